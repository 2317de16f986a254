pub mod consistency;
pub mod fix_log;
pub mod grid_matcher;
pub mod tile;
pub mod tile_grid;
pub mod view;
