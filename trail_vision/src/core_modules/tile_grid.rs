// THEORY:
// The `TileGrid` is the shared currency of the engine. Both the world map and the
// live capture are reduced to one: a flat, row-major grid of `TileShade`s. The map
// grid is built exactly once at startup and never changes; the capture grid is
// rebuilt from scratch every cycle.
//
// Key architectural principles:
// 1.  **One format, two roles**: The placement search only ever compares two
//     `TileGrid`s cell by cell. Nothing downstream of this module touches pixels.
// 2.  **Row-major flat storage**: A single `Vec` indexed `row * cols + col`, the
//     same layout the grid scan and the placement search iterate in. Scan order
//     matters here: it defines the tie-break of the search.
// 3.  **Signed lookups at the edges**: The search deliberately slides the capture
//     partially outside the map, so the grid offers a checked signed lookup that
//     simply reports out-of-bounds cells as absent.

use crate::core_modules::tile::{TileShade, classify_tile};
use crate::error::{Result, TrailError};
use image::GrayImage;

/// A 2D grid of quantized tile shades, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileGrid {
    rows: usize,
    cols: usize,
    shades: Vec<TileShade>,
}

impl TileGrid {
    /// Builds a grid directly from shade values. `shades` must be row-major and
    /// exactly `rows * cols` long.
    pub fn from_shades(rows: usize, cols: usize, shades: Vec<TileShade>) -> Result<Self> {
        if shades.len() != rows * cols {
            return Err(TrailError::Config(format!(
                "expected {} shades for a {rows}x{cols} grid, got {}",
                rows * cols,
                shades.len()
            )));
        }
        Ok(Self { rows, cols, shades })
    }

    /// Classifies a grayscale image into a tile grid.
    ///
    /// The image dimensions must be exact multiples of `tile_size`; maps that are
    /// not tile-aligned are a configuration error, not something to round away.
    pub fn from_image(image: &GrayImage, tile_size: u32) -> Result<Self> {
        if tile_size == 0 {
            return Err(TrailError::Config("tile size must be non-zero".into()));
        }
        if image.width() % tile_size != 0 || image.height() % tile_size != 0 {
            return Err(TrailError::Config(format!(
                "image dimensions {}x{} are not a multiple of the tile size {tile_size}",
                image.width(),
                image.height()
            )));
        }

        let cols = (image.width() / tile_size) as usize;
        let rows = (image.height() / tile_size) as usize;
        let mut shades = Vec::with_capacity(rows * cols);

        for row in 0..rows {
            for col in 0..cols {
                let base_x = col as u32 * tile_size;
                let base_y = row as u32 * tile_size;
                // Raster order within the tile: the classifier's early exit
                // depends on it.
                let shade = classify_tile((0..tile_size * tile_size).map(|i| {
                    let x = base_x + i % tile_size;
                    let y = base_y + i / tile_size;
                    image.get_pixel(x, y)[0]
                }));
                shades.push(shade);
            }
        }

        Ok(Self { rows, cols, shades })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// The shade at an in-bounds cell.
    pub fn get(&self, row: usize, col: usize) -> TileShade {
        self.shades[row * self.cols + col]
    }

    /// Checked signed lookup. Out-of-bounds cells are `None`, which the placement
    /// search treats as "nothing to compare".
    pub fn shade(&self, row: i32, col: i32) -> Option<TileShade> {
        if row < 0 || col < 0 || row >= self.rows as i32 || col >= self.cols as i32 {
            return None;
        }
        Some(self.get(row as usize, col as usize))
    }

    /// Renders the grid back into a grayscale image, one flat block per tile.
    /// Purely a debugging aid for eyeballing what the classifier saw.
    pub fn to_image(&self, tile_size: u32) -> GrayImage {
        let width = self.cols as u32 * tile_size;
        let height = self.rows as u32 * tile_size;
        GrayImage::from_fn(width, height, |x, y| {
            let shade = self.get((y / tile_size) as usize, (x / tile_size) as usize);
            image::Luma([shade.debug_luminance()])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_image(width: u32, height: u32, luminance: u8) -> GrayImage {
        GrayImage::from_pixel(width, height, image::Luma([luminance]))
    }

    #[test]
    fn builds_grid_of_expected_dimensions() {
        let grid = TileGrid::from_image(&flat_image(160, 144, 255), 16).unwrap();
        assert_eq!(grid.cols(), 10);
        assert_eq!(grid.rows(), 9);
        assert!((0..9).all(|r| (0..10).all(|c| grid.get(r, c) == TileShade::White)));
    }

    #[test]
    fn rejects_unaligned_dimensions() {
        let image = flat_image(150, 144, 255);
        assert!(TileGrid::from_image(&image, 16).is_err());
    }

    #[test]
    fn rejects_shade_count_mismatch() {
        assert!(TileGrid::from_shades(2, 2, vec![TileShade::White; 3]).is_err());
    }

    #[test]
    fn classifies_mixed_tiles_independently() {
        // Left tile black, right tile white.
        let mut image = flat_image(32, 16, 255);
        for y in 0..16 {
            for x in 0..16 {
                image.put_pixel(x, y, image::Luma([0]));
            }
        }
        let grid = TileGrid::from_image(&image, 16).unwrap();
        assert_eq!(grid.get(0, 0), TileShade::Black);
        assert_eq!(grid.get(0, 1), TileShade::White);
    }

    #[test]
    fn signed_lookup_reports_out_of_bounds() {
        let grid = TileGrid::from_image(&flat_image(32, 32, 0), 16).unwrap();
        assert_eq!(grid.shade(0, 0), Some(TileShade::Black));
        assert_eq!(grid.shade(-1, 0), None);
        assert_eq!(grid.shade(0, 2), None);
        assert_eq!(grid.shade(2, 1), None);
    }

    #[test]
    fn debug_render_round_trips_shades() {
        let grid = TileGrid::from_shades(
            1,
            4,
            vec![
                TileShade::White,
                TileShade::LightGrey,
                TileShade::DarkGrey,
                TileShade::Black,
            ],
        )
        .unwrap();
        let image = grid.to_image(16);
        assert_eq!(image.get_pixel(0, 0)[0], 255);
        assert_eq!(image.get_pixel(16, 0)[0], 150);
        assert_eq!(image.get_pixel(32, 0)[0], 80);
        assert_eq!(image.get_pixel(48, 0)[0], 0);
    }
}
