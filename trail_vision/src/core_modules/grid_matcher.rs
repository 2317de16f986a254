// THEORY:
// The `grid_matcher` is the engine of the localization layer. It answers one
// question: where inside the big map grid does the small capture grid fit best?
//
// Key architectural principles & algorithm steps:
// 1.  **Exhaustive placement scan**: Every top-left offset at which the capture
//     overlaps the map by at least one tile is a candidate. The scan deliberately
//     runs half a capture out of bounds on each edge, because map images are
//     sometimes missing boundary tiles that still show up in the live view.
// 2.  **Agreement scoring**: At each offset the two grids are compared cell by
//     cell: +1 where the shades agree, -1 where they disagree. Cells that fall
//     outside the map contribute nothing either way.
// 3.  **Give-up pruning**: The moment an offset's running score drops below the
//     give-up threshold the offset is abandoned. Almost every offset is obviously
//     wrong within its first few tiles, so this prunes the vast bulk of the work
//     and is what makes the brute-force scan affordable.
// 4.  **Strict-greater best tracking**: A candidate only replaces the best when
//     its score is strictly higher, so among tied offsets the first one in
//     row-major scan order wins. The tie-break is deterministic and documented
//     behavior, not an accident.
// 5.  **Stateless utility**: Like the classifier, the matcher has no memory. One
//     call, one answer; all temporal reasoning lives in the consistency filter.

use crate::core_modules::tile_grid::TileGrid;

/// A candidate placement of the capture grid inside the map grid. `x` and `y`
/// are the top-left tile offset; the maximum attainable score is the capture's
/// `rows * cols`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchCandidate {
    pub score: i32,
    pub x: i32,
    pub y: i32,
}

/// Finds the best placement of `capture` inside `map`.
///
/// `give_up` is the running score below which an offset is abandoned mid-scan.
/// Pruning only ever skips offsets that could not have become the best, so the
/// returned candidate is the same one an unpruned scan would find.
pub fn locate(map: &TileGrid, capture: &TileGrid, give_up: i32) -> MatchCandidate {
    let map_rows = map.rows() as i32;
    let map_cols = map.cols() as i32;
    let cap_rows = capture.rows() as i32;
    let cap_cols = capture.cols() as i32;

    let mut best = MatchCandidate {
        score: i32::MIN,
        x: 0,
        y: 0,
    };

    for y in -(cap_rows / 2)..(map_rows - cap_rows / 2) {
        for x in -(cap_cols / 2)..(map_cols - cap_cols / 2) {
            let mut score = 0i32;

            'placement: for cap_row in 0..cap_rows {
                for cap_col in 0..cap_cols {
                    let Some(map_shade) = map.shade(y + cap_row, x + cap_col) else {
                        continue;
                    };

                    if capture.get(cap_row as usize, cap_col as usize) == map_shade {
                        score += 1;
                    } else {
                        score -= 1;
                        if score < give_up {
                            break 'placement;
                        }
                    }
                }
            }

            if score > best.score {
                best = MatchCandidate { score, x, y };
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::tile::TileShade;

    const GIVE_UP: i32 = -5;

    /// A map that is all `White` except for a block of `pattern` placed at
    /// tile offset (x, y).
    fn map_with_block(
        rows: usize,
        cols: usize,
        pattern: &TileGrid,
        x: usize,
        y: usize,
    ) -> TileGrid {
        let mut shades = vec![TileShade::White; rows * cols];
        for r in 0..pattern.rows() {
            for c in 0..pattern.cols() {
                shades[(y + r) * cols + (x + c)] = pattern.get(r, c);
            }
        }
        TileGrid::from_shades(rows, cols, shades).unwrap()
    }

    /// A capture whose cells cycle through all four shades, distinctive enough
    /// that only its true placement scores perfectly.
    fn patterned_capture(rows: usize, cols: usize) -> TileGrid {
        let shades = (0..rows * cols)
            .map(|i| match i % 4 {
                0 => TileShade::White,
                1 => TileShade::LightGrey,
                2 => TileShade::DarkGrey,
                _ => TileShade::Black,
            })
            .collect();
        TileGrid::from_shades(rows, cols, shades).unwrap()
    }

    #[test]
    fn finds_exact_sub_grid_with_full_score() {
        let capture = patterned_capture(9, 10);
        let map = map_with_block(20, 20, &capture, 7, 3);

        let best = locate(&map, &capture, GIVE_UP);
        assert_eq!((best.x, best.y), (7, 3));
        assert_eq!(best.score, 90);
    }

    #[test]
    fn tie_break_keeps_first_offset_in_scan_order() {
        // Two identical blocks: row-major scan meets (1, 1) before (1, 6).
        let capture = TileGrid::from_shades(2, 2, vec![TileShade::Black; 4]).unwrap();
        let mut shades = vec![TileShade::White; 12 * 12];
        for (bx, by) in [(1usize, 1usize), (6, 1)] {
            for r in 0..2 {
                for c in 0..2 {
                    shades[(by + r) * 12 + (bx + c)] = TileShade::Black;
                }
            }
        }
        let map = TileGrid::from_shades(12, 12, shades).unwrap();

        let best = locate(&map, &capture, GIVE_UP);
        assert_eq!((best.x, best.y), (1, 1));
    }

    #[test]
    fn matches_capture_hanging_off_the_map_edge() {
        // The capture's left half sticks out past x = 0; only the right half
        // exists on the map. Out-of-bounds cells contribute nothing, so the
        // overhanging placement still wins.
        let capture = patterned_capture(4, 4);
        let mut shades = vec![TileShade::White; 8 * 8];
        for r in 0..4 {
            for c in 0..2 {
                shades[(2 + r) * 8 + c] = capture.get(r, c + 2);
            }
        }
        let map = TileGrid::from_shades(8, 8, shades).unwrap();

        let best = locate(&map, &capture, GIVE_UP);
        assert_eq!((best.x, best.y), (-2, 2));
        assert_eq!(best.score, 8);
    }

    #[test]
    fn pruning_does_not_change_the_winner() {
        let capture = patterned_capture(9, 10);
        let map = map_with_block(30, 30, &capture, 11, 14);

        let pruned = locate(&map, &capture, GIVE_UP);
        let unpruned = locate(&map, &capture, i32::MIN + 1);
        assert_eq!((pruned.x, pruned.y), (unpruned.x, unpruned.y));
        assert_eq!(pruned.score, unpruned.score);
    }

    #[test]
    fn disagreements_subtract_from_the_score() {
        let mut shades = vec![TileShade::Black; 4];
        shades[3] = TileShade::DarkGrey;
        let capture = TileGrid::from_shades(2, 2, shades).unwrap();
        let map = TileGrid::from_shades(2, 2, vec![TileShade::Black; 4]).unwrap();

        // Three agreements, one disagreement.
        let best = locate(&map, &capture, GIVE_UP);
        assert_eq!(best.score, 2);
        assert_eq!((best.x, best.y), (0, 0));
    }
}
