// THEORY:
// The `pipeline` module is the top-level API of the tracking engine. One call to
// `process_cycle` runs a full capture-process-filter cycle: classify the frame,
// gate on the centered player silhouette, search the map, run the acceptance
// chain and, on confirmation, append a fix to the trace. The caller gets back a
// `CycleReport` describing exactly what happened, which also drives the
// scheduler's interval choice.
//
// Every tunable lives in `TrackerConfig` rather than in scattered globals, so a
// test (or a different game) can run the same pipeline with different budgets.

use crate::core_modules::consistency::{Anchor, Assessment, ConsistencyFilter};
use crate::core_modules::fix_log::{FixLog, FixRecord};
use crate::core_modules::grid_matcher::{self, MatchCandidate};
use crate::core_modules::tile::TileShade;
use crate::core_modules::tile_grid::TileGrid;
use crate::error::{Result, TrailError};
use image::GrayImage;
use log::{debug, info};
use std::path::Path;
use std::time::Duration;

/// Configuration for the tracking pipeline. `Default` carries the values tuned
/// for a 160x144 view on a 16px-tile map.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Tile size in pixels, shared by the map and the capture.
    pub tile_size: u32,
    /// Resolution every capture is normalized to before classification.
    pub capture_width: u32,
    pub capture_height: u32,
    /// Placements scoring at or below this are ignored. A perfect score for a
    /// 10x9 capture is 90.
    pub score_threshold: i32,
    /// Running score at which the matcher abandons a placement mid-comparison.
    pub give_up_threshold: i32,
    /// Consecutive centered-silhouette captures required before searching.
    pub sighting_threshold: u32,
    /// Consecutive accepted placements required before a fix is written.
    pub confirm_threshold: u32,
    /// The allowed squared drift from the anchor grows by elapsed seconds
    /// squared times this.
    pub drift_multiplier: f64,
    /// Fraction of the remaining distance the anchor moves toward an accepted
    /// placement.
    pub anchor_smoothing: f64,
    /// Scheduler interval while still waiting to sight the silhouette.
    pub capture_interval: Duration,
    /// Scheduler interval once the silhouette is centered and searches run.
    pub find_interval: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tile_size: 16,
            capture_width: 160,
            capture_height: 144,
            score_threshold: 60,
            give_up_threshold: -5,
            sighting_threshold: 3,
            confirm_threshold: 3,
            drift_multiplier: 2.0,
            anchor_smoothing: 0.5,
            capture_interval: Duration::from_millis(2000),
            find_interval: Duration::from_millis(4000),
        }
    }
}

impl TrackerConfig {
    pub fn capture_grid_cols(&self) -> usize {
        (self.capture_width / self.tile_size) as usize
    }

    pub fn capture_grid_rows(&self) -> usize {
        (self.capture_height / self.tile_size) as usize
    }
}

/// The primary output of the pipeline for a single cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleReport {
    /// No player silhouette in the center tile (battle, menu, cutscene).
    PlayerMissing,
    /// Silhouette sighted; still debouncing before any search runs.
    Sighting { count: u32 },
    /// The search ran but the best placement scored too low to trust.
    WeakMatch { score: i32 },
    /// Best placement equals the previously accepted one; a real player moves.
    SameAsPrevious { x: i32, y: i32 },
    /// Placement was too far from the anchor for the time elapsed.
    DriftRejected { distance_sq: f64, allowed_sq: f64 },
    /// Placement accepted; the confirmation streak is still building.
    Unconfirmed { streak: u32 },
    /// Confirmed and logged. Coordinates are the player's map tile.
    Confirmed { x: i32, y: i32 },
}

impl CycleReport {
    /// Whether the player silhouette was centered this cycle. The scheduler
    /// re-captures quickly while this is false and relaxes once it holds.
    pub fn player_located(&self) -> bool {
        !matches!(
            self,
            CycleReport::PlayerMissing | CycleReport::Sighting { .. }
        )
    }

    /// The interval the scheduler should wait before the next cycle.
    pub fn suggested_interval(&self, config: &TrackerConfig) -> Duration {
        if self.player_located() {
            config.find_interval
        } else {
            config.capture_interval
        }
    }
}

/// The tracking engine: map grid, filter state and the trace writer.
pub struct TrackingPipeline {
    config: TrackerConfig,
    map_grid: TileGrid,
    filter: ConsistencyFilter,
    fix_log: FixLog,
}

impl TrackingPipeline {
    /// Builds the map grid from the map image (once; it is immutable from here
    /// on) and opens the trace for appending. The anchor starts at map center.
    pub fn new<P: AsRef<Path>>(
        config: TrackerConfig,
        map_image: &GrayImage,
        trace_path: P,
    ) -> Result<Self> {
        let map_grid = TileGrid::from_image(map_image, config.tile_size)?;
        let fix_log = FixLog::open(trace_path)?;
        Ok(Self::from_parts(config, map_grid, fix_log))
    }

    /// Assembles a pipeline from an already-built map grid and trace writer.
    pub fn from_parts(config: TrackerConfig, map_grid: TileGrid, fix_log: FixLog) -> Self {
        let anchor = Anchor {
            x: (map_grid.cols() / 2) as f64,
            y: (map_grid.rows() / 2) as f64,
        };
        Self {
            config,
            map_grid,
            filter: ConsistencyFilter::new(anchor),
            fix_log,
        }
    }

    /// Runs one capture-process-filter cycle. `frame` must already be
    /// normalized to the capture resolution; `elapsed` is time since session
    /// start.
    pub fn process_cycle(&mut self, frame: &GrayImage, elapsed: Duration) -> Result<CycleReport> {
        if frame.width() != self.config.capture_width
            || frame.height() != self.config.capture_height
        {
            return Err(TrailError::Capture(format!(
                "expected a {}x{} capture, got {}x{}",
                self.config.capture_width,
                self.config.capture_height,
                frame.width(),
                frame.height()
            )));
        }

        let capture = TileGrid::from_image(frame, self.config.tile_size)?;

        // The player silhouette renders as a black tile in the capture center.
        // Anything else means the view is covered (battle, menu, cutscene).
        let center = capture.get(capture.rows() / 2, capture.cols() / 2);
        if center != TileShade::Black {
            self.filter.reset_sightings();
            return Ok(CycleReport::PlayerMissing);
        }

        let sightings = self.filter.record_sighting();
        if sightings < self.config.sighting_threshold {
            return Ok(CycleReport::Sighting { count: sightings });
        }

        let candidate = grid_matcher::locate(&self.map_grid, &capture, self.config.give_up_threshold);
        debug!(
            "best placement ({}, {}) scored {}",
            candidate.x, candidate.y, candidate.score
        );

        if candidate.score <= self.config.score_threshold {
            return Ok(CycleReport::WeakMatch {
                score: candidate.score,
            });
        }

        match self.filter.assess(&candidate, elapsed, &self.config) {
            Assessment::SameAsPrevious => Ok(CycleReport::SameAsPrevious {
                x: candidate.x,
                y: candidate.y,
            }),
            Assessment::TooFar {
                distance_sq,
                allowed_sq,
            } => Ok(CycleReport::DriftRejected {
                distance_sq,
                allowed_sq,
            }),
            Assessment::Unconfirmed { streak } => Ok(CycleReport::Unconfirmed { streak }),
            Assessment::Confirmed => {
                let fix = self.player_tile(&candidate);
                self.fix_log.append(&FixRecord {
                    elapsed_secs: elapsed.as_secs(),
                    x: fix.0,
                    y: fix.1,
                })?;
                info!("fix confirmed at tile ({}, {})", fix.0, fix.1);
                Ok(CycleReport::Confirmed { x: fix.0, y: fix.1 })
            }
        }
    }

    /// Plants the anchor at a pixel coordinate on the map, converted to tile
    /// units. Bypasses the drift checks entirely.
    pub fn override_anchor(&mut self, pixel_x: u32, pixel_y: u32, elapsed: Duration) {
        let tile_x = (pixel_x / self.config.tile_size) as f64;
        let tile_y = (pixel_y / self.config.tile_size) as f64;
        info!("anchor override to tile ({tile_x}, {tile_y})");
        self.filter.override_anchor(tile_x, tile_y, elapsed);
    }

    pub fn anchor(&self) -> Anchor {
        self.filter.anchor()
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// A placement names the capture's top-left tile; the player stands half a
    /// capture in, so the logged fix is offset by half the capture dimensions.
    fn player_tile(&self, candidate: &MatchCandidate) -> (i32, i32) {
        (
            candidate.x + (self.config.capture_grid_cols() / 2) as i32,
            candidate.y + (self.config.capture_grid_rows() / 2) as i32,
        )
    }
}
