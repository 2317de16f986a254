// THEORY:
// This file is the main entry point for the `trail_vision` library crate. It
// exposes the tracking pipeline and its data structures as the high-level API:
// a consumer builds a `TrackerConfig`, hands a map image to `TrackingPipeline`
// (or wraps it in a `TrackingSession` for serialized async use) and feeds it
// normalized capture frames. The internal `core_modules` stay public for the
// visualizer, which shares the `FixRecord` trace format.

pub mod core_modules;
pub mod error;
pub mod pipeline;
pub mod session;

pub use error::{Result, TrailError};
pub use pipeline::{CycleReport, TrackerConfig, TrackingPipeline};
pub use session::TrackingSession;
