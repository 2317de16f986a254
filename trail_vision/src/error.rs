//! Error types for the trail_vision engine.

use thiserror::Error;

/// Engine error type.
#[derive(Error, Debug)]
pub enum TrailError {
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("capture error: {0}")]
    Capture(String),

    #[error("session error: {0}")]
    Session(String),
}

pub type Result<T> = std::result::Result<T, TrailError>;
