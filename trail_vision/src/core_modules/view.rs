// THEORY:
// The `view` module normalizes whatever the capture source produced into the
// fixed-resolution frame the classifier expects. Streams wrap the actual game
// output in chat panels and borders, so the operator supplies a rectangle
// locating the game view inside the captured window; that region is cropped out
// and linearly resized to the capture resolution. Operator input is validated
// up front: a typo'd region is rejected with an explicit error and the previous
// region stays in force.

use crate::error::{Result, TrailError};
use image::imageops::{self, FilterType};
use image::GrayImage;

/// The rectangle where the game view sits inside a captured window, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewRegion {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl ViewRegion {
    /// Parses the four operator-supplied fields. Any non-numeric or negative
    /// field is a configuration error; callers keep their old region on error.
    pub fn parse(left: &str, top: &str, width: &str, height: &str) -> Result<Self> {
        let field = |name: &str, value: &str| -> Result<i64> {
            value
                .trim()
                .parse::<i64>()
                .map_err(|_| TrailError::Config(format!("{name} is not an integer: {value:?}")))
        };

        let left = field("left", left)?;
        let top = field("top", top)?;
        let width = field("width", width)?;
        let height = field("height", height)?;

        if left < 0 || top < 0 {
            return Err(TrailError::Config(format!(
                "view origin cannot be negative: ({left}, {top})"
            )));
        }
        if width <= 0 || height <= 0 {
            return Err(TrailError::Config(format!(
                "view size must be positive: {width}x{height}"
            )));
        }

        Ok(Self {
            left: left as u32,
            top: top as u32,
            width: width as u32,
            height: height as u32,
        })
    }
}

/// Crops the view region (when one is set) out of a captured frame and resizes
/// the result to the capture resolution.
pub fn normalize(
    frame: &GrayImage,
    region: Option<&ViewRegion>,
    out_width: u32,
    out_height: u32,
) -> Result<GrayImage> {
    let cropped = match region {
        Some(r) => {
            if r.left as u64 + r.width as u64 > frame.width() as u64
                || r.top as u64 + r.height as u64 > frame.height() as u64
            {
                return Err(TrailError::Capture(format!(
                    "view region {}x{}+{}+{} does not fit a {}x{} frame",
                    r.width,
                    r.height,
                    r.left,
                    r.top,
                    frame.width(),
                    frame.height()
                )));
            }
            imageops::crop_imm(frame, r.left, r.top, r.width, r.height).to_image()
        }
        None => frame.clone(),
    };

    Ok(imageops::resize(
        &cropped,
        out_width,
        out_height,
        FilterType::Triangle,
    ))
}
