// THEORY:
// The visualizer is the offline half of the system. It never touches live
// capture state: it reads the append-only fix trace in file order, loads the
// same map image the tracker was matching against, and composites one line
// segment per consecutive pair of fixes onto a copy of the map.
//
// Two details carry the design:
// 1.  **Time as color**: each segment is colored by its fix's elapsed time
//     mapped through six linear ramps around the hue cycle
//     (red->yellow->green->cyan->blue->magenta->red), looping once per
//     configured period. A day of wandering reads as a rainbow.
// 2.  **Alpha accumulation**: segments are drawn thick, round-capped and
//     semi-transparent, each composited exactly once, so ground covered many
//     times visibly saturates while one-off detours stay faint.

use anyhow::Context;
use image::{Rgba, RgbaImage};
use log::warn;
use std::path::Path;
use trail_vision::core_modules::fix_log::FixRecord;

/// Rendering knobs. `Default` matches the tracker's 16px tiles and draws
/// 8px-thick lines at alpha 50/255 on a 24-hour color loop.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Tile size of the map the trace was recorded against.
    pub tile_size: u32,
    /// Hours per full trip around the hue cycle.
    pub color_loop_hours: f64,
    /// Path line thickness in pixels.
    pub line_thickness: u32,
    /// Per-segment compositing alpha, 0-255.
    pub alpha: u8,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            tile_size: 16,
            color_loop_hours: 24.0,
            line_thickness: 8,
            alpha: 50,
        }
    }
}

/// Maps elapsed seconds onto the hue cycle.
///
/// The loop is split into six equal stages; within each stage one RGB channel
/// ramps linearly while the other two sit at 0 or 255:
/// red->yellow, yellow->green, green->cyan, cyan->blue, blue->magenta,
/// magenta->red.
pub fn path_color(elapsed_secs: u64, color_loop_hours: f64) -> [u8; 3] {
    let loop_secs = color_loop_hours * 60.0 * 60.0;
    let stage_length = loop_secs / 6.0;

    let t = elapsed_secs as f64 % loop_secs;
    let stage = (t / stage_length) as u32;
    let ramp_up = (t % stage_length) / stage_length * 255.0;
    let ramp_down = 255.0 - ramp_up;

    let (r, g, b) = match stage {
        0 => (255.0, ramp_up, 0.0),
        1 => (ramp_down, 255.0, 0.0),
        2 => (0.0, 255.0, ramp_up),
        3 => (0.0, ramp_down, 255.0),
        4 => (ramp_up, 0.0, 255.0),
        _ => (255.0, 0.0, ramp_down),
    };
    [r as u8, g as u8, b as u8]
}

/// Composites one thick, round-capped, semi-transparent segment onto the
/// canvas. Every covered pixel is blended exactly once, so overlapping
/// segments (not overlapping pixels within one segment) are what intensify.
fn blend_segment(
    canvas: &mut RgbaImage,
    from: (f64, f64),
    to: (f64, f64),
    color: [u8; 3],
    thickness: u32,
    alpha: u8,
) {
    let radius = thickness as f64 / 2.0;
    let radius_sq = radius * radius;

    let min_x = (from.0.min(to.0) - radius).floor().max(0.0) as u32;
    let min_y = (from.1.min(to.1) - radius).floor().max(0.0) as u32;
    let max_x = (from.0.max(to.0) + radius).ceil().min(canvas.width() as f64 - 1.0) as u32;
    let max_y = (from.1.max(to.1) + radius).ceil().min(canvas.height() as f64 - 1.0) as u32;

    let dx = to.0 - from.0;
    let dy = to.1 - from.1;
    let length_sq = dx * dx + dy * dy;

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let px = x as f64;
            let py = y as f64;

            // Distance from the pixel to the segment; clamping the projection
            // onto the segment is what produces the round caps.
            let t = if length_sq == 0.0 {
                0.0
            } else {
                (((px - from.0) * dx + (py - from.1) * dy) / length_sq).clamp(0.0, 1.0)
            };
            let nearest_x = from.0 + t * dx;
            let nearest_y = from.1 + t * dy;
            let dist_sq = (px - nearest_x).powi(2) + (py - nearest_y).powi(2);

            if dist_sq <= radius_sq {
                let pixel = canvas.get_pixel_mut(x, y);
                let blended = blend_over(pixel.0, color, alpha);
                *pixel = Rgba(blended);
            }
        }
    }
}

/// Source-over blend of an opaque color at the given alpha onto an opaque
/// background pixel.
fn blend_over(background: [u8; 4], color: [u8; 3], alpha: u8) -> [u8; 4] {
    let a = alpha as u32;
    let blend = |bg: u8, fg: u8| ((bg as u32 * (255 - a) + fg as u32 * a) / 255) as u8;
    [
        blend(background[0], color[0]),
        blend(background[1], color[1]),
        blend(background[2], color[2]),
        background[3],
    ]
}

/// Reads a fix trace, skipping malformed lines. One bad line should not throw
/// away hours of valid history, so parse failures are logged and dropped.
pub fn read_trace<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<FixRecord>> {
    let contents = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("reading trace {:?}", path.as_ref()))?;

    let mut fixes = Vec::new();
    for (number, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<FixRecord>() {
            Ok(fix) => fixes.push(fix),
            Err(err) => warn!("skipping trace line {}: {err}", number + 1),
        }
    }
    Ok(fixes)
}

/// Draws the full path over a copy of the map image.
pub fn render_over_map(map: &RgbaImage, fixes: &[FixRecord], config: &RenderConfig) -> RgbaImage {
    let mut canvas = map.clone();
    let tile = config.tile_size as f64;

    for pair in fixes.windows(2) {
        let (prev, fix) = (&pair[0], &pair[1]);
        let color = path_color(fix.elapsed_secs, config.color_loop_hours);
        blend_segment(
            &mut canvas,
            (prev.x as f64 * tile, prev.y as f64 * tile),
            (fix.x as f64 * tile, fix.y as f64 * tile),
            color,
            config.line_thickness,
            config.alpha,
        );
    }

    canvas
}

/// Batch entry point: map image + trace file -> annotated output image.
pub fn render_path<P, Q, R>(
    map_path: P,
    trace_path: Q,
    output_path: R,
    config: &RenderConfig,
) -> anyhow::Result<()>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    R: AsRef<Path>,
{
    let map = image::open(map_path.as_ref())
        .with_context(|| format!("opening map image {:?}", map_path.as_ref()))?
        .to_rgba8();
    let fixes = read_trace(trace_path)?;

    let annotated = render_over_map(&map, &fixes, config);
    annotated
        .save(output_path.as_ref())
        .with_context(|| format!("saving output image {:?}", output_path.as_ref()))?;
    Ok(())
}
