// Thin runner around the trail_vision engine. An external grabber keeps writing
// the latest stream screenshot to a file; this loop re-reads it on a timer,
// normalizes it and hands it to the tracking session. Operator commands arrive
// on stdin:
//
//   view <left> <top> <width> <height>   locate the game view in the frame
//   anchor <x> <y>                       plant the anchor at a map pixel
//   time <secs | h:m:s>                  rebase the clock to stream time
//   quit
//
// The loop never dies on a bad cycle: a missing capture file or a glitched
// frame is logged and the next tick tries again.

use anyhow::Context;
use log::{error, info, warn};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use trail_vision::core_modules::view::{self, ViewRegion};
use trail_vision::{CycleReport, TrackerConfig, TrackingPipeline, TrackingSession};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        println!("Usage: stream_tracker <map_image> <trace_file> <capture_file>");
        return Ok(());
    }
    let map_path = &args[1];
    let trace_path = &args[2];
    let capture_path = PathBuf::from(&args[3]);

    let map_image = image::open(map_path)
        .with_context(|| format!("opening map image {map_path:?}"))?
        .to_luma8();

    let config = TrackerConfig::default();
    let pipeline = TrackingPipeline::new(config.clone(), &map_image, trace_path)?;
    let session = TrackingSession::spawn(pipeline);

    info!(
        "tracking a {}x{} map, appending fixes to {trace_path}",
        map_image.width(),
        map_image.height()
    );

    let mut view_region: Option<ViewRegion> = None;
    let mut delay = config.capture_interval;
    let mut commands_open = true;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = tokio::time::sleep(delay) => {
                match run_cycle(&session, &capture_path, view_region.as_ref(), &config).await {
                    Ok(report) => {
                        info!("cycle: {report:?}");
                        delay = report.suggested_interval(&config);
                    }
                    Err(err) => warn!("cycle failed: {err:#}"),
                }
            }
            line = lines.next_line(), if commands_open => {
                match line {
                    Ok(Some(line)) => {
                        if handle_command(&line, &session, &mut view_region).await {
                            break;
                        }
                    }
                    Ok(None) | Err(_) => {
                        // stdin closed; keep tracking without commands.
                        commands_open = false;
                    }
                }
            }
        }
    }

    session.shutdown().await;
    Ok(())
}

/// One capture-process-filter cycle. A missing capture file aborts the cycle
/// without touching any tracking state.
async fn run_cycle(
    session: &TrackingSession,
    capture_path: &Path,
    region: Option<&ViewRegion>,
    config: &TrackerConfig,
) -> anyhow::Result<CycleReport> {
    let frame = image::open(capture_path)
        .with_context(|| format!("nothing to capture at {capture_path:?}"))?
        .to_luma8();

    let normalized = view::normalize(&frame, region, config.capture_width, config.capture_height)?;
    Ok(session.process(normalized).await?)
}

/// Applies one operator command. Returns true when the operator asked to quit.
/// Bad input never mutates anything: the error is logged and the previous
/// configuration stays in force.
async fn handle_command(
    line: &str,
    session: &TrackingSession,
    view_region: &mut Option<ViewRegion>,
) -> bool {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    match tokens.as_slice() {
        ["view", left, top, width, height] => {
            match ViewRegion::parse(left, top, width, height) {
                Ok(region) => {
                    info!("view region set to {region:?}");
                    *view_region = Some(region);
                }
                Err(err) => error!("view command rejected: {err}"),
            }
        }
        ["anchor", x, y] => match (x.parse::<u32>(), y.parse::<u32>()) {
            (Ok(pixel_x), Ok(pixel_y)) => {
                if let Err(err) = session.override_anchor(pixel_x, pixel_y).await {
                    error!("anchor override failed: {err}");
                }
            }
            _ => error!("anchor command rejected: coordinates must be pixel integers"),
        },
        ["time", stamp] => match parse_elapsed(stamp) {
            Some(elapsed) => {
                if let Err(err) = session.rebase_clock(elapsed).await {
                    error!("clock rebase failed: {err}");
                }
            }
            None => error!("time command rejected: want seconds or h:m:s, got {stamp:?}"),
        },
        ["quit"] => return true,
        [] => {}
        _ => error!("unknown command: {line:?}"),
    }

    false
}

/// Parses an elapsed stream time, either plain seconds or `h:m:s`.
fn parse_elapsed(stamp: &str) -> Option<Duration> {
    if !stamp.contains(':') {
        return stamp.parse::<u64>().ok().map(Duration::from_secs);
    }

    let parts: Vec<&str> = stamp.split(':').collect();
    if parts.len() != 3 {
        return None;
    }
    let hours = parts[0].parse::<u64>().ok()?;
    let minutes = parts[1].parse::<u64>().ok()?;
    let seconds = parts[2].parse::<u64>().ok()?;
    if minutes >= 60 || seconds >= 60 {
        return None;
    }
    Some(Duration::from_secs(hours * 3600 + minutes * 60 + seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_seconds() {
        assert_eq!(parse_elapsed("90"), Some(Duration::from_secs(90)));
    }

    #[test]
    fn parses_h_m_s() {
        assert_eq!(
            parse_elapsed("2:05:30"),
            Some(Duration::from_secs(2 * 3600 + 5 * 60 + 30))
        );
    }

    #[test]
    fn rejects_garbage_stamps() {
        assert_eq!(parse_elapsed("abc"), None);
        assert_eq!(parse_elapsed("1:2"), None);
        assert_eq!(parse_elapsed("1:75:00"), None);
    }
}
