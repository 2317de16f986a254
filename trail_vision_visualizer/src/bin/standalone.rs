use std::env;
use trail_vision_visualizer::{RenderConfig, render_path};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        println!("Usage: standalone <map_image> <trace_file> <output_image>");
        return Ok(());
    }

    render_path(&args[1], &args[2], &args[3], &RenderConfig::default())?;
    println!("Path rendered to {}", args[3]);
    Ok(())
}
