use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use wme_formats::FrameDef;

/// Inspect a WME `FRAME { ... }` definition and list its subframes.
#[derive(Parser)]
struct Args {
    /// Path to the frame definition to inspect
    path: PathBuf,
    /// Print the parsed definition as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let bytes =
        fs::read(&args.path).with_context(|| format!("reading {}", args.path.display()))?;
    let frame = FrameDef::parse_bytes(&bytes)
        .with_context(|| format!("parsing {}", args.path.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&frame)?);
        return Ok(());
    }

    println!("delay {}", frame.delay);
    println!("move {}, {}", frame.move_x, frame.move_y);
    println!("keyframe {}", frame.keyframe);
    println!("sound {}", frame.sound.as_deref().unwrap_or("-"));
    println!("subframes: {}", frame.subframes.len());
    for (idx, sub) in frame.subframes.iter().enumerate() {
        let rect = sub
            .rect
            .map(|r| format!("{},{},{},{}", r.left, r.top, r.right, r.bottom))
            .unwrap_or_else(|| "image".to_string());
        println!(
            "{:>4}  {:<32}  rect {:<16}  hotspot {},{}  alpha {:08X}{}",
            idx,
            sub.image.as_deref().unwrap_or("-"),
            rect,
            sub.hotspot_x,
            sub.hotspot_y,
            sub.alpha.0,
            if sub.decoration { "  decoration" } else { "" }
        );
    }
    println!("events: {}", frame.apply_events.len());
    for event in &frame.apply_events {
        println!("      {event}");
    }

    Ok(())
}
