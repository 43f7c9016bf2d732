use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};
use image::{codecs::png::PngEncoder, ColorType, ImageEncoder};
use tempfile::tempdir;

fn write_png(path: &Path, width: u32, height: u32) -> Result<()> {
    let pixels = vec![255u8; (width * height * 4) as usize];
    let file = fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    PngEncoder::new(file).write_image(&pixels, width, height, ColorType::Rgba8)?;
    Ok(())
}

#[test]
fn host_runs_script_ticks_and_verifies_save() -> Result<()> {
    let dir = tempdir()?;
    write_png(&dir.path().join("body.png"), 24, 48)?;
    write_png(&dir.path().join("hat.png"), 10, 6)?;
    fs::write(dir.path().join("step.wav"), b"RIFF")?;

    let frame_path = dir.path().join("walk.frame");
    fs::write(
        &frame_path,
        "FRAME\n{\n  DELAY = 100\n  IMAGE = \"body.png\"\n  HOTSPOT { 12, 48 }\n  SOUND = \"step.wav\"\n  APPLY_EVENT = \"FootDown\"\n}\n",
    )?;
    let script_path = dir.path().join("setup.lua");
    fs::write(
        &script_path,
        "local hat = frame:AddSubframe(\"hat.png\")\nhat.HotspotY = 60\nframe.Delay = 75\nFader:FadeIn(0, 0, 0, 255, 40)\n",
    )?;
    let settings_path = dir.path().join("host.json");
    fs::write(&settings_path, r#"{ "ticks": 3, "tick_ms": 20 }"#)?;
    let save_path = dir.path().join("walk.sav");

    let output = Command::new(env!("CARGO_BIN_EXE_wme_engine"))
        .arg("--frame")
        .arg(&frame_path)
        .arg("--script")
        .arg(&script_path)
        .arg("--settings")
        .arg(&settings_path)
        .arg("--save")
        .arg(&save_path)
        .output()
        .context("running wme_engine")?;
    assert!(
        output.status.success(),
        "wme_engine failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("delay 75"), "{stdout}");
    assert!(stdout.contains("sound step.wav"), "{stdout}");
    assert!(stdout.contains("subframes: 2"), "{stdout}");
    assert!(stdout.contains("hotspot 0,60"), "{stdout}");
    assert!(stdout.contains("fader idle alpha 0"), "{stdout}");
    assert!(stdout.contains("script errors: 0"), "{stdout}");

    let saved = fs::read(&save_path)?;
    assert_eq!(&saved[..4], b"WMES");
    Ok(())
}

#[test]
fn host_prints_text_form() -> Result<()> {
    let dir = tempdir()?;
    write_png(&dir.path().join("a.png"), 4, 4)?;
    let frame_path = dir.path().join("a.frame");
    fs::write(&frame_path, "FRAME { DELAY = 5 SUBFRAME { IMAGE = \"a.png\" } }")?;

    let output = Command::new(env!("CARGO_BIN_EXE_wme_engine"))
        .arg("--frame")
        .arg(&frame_path)
        .arg("--text")
        .output()
        .context("running wme_engine")?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.starts_with("FRAME {\n  DELAY = 5\n"), "{stdout}");
    assert!(stdout.contains("IMAGE = \"a.png\""), "{stdout}");
    Ok(())
}

#[test]
fn missing_image_fails_the_load() -> Result<()> {
    let dir = tempdir()?;
    let frame_path = dir.path().join("broken.frame");
    fs::write(&frame_path, "FRAME { IMAGE = \"nowhere.png\" }")?;

    let output = Command::new(env!("CARGO_BIN_EXE_wme_engine"))
        .arg("--frame")
        .arg(&frame_path)
        .output()
        .context("running wme_engine")?;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error loading SUBFRAME"), "{stderr}");
    Ok(())
}
