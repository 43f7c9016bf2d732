use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;
use wme_engine::fs_store::{DirSurfaceStorage, FileSoundManager, LoggingRenderer};
use wme_engine::lua_host::{HostState, ScriptHost};
use wme_engine::settings::HostSettings;
use wme_engine::sound::Sound;
use wme_engine::{Frame, FrameOwner, Game};

mod cli;
use cli::Args;

/// Stands in for the sprite or entity a frame normally belongs to.
struct LoggingOwner;

impl FrameOwner for LoggingOwner {
    fn update_one_sound(&mut self, sound: &mut Sound) {
        log::debug!(
            "frame sound '{}' about to play",
            sound.filename().unwrap_or_default()
        );
    }

    fn apply_event(&mut self, event: &str) {
        log::info!("apply event '{event}'");
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let settings = HostSettings::from_json_file(args.settings.as_deref())
        .context("loading host settings")?;
    let data_root = match &settings.data_root {
        Some(root) => root.clone(),
        None => args
            .frame
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };

    let mut game = Game::new(
        Box::new(DirSurfaceStorage::new(data_root.clone())),
        Box::new(FileSoundManager::new(data_root, settings.sound_available)),
        Box::new(LoggingRenderer),
    );
    let text = fs::read_to_string(&args.frame)
        .with_context(|| format!("reading {}", args.frame.display()))?;
    let frame = Frame::load(&mut game, &text)
        .with_context(|| format!("loading frame {}", args.frame.display()))?;

    let host = ScriptHost::new(HostState::new(game, frame))?;
    if let Some(script) = &args.script {
        let source = fs::read_to_string(script)
            .with_context(|| format!("reading {}", script.display()))?;
        host.run(&script.display().to_string(), &source)?;
    }
    let mut state = host.into_state()?;

    let mut owner = LoggingOwner;
    state.enter(Some(&mut owner), settings.muted)?;
    for _ in 0..settings.ticks {
        state.tick(settings.tick_ms)?;
    }

    if let Some(path) = &args.save {
        let stream = state.save().context("serializing save state")?;
        fs::write(path, &stream).with_context(|| format!("writing {}", path.display()))?;
        let before = state.frame.to_text();
        state.load(&stream).context("reloading save state")?;
        if state.frame.to_text() != before {
            bail!("frame reloaded from {} differs from the saved one", path.display());
        }
        println!("saved {} bytes to {}", stream.len(), path.display());
    }

    if args.text {
        print!("{}", state.frame.to_text());
    } else {
        print_summary(&state);
    }
    Ok(())
}

fn print_summary(state: &HostState) {
    let frame = &state.frame;
    println!("delay {}", frame.delay);
    println!("move {}, {}", frame.move_x, frame.move_y);
    println!(
        "sound {}",
        frame.sound().and_then(Sound::filename).unwrap_or("-")
    );
    println!("subframes: {}", frame.subframes().len());
    for (idx, sub) in frame.subframes().values().enumerate() {
        println!(
            "{:>4}  {:<32}  rect {},{},{},{}  hotspot {},{}",
            idx,
            sub.image().unwrap_or("-"),
            sub.rect.left,
            sub.rect.top,
            sub.rect.right,
            sub.rect.bottom,
            sub.hotspot_x,
            sub.hotspot_y
        );
    }
    println!("events: {}", frame.apply_events().len());
    for event in frame.apply_events() {
        println!("      {event}");
    }
    println!(
        "fader {} alpha {}",
        if state.fader.is_active() { "active" } else { "idle" },
        state.fader.current_alpha()
    );
    println!("script errors: {}", state.log.errors().len());
    for error in state.log.errors() {
        println!("      {error}");
    }
}
