//! Launcher front end: command-line flags and game identification by the
//! name of the game's executable.

mod detector;
mod games;

pub use detector::{midi, CliError, DetectError, GameDetector, USAGE};
pub use games::{find_game, GameFeatures, GameRecord, GAMES};

/// Banner printed for `-v`.
pub fn version_banner() -> String {
    format!("ScummVM {}", env!("CARGO_PKG_VERSION"))
}
