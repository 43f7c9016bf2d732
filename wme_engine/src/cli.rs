use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    about = "Host that builds a live WME frame, runs a script against it and simulates display ticks",
    version
)]
pub struct Args {
    /// Path to the FRAME definition to load
    #[arg(long)]
    pub frame: PathBuf,

    /// Lua script to run against the loaded frame
    #[arg(long)]
    pub script: Option<PathBuf>,

    /// Optional JSON host settings file
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Write the save-state stream here and reload it to verify
    #[arg(long)]
    pub save: Option<PathBuf>,

    /// Print the frame in its resource text form instead of a summary
    #[arg(long)]
    pub text: bool,
}
