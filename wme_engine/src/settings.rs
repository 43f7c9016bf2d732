use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Host configuration read from an optional JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSettings {
    /// Images and sounds are looked up relative to this directory. When
    /// unset, the directory holding the frame definition is used.
    pub data_root: Option<PathBuf>,
    pub sound_available: bool,
    /// Game clock advance per simulated tick, in milliseconds.
    pub tick_ms: u32,
    pub ticks: u32,
    pub muted: bool,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            data_root: None,
            sound_available: true,
            tick_ms: 20,
            ticks: 0,
            muted: false,
        }
    }
}

impl HostSettings {
    /// Defaults when `path` is `None`; a named file must exist and parse.
    pub fn from_json_file(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse settings json: {}", path.display()))
    }
}
