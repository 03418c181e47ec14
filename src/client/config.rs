use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::bot::direction::{default_note_directions, NoteDirection};
use crate::error::{Error, Result};

pub const DEFAULT_PORT: u16 = 5054;

/// Default config location: `~/.midi-locomotion/config.json`
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".midi-locomotion")
        .join("config.json")
}

/// UDP listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    /// IPv4 literal, or `"any"` / `"0.0.0.0"` for every interface
    pub bind_address: String,
    pub port: u16,
    /// Idle heartbeat interval; also bounds how long `stop` can take
    pub receive_timeout_ms: u64,
    pub debug: bool,
}

impl ReceiverConfig {
    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms.max(1))
    }
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            receive_timeout_ms: 3000,
            debug: true,
        }
    }
}

/// Step and travel settings for the motion controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Distance (m) every message commits before bonuses
    pub base_step: f32,
    /// Bonus weight for `vel / 127`
    pub vel_weight: f32,
    /// Bonus weight for payload `speed`
    pub speed_weight: f32,
    /// Travel speed while a step is in progress (m/s)
    pub move_speed: f32,
    /// Ordered note prefix table; first match wins
    pub note_directions: Vec<NoteDirection>,
    pub debug: bool,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            base_step: 0.5,
            vel_weight: 0.5,
            speed_weight: 0.5,
            move_speed: 2.0,
            note_directions: default_note_directions(),
            debug: true,
        }
    }
}

/// Full configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocomotionConfig {
    pub receiver: ReceiverConfig,
    pub motion: MotionConfig,
}

impl LocomotionConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}
