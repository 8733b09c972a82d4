use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub scheduler: SchedulerConfig,
    pub tempo: TempoConfig,
    pub tuner: TunerConfig,
    pub assets: AssetConfig,
    /// Initial volume on the 0..=100 scale.
    pub volume: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            scheduler: SchedulerConfig::default(),
            tempo: TempoConfig::default(),
            tuner: TunerConfig::default(),
            assets: AssetConfig::default(),
            volume: 50,
        }
    }
}

impl AppConfig {
    /// Reads a JSON configuration file. Missing fields fall back to defaults.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Configuration specific to the audio subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample rate used when no device dictates one (offline rendering).
    pub sample_rate: u32,
    /// Frames per render block. Requested from the device for live output
    /// and used directly offline, capped at one scheduler tick.
    pub block_size: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            block_size: 512,
        }
    }
}

/// Timing of the look-ahead scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// How often the scheduler wakes up to refill the look-ahead window.
    pub tick_interval_ms: u64,
    /// How far ahead of the audio clock beats are committed.
    pub schedule_ahead_secs: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 25,
            schedule_ahead_secs: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TempoConfig {
    pub min_bpm: u32,
    pub max_bpm: u32,
    pub default_bpm: u32,
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            min_bpm: 40,
            max_bpm: 240,
            default_bpm: 120,
        }
    }
}

impl TempoConfig {
    pub fn contains(&self, bpm: u32) -> bool {
        (self.min_bpm..=self.max_bpm).contains(&bpm)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    /// Note the guitar sample was recorded at.
    pub reference_note: String,
    pub stop_after_secs: f64,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            reference_note: "C4".to_string(),
            stop_after_secs: 3.0,
        }
    }
}

/// Locations of the two fixed sample assets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub root: String,
    pub hi_hat: String,
    pub guitar: String,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            root: "assets".to_string(),
            hi_hat: "hihat.wav".to_string(),
            guitar: "guitar.wav".to_string(),
        }
    }
}
