//! Preview construction parameters.
//!
//! Hosts usually build a `PreviewConfig` in code from already-resolved media
//! locators; the runner can also read one from YAML:
//!
//! ```yaml
//! video_uri: clips/beach.mp4
//! music_uri: sounds/waves.mp3
//! music_offset_ms: -1000
//! music_gain: 0.5
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::playback::position::PositionBinding;

pub const DEFAULT_MUSIC_GAIN: f32 = 0.8;
pub const DEFAULT_VIDEO_GAIN: f32 = 1.0;
pub const DEFAULT_PHOTO_DURATION_SEC: f64 = 8.0;

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Sources and initial settings of one preview session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Video locator; wins over `photo_uri` when both are set
    pub video_uri: Option<String>,
    pub photo_uri: Option<String>,
    /// Still shown before the video has frames, and as the launcher thumbnail
    pub poster_uri: Option<String>,
    /// Optional music track mixed against the visual
    pub music_uri: Option<String>,
    /// Positive: music starts later than the visual. Negative: earlier.
    pub music_offset_ms: i64,
    pub music_gain: f32,
    pub video_gain: f32,
    /// Nominal length of a photo preview (ignored when a video is present)
    pub photo_duration_sec: f64,
    pub is_looping: bool,
    /// Set when the caller owns the playhead; seeds the initial position
    pub position_sec: Option<f64>,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            video_uri: None,
            photo_uri: None,
            poster_uri: None,
            music_uri: None,
            music_offset_ms: 0,
            music_gain: DEFAULT_MUSIC_GAIN,
            video_gain: DEFAULT_VIDEO_GAIN,
            photo_duration_sec: DEFAULT_PHOTO_DURATION_SEC,
            is_looping: true,
            position_sec: None,
        }
    }
}

impl PreviewConfig {
    /// Copy with gains clamped to [0, 1], a usable photo duration and empty
    /// locators treated as absent
    pub fn normalized(&self) -> Self {
        fn locator(uri: &Option<String>) -> Option<String> {
            uri.as_ref().filter(|uri| !uri.trim().is_empty()).cloned()
        }

        let photo_duration_sec = if self.photo_duration_sec.is_finite() && self.photo_duration_sec > 0.0 {
            self.photo_duration_sec
        } else {
            DEFAULT_PHOTO_DURATION_SEC
        };

        Self {
            video_uri: locator(&self.video_uri),
            photo_uri: locator(&self.photo_uri),
            poster_uri: locator(&self.poster_uri),
            music_uri: locator(&self.music_uri),
            music_offset_ms: self.music_offset_ms,
            music_gain: clamp_gain(self.music_gain),
            video_gain: clamp_gain(self.video_gain),
            photo_duration_sec,
            is_looping: self.is_looping,
            position_sec: self.position_sec.filter(|sec| sec.is_finite()),
        }
    }

    /// Ownership of the playhead, fixed at construction
    pub fn position_binding(&self) -> PositionBinding {
        if self.position_sec.is_some() {
            PositionBinding::Controlled
        } else {
            PositionBinding::Owned
        }
    }

    /// Thumbnail shown by the launcher: poster, falling back to the photo
    pub fn thumbnail_uri(&self) -> Option<&str> {
        self.poster_uri
            .as_deref()
            .filter(|uri| !uri.is_empty())
            .or_else(|| self.photo_uri.as_deref().filter(|uri| !uri.is_empty()))
    }
}

/// Clamp a gain into [0, 1]; NaN becomes silence
pub fn clamp_gain(gain: f32) -> f32 {
    if gain.is_nan() {
        0.0
    } else {
        gain.clamp(0.0, 1.0)
    }
}

/// Load configuration from a YAML file
pub fn load_config(path: &Path) -> Result<PreviewConfig, ConfigError> {
    log::info!("load_config: Loading from {:?}", path);
    let contents = std::fs::read_to_string(path)?;
    let config = serde_yaml::from_str::<PreviewConfig>(&contents)?;
    Ok(config)
}
