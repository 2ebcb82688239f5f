//! Session source set, derived preview mode, and transport state machine.

use crate::config::PreviewConfig;
use crate::core::time::{self, Millis};

/// What the stage shows. Derived from which sources are present, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreviewMode {
    Video,
    VideoWithMusic,
    Photo,
    PhotoWithMusic,
}

impl PreviewMode {
    /// Pure function of source presence. Video takes precedence over photo.
    pub fn resolve(has_video: bool, _has_photo: bool, has_music: bool) -> Self {
        match (has_video, has_music) {
            (true, false) => PreviewMode::Video,
            (true, true) => PreviewMode::VideoWithMusic,
            (false, false) => PreviewMode::Photo,
            (false, true) => PreviewMode::PhotoWithMusic,
        }
    }
}

/// The visual track
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimarySource {
    Video { uri: String },
    /// A still has no timeline of its own; it is held for `duration_ms`
    Photo { uri: String, duration_ms: Millis },
}

impl PrimarySource {
    pub fn uri(&self) -> &str {
        match self {
            PrimarySource::Video { uri } | PrimarySource::Photo { uri, .. } => uri,
        }
    }
}

/// Resolved locators for one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sources {
    pub primary: PrimarySource,
    pub poster: Option<String>,
    pub music: Option<String>,
}

impl Sources {
    /// Resolve the configured locators. `None` when there is no visual at all.
    pub fn from_config(config: &PreviewConfig) -> Option<Self> {
        let config = config.normalized();
        let primary = match (config.video_uri, config.photo_uri) {
            (Some(uri), _) => PrimarySource::Video { uri },
            (None, Some(uri)) => PrimarySource::Photo {
                uri,
                duration_ms: time::from_seconds(config.photo_duration_sec),
            },
            (None, None) => return None,
        };

        Some(Self {
            primary,
            poster: config.poster_uri,
            music: config.music_uri,
        })
    }

    pub fn mode(&self) -> PreviewMode {
        PreviewMode::resolve(
            matches!(self.primary, PrimarySource::Video { .. }),
            matches!(self.primary, PrimarySource::Photo { .. }),
            self.music.is_some(),
        )
    }
}

/// Transport state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    /// Not playing; playheads parked
    Paused,
    /// Playing, including while a staggered start is still pending
    Playing,
    /// Reached the end with looping disabled; frozen at the duration
    Ended,
    /// The primary surface failed to load; poster-only stage
    Stopped,
    /// Torn down; no further work is performed
    Closed,
}

impl TransportState {
    pub fn is_playing(&self) -> bool {
        matches!(self, TransportState::Playing)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, TransportState::Closed)
    }

    /// States from which `play()` may start the transport
    pub fn can_start(&self) -> bool {
        matches!(self, TransportState::Paused | TransportState::Ended)
    }
}
