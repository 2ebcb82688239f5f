//! Platform media element seam.
//!
//! A `MediaElement` is whatever actually decodes and renders a locator on the
//! host platform (an HTML media element, a GStreamer pipeline, ...). The
//! engine only issues synchronous intents and drains events once per frame.

use crate::core::time::Millis;

/// Error raised when a source cannot be fetched or decoded.
/// Reported once per load; never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaLoadError {
    #[error("failed to fetch {uri}: {reason}")]
    Fetch { uri: String, reason: String },
    #[error("failed to decode {uri}: {reason}")]
    Decode { uri: String, reason: String },
    #[error("empty media locator")]
    EmptyLocator,
    #[error("media element is detached")]
    Detached,
}

/// Asynchronous notifications produced by an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    /// One-shot signal carrying the decoded duration
    MetadataLoaded { duration_ms: Millis },
    /// Playback reached the end of the media; the element has paused itself
    Ended,
    /// Load failed after `load` returned
    Error(MediaLoadError),
}

/// A single timed media element owned by a session
pub trait MediaElement {
    /// Bind a new source. Immediate failures return `Err`; late failures arrive
    /// as `MediaEvent::Error`.
    fn load(&mut self, uri: &str) -> Result<(), MediaLoadError>;
    fn play(&mut self);
    fn pause(&mut self);
    fn set_current_time_ms(&mut self, position: Millis);
    fn current_time_ms(&self) -> Millis;
    fn set_volume(&mut self, gain: f32);
    fn volume(&self) -> f32;
    fn is_paused(&self) -> bool;
    /// Next pending event, if any
    fn poll_event(&mut self) -> Option<MediaEvent>;
    /// Release the bound source; the element is unusable afterwards
    fn detach(&mut self);
}

/// Factory for the platform elements of one session
pub trait MediaBackend {
    fn create_video(&self) -> Box<dyn MediaElement>;
    fn create_audio(&self) -> Box<dyn MediaElement>;
}
