//! Synchronized preview engine for a post: one visual track (a video, or a
//! photo held for a fixed duration) mixed with an optional, time-shifted music
//! track. Independent gains, seamless looping and scrubbing.

pub mod config;
pub mod core;
pub mod media;
pub mod playback;
pub mod shell;

pub use config::{load_config, PreviewConfig};
pub use playback::{PlaybackCommand, PlaybackError, PlaybackSession, SessionEvent, TickOutcome};
pub use shell::PreviewLauncher;
