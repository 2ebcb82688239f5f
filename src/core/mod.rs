//! Core types shared by the media surfaces and the playback engine.
//!
//! Time is carried as whole milliseconds (`Millis`); wall time comes from a
//! `Clock` so that hosts and tests can substitute a deterministic one.

pub mod clock;
pub mod time;

pub use clock::{Clock, ManualClock, SystemClock};
pub use time::{Millis, ZERO};
