//! Position model for the primary track.
//!
//! Sampled once per frame from the primary surface and clamped into
//! `[0, duration]`. Who owns the value is decided once, at session creation:
//! either the session holds it (`Owned`) or it is mirrored out to a caller
//! that owns it (`Controlled`).

use crate::core::time::{clamp_position, Millis};

/// A caller-pushed position further than this from the last reported value is
/// treated as a scrub and applied as a seek
pub const EXTERNAL_SEEK_TOLERANCE_MS: Millis = 250;

/// Ownership of the playhead value, fixed for the session's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionBinding {
    /// The session holds the position; nothing is reported outward
    Owned,
    /// The caller holds the position; every change is reported outward and
    /// values pushed back by the caller may move the playhead
    Controlled,
}

#[derive(Debug, Clone)]
pub struct PositionModel {
    binding: PositionBinding,
    position_ms: Millis,
    last_reported_ms: Option<Millis>,
}

impl PositionModel {
    pub fn new(binding: PositionBinding, initial_ms: Millis) -> Self {
        Self {
            binding,
            position_ms: initial_ms.max(0),
            last_reported_ms: None,
        }
    }

    pub fn binding(&self) -> PositionBinding {
        self.binding
    }

    pub fn position_ms(&self) -> Millis {
        self.position_ms
    }

    /// Store a fresh sample. In controlled mode returns the value to report
    /// outward when it differs from the last report.
    pub fn update(&mut self, raw_ms: Millis, duration_ms: Millis) -> Option<Millis> {
        self.position_ms = clamp_position(raw_ms, duration_ms);
        match self.binding {
            PositionBinding::Owned => None,
            PositionBinding::Controlled => {
                if self.last_reported_ms == Some(self.position_ms) {
                    None
                } else {
                    self.last_reported_ms = Some(self.position_ms);
                    Some(self.position_ms)
                }
            }
        }
    }

    /// Decide whether a caller-pushed value should move the playhead.
    /// Always `None` for an owned position.
    pub fn external_target(&self, external_ms: Millis) -> Option<Millis> {
        match self.binding {
            PositionBinding::Owned => None,
            PositionBinding::Controlled => {
                let reference = self.last_reported_ms.unwrap_or(self.position_ms);
                if (external_ms - reference).abs() > EXTERNAL_SEEK_TOLERANCE_MS {
                    Some(external_ms)
                } else {
                    None
                }
            }
        }
    }
}
