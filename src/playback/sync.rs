//! Primary/secondary synchronization.
//!
//! Sync means one thing throughout: while both tracks run, the audio playhead
//! equals the primary playhead minus the music offset, floored at zero. This
//! module computes the starting playheads and the start stagger for a given
//! primary position, and owns the cancellable timers of staggered starts.

use crate::core::time::Millis;
use crate::media::surface::Track;
use crate::playback::timer::TimerQueue;

/// Audio playhead that aligns with primary position `primary_ms`
#[inline]
pub fn audio_position_for(primary_ms: Millis, offset_ms: Millis) -> Millis {
    primary_ms.saturating_sub(offset_ms).max(0)
}

/// Deviation of the audio playhead from its aligned position.
/// Positive when audio runs ahead.
#[inline]
pub fn drift_ms(primary_ms: Millis, audio_ms: Millis, offset_ms: Millis) -> Millis {
    audio_ms.saturating_sub(audio_position_for(primary_ms, offset_ms))
}

/// How the two `play` intents are spread in time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stagger {
    /// Both tracks (or the primary alone) start now
    Simultaneous,
    /// Primary starts now, audio after the delay
    SecondaryAfter(Millis),
    /// Audio starts now, primary after the delay (audio pre-roll)
    PrimaryAfter(Millis),
}

/// Where each surface is parked before starting, and the stagger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartPlan {
    pub primary_at: Millis,
    pub secondary_at: Option<Millis>,
    pub stagger: Stagger,
}

/// Plan a transport start at primary position `primary_ms`.
///
/// A positive offset delays the audio until the primary reaches the offset,
/// so starting past it needs no stagger. A negative offset is an audio
/// pre-roll: starting from the top, the audio runs alone for `|offset|`
/// before the primary enters; starting mid-track both start together.
pub fn plan_start(primary_ms: Millis, offset_ms: Millis, has_secondary: bool) -> StartPlan {
    if !has_secondary {
        return StartPlan {
            primary_at: primary_ms,
            secondary_at: None,
            stagger: Stagger::Simultaneous,
        };
    }

    let secondary_at = Some(audio_position_for(primary_ms, offset_ms));
    let stagger = if offset_ms > 0 && primary_ms < offset_ms {
        Stagger::SecondaryAfter(offset_ms.saturating_sub(primary_ms))
    } else if offset_ms < 0 && primary_ms == 0 {
        Stagger::PrimaryAfter(offset_ms.saturating_neg())
    } else {
        Stagger::Simultaneous
    };

    StartPlan {
        primary_at: primary_ms,
        secondary_at,
        stagger,
    }
}

/// Plan the restart at a loop wrap. Both tracks resume together from their
/// realigned playheads; a positive offset still holds the audio back until
/// the primary reaches it. A wrap never pre-rolls the audio.
pub fn plan_wrap(offset_ms: Millis, has_secondary: bool) -> StartPlan {
    let mut plan = plan_start(0, offset_ms, has_secondary);
    if let Stagger::PrimaryAfter(_) = plan.stagger {
        plan.stagger = Stagger::Simultaneous;
    }
    plan
}

/// Owner of the delayed-start timers of one session
#[derive(Debug, Default)]
pub struct SyncScheduler {
    timers: TimerQueue<Track>,
}

impl SyncScheduler {
    pub fn new() -> Self {
        Self {
            timers: TimerQueue::new(),
        }
    }

    /// Arm `plan` at wall time `now`. Returns the tracks to start immediately;
    /// the staggered one is queued. Any previously pending start is dropped.
    pub fn arm(&mut self, plan: &StartPlan, now: Millis) -> Vec<Track> {
        self.cancel_pending();
        match plan.stagger {
            Stagger::Simultaneous => {
                let mut tracks = vec![Track::Primary];
                if plan.secondary_at.is_some() {
                    tracks.push(Track::Secondary);
                }
                tracks
            }
            Stagger::SecondaryAfter(delay) => {
                log::debug!("sync: audio start delayed by {}ms", delay);
                self.timers.schedule(now.saturating_add(delay), Track::Secondary);
                vec![Track::Primary]
            }
            Stagger::PrimaryAfter(delay) => {
                log::debug!("sync: audio pre-roll of {}ms before primary", delay);
                self.timers.schedule(now.saturating_add(delay), Track::Primary);
                vec![Track::Secondary]
            }
        }
    }

    /// Drop every pending delayed start
    pub fn cancel_pending(&mut self) -> usize {
        let cancelled = self.timers.cancel_all();
        if cancelled > 0 {
            log::debug!("sync: cancelled {} pending start(s)", cancelled);
        }
        cancelled
    }

    /// Delayed starts that are due at `now`
    pub fn take_due(&mut self, now: Millis) -> Vec<Track> {
        self.timers.take_due(now)
    }

    pub fn has_pending(&self) -> bool {
        !self.timers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_position_floor() {
        assert_eq!(audio_position_for(0, 300), 0);
        assert_eq!(audio_position_for(1_000, 300), 700);
        assert_eq!(audio_position_for(0, -1_000), 1_000);
        assert_eq!(audio_position_for(2_000, -500), 2_500);
    }

    #[test]
    fn test_offset_invariant_grid() {
        for m in [0, 1, 250, 999, 4_000, 9_999] {
            for offset in [-2_000, -1, 0, 1, 300, 5_000] {
                let plan = plan_start(m, offset, true);
                assert_eq!(plan.primary_at, m);
                assert_eq!(plan.secondary_at, Some((m - offset).max(0)));
            }
        }
    }

    #[test]
    fn test_zero_offset_is_simultaneous() {
        let plan = plan_start(1_500, 0, true);
        assert_eq!(plan.stagger, Stagger::Simultaneous);
        assert_eq!(plan.secondary_at, Some(1_500));
    }

    #[test]
    fn test_positive_offset_delays_audio() {
        assert_eq!(plan_start(0, 500, true).stagger, Stagger::SecondaryAfter(500));
        assert_eq!(plan_start(200, 500, true).stagger, Stagger::SecondaryAfter(300));
        // Already past the audio entry point
        assert_eq!(plan_start(800, 500, true).stagger, Stagger::Simultaneous);
    }

    #[test]
    fn test_negative_offset_pre_roll() {
        let plan = plan_start(0, -1_000, true);
        assert_eq!(plan.stagger, Stagger::PrimaryAfter(1_000));
        assert_eq!(plan.secondary_at, Some(1_000));
        assert_eq!(plan_start(3_000, -1_000, true).stagger, Stagger::Simultaneous);
    }

    #[test]
    fn test_no_secondary() {
        let plan = plan_start(700, 500, false);
        assert_eq!(plan.stagger, Stagger::Simultaneous);
        assert_eq!(plan.secondary_at, None);
    }

    #[test]
    fn test_arm_and_fire() {
        let mut scheduler = SyncScheduler::new();
        let plan = plan_start(0, 500, true);
        assert_eq!(scheduler.arm(&plan, 1_000), vec![Track::Primary]);
        assert!(scheduler.take_due(1_499).is_empty());
        assert_eq!(scheduler.take_due(1_500), vec![Track::Secondary]);
        assert!(!scheduler.has_pending());
    }

    #[test]
    fn test_rearm_replaces_pending() {
        let mut scheduler = SyncScheduler::new();
        scheduler.arm(&plan_start(0, 500, true), 0);
        let immediate = scheduler.arm(&plan_start(0, 0, true), 100);
        assert_eq!(immediate, vec![Track::Primary, Track::Secondary]);
        assert!(!scheduler.has_pending());
    }

    #[test]
    fn test_cancel_pending() {
        let mut scheduler = SyncScheduler::new();
        scheduler.arm(&plan_start(0, -800, true), 0);
        assert!(scheduler.has_pending());
        assert_eq!(scheduler.cancel_pending(), 1);
        assert!(scheduler.take_due(10_000).is_empty());
    }

    #[test]
    fn test_wrap_never_pre_rolls() {
        let plan = plan_wrap(-400, true);
        assert_eq!(plan.stagger, Stagger::Simultaneous);
        assert_eq!(plan.primary_at, 0);
        assert_eq!(plan.secondary_at, Some(400));

        // A positive offset still waits for its entry point
        assert_eq!(plan_wrap(300, true).stagger, Stagger::SecondaryAfter(300));
        assert_eq!(plan_wrap(300, true).secondary_at, Some(0));
        assert_eq!(plan_wrap(-400, false).secondary_at, None);
    }

    #[test]
    fn test_extreme_offsets_saturate() {
        assert_eq!(audio_position_for(5_000, i64::MIN), i64::MAX);
        assert_eq!(audio_position_for(5_000, i64::MAX), 0);
        assert_eq!(plan_start(0, i64::MIN, true).stagger, Stagger::PrimaryAfter(i64::MAX));
        assert_eq!(drift_ms(0, i64::MIN, 0), i64::MIN);

        let mut scheduler = SyncScheduler::new();
        let plan = plan_start(0, i64::MAX, true);
        assert_eq!(scheduler.arm(&plan, 16), vec![Track::Primary]);
        assert!(scheduler.take_due(i64::MAX - 1).is_empty());
        assert!(scheduler.has_pending());
    }

    #[test]
    fn test_drift() {
        assert_eq!(drift_ms(1_000, 700, 300), 0);
        assert_eq!(drift_ms(1_000, 716, 300), 16);
        assert_eq!(drift_ms(100, 0, 300), 0);
    }
}
