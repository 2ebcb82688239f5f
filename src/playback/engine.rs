//! Playback session coordinating the primary and secondary surfaces.
//! Events go out over crossbeam channels; all mutation happens on the caller's
//! thread from transport calls and the per-frame `tick`.

use crossbeam::channel;
use std::rc::Rc;

use crate::config::{clamp_gain, PreviewConfig};
use crate::core::clock::Clock;
use crate::core::time::{self, clamp_position, Millis};
use crate::media::element::{MediaBackend, MediaLoadError};
use crate::media::surface::{MediaHandles, SurfaceSignal, Track};
use crate::playback::position::{PositionBinding, PositionModel};
use crate::playback::state::{PreviewMode, Sources, TransportState};
use crate::playback::sync::{self, StartPlan, SyncScheduler};
use crate::playback::timer::FrameTask;

/// Events kept for the first subscriber when nobody is listening yet
const EVENT_BACKLOG_LIMIT: usize = 64;

/// Command sent to a playback session
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackCommand {
    Play,
    Pause,
    Toggle,
    Seek(Millis),
    SetVideoGain(f32),
    SetMusicGain(f32),
    SetMusicOffset(Millis),
    SetLooping(bool),
}

/// Outward notification from a session. The session never reads anything
/// back through these.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    PlayState(bool),
    /// Controlled position mode only
    PositionSec(f64),
    OffsetChanged(Millis),
    MusicGainChanged(f32),
    VideoGainChanged(f32),
    DurationKnown(Millis),
    Looped,
    Ended,
    MediaFailed { track: Track, error: MediaLoadError },
}

/// Error type for playback sessions
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("no video or photo source to preview")]
    NoPrimarySource,
    #[error("delayed {track:?} start came due while transport is {state:?}")]
    SchedulerRace { track: Track, state: TransportState },
}

/// Result of one frame tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Running,
    Looped,
    Ended,
    /// The session was torn down; the host should stop ticking
    Closed,
}

/// One open preview: a visual track, an optional music track, and the
/// transport that keeps them aligned
pub struct PlaybackSession {
    sources: Sources,
    mode: PreviewMode,
    clock: Rc<dyn Clock>,
    handles: MediaHandles,
    position: PositionModel,
    scheduler: SyncScheduler,
    frame_task: FrameTask,
    state: TransportState,
    music_offset_ms: Millis,
    music_gain: f32,
    video_gain: f32,
    looping: bool,
    pending_seek: Option<Millis>,
    subscribers: Vec<channel::Sender<SessionEvent>>,
    backlog: Vec<SessionEvent>,
}

impl PlaybackSession {
    /// Open a session over the sources in `config`.
    ///
    /// Load failures do not fail the open: a broken visual leaves a
    /// poster-only stage, a broken music track is ignored for the session.
    pub fn open(
        config: &PreviewConfig,
        backend: &dyn MediaBackend,
        clock: Rc<dyn Clock>,
    ) -> Result<Self, PlaybackError> {
        let config = config.normalized();
        let sources = Sources::from_config(&config).ok_or(PlaybackError::NoPrimarySource)?;
        let mode = sources.mode();

        let (mut handles, failures) = MediaHandles::open(&sources, backend, Rc::clone(&clock));
        handles.primary.set_volume(config.video_gain);
        if let Some(audio) = handles.secondary.as_mut() {
            audio.set_volume(config.music_gain);
        }

        let initial_ms = config.position_sec.map(time::from_seconds).unwrap_or(0).max(0);
        log::info!(
            "session: opened {:?} primary={} music={:?}",
            mode,
            sources.primary.uri(),
            sources.music
        );

        let mut session = Self {
            sources,
            mode,
            clock,
            handles,
            position: PositionModel::new(config.position_binding(), 0),
            scheduler: SyncScheduler::new(),
            frame_task: FrameTask::start(),
            state: TransportState::Paused,
            music_offset_ms: config.music_offset_ms,
            music_gain: config.music_gain,
            video_gain: config.video_gain,
            looping: config.is_looping,
            pending_seek: None,
            subscribers: Vec::new(),
            backlog: Vec::new(),
        };

        for (track, error) in failures {
            session.handle_media_failure(track, error);
        }
        if initial_ms > 0 {
            if session.handles.primary.duration_ms() > 0 {
                session.seek(initial_ms);
            } else {
                session.pending_seek = Some(initial_ms);
            }
        }
        Ok(session)
    }

    /// Replace the source set. The current surfaces are torn down before the
    /// new ones are created; subscribers carry over. A config without a visual
    /// is rejected up front and leaves the current session untouched.
    pub fn reload(
        &mut self,
        config: &PreviewConfig,
        backend: &dyn MediaBackend,
    ) -> Result<(), PlaybackError> {
        if Sources::from_config(&config.normalized()).is_none() {
            return Err(PlaybackError::NoPrimarySource);
        }
        self.close();
        let next = Self::open(config, backend, Rc::clone(&self.clock))?;
        let subscribers = std::mem::take(&mut self.subscribers);
        *self = next;
        self.subscribers = subscribers;
        self.flush_backlog();
        Ok(())
    }

    /// Receive this session's events. The first subscriber also gets events
    /// raised before anyone subscribed (e.g. load failures during `open`).
    pub fn subscribe(&mut self) -> channel::Receiver<SessionEvent> {
        let (tx, rx) = channel::unbounded();
        self.subscribers.push(tx);
        self.flush_backlog();
        rx
    }

    /// Process a transport or mixer command
    pub fn process_command(&mut self, command: PlaybackCommand) {
        match command {
            PlaybackCommand::Play => self.play(),
            PlaybackCommand::Pause => self.pause(),
            PlaybackCommand::Toggle => self.toggle(),
            PlaybackCommand::Seek(position) => self.seek(position),
            PlaybackCommand::SetVideoGain(gain) => self.set_video_gain(gain),
            PlaybackCommand::SetMusicGain(gain) => self.set_music_gain(gain),
            PlaybackCommand::SetMusicOffset(offset) => self.set_music_offset_ms(offset),
            PlaybackCommand::SetLooping(looping) => self.set_looping(looping),
        }
    }

    /// Start the transport from the current position.
    /// No-op while playing; restarts from zero when parked at the end.
    pub fn play(&mut self) {
        if !self.state.can_start() {
            if self.state == TransportState::Stopped {
                log::warn!("session: play ignored, primary media failed to load");
            }
            return;
        }

        let position = self.position.position_ms();
        let from = if self.state == TransportState::Ended || self.is_at_end(position) {
            0
        } else {
            position
        };
        self.set_state(TransportState::Playing);
        self.start_from(from);
    }

    /// Pause both surfaces and drop any pending staggered start
    pub fn pause(&mut self) {
        if self.state.is_closed() {
            return;
        }
        self.scheduler.cancel_pending();
        self.handles.pause_all();
        self.sample_position();
        if self.state.is_playing() {
            self.set_state(TransportState::Paused);
        }
    }

    pub fn toggle(&mut self) {
        if self.state.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Move the playhead, clamped to `[0, duration]`. Transport state is kept:
    /// a playing session is realigned from the new position.
    pub fn seek(&mut self, position_ms: Millis) {
        if matches!(self.state, TransportState::Closed | TransportState::Stopped) {
            return;
        }
        let target = clamp_position(position_ms, self.handles.primary.duration_ms());
        self.scheduler.cancel_pending();

        if self.state.is_playing() {
            if self.is_at_end(target) {
                self.handle_end_of_track();
            } else {
                self.start_from(target);
            }
            return;
        }

        self.handles.primary.seek(target);
        let audio_at = sync::audio_position_for(target, self.music_offset_ms);
        if let Some(audio) = self.handles.active_secondary() {
            audio.seek(audio_at);
        }
        if self.state == TransportState::Ended {
            self.set_state(TransportState::Paused);
        }
        self.sample_position();
    }

    /// Controlled position mode: apply a position the caller pushed back.
    /// Values close to what was last reported are echoes and are ignored.
    pub fn sync_external_position_sec(&mut self, position_sec: f64) {
        if !position_sec.is_finite() {
            return;
        }
        if let Some(target) = self.position.external_target(time::from_seconds(position_sec)) {
            log::debug!("session: external scrub to {}ms", target);
            self.seek(target);
        }
    }

    pub fn set_video_gain(&mut self, gain: f32) {
        if self.state.is_closed() {
            return;
        }
        self.video_gain = clamp_gain(gain);
        self.handles.primary.set_volume(self.video_gain);
        self.emit(SessionEvent::VideoGainChanged(self.video_gain));
    }

    pub fn set_music_gain(&mut self, gain: f32) {
        if self.state.is_closed() {
            return;
        }
        self.music_gain = clamp_gain(gain);
        if let Some(audio) = self.handles.secondary.as_mut() {
            audio.set_volume(self.music_gain);
        }
        self.emit(SessionEvent::MusicGainChanged(self.music_gain));
    }

    /// Change the music offset live. A playing session is realigned from its
    /// current position; a paused one only moves the audio playhead.
    pub fn set_music_offset_ms(&mut self, offset_ms: Millis) {
        if self.state.is_closed() || offset_ms == self.music_offset_ms {
            return;
        }
        self.music_offset_ms = offset_ms;
        self.emit(SessionEvent::OffsetChanged(offset_ms));

        if self.state.is_playing() {
            self.scheduler.cancel_pending();
            self.start_from(self.position.position_ms());
        } else {
            let audio_at = sync::audio_position_for(self.position.position_ms(), offset_ms);
            if let Some(audio) = self.handles.active_secondary() {
                audio.seek(audio_at);
            }
        }
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    /// Advance one frame: fire due staggered starts, drain surface signals,
    /// refresh the position and handle end of track.
    pub fn tick(&mut self) -> Result<TickOutcome, PlaybackError> {
        if !self.frame_task.begin_frame() {
            return Ok(TickOutcome::Closed);
        }

        let now = self.clock.now_ms();
        for track in self.scheduler.take_due(now) {
            if !self.state.is_playing() {
                return Err(PlaybackError::SchedulerRace {
                    track,
                    state: self.state,
                });
            }
            self.fire_delayed_start(track);
        }

        let mut primary_ended = false;
        for (track, signal) in self.handles.poll_all() {
            match (track, signal) {
                (Track::Primary, SurfaceSignal::DurationKnown(duration_ms)) => {
                    log::debug!("session: primary duration {}ms", duration_ms);
                    self.emit(SessionEvent::DurationKnown(duration_ms));
                    if let Some(target) = self.pending_seek.take() {
                        self.seek(target);
                    }
                }
                (Track::Primary, SurfaceSignal::Ended) => primary_ended = true,
                (Track::Secondary, SurfaceSignal::DurationKnown(_)) => {}
                (Track::Secondary, SurfaceSignal::Ended) => {
                    log::debug!("session: music ended before the visual");
                }
                (track, SurfaceSignal::Failed(error)) => self.handle_media_failure(track, error),
            }
        }

        self.sample_position();

        let duration = self.handles.primary.duration_ms();
        let at_end = duration > 0
            && self.handles.primary.is_playing()
            && self.position.position_ms() >= duration;
        if self.state.is_playing() && (primary_ended || at_end) {
            return Ok(self.handle_end_of_track());
        }

        if log::log_enabled!(log::Level::Trace) {
            if let Some(drift) = self.drift_ms() {
                log::trace!("sync: drift {}ms at {}ms", drift, self.position.position_ms());
            }
        }
        Ok(TickOutcome::Running)
    }

    /// Tear down: stop the frame task, cancel pending starts, pause and detach
    /// both surfaces. Idempotent.
    pub fn close(&mut self) {
        if self.state.is_closed() {
            return;
        }
        self.frame_task.cancel();
        self.scheduler.cancel_pending();
        self.handles.release_all();
        self.set_state(TransportState::Closed);
        log::info!(
            "session: closed {} after {} frames",
            self.sources.primary.uri(),
            self.frame_task.frames()
        );
    }

    pub fn mode(&self) -> PreviewMode {
        self.mode
    }

    pub fn sources(&self) -> &Sources {
        &self.sources
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    pub fn is_open(&self) -> bool {
        !self.state.is_closed()
    }

    /// Authoritative playhead of the primary track
    pub fn position_ms(&self) -> Millis {
        self.position.position_ms()
    }

    pub fn position_sec(&self) -> f64 {
        time::to_seconds(self.position.position_ms())
    }

    /// Primary duration; 0 until a video's metadata has loaded
    pub fn duration_ms(&self) -> Millis {
        self.handles.primary.duration_ms()
    }

    pub fn position_binding(&self) -> PositionBinding {
        self.position.binding()
    }

    pub fn music_offset_ms(&self) -> Millis {
        self.music_offset_ms
    }

    pub fn music_gain(&self) -> f32 {
        self.music_gain
    }

    pub fn video_gain(&self) -> f32 {
        self.video_gain
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Poster to show in place of the stage, if any
    pub fn poster_uri(&self) -> Option<&str> {
        self.handles.primary.poster()
    }

    /// True when the visual failed and only the poster can be shown
    pub fn is_stage_empty(&self) -> bool {
        self.handles.primary.is_failed()
    }

    /// True when a music track was given but could not be loaded
    pub fn is_music_ignored(&self) -> bool {
        self.handles
            .secondary
            .as_ref()
            .map_or(false, |audio| audio.is_failed())
    }

    /// A staggered start is armed and has not fired yet
    pub fn has_pending_start(&self) -> bool {
        self.scheduler.has_pending()
    }

    /// Audio deviation from its aligned position while both surfaces run
    pub fn drift_ms(&self) -> Option<Millis> {
        let audio = self.handles.secondary.as_ref()?;
        if !self.handles.primary.is_playing() || !audio.is_playing() {
            return None;
        }
        Some(sync::drift_ms(
            self.handles.primary.position_ms(),
            audio.position_ms(),
            self.music_offset_ms,
        ))
    }

    /// A known duration with the playhead on or past it
    fn is_at_end(&self, position_ms: Millis) -> bool {
        let duration = self.handles.primary.duration_ms();
        duration > 0 && position_ms >= duration
    }

    /// Park both surfaces at their aligned positions for primary position
    /// `primary_ms`, then start them according to the offset stagger
    fn start_from(&mut self, primary_ms: Millis) {
        let plan = sync::plan_start(
            primary_ms,
            self.music_offset_ms,
            self.handles.has_active_secondary(),
        );
        self.start_with(&plan);
    }

    fn start_with(&mut self, plan: &StartPlan) {
        let now = self.clock.now_ms();
        self.handles.pause_all();
        self.handles.primary.seek(plan.primary_at);
        if let (Some(audio_at), Some(audio)) = (plan.secondary_at, self.handles.active_secondary()) {
            audio.seek(audio_at);
        }
        for track in self.scheduler.arm(plan, now) {
            self.handles.resume(track);
        }
        self.sample_position();
    }

    fn fire_delayed_start(&mut self, track: Track) {
        match track {
            Track::Primary => self.handles.resume(Track::Primary),
            Track::Secondary => {
                // Realign against where the primary actually is, the frame
                // tick may have run late
                let audio_at = sync::audio_position_for(
                    self.handles.primary.position_ms(),
                    self.music_offset_ms,
                );
                if let Some(audio) = self.handles.active_secondary() {
                    audio.play(audio_at);
                }
            }
        }
    }

    fn handle_end_of_track(&mut self) -> TickOutcome {
        let duration = self.handles.primary.duration_ms();
        self.scheduler.cancel_pending();

        if self.looping {
            log::debug!("loop: wrapping at {}ms", duration);
            let plan = sync::plan_wrap(self.music_offset_ms, self.handles.has_active_secondary());
            self.start_with(&plan);
            self.emit(SessionEvent::Looped);
            TickOutcome::Looped
        } else {
            log::debug!("loop: reached end at {}ms", duration);
            self.handles.pause_all();
            self.handles.primary.seek(duration);
            let report = self.position.update(duration, duration);
            self.report_position(report);
            self.set_state(TransportState::Ended);
            self.emit(SessionEvent::Ended);
            TickOutcome::Ended
        }
    }

    fn handle_media_failure(&mut self, track: Track, error: MediaLoadError) {
        log::warn!("session: {:?} media failed: {}", track, error);
        match track {
            Track::Primary => {
                self.scheduler.cancel_pending();
                self.pending_seek = None;
                self.handles.pause_all();
                self.set_state(TransportState::Stopped);
            }
            Track::Secondary => {
                if let Some(audio) = self.handles.secondary.as_mut() {
                    audio.pause();
                }
            }
        }
        self.emit(SessionEvent::MediaFailed { track, error });
    }

    fn sample_position(&mut self) {
        let raw = self.handles.primary.position_ms();
        let report = self.position.update(raw, self.handles.primary.duration_ms());
        self.report_position(report);
    }

    fn report_position(&mut self, report: Option<Millis>) {
        if let Some(position_ms) = report {
            self.emit(SessionEvent::PositionSec(time::to_seconds(position_ms)));
        }
    }

    fn set_state(&mut self, state: TransportState) {
        let was_playing = self.state.is_playing();
        self.state = state;
        if was_playing != state.is_playing() {
            self.emit(SessionEvent::PlayState(state.is_playing()));
        }
    }

    fn emit(&mut self, event: SessionEvent) {
        if self.subscribers.is_empty() {
            if self.backlog.len() >= EVENT_BACKLOG_LIMIT {
                self.backlog.remove(0);
            }
            self.backlog.push(event);
            return;
        }
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn flush_backlog(&mut self) {
        for event in std::mem::take(&mut self.backlog) {
            self.emit(event);
        }
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.close();
    }
}
