//! Media handle abstraction.
//!
//! One interchangeable surface per track. The primary track is either a real
//! timed medium (`VideoSurface`) or a still image held for a nominal duration
//! (`PhotoSurface`); both expose the same seek/resume/pause/volume intents so
//! that the scheduler and transport never branch on the kind of visual.

use std::rc::Rc;

use crate::core::clock::Clock;
use crate::core::time::{clamp_position, Millis};
use crate::media::element::{MediaBackend, MediaElement, MediaEvent, MediaLoadError};
use crate::playback::state::{PrimarySource, Sources};

/// Which of the two session tracks an action or signal refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Track {
    Primary,
    Secondary,
}

/// Signals drained from a surface once per frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceSignal {
    DurationKnown(Millis),
    Ended,
    Failed(MediaLoadError),
}

/// Primary surface backed by a platform video element
pub struct VideoSurface {
    element: Box<dyn MediaElement>,
    uri: Option<String>,
    poster: Option<String>,
    duration_ms: Millis,
    failed: bool,
}

impl VideoSurface {
    pub fn new(element: Box<dyn MediaElement>) -> Self {
        Self {
            element,
            uri: None,
            poster: None,
            duration_ms: 0,
            failed: false,
        }
    }

    /// Bind a source. Duration stays 0 until the metadata signal arrives.
    pub fn load(&mut self, uri: &str, poster: Option<&str>) -> Result<(), MediaLoadError> {
        self.uri = Some(uri.to_string());
        self.poster = poster.map(str::to_string);
        self.duration_ms = 0;
        self.failed = false;
        if let Err(err) = self.element.load(uri) {
            self.failed = true;
            return Err(err);
        }
        Ok(())
    }

    fn poll(&mut self) -> Option<SurfaceSignal> {
        match self.element.poll_event()? {
            MediaEvent::MetadataLoaded { duration_ms } => {
                self.duration_ms = duration_ms.max(0);
                Some(SurfaceSignal::DurationKnown(self.duration_ms))
            }
            MediaEvent::Ended => Some(SurfaceSignal::Ended),
            MediaEvent::Error(err) => {
                self.failed = true;
                self.element.pause();
                Some(SurfaceSignal::Failed(err))
            }
        }
    }
}

/// Synthetic primary surface for a still image.
///
/// The timeline is emulated from wall-clock deltas:
/// `position = min(duration, now - started_at + accumulated)` while playing,
/// `accumulated` while paused.
pub struct PhotoSurface {
    clock: Rc<dyn Clock>,
    uri: Option<String>,
    poster: Option<String>,
    duration_ms: Millis,
    started_at: Option<Millis>,
    accumulated_ms: Millis,
    volume: f32,
    duration_pending: bool,
    released: bool,
}

impl PhotoSurface {
    pub fn new(clock: Rc<dyn Clock>, duration_ms: Millis) -> Self {
        Self {
            clock,
            uri: None,
            poster: None,
            duration_ms: duration_ms.max(0),
            started_at: None,
            accumulated_ms: 0,
            volume: 1.0,
            duration_pending: false,
            released: false,
        }
    }

    pub fn load(&mut self, uri: &str, poster: Option<&str>) -> Result<(), MediaLoadError> {
        if uri.is_empty() {
            return Err(MediaLoadError::EmptyLocator);
        }
        self.uri = Some(uri.to_string());
        self.poster = poster.map(str::to_string);
        self.started_at = None;
        self.accumulated_ms = 0;
        self.duration_pending = true;
        Ok(())
    }

    fn position_ms(&self) -> Millis {
        match self.started_at {
            Some(started_at) => {
                let elapsed = self.clock.now_ms() - started_at;
                (elapsed + self.accumulated_ms).min(self.duration_ms)
            }
            None => self.accumulated_ms,
        }
    }

    fn resume(&mut self) {
        if self.started_at.is_none() && !self.released {
            self.started_at = Some(self.clock.now_ms());
        }
    }

    fn pause(&mut self) {
        self.accumulated_ms = self.position_ms();
        self.started_at = None;
    }

    /// Rewrites the reference point only; a running timer keeps running
    fn seek(&mut self, position: Millis) {
        self.accumulated_ms = clamp_position(position, self.duration_ms);
        if self.started_at.is_some() {
            self.started_at = Some(self.clock.now_ms());
        }
    }

    fn poll(&mut self) -> Option<SurfaceSignal> {
        if self.duration_pending {
            self.duration_pending = false;
            return Some(SurfaceSignal::DurationKnown(self.duration_ms));
        }
        if self.started_at.is_some() && self.position_ms() >= self.duration_ms {
            self.accumulated_ms = self.duration_ms;
            self.started_at = None;
            return Some(SurfaceSignal::Ended);
        }
        None
    }
}

/// Primary (visual) surface
pub enum PrimarySurface {
    Video(VideoSurface),
    Photo(PhotoSurface),
}

impl PrimarySurface {
    pub fn load(&mut self, uri: &str, poster: Option<&str>) -> Result<(), MediaLoadError> {
        match self {
            PrimarySurface::Video(video) => video.load(uri, poster),
            PrimarySurface::Photo(photo) => photo.load(uri, poster),
        }
    }

    /// Seek to `position` and start
    pub fn play(&mut self, position: Millis) {
        self.seek(position);
        self.resume();
    }

    /// Start from wherever the playhead currently is
    pub fn resume(&mut self) {
        match self {
            PrimarySurface::Video(video) => {
                if !video.failed {
                    video.element.play();
                }
            }
            PrimarySurface::Photo(photo) => photo.resume(),
        }
    }

    pub fn pause(&mut self) {
        match self {
            PrimarySurface::Video(video) => video.element.pause(),
            PrimarySurface::Photo(photo) => photo.pause(),
        }
    }

    pub fn seek(&mut self, position: Millis) {
        match self {
            PrimarySurface::Video(video) => {
                let target = clamp_position(position, video.duration_ms);
                video.element.set_current_time_ms(target);
            }
            PrimarySurface::Photo(photo) => photo.seek(position),
        }
    }

    pub fn set_volume(&mut self, gain: f32) {
        match self {
            PrimarySurface::Video(video) => video.element.set_volume(gain),
            PrimarySurface::Photo(photo) => photo.volume = gain,
        }
    }

    pub fn volume(&self) -> f32 {
        match self {
            PrimarySurface::Video(video) => video.element.volume(),
            PrimarySurface::Photo(photo) => photo.volume,
        }
    }

    /// Raw playhead of the surface (not yet clamped to the session duration)
    pub fn position_ms(&self) -> Millis {
        match self {
            PrimarySurface::Video(video) => video.element.current_time_ms(),
            PrimarySurface::Photo(photo) => photo.position_ms(),
        }
    }

    /// Known duration; 0 for a video whose metadata has not arrived
    pub fn duration_ms(&self) -> Millis {
        match self {
            PrimarySurface::Video(video) => video.duration_ms,
            PrimarySurface::Photo(photo) => photo.duration_ms,
        }
    }

    pub fn is_playing(&self) -> bool {
        match self {
            PrimarySurface::Video(video) => !video.failed && !video.element.is_paused(),
            PrimarySurface::Photo(photo) => photo.started_at.is_some(),
        }
    }

    pub fn is_failed(&self) -> bool {
        match self {
            PrimarySurface::Video(video) => video.failed,
            PrimarySurface::Photo(_) => false,
        }
    }

    pub fn poster(&self) -> Option<&str> {
        match self {
            PrimarySurface::Video(video) => video.poster.as_deref(),
            PrimarySurface::Photo(photo) => photo.poster.as_deref(),
        }
    }

    pub fn uri(&self) -> Option<&str> {
        match self {
            PrimarySurface::Video(video) => video.uri.as_deref(),
            PrimarySurface::Photo(photo) => photo.uri.as_deref(),
        }
    }

    fn poll(&mut self) -> Option<SurfaceSignal> {
        match self {
            PrimarySurface::Video(video) => video.poll(),
            PrimarySurface::Photo(photo) => photo.poll(),
        }
    }

    fn release(&mut self) {
        match self {
            PrimarySurface::Video(video) => {
                video.element.pause();
                video.element.detach();
            }
            PrimarySurface::Photo(photo) => {
                photo.pause();
                photo.released = true;
            }
        }
    }
}

/// Secondary (music) surface
pub struct AudioSurface {
    element: Box<dyn MediaElement>,
    uri: String,
    failed: bool,
}

impl AudioSurface {
    pub fn new(element: Box<dyn MediaElement>, uri: &str) -> Self {
        Self {
            element,
            uri: uri.to_string(),
            failed: false,
        }
    }

    pub fn load(&mut self) -> Result<(), MediaLoadError> {
        if let Err(err) = self.element.load(&self.uri) {
            self.failed = true;
            return Err(err);
        }
        Ok(())
    }

    pub fn play(&mut self, position: Millis) {
        self.seek(position);
        self.resume();
    }

    pub fn resume(&mut self) {
        if !self.failed {
            self.element.play();
        }
    }

    pub fn pause(&mut self) {
        self.element.pause();
    }

    pub fn seek(&mut self, position: Millis) {
        if !self.failed {
            self.element.set_current_time_ms(position.max(0));
        }
    }

    pub fn set_volume(&mut self, gain: f32) {
        self.element.set_volume(gain);
    }

    pub fn volume(&self) -> f32 {
        self.element.volume()
    }

    pub fn position_ms(&self) -> Millis {
        self.element.current_time_ms()
    }

    pub fn is_playing(&self) -> bool {
        !self.failed && !self.element.is_paused()
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    fn poll(&mut self) -> Option<SurfaceSignal> {
        match self.element.poll_event()? {
            MediaEvent::MetadataLoaded { duration_ms } => {
                Some(SurfaceSignal::DurationKnown(duration_ms))
            }
            MediaEvent::Ended => Some(SurfaceSignal::Ended),
            MediaEvent::Error(err) => {
                self.failed = true;
                self.element.pause();
                Some(SurfaceSignal::Failed(err))
            }
        }
    }

    fn release(&mut self) {
        self.element.pause();
        self.element.detach();
    }
}

/// The two surfaces owned by one session
pub struct MediaHandles {
    pub primary: PrimarySurface,
    pub secondary: Option<AudioSurface>,
}

impl MediaHandles {
    /// Create and load the surfaces for `sources`.
    /// Load failures are returned alongside the handles so the session can
    /// degrade instead of refusing to open.
    pub fn open(
        sources: &Sources,
        backend: &dyn MediaBackend,
        clock: Rc<dyn Clock>,
    ) -> (Self, Vec<(Track, MediaLoadError)>) {
        let mut failures = Vec::new();

        let mut primary = match &sources.primary {
            PrimarySource::Video { .. } => {
                PrimarySurface::Video(VideoSurface::new(backend.create_video()))
            }
            PrimarySource::Photo { duration_ms, .. } => {
                PrimarySurface::Photo(PhotoSurface::new(clock, *duration_ms))
            }
        };
        if let Err(err) = primary.load(sources.primary.uri(), sources.poster.as_deref()) {
            failures.push((Track::Primary, err));
        }

        let secondary = sources.music.as_deref().map(|uri| {
            let mut audio = AudioSurface::new(backend.create_audio(), uri);
            if let Err(err) = audio.load() {
                failures.push((Track::Secondary, err));
            }
            audio
        });

        (Self { primary, secondary }, failures)
    }

    /// Secondary surface that is present and has not failed
    pub fn active_secondary(&mut self) -> Option<&mut AudioSurface> {
        self.secondary.as_mut().filter(|audio| !audio.is_failed())
    }

    pub fn has_active_secondary(&self) -> bool {
        self.secondary
            .as_ref()
            .map_or(false, |audio| !audio.is_failed())
    }

    /// Start a track from its current playhead
    pub fn resume(&mut self, track: Track) {
        match track {
            Track::Primary => self.primary.resume(),
            Track::Secondary => {
                if let Some(audio) = self.active_secondary() {
                    audio.resume();
                }
            }
        }
    }

    pub fn pause_all(&mut self) {
        self.primary.pause();
        if let Some(audio) = self.secondary.as_mut() {
            audio.pause();
        }
    }

    /// Drain every pending signal from both surfaces
    pub fn poll_all(&mut self) -> Vec<(Track, SurfaceSignal)> {
        let mut signals = Vec::new();
        while let Some(signal) = self.primary.poll() {
            signals.push((Track::Primary, signal));
        }
        if let Some(audio) = self.secondary.as_mut() {
            while let Some(signal) = audio.poll() {
                signals.push((Track::Secondary, signal));
            }
        }
        signals
    }

    /// Pause and detach both surfaces
    pub fn release_all(&mut self) {
        self.primary.release();
        if let Some(audio) = self.secondary.as_mut() {
            audio.release();
        }
    }
}
