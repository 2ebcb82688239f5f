//! Clock-driven media elements.
//!
//! `SimulatedElement` behaves like a platform media element whose decoding is
//! instantaneous: the playhead advances with the session clock while playing,
//! metadata arrives on the first poll after `load`, and reaching the end pauses
//! the element and raises `MediaEvent::Ended`. Used by the headless runner and
//! by the engine tests.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use crate::core::clock::Clock;
use crate::core::time::Millis;
use crate::media::element::{MediaBackend, MediaElement, MediaEvent, MediaLoadError};

/// Duration given to locators that were never registered
pub const DEFAULT_SIMULATED_DURATION_MS: Millis = 30_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Video,
    Audio,
}

#[derive(Debug, Default)]
struct Catalog {
    durations: HashMap<String, Millis>,
    failing: HashSet<String>,
}

#[derive(Debug)]
struct SimState {
    kind: ElementKind,
    uri: Option<String>,
    duration_ms: Millis,
    failed: bool,
    detached: bool,
    paused: bool,
    anchor_pos: Millis,
    anchor_wall: Millis,
    volume: f32,
    play_calls: u32,
    events: VecDeque<MediaEvent>,
}

impl SimState {
    fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            uri: None,
            duration_ms: 0,
            failed: false,
            detached: false,
            paused: true,
            anchor_pos: 0,
            anchor_wall: 0,
            volume: 1.0,
            play_calls: 0,
            events: VecDeque::new(),
        }
    }

    fn position_at(&self, now: Millis) -> Millis {
        if self.paused {
            self.anchor_pos
        } else {
            (self.anchor_pos + now - self.anchor_wall).min(self.duration_ms)
        }
    }

    fn usable(&self) -> bool {
        self.uri.is_some() && !self.failed && !self.detached
    }
}

/// Simulated media element
pub struct SimulatedElement {
    clock: Rc<dyn Clock>,
    catalog: Rc<RefCell<Catalog>>,
    state: Rc<RefCell<SimState>>,
}

impl MediaElement for SimulatedElement {
    fn load(&mut self, uri: &str) -> Result<(), MediaLoadError> {
        let mut state = self.state.borrow_mut();
        if state.detached {
            return Err(MediaLoadError::Detached);
        }
        if uri.is_empty() {
            return Err(MediaLoadError::EmptyLocator);
        }

        let catalog = self.catalog.borrow();
        state.uri = Some(uri.to_string());
        state.paused = true;
        state.anchor_pos = 0;
        state.anchor_wall = self.clock.now_ms();
        state.events.clear();

        if catalog.failing.contains(uri) {
            state.failed = true;
            state.duration_ms = 0;
            state.events.push_back(MediaEvent::Error(MediaLoadError::Decode {
                uri: uri.to_string(),
                reason: "unsupported stream".to_string(),
            }));
        } else {
            let duration_ms = catalog
                .durations
                .get(uri)
                .copied()
                .unwrap_or(DEFAULT_SIMULATED_DURATION_MS);
            state.failed = false;
            state.duration_ms = duration_ms;
            state
                .events
                .push_back(MediaEvent::MetadataLoaded { duration_ms });
        }
        Ok(())
    }

    fn play(&mut self) {
        let now = self.clock.now_ms();
        let mut state = self.state.borrow_mut();
        state.play_calls += 1;
        if !state.usable() || !state.paused {
            return;
        }
        // Playing an ended element restarts it
        if state.anchor_pos >= state.duration_ms {
            state.anchor_pos = 0;
        }
        state.anchor_wall = now;
        state.paused = false;
    }

    fn pause(&mut self) {
        let now = self.clock.now_ms();
        let mut state = self.state.borrow_mut();
        if state.paused {
            return;
        }
        state.anchor_pos = state.position_at(now);
        state.paused = true;
    }

    fn set_current_time_ms(&mut self, position: Millis) {
        let now = self.clock.now_ms();
        let mut state = self.state.borrow_mut();
        if !state.usable() {
            return;
        }
        state.anchor_pos = position.clamp(0, state.duration_ms);
        state.anchor_wall = now;
    }

    fn current_time_ms(&self) -> Millis {
        self.state.borrow().position_at(self.clock.now_ms())
    }

    fn set_volume(&mut self, gain: f32) {
        self.state.borrow_mut().volume = gain.clamp(0.0, 1.0);
    }

    fn volume(&self) -> f32 {
        self.state.borrow().volume
    }

    fn is_paused(&self) -> bool {
        self.state.borrow().paused
    }

    fn poll_event(&mut self) -> Option<MediaEvent> {
        let now = self.clock.now_ms();
        let mut state = self.state.borrow_mut();
        if state.usable() && !state.paused && state.position_at(now) >= state.duration_ms {
            state.anchor_pos = state.duration_ms;
            state.paused = true;
            state.events.push_back(MediaEvent::Ended);
        }
        state.events.pop_front()
    }

    fn detach(&mut self) {
        let mut state = self.state.borrow_mut();
        state.paused = true;
        state.detached = true;
        state.events.clear();
    }
}

/// Read-only view into a simulated element, kept by tests and hosts after the
/// element itself has been handed to a session
#[derive(Clone)]
pub struct SimulatedProbe {
    clock: Rc<dyn Clock>,
    state: Rc<RefCell<SimState>>,
}

impl SimulatedProbe {
    pub fn kind(&self) -> ElementKind {
        self.state.borrow().kind
    }

    pub fn uri(&self) -> Option<String> {
        self.state.borrow().uri.clone()
    }

    pub fn position_ms(&self) -> Millis {
        self.state.borrow().position_at(self.clock.now_ms())
    }

    pub fn is_playing(&self) -> bool {
        !self.state.borrow().paused
    }

    pub fn volume(&self) -> f32 {
        self.state.borrow().volume
    }

    pub fn play_calls(&self) -> u32 {
        self.state.borrow().play_calls
    }

    pub fn is_detached(&self) -> bool {
        self.state.borrow().detached
    }
}

/// Backend handing out simulated elements
pub struct SimulatedBackend {
    clock: Rc<dyn Clock>,
    catalog: Rc<RefCell<Catalog>>,
    created: RefCell<Vec<SimulatedProbe>>,
    peak_attached: Cell<usize>,
}

impl SimulatedBackend {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            clock,
            catalog: Rc::new(RefCell::new(Catalog::default())),
            created: RefCell::new(Vec::new()),
            peak_attached: Cell::new(0),
        }
    }

    /// Register the decoded duration of a locator
    pub fn with_media(self, uri: &str, duration_ms: Millis) -> Self {
        self.catalog
            .borrow_mut()
            .durations
            .insert(uri.to_string(), duration_ms.max(0));
        self
    }

    /// Make every load of `uri` fail with a decode error
    pub fn with_failure(self, uri: &str) -> Self {
        self.catalog.borrow_mut().failing.insert(uri.to_string());
        self
    }

    /// Most recently created element currently bound to `uri`
    pub fn probe(&self, uri: &str) -> Option<SimulatedProbe> {
        self.created
            .borrow()
            .iter()
            .rev()
            .find(|probe| probe.uri().as_deref() == Some(uri))
            .cloned()
    }

    /// Number of elements handed out so far
    pub fn created_count(&self) -> usize {
        self.created.borrow().len()
    }

    /// Most elements that were attached at the same time
    pub fn peak_attached(&self) -> usize {
        self.peak_attached.get()
    }

    fn create(&self, kind: ElementKind) -> Box<dyn MediaElement> {
        let state = Rc::new(RefCell::new(SimState::new(kind)));
        let mut created = self.created.borrow_mut();
        created.push(SimulatedProbe {
            clock: Rc::clone(&self.clock),
            state: Rc::clone(&state),
        });
        let attached = created.iter().filter(|probe| !probe.is_detached()).count();
        self.peak_attached.set(self.peak_attached.get().max(attached));
        Box::new(SimulatedElement {
            clock: Rc::clone(&self.clock),
            catalog: Rc::clone(&self.catalog),
            state,
        })
    }
}

impl MediaBackend for SimulatedBackend {
    fn create_video(&self) -> Box<dyn MediaElement> {
        self.create(ElementKind::Video)
    }

    fn create_audio(&self) -> Box<dyn MediaElement> {
        self.create(ElementKind::Audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;

    fn setup() -> (ManualClock, SimulatedBackend) {
        let clock = ManualClock::new();
        let backend = SimulatedBackend::new(Rc::new(clock.clone()))
            .with_media("clip.mp4", 2_000)
            .with_failure("broken.mp4");
        (clock, backend)
    }

    #[test]
    fn test_metadata_on_first_poll() {
        let (_clock, backend) = setup();
        let mut element = backend.create_video();
        element.load("clip.mp4").unwrap();
        assert_eq!(
            element.poll_event(),
            Some(MediaEvent::MetadataLoaded { duration_ms: 2_000 })
        );
        assert_eq!(element.poll_event(), None);
    }

    #[test]
    fn test_playhead_follows_clock() {
        let (clock, backend) = setup();
        let mut element = backend.create_video();
        element.load("clip.mp4").unwrap();
        element.set_current_time_ms(500);
        element.play();
        clock.advance(300);
        assert_eq!(element.current_time_ms(), 800);
        element.pause();
        clock.advance(300);
        assert_eq!(element.current_time_ms(), 800);
    }

    #[test]
    fn test_end_pauses_and_signals() {
        let (clock, backend) = setup();
        let mut element = backend.create_video();
        element.load("clip.mp4").unwrap();
        element.poll_event();
        element.play();
        clock.advance(2_500);
        assert_eq!(element.poll_event(), Some(MediaEvent::Ended));
        assert!(element.is_paused());
        assert_eq!(element.current_time_ms(), 2_000);
    }

    #[test]
    fn test_failure_is_reported_late() {
        let (_clock, backend) = setup();
        let mut element = backend.create_video();
        assert!(element.load("broken.mp4").is_ok());
        assert!(matches!(
            element.poll_event(),
            Some(MediaEvent::Error(MediaLoadError::Decode { .. }))
        ));
        element.play();
        assert!(element.is_paused());
    }

    #[test]
    fn test_empty_locator_rejected() {
        let (_clock, backend) = setup();
        let mut element = backend.create_audio();
        assert_eq!(element.load(""), Err(MediaLoadError::EmptyLocator));
    }

    #[test]
    fn test_probe_tracks_calls() {
        let (_clock, backend) = setup();
        let mut element = backend.create_audio();
        element.load("clip.mp4").unwrap();
        element.play();
        element.set_volume(1.7);

        let probe = backend.probe("clip.mp4").unwrap();
        assert_eq!(probe.kind(), ElementKind::Audio);
        assert_eq!(probe.play_calls(), 1);
        assert!(probe.is_playing());
        assert_eq!(probe.volume(), 1.0);

        element.detach();
        assert!(probe.is_detached());
        assert!(!probe.is_playing());
    }

    #[test]
    fn test_peak_attached_ignores_detached() {
        let (_clock, backend) = setup();
        let mut first = backend.create_video();
        first.detach();
        let _second = backend.create_video();
        assert_eq!(backend.peak_attached(), 1);
        let _third = backend.create_audio();
        assert_eq!(backend.peak_attached(), 2);
    }
}
