//! Thumbnail launcher.
//!
//! Shows a thumbnail for a prepared post and opens at most one preview
//! session over it. Closing the preview tears the session down completely.

use std::rc::Rc;

use crate::config::PreviewConfig;
use crate::core::clock::Clock;
use crate::media::element::MediaBackend;
use crate::playback::engine::{PlaybackError, PlaybackSession};

pub struct PreviewLauncher {
    config: PreviewConfig,
    backend: Rc<dyn MediaBackend>,
    clock: Rc<dyn Clock>,
    session: Option<PlaybackSession>,
}

impl PreviewLauncher {
    pub fn new(config: PreviewConfig, backend: Rc<dyn MediaBackend>, clock: Rc<dyn Clock>) -> Self {
        Self {
            config,
            backend,
            clock,
            session: None,
        }
    }

    /// Poster if one was given, otherwise the photo itself
    pub fn thumbnail_uri(&self) -> Option<&str> {
        self.config.thumbnail_uri()
    }

    pub fn config(&self) -> &PreviewConfig {
        &self.config
    }

    /// Open the modal preview. Re-opening returns the session already open.
    pub fn open(&mut self) -> Result<&mut PlaybackSession, PlaybackError> {
        let session = match self.session.take() {
            Some(session) if session.is_open() => session,
            _ => {
                log::info!("launcher: opening preview");
                PlaybackSession::open(&self.config, self.backend.as_ref(), Rc::clone(&self.clock))?
            }
        };
        Ok(self.session.insert(session))
    }

    /// Close the modal preview with a full session teardown
    pub fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            log::info!("launcher: closing preview");
            session.close();
        }
    }

    pub fn is_open(&self) -> bool {
        self.session.as_ref().map_or(false, PlaybackSession::is_open)
    }

    pub fn session_mut(&mut self) -> Option<&mut PlaybackSession> {
        self.session.as_mut().filter(|session| session.is_open())
    }

    /// Swap the prepared sources. An open preview is closed first.
    pub fn set_sources(&mut self, config: PreviewConfig) {
        self.close();
        self.config = config;
    }
}

impl Drop for PreviewLauncher {
    fn drop(&mut self) {
        self.close();
    }
}
