//! Session and surface lifecycle
//!
//! Resume brings things up in dependency order: session, then the display
//! surface, then input. Pause tears down in reverse: input and the display
//! surface stop before the session pauses, so nothing queries a paused
//! session.

use crate::core::AppConfig;
use crate::tracking::{DepthMode, SessionError, SessionHandle, SessionState, TrackingSession};

use super::notifier::UserNotifier;

/// Creates tracking sessions on demand
pub trait SessionFactory {
    /// Create a new session
    fn create(&mut self) -> Result<Box<dyn TrackingSession>, SessionError>;
}

impl<F> SessionFactory for F
where
    F: FnMut() -> Result<Box<dyn TrackingSession>, SessionError>,
{
    fn create(&mut self) -> Result<Box<dyn TrackingSession>, SessionError> {
        self()
    }
}

/// Something that follows the app's resume/pause cycle
pub trait LifecycleParticipant {
    /// Start or restart
    fn on_resume(&mut self);

    /// Stop
    fn on_pause(&mut self);
}

/// Participant with nothing to do
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopParticipant;

impl LifecycleParticipant for NoopParticipant {
    fn on_resume(&mut self) {}
    fn on_pause(&mut self) {}
}

/// Owns the session and sequences resume/pause/destroy
pub struct ArLifecycle {
    factory: Box<dyn SessionFactory>,
    session: Option<SessionHandle>,
    sessions_created: u64,
    display_surface: Box<dyn LifecycleParticipant>,
    input: Box<dyn LifecycleParticipant>,
}

impl ArLifecycle {
    /// Create a lifecycle; no session exists until the first resume
    pub fn new(
        factory: impl SessionFactory + 'static,
        display_surface: impl LifecycleParticipant + 'static,
        input: impl LifecycleParticipant + 'static,
    ) -> Self {
        Self {
            factory: Box::new(factory),
            session: None,
            sessions_created: 0,
            display_surface: Box::new(display_surface),
            input: Box::new(input),
        }
    }

    /// The session, once created
    pub fn session(&self) -> Option<&SessionHandle> {
        self.session.as_ref()
    }

    /// Mutable session access for the frame renderer
    pub fn session_mut(&mut self) -> Option<&mut SessionHandle> {
        self.session.as_mut()
    }

    /// How many sessions the factory has produced; changes whenever the session is replaced
    pub fn sessions_created(&self) -> u64 {
        self.sessions_created
    }

    /// Whether the session is resumed
    pub fn is_running(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.state() == SessionState::Resumed)
    }

    /// Create (if needed), configure and resume the session, then the
    /// display surface and input
    ///
    /// Failures are reported through `notifier` and leave everything
    /// paused; the next resume tries again. A session whose camera is
    /// unavailable is discarded.
    pub fn resume(&mut self, config: &mut AppConfig, notifier: &mut dyn UserNotifier) -> Result<(), SessionError> {
        if self.session.is_none() {
            match self.factory.create() {
                Ok(session) => {
                    self.session = Some(SessionHandle::new(session));
                    self.sessions_created += 1;
                }
                Err(e) => {
                    log::error!("Exception creating session: {:?}", e);
                    notifier.show_error(&e.to_string());
                    return Err(e);
                }
            }
        }
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };

        config.depth.restrict_to_support(session.is_depth_mode_supported(DepthMode::Automatic));
        let started = session
            .configure_from_settings(&config.instant_placement)
            .and_then(|()| session.resume());
        if let Err(e) = started {
            log::error!("Failed to resume session: {}", e);
            notifier.show_error(&e.to_string());
            if e == SessionError::CameraNotAvailable {
                self.session = None;
            }
            return Err(e);
        }

        self.display_surface.on_resume();
        self.input.on_resume();
        Ok(())
    }

    /// Pause input, then the display surface, then the session
    pub fn pause(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        self.input.on_pause();
        self.display_surface.on_pause();
        session.pause();
    }

    /// Close and drop the session
    pub fn destroy(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close();
        }
    }
}

impl Drop for ArLifecycle {
    fn drop(&mut self) {
        self.destroy();
    }
}
