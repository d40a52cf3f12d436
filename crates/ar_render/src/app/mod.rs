//! # AR Application
//!
//! Glue between the host (window, input, OS lifecycle) and the per-frame
//! pipeline. [`ArApp`] owns the settings, the tap queue, the session
//! lifecycle and the frame renderer, and exposes the callbacks a host
//! drives:
//!
//! ```text
//! resume ─▶ surface_created ─▶ surface_changed ─▶ tick ... ─▶ pause ─▶ destroy
//! ```
//!
//! Settings changes go through [`ArApp::apply_settings`], which reconfigures
//! the live session. With a settings file attached, every change to the
//! depth or instant placement settings is written back immediately.

pub mod lifecycle;
pub mod notifier;

pub use lifecycle::{ArLifecycle, LifecycleParticipant, NoopParticipant, SessionFactory};
pub use notifier::{LogNotifier, NotifierEvent, RecordingNotifier, UserNotifier};

use std::path::PathBuf;

use thiserror::Error;

use crate::assets::AssetError;
use crate::config::{Config, ConfigError};
use crate::core::{AppConfig, DepthSettings, InstantPlacementSettings};
use crate::placement::TapQueue;
use crate::render::resources::RenderContext;
use crate::render::{ArFrameRenderer, FrameServices, RenderError, SurfaceRenderer};
use crate::tracking::{DepthMode, SessionError, Tap};

/// Application-level errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Session could not be created or resumed
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// A frame failed to render
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Settings could not be loaded or saved
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// An asset could not be read
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),
}

impl AppError {
    /// Whether a recorded session has no more frames
    pub fn is_end_of_recording(&self) -> bool {
        matches!(
            self,
            Self::Session(SessionError::EndOfRecording) | Self::Render(RenderError::Session(SessionError::EndOfRecording))
        )
    }
}

/// The AR app: settings, taps, session lifecycle and frame renderer
pub struct ArApp<N: UserNotifier> {
    config: AppConfig,
    settings_path: Option<PathBuf>,
    lifecycle: ArLifecycle,
    sessions_seen: u64,
    renderer: ArFrameRenderer,
    notifier: N,
    taps: TapQueue,
}

impl<N: UserNotifier> ArApp<N> {
    /// Create the app; nothing runs until [`resume`](Self::resume)
    pub fn new(ctx: &RenderContext, config: AppConfig, lifecycle: ArLifecycle, notifier: N) -> Self {
        let renderer = ArFrameRenderer::new(ctx, &config.renderer);
        Self {
            config,
            settings_path: None,
            lifecycle,
            sessions_seen: 0,
            renderer,
            notifier,
            taps: TapQueue::default(),
        }
    }

    /// Share an existing tap queue, e.g. one an input thread already holds
    #[must_use]
    pub fn with_tap_queue(mut self, taps: TapQueue) -> Self {
        self.taps = taps;
        self
    }

    /// Write settings back to `path` whenever they change
    #[must_use]
    pub fn with_settings_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    /// Current settings
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Change depth and instant placement settings, as a settings menu does
    ///
    /// The live session is reconfigured right away; depth toggles the
    /// session cannot honor are switched back off.
    pub fn apply_settings(
        &mut self,
        edit: impl FnOnce(&mut DepthSettings, &mut InstantPlacementSettings),
    ) -> Result<(), AppError> {
        edit(&mut self.config.depth, &mut self.config.instant_placement);
        if let Some(session) = self.lifecycle.session_mut() {
            self.config.depth.restrict_to_support(session.is_depth_mode_supported(DepthMode::Automatic));
            if let Err(e) = session.configure_from_settings(&self.config.instant_placement) {
                log::error!("Failed to reconfigure session: {}", e);
                self.notifier.show_error(&e.to_string());
                return Err(e.into());
            }
        }
        self.save_settings()?;
        Ok(())
    }

    fn save_settings(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.settings_path {
            self.config.save_to_file(path)?;
            log::debug!("Settings saved to {}", path.display());
        }
        Ok(())
    }

    fn save_settings_if_changed(&self, before: &DepthSettings) {
        if self.config.depth != *before {
            if let Err(e) = self.save_settings() {
                log::error!("Failed to save settings: {}", e);
            }
        }
    }

    /// The session lifecycle
    pub fn lifecycle(&self) -> &ArLifecycle {
        &self.lifecycle
    }

    /// The frame renderer
    pub fn renderer(&self) -> &ArFrameRenderer {
        &self.renderer
    }

    /// The notifier
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Mutable notifier, e.g. to script prompt answers
    pub fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }

    /// A handle input threads can offer taps to
    pub fn taps(&self) -> TapQueue {
        self.taps.clone()
    }

    /// Queue a tap from the host's input thread
    pub fn on_tap(&self, x: f32, y: f32) -> bool {
        self.taps.offer(Tap { x, y })
    }

    fn services(&mut self) -> (&mut ArFrameRenderer, FrameServices<'_>) {
        (
            &mut self.renderer,
            FrameServices {
                session: self.lifecycle.session_mut(),
                config: &mut self.config,
                notifier: &mut self.notifier,
                taps: &self.taps,
            },
        )
    }

    /// Resume the session, the display surface and input
    pub fn resume(&mut self) -> Result<(), AppError> {
        let before = self.config.depth.clone();
        let result = self.lifecycle.resume(&mut self.config, &mut self.notifier);
        if self.lifecycle.sessions_created() != self.sessions_seen {
            self.sessions_seen = self.lifecycle.sessions_created();
            self.renderer.on_session_replaced();
        }
        self.save_settings_if_changed(&before);
        result?;
        Ok(())
    }

    /// Pause input, the display surface and the session
    pub fn pause(&mut self) {
        self.lifecycle.pause();
    }

    /// The rendering surface now exists
    pub fn surface_created(&mut self) {
        let (renderer, mut services) = self.services();
        renderer.on_surface_created(&mut services);
    }

    /// The rendering surface was resized
    pub fn surface_changed(&mut self, width: u32, height: u32) {
        let (renderer, mut services) = self.services();
        renderer.on_surface_changed(&mut services, width, height);
    }

    /// The display rotated
    pub fn display_rotated(&mut self, rotation_degrees: u32) {
        self.renderer.set_display_rotation(rotation_degrees);
    }

    /// Render one frame; does nothing while paused
    pub fn tick(&mut self) -> Result<(), AppError> {
        if !self.lifecycle.is_running() {
            return Ok(());
        }
        // Answering the depth prompt changes settings mid-tick
        let before = self.config.depth.clone();
        let (renderer, mut services) = self.services();
        let result = renderer.on_draw_frame(&mut services);
        self.save_settings_if_changed(&before);
        result?;
        Ok(())
    }

    /// Close the session
    pub fn destroy(&mut self) {
        self.lifecycle.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_of_recording_is_recognized_through_render_errors() {
        assert!(AppError::from(SessionError::EndOfRecording).is_end_of_recording());
        assert!(AppError::from(RenderError::from(SessionError::EndOfRecording)).is_end_of_recording());
        assert!(!AppError::from(SessionError::CameraNotAvailable).is_end_of_recording());
    }
}
