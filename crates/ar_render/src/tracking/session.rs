//! Tracking session interface and lifecycle handle
//!
//! [`TrackingSession`] is the seam to the external tracking runtime.
//! [`SessionHandle`] wraps a session with an explicit state machine so that
//! calls made in the wrong lifecycle phase fail with
//! [`SessionError::InvalidState`] instead of reaching the runtime.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::config::InstantPlacementSettings;
use crate::foundation::math::Pose;

use super::frame::{Anchor, AnchorId, Frame, Plane, TrackingState};
use super::hit::{HitResult, Tap};

/// Light estimation mode requested from the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightEstimationMode {
    /// No estimate
    Disabled,
    /// Single ambient intensity
    AmbientIntensity,
    /// Main light plus spherical harmonics ambient
    EnvironmentalHdr,
}

/// Depth mode requested from the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepthMode {
    /// No depth images
    Disabled,
    /// Depth images when the device supports them
    Automatic,
}

/// Instant placement mode requested from the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstantPlacementMode {
    /// Only full hit tests
    Disabled,
    /// Approximate-distance placement with +Y up
    LocalYUp,
}

/// Session feature configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Light estimation
    pub light_estimation_mode: LightEstimationMode,
    /// Depth
    pub depth_mode: DepthMode,
    /// Instant placement
    pub instant_placement_mode: InstantPlacementMode,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            light_estimation_mode: LightEstimationMode::EnvironmentalHdr,
            depth_mode: DepthMode::Disabled,
            instant_placement_mode: InstantPlacementMode::Disabled,
        }
    }
}

impl SessionConfig {
    /// Derive a configuration from the user settings and device capabilities
    ///
    /// Depth stays on whenever the device supports it, so toggling occlusion
    /// later does not require reconfiguring the session.
    pub fn from_settings(depth_supported: bool, instant_placement: &InstantPlacementSettings) -> Self {
        Self {
            light_estimation_mode: LightEstimationMode::EnvironmentalHdr,
            depth_mode: if depth_supported { DepthMode::Automatic } else { DepthMode::Disabled },
            instant_placement_mode: if instant_placement.is_instant_placement_enabled() {
                InstantPlacementMode::LocalYUp
            } else {
                InstantPlacementMode::Disabled
            },
        }
    }
}

/// Session errors
///
/// The `Display` text of each variant is the remediation message shown to
/// the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Tracking runtime is not installed
    #[error("Please install ARCore")]
    NotInstalled,

    /// User declined to install the runtime
    #[error("Please install ARCore")]
    UserDeclinedInstallation,

    /// Installed runtime is older than required
    #[error("Please update ARCore")]
    ApkTooOld,

    /// This app was built against an older runtime API
    #[error("Please update this app")]
    SdkTooOld,

    /// Device cannot run AR
    #[error("This device does not support AR")]
    DeviceNotCompatible,

    /// Camera cannot be opened or was lost
    #[error("Camera not available. Try restarting the app.")]
    CameraNotAvailable,

    /// Operation not valid in the current lifecycle state
    #[error("Session is {actual:?}, operation requires {expected}")]
    InvalidState {
        /// Current state
        actual: SessionState,
        /// Required state
        expected: &'static str,
    },

    /// Replay ran out of recorded frames
    #[error("End of recorded session")]
    EndOfRecording,

    /// Anything else
    #[error("Failed to create AR session: {0}")]
    Other(String),
}

/// External tracking runtime
///
/// Implementations own all tracking state; the renderer sees it only
/// through [`Frame`] snapshots.
pub trait TrackingSession {
    /// Apply a feature configuration
    fn configure(&mut self, config: &SessionConfig) -> Result<(), SessionError>;

    /// Start or restart the camera and tracking
    fn resume(&mut self) -> Result<(), SessionError>;

    /// Stop the camera; tracking state is kept
    fn pause(&mut self);

    /// Release all runtime resources
    fn close(&mut self);

    /// Produce the next frame, blocking until the camera has one
    fn update(&mut self) -> Result<Frame, SessionError>;

    /// Texture the runtime should write camera images into
    fn set_camera_texture_name(&mut self, texture_id: u64);

    /// Inform the runtime of the viewport size and rotation
    fn set_display_geometry(&mut self, rotation_degrees: u32, width: u32, height: u32);

    /// Ray cast from a screen point; results ordered nearest first
    fn hit_test(&self, frame: &Frame, tap: Tap) -> Vec<HitResult>;

    /// Instant placement hit test at an assumed distance
    fn hit_test_instant_placement(
        &self,
        frame: &Frame,
        tap: Tap,
        approximate_distance_meters: f32,
    ) -> Vec<HitResult>;

    /// Create an anchor at a hit pose
    fn create_anchor(&mut self, pose: Pose) -> Result<Anchor, SessionError>;

    /// Stop tracking an anchor
    fn detach_anchor(&mut self, id: AnchorId);

    /// Current tracking state of an anchor, `None` once detached
    fn anchor_state(&self, id: AnchorId) -> Option<TrackingState>;

    /// Whether the device can produce depth in the given mode
    fn is_depth_mode_supported(&self, mode: DepthMode) -> bool;

    /// All planes the runtime currently knows
    fn all_planes(&self) -> Vec<Plane>;
}

/// Lifecycle state of a [`SessionHandle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created but never resumed
    Created,
    /// Camera running; `update` allowed
    Resumed,
    /// Camera stopped
    Paused,
    /// Resources released; terminal
    Closed,
}

/// Owned session plus explicit lifecycle state
pub struct SessionHandle {
    session: Box<dyn TrackingSession>,
    state: SessionState,
    config: SessionConfig,
}

impl SessionHandle {
    /// Wrap a freshly created session
    pub fn new(session: Box<dyn TrackingSession>) -> Self {
        Self {
            session,
            state: SessionState::Created,
            config: SessionConfig::default(),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Last applied configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn require_open(&self) -> Result<(), SessionError> {
        if self.state == SessionState::Closed {
            return Err(SessionError::InvalidState { actual: self.state, expected: "not closed" });
        }
        Ok(())
    }

    fn require_resumed(&self) -> Result<(), SessionError> {
        if self.state != SessionState::Resumed {
            return Err(SessionError::InvalidState { actual: self.state, expected: "resumed" });
        }
        Ok(())
    }

    /// Configure the session from user settings
    pub fn configure_from_settings(
        &mut self,
        instant_placement: &InstantPlacementSettings,
    ) -> Result<(), SessionError> {
        let depth_supported = self.is_depth_mode_supported(DepthMode::Automatic);
        self.configure(SessionConfig::from_settings(depth_supported, instant_placement))
    }

    /// Apply a configuration
    pub fn configure(&mut self, config: SessionConfig) -> Result<(), SessionError> {
        self.require_open()?;
        self.session.configure(&config)?;
        log::debug!("Session configured: {:?}", config);
        self.config = config;
        Ok(())
    }

    /// Resume tracking
    pub fn resume(&mut self) -> Result<(), SessionError> {
        self.require_open()?;
        if self.state == SessionState::Resumed {
            return Ok(());
        }
        self.session.resume()?;
        self.state = SessionState::Resumed;
        log::info!("Session resumed");
        Ok(())
    }

    /// Pause tracking; no-op unless resumed
    pub fn pause(&mut self) {
        if self.state == SessionState::Resumed {
            self.session.pause();
            self.state = SessionState::Paused;
            log::info!("Session paused");
        }
    }

    /// Close the session; idempotent
    pub fn close(&mut self) {
        if self.state != SessionState::Closed {
            self.session.close();
            self.state = SessionState::Closed;
            log::info!("Session closed");
        }
    }

    /// Next frame; only while resumed
    pub fn update(&mut self) -> Result<Frame, SessionError> {
        self.require_resumed()?;
        self.session.update()
    }

    /// Bind the camera texture
    pub fn set_camera_texture_name(&mut self, texture_id: u64) {
        self.session.set_camera_texture_name(texture_id);
    }

    /// Forward display geometry
    pub fn set_display_geometry(&mut self, rotation_degrees: u32, width: u32, height: u32) {
        self.session.set_display_geometry(rotation_degrees, width, height);
    }

    /// Screen-space hit test
    pub fn hit_test(&self, frame: &Frame, tap: Tap) -> Vec<HitResult> {
        self.session.hit_test(frame, tap)
    }

    /// Instant placement hit test
    pub fn hit_test_instant_placement(&self, frame: &Frame, tap: Tap, distance: f32) -> Vec<HitResult> {
        self.session.hit_test_instant_placement(frame, tap, distance)
    }

    /// Create an anchor
    pub fn create_anchor(&mut self, pose: Pose) -> Result<Anchor, SessionError> {
        self.require_resumed()?;
        self.session.create_anchor(pose)
    }

    /// Detach an anchor
    pub fn detach_anchor(&mut self, id: AnchorId) {
        self.session.detach_anchor(id);
    }

    /// Anchor tracking state
    pub fn anchor_state(&self, id: AnchorId) -> Option<TrackingState> {
        self.session.anchor_state(id)
    }

    /// Depth capability query
    pub fn is_depth_mode_supported(&self, mode: DepthMode) -> bool {
        self.session.is_depth_mode_supported(mode)
    }

    /// All known planes
    pub fn all_planes(&self) -> Vec<Plane> {
        self.session.all_planes()
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::replay::{ReplayRecording, ReplaySession};

    fn handle() -> SessionHandle {
        SessionHandle::new(Box::new(ReplaySession::new(ReplayRecording::default())))
    }

    #[test]
    fn update_requires_resumed_state() {
        let mut session = handle();
        assert!(matches!(
            session.update(),
            Err(SessionError::InvalidState { actual: SessionState::Created, .. })
        ));
        session.resume().unwrap();
        session.pause();
        assert_eq!(session.state(), SessionState::Paused);
        assert!(session.update().is_err());
    }

    #[test]
    fn closed_session_rejects_resume() {
        let mut session = handle();
        session.close();
        session.close();
        assert!(session.resume().is_err());
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn config_follows_settings_and_support() {
        let mut placement = InstantPlacementSettings::default();
        placement.set_instant_placement_enabled(true);
        let config = SessionConfig::from_settings(false, &placement);
        assert_eq!(config.depth_mode, DepthMode::Disabled);
        assert_eq!(config.instant_placement_mode, InstantPlacementMode::LocalYUp);
        assert_eq!(config.light_estimation_mode, LightEstimationMode::EnvironmentalHdr);

        let config = SessionConfig::from_settings(true, &InstantPlacementSettings::default());
        assert_eq!(config.depth_mode, DepthMode::Automatic);
        assert_eq!(config.instant_placement_mode, InstantPlacementMode::Disabled);
    }

    #[test]
    fn remediation_messages() {
        assert_eq!(SessionError::ApkTooOld.to_string(), "Please update ARCore");
        assert_eq!(SessionError::SdkTooOld.to_string(), "Please update this app");
        assert_eq!(SessionError::DeviceNotCompatible.to_string(), "This device does not support AR");
    }
}
