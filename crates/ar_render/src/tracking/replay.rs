//! Recorded session playback
//!
//! [`ReplaySession`] implements [`TrackingSession`] from a
//! [`ReplayRecording`] loaded from RON or TOML through the [`Config`] trait.
//! Each `update` returns the next recorded frame. Anchors are owned by the
//! replay and stamped into every frame it returns, tracking whenever the
//! camera tracks.

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::foundation::math::{Pose, Vec3};

use super::frame::{Anchor, AnchorId, Frame, Plane, TrackingState};
use super::hit::{HitResult, InstantPlacementMethod, Tap, Trackable};
use super::session::{DepthMode, InstantPlacementMode, SessionConfig, SessionError, TrackingSession};

/// One recorded frame plus the hit test answers valid for it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    /// The frame snapshot
    pub frame: Frame,
    /// Results of a full hit test at any tap during this frame
    #[serde(default)]
    pub hits: Vec<HitResult>,
    /// Results of an instant placement hit test; synthesized when empty
    #[serde(default)]
    pub instant_hits: Vec<HitResult>,
}

/// One step of a recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReplayStep {
    /// A normal frame
    Frame(FrameRecord),
    /// The camera was unavailable for this tick
    CameraUnavailable,
}

/// A recorded tracking session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayRecording {
    /// Whether the recording device produced depth
    pub depth_supported: bool,
    /// Restart from the first step when the recording ends
    pub looping: bool,
    /// Recorded ticks in order
    pub steps: Vec<ReplayStep>,
}

impl Config for ReplayRecording {}

/// Tracking session backed by a recording
pub struct ReplaySession {
    recording: ReplayRecording,
    cursor: usize,
    current: Option<FrameRecord>,
    config: SessionConfig,
    anchors: Vec<Anchor>,
    next_anchor_id: u64,
    camera_texture: Option<u64>,
    running: bool,
}

impl ReplaySession {
    /// Play back the given recording
    pub fn new(recording: ReplayRecording) -> Self {
        Self {
            recording,
            cursor: 0,
            current: None,
            config: SessionConfig::default(),
            anchors: Vec::new(),
            next_anchor_id: 1,
            camera_texture: None,
            running: false,
        }
    }

    /// Number of recorded steps
    pub fn len(&self) -> usize {
        self.recording.steps.len()
    }

    /// Whether the recording has no steps
    pub fn is_empty(&self) -> bool {
        self.recording.steps.is_empty()
    }

    /// Texture the renderer registered for camera images
    pub fn camera_texture_name(&self) -> Option<u64> {
        self.camera_texture
    }

    /// Whether the replay is between `resume` and `pause`
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Live anchors owned by the replay
    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    fn next_step(&mut self) -> Option<ReplayStep> {
        if self.cursor >= self.recording.steps.len() {
            if !self.recording.looping || self.recording.steps.is_empty() {
                return None;
            }
            self.cursor = 0;
        }
        let step = self.recording.steps[self.cursor].clone();
        self.cursor += 1;
        Some(step)
    }

    fn instant_placement_hit(frame: &Frame, distance: f32) -> HitResult {
        let camera = &frame.camera.pose;
        let position = camera.transform_point(Vec3::new(0.0, 0.0, -distance));
        HitResult {
            hit_pose: Pose::from_translation(position.x, position.y, position.z),
            distance,
            trackable: Trackable::InstantPlacementPoint {
                tracking_method: InstantPlacementMethod::ScreenspaceWithApproximateDistance,
            },
        }
    }
}

impl TrackingSession for ReplaySession {
    fn configure(&mut self, config: &SessionConfig) -> Result<(), SessionError> {
        if config.depth_mode == DepthMode::Automatic && !self.recording.depth_supported {
            return Err(SessionError::Other("depth mode not supported by recording".to_string()));
        }
        self.config = *config;
        Ok(())
    }

    fn resume(&mut self) -> Result<(), SessionError> {
        self.running = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.running = false;
    }

    fn close(&mut self) {
        self.running = false;
        self.anchors.clear();
        self.current = None;
    }

    fn update(&mut self) -> Result<Frame, SessionError> {
        match self.next_step() {
            None => Err(SessionError::EndOfRecording),
            Some(ReplayStep::CameraUnavailable) => Err(SessionError::CameraNotAvailable),
            Some(ReplayStep::Frame(mut record)) => {
                let anchor_state = if record.frame.camera.is_tracking() {
                    TrackingState::Tracking
                } else {
                    TrackingState::Paused
                };
                for anchor in &mut self.anchors {
                    anchor.tracking_state = anchor_state;
                }
                if self.config.depth_mode == DepthMode::Disabled {
                    record.frame.depth_image = None;
                }
                record.frame.anchors = self.anchors.clone();
                let frame = record.frame.clone();
                self.current = Some(record);
                Ok(frame)
            }
        }
    }

    fn set_camera_texture_name(&mut self, texture_id: u64) {
        self.camera_texture = Some(texture_id);
    }

    fn set_display_geometry(&mut self, rotation_degrees: u32, width: u32, height: u32) {
        log::debug!("Replay display geometry: {}° {}x{}", rotation_degrees, width, height);
    }

    fn hit_test(&self, _frame: &Frame, _tap: Tap) -> Vec<HitResult> {
        self.current.as_ref().map(|r| r.hits.clone()).unwrap_or_default()
    }

    fn hit_test_instant_placement(
        &self,
        frame: &Frame,
        _tap: Tap,
        approximate_distance_meters: f32,
    ) -> Vec<HitResult> {
        if self.config.instant_placement_mode == InstantPlacementMode::Disabled {
            return Vec::new();
        }
        match &self.current {
            Some(record) if !record.instant_hits.is_empty() => record.instant_hits.clone(),
            _ => vec![Self::instant_placement_hit(frame, approximate_distance_meters)],
        }
    }

    fn create_anchor(&mut self, pose: Pose) -> Result<Anchor, SessionError> {
        let anchor = Anchor {
            id: AnchorId(self.next_anchor_id),
            pose,
            tracking_state: TrackingState::Tracking,
        };
        self.next_anchor_id += 1;
        self.anchors.push(anchor.clone());
        Ok(anchor)
    }

    fn detach_anchor(&mut self, id: AnchorId) {
        self.anchors.retain(|a| a.id != id);
    }

    fn anchor_state(&self, id: AnchorId) -> Option<TrackingState> {
        self.anchors.iter().find(|a| a.id == id).map(|a| a.tracking_state)
    }

    fn is_depth_mode_supported(&self, mode: DepthMode) -> bool {
        match mode {
            DepthMode::Disabled => true,
            DepthMode::Automatic => self.recording.depth_supported,
        }
    }

    fn all_planes(&self) -> Vec<Plane> {
        self.current.as_ref().map(|r| r.frame.planes.clone()).unwrap_or_default()
    }
}
