//! Per-tick tracking snapshot
//!
//! A [`Frame`] is produced once per tick by the tracking session. The
//! renderer only reads it; it is dropped at the end of the tick.

use serde::{Deserialize, Serialize};

use crate::foundation::math::{utils, Mat4, Pose, Vec3};

/// Tracking quality of the camera, an anchor or a trackable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrackingState {
    /// Actively tracked; pose is current
    Tracking,
    /// Temporarily lost; may resume
    #[default]
    Paused,
    /// Permanently lost
    Stopped,
}

/// Why camera tracking is paused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrackingFailureReason {
    /// No failure; tracking is initializing
    #[default]
    None,
    /// Internal error in the tracking runtime
    BadState,
    /// Not enough light
    InsufficientLight,
    /// Device moved too fast
    ExcessiveMotion,
    /// Not enough texture in view
    InsufficientFeatures,
    /// Camera is used by another client
    CameraUnavailable,
}

impl TrackingFailureReason {
    /// User-facing explanation, or `None` when there is no failure
    pub fn message(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::BadState => Some("Tracking lost due to bad internal state. Please try restarting the AR experience."),
            Self::InsufficientLight => Some("Too dark. Try moving to a well-lit area."),
            Self::ExcessiveMotion => Some("Moving too fast. Slow down."),
            Self::InsufficientFeatures => Some("Can't find anything. Aim device at a surface with more texture or color."),
            Self::CameraUnavailable => Some("Another app is using the camera. Tap on this app or try closing the other one."),
        }
    }
}

/// Affine map from normalized device coordinates to camera texture coordinates
///
/// `u = m[0]*x + m[1]*y + m[2]`, `v = m[3]*x + m[4]*y + m[5]`. Depends on
/// the display rotation and the camera image crop, so it changes only when
/// the display geometry changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayUvTransform(pub [f32; 6]);

impl Default for DisplayUvTransform {
    fn default() -> Self {
        // Unrotated display, texture origin top-left
        Self([0.5, 0.0, 0.5, 0.0, -0.5, 0.5])
    }
}

impl DisplayUvTransform {
    /// Map interleaved `(x, y)` NDC pairs to `(u, v)` pairs
    pub fn apply(&self, ndc: &[f32]) -> Vec<f32> {
        let m = &self.0;
        ndc.chunks_exact(2)
            .flat_map(|p| [m[0] * p[0] + m[1] * p[1] + m[2], m[3] * p[0] + m[4] * p[1] + m[5]])
            .collect()
    }
}

/// Pose-tracked camera for the current frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Tracking state of the device
    pub tracking_state: TrackingState,
    /// Reason tracking is paused, if any
    #[serde(default)]
    pub failure_reason: TrackingFailureReason,
    /// Physical camera pose in world space
    pub pose: Pose,
    /// Virtual camera pose aligned with the display orientation
    pub display_oriented_pose: Pose,
    /// Vertical field of view in radians
    pub fov_y: f32,
    /// Viewport aspect ratio (width / height)
    pub aspect: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            tracking_state: TrackingState::Paused,
            failure_reason: TrackingFailureReason::None,
            pose: Pose::IDENTITY,
            display_oriented_pose: Pose::IDENTITY,
            fov_y: 60f32.to_radians(),
            aspect: 9.0 / 16.0,
        }
    }
}

impl Camera {
    /// World-to-view matrix
    pub fn view_matrix(&self) -> Mat4 {
        self.display_oriented_pose.inverse().to_matrix()
    }

    /// View-to-clip matrix for the given clip planes
    pub fn projection_matrix(&self, z_near: f32, z_far: f32) -> Mat4 {
        utils::perspective_gl(self.fov_y, self.aspect, z_near, z_far)
    }

    /// Whether the camera is currently tracking
    pub fn is_tracking(&self) -> bool {
        self.tracking_state == TrackingState::Tracking
    }
}

/// Raw 16-bit depth image in millimetres
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthImage {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Row-major depth samples in millimetres, zero meaning "unknown"
    pub millimeters: Vec<u16>,
}

impl DepthImage {
    /// Width / height
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Pack samples into two 8-bit channels (low byte, high byte)
    pub fn to_rg8(&self) -> Vec<u8> {
        self.millimeters.iter().flat_map(|d| d.to_le_bytes()).collect()
    }

    /// Whether the sample count matches the dimensions
    pub fn is_well_formed(&self) -> bool {
        self.width > 0
            && self.height > 0
            && (self.width as usize).checked_mul(self.height as usize) == Some(self.millimeters.len())
    }
}

/// Identifier of an anchor, unique within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnchorId(pub u64);

/// A tracked pose in world space created by user interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    /// Identifier
    pub id: AnchorId,
    /// Current world pose
    pub pose: Pose,
    /// Current tracking state
    pub tracking_state: TrackingState,
}

/// Orientation class of a detected plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaneType {
    /// Floor, table top
    HorizontalUpwardFacing,
    /// Ceiling
    HorizontalDownwardFacing,
    /// Wall
    Vertical,
}

/// A detected planar surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    /// Identifier, stable across frames
    pub id: u64,
    /// Orientation class
    pub plane_type: PlaneType,
    /// Pose of the plane center; the plane normal is the local +Y axis
    pub center_pose: Pose,
    /// Boundary polygon as `(x, z)` pairs in the plane's local frame
    pub polygon: Vec<[f32; 2]>,
    /// Tracking state
    pub tracking_state: TrackingState,
    /// Plane this one was merged into, if any
    #[serde(default)]
    pub subsumed_by: Option<u64>,
}

impl Plane {
    /// Whether a world pose projects inside the boundary polygon
    pub fn is_pose_in_polygon(&self, pose: &Pose) -> bool {
        let local = self.center_pose.inverse().transform_point(pose.translation());
        point_in_polygon(local.x, local.z, &self.polygon)
    }

    /// Plane normal in world space
    pub fn normal(&self) -> Vec3 {
        self.center_pose.y_axis()
    }
}

/// Even-odd ray casting test
fn point_in_polygon(x: f32, z: f32, polygon: &[[f32; 2]]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let [xi, zi] = polygon[i];
        let [xj, zj] = polygon[j];
        if (zi > z) != (zj > z) && x < (xj - xi) * (z - zi) / (zj - zi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Feature points observed by the tracker
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointCloud {
    /// Acquisition timestamp in nanoseconds
    pub timestamp: i64,
    /// `(x, y, z, confidence)` in world space
    pub points: Vec<[f32; 4]>,
}

impl PointCloud {
    /// Flattened `x, y, z, confidence` stream for upload
    pub fn as_flat(&self) -> &[f32] {
        bytemuck::cast_slice(&self.points)
    }
}

/// Validity of a light estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LightEstimateState {
    /// No usable estimate this frame
    #[default]
    NotValid,
    /// Estimate is usable
    Valid,
}

/// Environmental HDR light estimate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LightEstimate {
    /// Validity
    pub state: LightEstimateState,
    /// Direction towards the main light, world space
    #[serde(default)]
    pub main_light_direction: [f32; 3],
    /// Main light intensity, linear RGB
    #[serde(default)]
    pub main_light_intensity: [f32; 3],
    /// Ambient spherical harmonics, 9 coefficients × 3 channels, coefficient-major
    #[serde(default)]
    pub ambient_spherical_harmonics: Vec<f32>,
}

impl LightEstimate {
    /// Whether the estimate can be used
    pub fn is_valid(&self) -> bool {
        self.state == LightEstimateState::Valid
    }
}

/// Snapshot of everything the tracker reports for one tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Camera image timestamp in nanoseconds; zero before the first camera frame
    pub timestamp: i64,
    /// Camera state and intrinsics
    pub camera: Camera,
    /// Depth image, absent when not yet available
    #[serde(default)]
    pub depth_image: Option<DepthImage>,
    /// All anchors known to the session with their current state
    #[serde(default)]
    pub anchors: Vec<Anchor>,
    /// Detected planes
    #[serde(default)]
    pub planes: Vec<Plane>,
    /// Feature points
    #[serde(default)]
    pub point_cloud: PointCloud,
    /// Lighting
    #[serde(default)]
    pub light_estimate: LightEstimate,
    /// Whether the display rotated or resized since the previous frame
    #[serde(default)]
    pub display_geometry_changed: bool,
    /// Current NDC-to-texture mapping for the camera image
    #[serde(default)]
    pub display_uv_transform: DisplayUvTransform,
}

impl Frame {
    /// Map NDC coordinates to camera texture coordinates
    pub fn transform_ndc_to_texture(&self, ndc: &[f32]) -> Vec<f32> {
        self.display_uv_transform.apply(ndc)
    }

    /// Depth image for this frame, if the tracker produced one
    pub fn acquire_depth_image(&self) -> Option<&DepthImage> {
        self.depth_image.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Quat;

    fn square_plane() -> Plane {
        Plane {
            id: 1,
            plane_type: PlaneType::HorizontalUpwardFacing,
            center_pose: Pose::from_translation(0.0, -1.0, -2.0),
            polygon: vec![[-0.5, -0.5], [0.5, -0.5], [0.5, 0.5], [-0.5, 0.5]],
            tracking_state: TrackingState::Tracking,
            subsumed_by: None,
        }
    }

    #[test]
    fn pose_inside_polygon() {
        let plane = square_plane();
        assert!(plane.is_pose_in_polygon(&Pose::from_translation(0.2, -1.0, -2.1)));
        assert!(!plane.is_pose_in_polygon(&Pose::from_translation(0.7, -1.0, -2.0)));
    }

    #[test]
    fn rotated_plane_polygon_uses_local_frame() {
        let mut plane = square_plane();
        plane.polygon = vec![[0.0, -0.1], [2.0, -0.1], [2.0, 0.1], [0.0, 0.1]];
        plane.center_pose = Pose::new(
            Vec3::zeros(),
            Quat::from_axis_angle(&Vec3::y_axis(), std::f32::consts::FRAC_PI_2),
        );
        // Local +X maps to world -Z after a quarter turn about Y
        assert!(plane.is_pose_in_polygon(&Pose::from_translation(0.0, 0.0, -1.5)));
        assert!(!plane.is_pose_in_polygon(&Pose::from_translation(1.5, 0.0, 0.0)));
    }

    #[test]
    fn default_uv_transform_maps_ndc_corners() {
        let uv = DisplayUvTransform::default().apply(&[-1.0, -1.0, 1.0, 1.0]);
        assert_eq!(uv, vec![0.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn depth_packs_little_endian() {
        let depth = DepthImage { width: 2, height: 1, millimeters: vec![0x0102, 1500] };
        assert_eq!(depth.to_rg8(), vec![0x02, 0x01, 0xdc, 0x05]);
        assert!(depth.is_well_formed());
        assert_eq!(depth.aspect_ratio(), 2.0);
    }

    #[test]
    fn oversized_depth_dimensions_are_malformed() {
        let depth = DepthImage { width: 70_000, height: 70_000, millimeters: vec![0; 16] };
        assert!(!depth.is_well_formed());
        let truncated = DepthImage { width: 4, height: 4, millimeters: vec![0; 15] };
        assert!(!truncated.is_well_formed());
    }

    #[test]
    fn failure_reason_messages() {
        assert!(TrackingFailureReason::None.message().is_none());
        assert!(TrackingFailureReason::ExcessiveMotion.message().is_some());
    }
}
