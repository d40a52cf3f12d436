//! Hit testing types

use serde::{Deserialize, Serialize};

use crate::foundation::math::Pose;

use super::frame::Plane;

/// A screen tap in view pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tap {
    /// Horizontal position in pixels
    pub x: f32,
    /// Vertical position in pixels
    pub y: f32,
}

/// How a feature point's orientation was determined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointOrientationMode {
    /// Orientation is the identity; no surface information
    InitializedToIdentity,
    /// Orientation follows an estimated surface normal
    EstimatedSurfaceNormal,
}

/// How an instant placement point is currently tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstantPlacementMethod {
    /// Not tracked
    NotTracking,
    /// Screen-space position with an assumed distance
    ScreenspaceWithApproximateDistance,
    /// Fully tracked in 3D
    FullTracking,
}

/// Entity a hit test ray intersected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Trackable {
    /// A detected plane
    Plane(Plane),
    /// A feature point
    Point {
        /// Orientation source
        orientation_mode: PointOrientationMode,
    },
    /// An instant placement point
    InstantPlacementPoint {
        /// Tracking method
        tracking_method: InstantPlacementMethod,
    },
}

/// One hit test intersection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitResult {
    /// Pose of the intersection
    pub hit_pose: Pose,
    /// Distance from the camera in metres
    pub distance: f32,
    /// What was hit
    pub trackable: Trackable,
}
