//! # Tracking
//!
//! Data produced by the AR tracking runtime once per tick, and the session
//! interface used to query it. The runtime itself (world tracking, plane
//! and depth estimation) is external; [`replay::ReplaySession`] plays back a
//! recorded session for the viewer and for tests.

pub mod frame;
pub mod hit;
pub mod session;
pub mod replay;

pub use frame::{
    Anchor, AnchorId, Camera, DepthImage, DisplayUvTransform, Frame, LightEstimate,
    LightEstimateState, Plane, PlaneType, PointCloud, TrackingFailureReason, TrackingState,
};
pub use hit::{HitResult, InstantPlacementMethod, PointOrientationMode, Tap, Trackable};
pub use session::{
    DepthMode, InstantPlacementMode, LightEstimationMode, SessionConfig, SessionError,
    SessionHandle, SessionState, TrackingSession,
};
pub use replay::{FrameRecord, ReplayRecording, ReplaySession, ReplayStep};
