//! # Tap-to-Anchor Placement
//!
//! Turns a screen tap into an anchor on the first acceptable hit:
//!
//! - a **plane**, hit inside its boundary polygon, with the camera in front of it
//! - a **feature point** whose orientation follows an estimated surface normal
//! - any **instant placement point**
//!
//! Hits arrive sorted nearest first, so only the closest acceptable hit is
//! used.

pub mod anchors;
pub mod tap_queue;

pub use anchors::{AnchorStore, MAX_ANCHORS};
pub use tap_queue::{TapQueue, TAP_QUEUE_CAPACITY};

use crate::core::InstantPlacementSettings;
use crate::foundation::math::Pose;
use crate::render::systems::calculate_distance_to_plane;
use crate::tracking::{
    AnchorId, Frame, HitResult, PointOrientationMode, SessionError, SessionHandle, Tap, Trackable,
};

/// Assumed distance to the surface for instant placement hit tests
pub const APPROXIMATE_DISTANCE_METERS: f32 = 2.0;

/// What a tap did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementOutcome {
    /// The camera was not tracking; the tap was dropped
    NotTracking,
    /// No hit qualified for an anchor
    NoAcceptableHit,
    /// A new anchor was created
    Placed {
        /// The new anchor
        anchor: AnchorId,
        /// Oldest anchor evicted to make room
        evicted: Option<AnchorId>,
    },
}

impl PlacementOutcome {
    /// Whether an anchor was created
    pub fn is_placed(&self) -> bool {
        matches!(self, Self::Placed { .. })
    }
}

/// Whether a hit may receive an anchor
pub fn is_hit_acceptable(hit: &HitResult, camera_pose: &Pose) -> bool {
    match &hit.trackable {
        Trackable::Plane(plane) => {
            plane.is_pose_in_polygon(&hit.hit_pose) && calculate_distance_to_plane(&hit.hit_pose, camera_pose) > 0.0
        }
        Trackable::Point { orientation_mode } => *orientation_mode == PointOrientationMode::EstimatedSurfaceNormal,
        Trackable::InstantPlacementPoint { .. } => true,
    }
}

/// Hit test a tap and anchor the first acceptable hit
///
/// Taps are ignored unless the camera is tracking. With instant placement
/// enabled the hit test assumes `approximate_distance` metres to the
/// surface. When the store is full its oldest anchor is detached from the
/// session before the new one is created.
pub fn handle_tap(
    frame: &Frame,
    session: &mut SessionHandle,
    tap: Tap,
    instant_placement: &InstantPlacementSettings,
    approximate_distance: f32,
    anchors: &mut AnchorStore,
) -> Result<PlacementOutcome, SessionError> {
    if !frame.camera.is_tracking() {
        log::debug!("Ignoring tap at ({}, {}): camera not tracking", tap.x, tap.y);
        return Ok(PlacementOutcome::NotTracking);
    }

    let hits = if instant_placement.is_instant_placement_enabled() {
        session.hit_test_instant_placement(frame, tap, approximate_distance)
    } else {
        session.hit_test(frame, tap)
    };
    let Some(hit) = hits.iter().find(|hit| is_hit_acceptable(hit, &frame.camera.pose)) else {
        log::debug!("No acceptable hit among {} results", hits.len());
        return Ok(PlacementOutcome::NoAcceptableHit);
    };

    let evicted = anchors.evict_if_full(|oldest| session.detach_anchor(oldest));
    let anchor = session.create_anchor(hit.hit_pose)?;
    let id = anchor.id;
    anchors.push(anchor, |_| {});
    log::info!("Placed anchor {:?} ({} live)", id, anchors.len());
    Ok(PlacementOutcome::Placed { anchor: id, evicted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::{
        Camera, FrameRecord, InstantPlacementMethod, Plane, PlaneType, ReplayRecording, ReplaySession, ReplayStep,
        SessionConfig, TrackingState, InstantPlacementMode,
    };

    fn floor() -> Plane {
        Plane {
            id: 7,
            plane_type: PlaneType::HorizontalUpwardFacing,
            center_pose: Pose::from_translation(0.0, -1.0, -1.0),
            polygon: vec![[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]],
            tracking_state: TrackingState::Tracking,
            subsumed_by: None,
        }
    }

    fn plane_hit(x: f32) -> HitResult {
        HitResult {
            hit_pose: Pose::from_translation(x, -1.0, -1.0),
            distance: 1.4,
            trackable: Trackable::Plane(floor()),
        }
    }

    fn point_hit(orientation_mode: PointOrientationMode) -> HitResult {
        HitResult {
            hit_pose: Pose::from_translation(0.0, 0.0, -0.5),
            distance: 0.5,
            trackable: Trackable::Point { orientation_mode },
        }
    }

    fn tracking_frame() -> Frame {
        Frame {
            timestamp: 1,
            camera: Camera { tracking_state: TrackingState::Tracking, ..Default::default() },
            ..Default::default()
        }
    }

    fn session_with_hits(hits: Vec<HitResult>, tracking: bool) -> (SessionHandle, Frame) {
        let mut frame = tracking_frame();
        if !tracking {
            frame.camera.tracking_state = TrackingState::Paused;
        }
        let record = FrameRecord { frame, hits, instant_hits: Vec::new() };
        let recording = ReplayRecording { looping: true, steps: vec![ReplayStep::Frame(record)], ..Default::default() };
        let mut session = SessionHandle::new(Box::new(ReplaySession::new(recording)));
        session.resume().unwrap();
        let frame = session.update().unwrap();
        (session, frame)
    }

    #[test]
    fn plane_hits_need_polygon_and_front_side() {
        assert!(is_hit_acceptable(&plane_hit(0.0), &Pose::IDENTITY));
        // Outside the polygon
        assert!(!is_hit_acceptable(&plane_hit(5.0), &Pose::IDENTITY));
        // Camera below the floor
        assert!(!is_hit_acceptable(&plane_hit(0.0), &Pose::from_translation(0.0, -2.0, 0.0)));
    }

    #[test]
    fn point_hits_need_surface_normal() {
        assert!(is_hit_acceptable(&point_hit(PointOrientationMode::EstimatedSurfaceNormal), &Pose::IDENTITY));
        assert!(!is_hit_acceptable(&point_hit(PointOrientationMode::InitializedToIdentity), &Pose::IDENTITY));
        let instant = HitResult {
            hit_pose: Pose::IDENTITY,
            distance: 2.0,
            trackable: Trackable::InstantPlacementPoint { tracking_method: InstantPlacementMethod::NotTracking },
        };
        assert!(is_hit_acceptable(&instant, &Pose::IDENTITY));
    }

    #[test]
    fn first_acceptable_hit_wins() {
        let hits = vec![point_hit(PointOrientationMode::InitializedToIdentity), plane_hit(0.25), plane_hit(-0.5)];
        let (mut session, frame) = session_with_hits(hits, true);
        let mut store = AnchorStore::default();
        let outcome = handle_tap(&frame, &mut session, Tap { x: 1.0, y: 1.0 }, &Default::default(), 2.0, &mut store)
            .unwrap();
        assert!(outcome.is_placed());
        assert_eq!(store.len(), 1);
        assert_eq!(store.iter().next().map(|a| a.pose.translation[0]), Some(0.25));
    }

    #[test]
    fn taps_are_ignored_while_not_tracking() {
        let (mut session, frame) = session_with_hits(vec![plane_hit(0.0)], false);
        let mut store = AnchorStore::default();
        let outcome = handle_tap(&frame, &mut session, Tap { x: 0.0, y: 0.0 }, &Default::default(), 2.0, &mut store)
            .unwrap();
        assert_eq!(outcome, PlacementOutcome::NotTracking);
        assert!(store.is_empty());
    }

    #[test]
    fn unacceptable_hits_place_nothing() {
        let (mut session, frame) = session_with_hits(vec![plane_hit(9.0)], true);
        let mut store = AnchorStore::default();
        let outcome = handle_tap(&frame, &mut session, Tap { x: 0.0, y: 0.0 }, &Default::default(), 2.0, &mut store)
            .unwrap();
        assert_eq!(outcome, PlacementOutcome::NoAcceptableHit);
    }

    #[test]
    fn full_store_detaches_the_oldest_session_anchor() {
        let (mut session, frame) = session_with_hits(vec![plane_hit(0.0)], true);
        let mut store = AnchorStore::with_capacity(2);
        let tap = Tap { x: 0.0, y: 0.0 };
        for _ in 0..3 {
            handle_tap(&frame, &mut session, tap, &Default::default(), 2.0, &mut store).unwrap();
        }
        assert_eq!(store.ids(), vec![AnchorId(2), AnchorId(3)]);
        assert_eq!(session.anchor_state(AnchorId(1)), None);
        assert_eq!(session.anchor_state(AnchorId(3)), Some(TrackingState::Tracking));
    }

    #[test]
    fn instant_placement_uses_approximate_distance() {
        let (mut session, frame) = session_with_hits(Vec::new(), true);
        session
            .configure(SessionConfig { instant_placement_mode: InstantPlacementMode::LocalYUp, ..Default::default() })
            .unwrap();
        let mut settings = InstantPlacementSettings::default();
        settings.set_instant_placement_enabled(true);
        let mut store = AnchorStore::default();

        let outcome = handle_tap(
            &frame,
            &mut session,
            Tap { x: 0.0, y: 0.0 },
            &settings,
            APPROXIMATE_DISTANCE_METERS,
            &mut store,
        )
        .unwrap();
        assert!(outcome.is_placed());
        assert_eq!(store.iter().next().map(|a| a.pose.translation), Some([0.0, 0.0, -2.0]));
    }
}
