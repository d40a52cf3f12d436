//! # Frame Renderer
//!
//! Drives one AR tick: pull a frame from the session, react to input and
//! settings, then draw every pass in order.
//!
//! ```text
//! session.update ─▶ depth settings ─▶ display geometry / depth upload ─▶ tap
//!      ─▶ status message ─▶ background ─▶ point cloud ─▶ planes
//!      ─▶ lighting ─▶ anchored objects (offscreen) ─▶ composite
//! ```
//!
//! Asset failures while building the passes are reported to the user and
//! the affected passes are skipped; the rest of the frame still renders.

use crate::app::UserNotifier;
use crate::core::{AppConfig, DepthSettings, RendererConfig};
use crate::placement::{handle_tap, AnchorStore, PlacementOutcome, TapQueue};
use crate::render::resources::{Framebuffer, RenderContext};
use crate::render::systems::{
    update_light_estimation, BackgroundRenderer, PlaneRenderer, PointCloudRenderer, VirtualObjectAssets,
    VirtualObjectRenderer,
};
use crate::render::{RenderError, RenderResult};
use crate::tracking::{DepthMode, Frame, SessionError, SessionHandle, TrackingState};

/// Shown while no plane is tracked yet
pub const SEARCHING_PLANE_MESSAGE: &str = "Searching for surfaces...";

/// Shown once planes are tracked but nothing is placed
pub const WAITING_FOR_TAP_MESSAGE: &str = "Tap on a surface to place an object.";

/// Everything a tick needs besides the renderer's own state
pub struct FrameServices<'a> {
    /// The session, if one exists
    pub session: Option<&'a mut SessionHandle>,
    /// Settings; depth toggles may change when the user answers a prompt
    pub config: &'a mut AppConfig,
    /// User-facing messages
    pub notifier: &'a mut dyn UserNotifier,
    /// Pending taps
    pub taps: &'a TapQueue,
}

/// Rendering surface callbacks
pub trait SurfaceRenderer {
    /// Build GPU resources; called once the surface exists
    fn on_surface_created(&mut self, services: &mut FrameServices<'_>);

    /// The surface was resized or rotated
    fn on_surface_changed(&mut self, services: &mut FrameServices<'_>, width: u32, height: u32);

    /// Render one frame
    fn on_draw_frame(&mut self, services: &mut FrameServices<'_>) -> RenderResult<()>;
}

/// What the last tick did, for hosts and tests
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    /// Whether the session produced a frame
    pub updated: bool,
    /// Whether the camera background was drawn
    pub background_drawn: bool,
    /// Whether the 3D passes ran
    pub scene_drawn: bool,
    /// Planes drawn
    pub planes_drawn: usize,
    /// Anchored objects drawn
    pub objects_drawn: usize,
    /// Outcome of the tap handled this tick
    pub placement: Option<PlacementOutcome>,
}

struct PendingGeometry {
    rotation_degrees: u32,
    width: u32,
    height: u32,
}

/// The AR frame renderer
pub struct ArFrameRenderer {
    ctx: RenderContext,
    renderer_config: RendererConfig,
    background: Option<BackgroundRenderer>,
    point_cloud: Option<PointCloudRenderer>,
    planes: Option<PlaneRenderer>,
    objects: Option<VirtualObjectRenderer>,
    virtual_scene: Option<Framebuffer>,
    anchors: AnchorStore,
    has_set_texture_names: bool,
    display_rotation: u32,
    pending_geometry: Option<PendingGeometry>,
    last_report: FrameReport,
}

impl ArFrameRenderer {
    /// Create a renderer; resources are built in [`SurfaceRenderer::on_surface_created`]
    pub fn new(ctx: &RenderContext, renderer_config: &RendererConfig) -> Self {
        Self {
            ctx: ctx.clone(),
            renderer_config: renderer_config.clone(),
            background: None,
            point_cloud: None,
            planes: None,
            objects: None,
            virtual_scene: None,
            anchors: AnchorStore::default(),
            has_set_texture_names: false,
            display_rotation: 0,
            pending_geometry: None,
            last_report: FrameReport::default(),
        }
    }

    /// Placed anchors
    pub fn anchors(&self) -> &AnchorStore {
        &self.anchors
    }

    /// What the last tick did
    pub fn last_report(&self) -> &FrameReport {
        &self.last_report
    }

    /// Background compositor, once built
    pub fn background(&self) -> Option<&BackgroundRenderer> {
        self.background.as_ref()
    }

    /// Record a display rotation; forwarded to the session on the next tick
    pub fn set_display_rotation(&mut self, rotation_degrees: u32) {
        self.display_rotation = rotation_degrees;
        self.queue_display_geometry();
    }

    /// Forget everything tied to the previous session
    ///
    /// Anchors belong to the session that created them, and a new session
    /// needs the camera texture and display geometry again.
    pub fn on_session_replaced(&mut self) {
        if !self.anchors.is_empty() {
            log::info!("Session replaced; dropping {} anchors", self.anchors.len());
        }
        self.anchors.clear();
        self.has_set_texture_names = false;
        self.queue_display_geometry();
    }

    fn queue_display_geometry(&mut self) {
        if let Some(pending) = self.pending_geometry.as_mut() {
            pending.rotation_degrees = self.display_rotation;
        } else if let Some(fb) = &self.virtual_scene {
            let (width, height) = fb.size();
            self.pending_geometry = Some(PendingGeometry { rotation_degrees: self.display_rotation, width, height });
        }
    }

    fn build<T>(
        &self,
        what: &str,
        notifier: &mut dyn UserNotifier,
        build: impl FnOnce(&RenderContext) -> RenderResult<T>,
    ) -> Option<T> {
        match build(&self.ctx) {
            Ok(value) => Some(value),
            Err(e) => {
                log::error!("Failed to create {}: {}", what, e);
                notify_failure(notifier, &e);
                None
            }
        }
    }

    fn apply_depth_settings(&mut self, depth: &DepthSettings) -> RenderResult<()> {
        if let Some(background) = self.background.as_mut() {
            background.set_use_depth_visualization(depth.depth_color_visualization_enabled())?;
            background.set_use_occlusion(depth.use_depth_for_occlusion())?;
        }
        Ok(())
    }

    fn draw_frame(&mut self, session: &mut SessionHandle, services: &mut FrameServices<'_>) -> RenderResult<()> {
        if !self.has_set_texture_names {
            if let Some(background) = &self.background {
                session.set_camera_texture_name(background.camera_color_texture().handle().0);
                self.has_set_texture_names = true;
            }
        }
        if let Some(geometry) = self.pending_geometry.take() {
            session.set_display_geometry(geometry.rotation_degrees, geometry.width, geometry.height);
        }

        let frame = match session.update() {
            Ok(frame) => frame,
            Err(SessionError::CameraNotAvailable) => {
                log::error!("Camera not available during on_draw_frame");
                services.notifier.show_error(&SessionError::CameraNotAvailable.to_string());
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        self.last_report.updated = true;
        let camera = &frame.camera;

        match self.apply_depth_settings(&services.config.depth) {
            Ok(()) => {}
            Err(e) if e.is_asset_failure() => {
                log::error!("Failed to read a required asset file: {}", e);
                notify_failure(services.notifier, &e);
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        if let Some(background) = self.background.as_mut() {
            background.update_display_geometry(&frame)?;
            if camera.is_tracking() && services.config.depth.needs_depth_image() {
                // Depth usually lags the first tracked frames; nothing to upload yet
                if let Some(depth) = frame.acquire_depth_image() {
                    background.update_camera_depth_texture(depth)?;
                }
            }
        }

        self.anchors.sync(&frame);
        if let Some(tap) = services.taps.poll() {
            let outcome = handle_tap(
                &frame,
                session,
                tap,
                &services.config.instant_placement,
                self.renderer_config.approximate_distance_meters,
                &mut self.anchors,
            )?;
            if outcome.is_placed() {
                offer_depth_if_needed(session, &mut services.config.depth, services.notifier);
            }
            self.last_report.placement = Some(outcome);
        }

        let planes = session.all_planes();
        match status_message(&frame, planes.iter().any(|p| p.tracking_state == TrackingState::Tracking), &self.anchors) {
            Some(message) => services.notifier.show_message(message),
            None => services.notifier.hide(),
        }

        if frame.timestamp != 0 {
            // No camera image yet; the texture may hold a previous session's image
            if let Some(background) = &self.background {
                background.draw_background()?;
                self.last_report.background_drawn = true;
            }
        }

        if camera.tracking_state == TrackingState::Paused {
            return Ok(());
        }
        self.last_report.scene_drawn = true;

        let z_near = services.config.renderer.z_near;
        let z_far = services.config.renderer.z_far;
        let projection = camera.projection_matrix(z_near, z_far);
        let view = camera.view_matrix();

        if let Some(point_cloud) = self.point_cloud.as_mut() {
            point_cloud.update(&frame.point_cloud)?;
            point_cloud.draw(&(projection * view))?;
        }

        if let Some(plane_renderer) = self.planes.as_mut() {
            self.last_report.planes_drawn =
                plane_renderer.draw_planes(&planes, &camera.display_oriented_pose, &view, &projection)?;
        }

        if let (Some(objects), Some(framebuffer)) = (self.objects.as_mut(), self.virtual_scene.as_ref()) {
            update_light_estimation(objects.shader_mut(), &frame.light_estimate, &view)?;
            self.last_report.objects_drawn = objects.draw_anchors(self.anchors.iter(), &view, &projection, framebuffer)?;
        }

        if let (Some(background), Some(framebuffer)) = (self.background.as_mut(), self.virtual_scene.as_ref()) {
            background.draw_virtual_scene(framebuffer, z_near, z_far)?;
        }
        Ok(())
    }
}

impl SurfaceRenderer for ArFrameRenderer {
    fn on_surface_created(&mut self, services: &mut FrameServices<'_>) {
        let point_color = self.renderer_config.point_cloud_color;
        let point_size = self.renderer_config.point_size;

        self.background = self.build("background renderer", services.notifier, BackgroundRenderer::new);
        self.planes = self.build("plane renderer", services.notifier, PlaneRenderer::new);
        self.virtual_scene = self.build("virtual scene framebuffer", services.notifier, |ctx| Framebuffer::new(ctx, 1, 1));
        self.point_cloud = self.build("point cloud renderer", services.notifier, |ctx| {
            PointCloudRenderer::new(ctx, point_color, point_size)
        });
        self.objects = self.build("virtual object renderer", services.notifier, |ctx| {
            VirtualObjectRenderer::new(ctx, VirtualObjectAssets::default())
        });
        log::info!("Surface created");
    }

    fn on_surface_changed(&mut self, _services: &mut FrameServices<'_>, width: u32, height: u32) {
        self.ctx.set_viewport(width, height);
        if let Some(framebuffer) = self.virtual_scene.as_mut() {
            if let Err(e) = framebuffer.resize(width, height) {
                log::error!("Failed to resize virtual scene framebuffer: {}", e);
            }
        }
        self.pending_geometry = Some(PendingGeometry { rotation_degrees: self.display_rotation, width, height });
        log::debug!("Surface changed to {}x{}", width, height);
    }

    fn on_draw_frame(&mut self, services: &mut FrameServices<'_>) -> RenderResult<()> {
        self.last_report = FrameReport::default();
        let Some(session) = services.session.take() else {
            return Ok(());
        };
        let result = self.draw_frame(session, services);
        if let Err(e) = &result {
            log::error!("Frame failed: {}", e);
        }
        result
    }
}

/// Status for the current frame, or `None` to hide
pub fn status_message(frame: &Frame, has_tracking_plane: bool, anchors: &AnchorStore) -> Option<&'static str> {
    let camera = &frame.camera;
    if camera.tracking_state == TrackingState::Paused {
        return Some(camera.failure_reason.message().unwrap_or(SEARCHING_PLANE_MESSAGE));
    }
    if !has_tracking_plane {
        return Some(SEARCHING_PLANE_MESSAGE);
    }
    anchors.is_empty().then_some(WAITING_FOR_TAP_MESSAGE)
}

/// After a placement, offer depth occlusion once on devices that support it
fn offer_depth_if_needed(session: &SessionHandle, depth: &mut DepthSettings, notifier: &mut dyn UserNotifier) {
    if !session.is_depth_mode_supported(DepthMode::Automatic) || !depth.should_show_depth_enable_dialog() {
        return;
    }
    let accepted = notifier.offer_depth_occlusion();
    depth.set_use_depth_for_occlusion(accepted);
    log::info!("Depth occlusion {}", if accepted { "enabled" } else { "declined" });
}

fn notify_failure(notifier: &mut dyn UserNotifier, error: &RenderError) {
    if error.is_asset_failure() {
        notifier.show_error(&format!("Failed to read a required asset file: {}", error));
    } else {
        notifier.show_error(&error.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::{Camera, TrackingFailureReason};

    fn frame(tracking_state: TrackingState, failure_reason: TrackingFailureReason) -> Frame {
        Frame {
            camera: Camera { tracking_state, failure_reason, ..Default::default() },
            ..Default::default()
        }
    }

    #[test]
    fn paused_camera_reports_searching_or_failure() {
        let anchors = AnchorStore::default();
        let paused = frame(TrackingState::Paused, TrackingFailureReason::None);
        assert_eq!(status_message(&paused, true, &anchors), Some(SEARCHING_PLANE_MESSAGE));

        let dark = frame(TrackingState::Paused, TrackingFailureReason::InsufficientLight);
        assert_eq!(status_message(&dark, true, &anchors), TrackingFailureReason::InsufficientLight.message());
    }

    #[test]
    fn tracking_status_depends_on_planes_and_anchors() {
        let mut anchors = AnchorStore::default();
        let tracking = frame(TrackingState::Tracking, TrackingFailureReason::None);
        assert_eq!(status_message(&tracking, false, &anchors), Some(SEARCHING_PLANE_MESSAGE));
        assert_eq!(status_message(&tracking, true, &anchors), Some(WAITING_FOR_TAP_MESSAGE));

        anchors.push(
            crate::tracking::Anchor {
                id: crate::tracking::AnchorId(1),
                pose: Default::default(),
                tracking_state: TrackingState::Tracking,
            },
            |_| {},
        );
        assert_eq!(status_message(&tracking, true, &anchors), None);
    }
}
