//! Detected plane rendering
//!
//! Each visible plane is drawn as a translucent grid. The boundary polygon
//! is fanned around its centroid; the centroid is opaque and the boundary
//! fades out, so overlapping planes blend smoothly.

use crate::foundation::math::{Mat4, Pose};
use crate::render::api::{BlendFactor, CullMode, PrimitiveMode};
use crate::render::resources::{Mesh, RenderContext, Shader, VertexBuffer};
use crate::render::{RenderError, RenderResult};
use crate::tracking::{Plane, TrackingState};

/// Colors assigned to planes by id
pub const PLANE_COLORS: [[f32; 4]; 6] = [
    [1.0, 1.0, 1.0, 1.0],
    [0.96, 0.26, 0.21, 1.0],
    [0.61, 0.15, 0.69, 1.0],
    [0.25, 0.32, 0.71, 1.0],
    [0.01, 0.66, 0.96, 1.0],
    [0.3, 0.69, 0.31, 1.0],
];

const CENTER_ALPHA: f32 = 1.0;
const EDGE_ALPHA: f32 = 0.0;

/// Signed distance from the plane to the camera along the plane normal
///
/// Positive when the camera is on the side the normal points to.
pub fn calculate_distance_to_plane(plane_pose: &Pose, camera_pose: &Pose) -> f32 {
    let normal = plane_pose.y_axis();
    (camera_pose.translation() - plane_pose.translation()).dot(&normal)
}

/// Color for a plane id
pub fn plane_color(id: u64) -> [f32; 4] {
    PLANE_COLORS[(id % PLANE_COLORS.len() as u64) as usize]
}

/// Fan-triangulate a boundary polygon around its centroid
///
/// Output is a triangle fan of `(x, z, alpha)` vertices: the centroid,
/// every boundary vertex, then the first boundary vertex again to close
/// the fan. Degenerate polygons (fewer than 3 vertices) yield nothing.
pub fn triangulate_plane(polygon: &[[f32; 2]]) -> Vec<f32> {
    if polygon.len() < 3 {
        return Vec::new();
    }
    let n = polygon.len() as f32;
    let (sx, sz) = polygon.iter().fold((0.0, 0.0), |(x, z), p| (x + p[0], z + p[1]));

    let mut vertices = Vec::with_capacity((polygon.len() + 2) * 3);
    vertices.extend_from_slice(&[sx / n, sz / n, CENTER_ALPHA]);
    for p in polygon.iter().chain(std::iter::once(&polygon[0])) {
        vertices.extend_from_slice(&[p[0], p[1], EDGE_ALPHA]);
    }
    vertices
}

/// Planes worth drawing, farthest first
///
/// Drops planes that are not tracking or were merged into another plane.
pub fn visible_planes_back_to_front<'a>(planes: &'a [Plane], camera_pose: &Pose) -> Vec<&'a Plane> {
    let mut visible: Vec<(&Plane, f32)> = planes
        .iter()
        .filter(|p| p.tracking_state == TrackingState::Tracking && p.subsumed_by.is_none())
        .map(|p| (p, calculate_distance_to_plane(&p.center_pose, camera_pose).abs()))
        .collect();
    visible.sort_by(|a, b| b.1.total_cmp(&a.1));
    visible.into_iter().map(|(p, _)| p).collect()
}

/// Draws detected planes
pub struct PlaneRenderer {
    ctx: RenderContext,
    mesh: Mesh,
    shader: Shader,
}

impl PlaneRenderer {
    /// Build the shader and a streaming mesh
    pub fn new(ctx: &RenderContext) -> RenderResult<Self> {
        let mut shader = Shader::from_assets(ctx, "shaders/plane.vert", "shaders/plane.frag", None)?;
        shader
            .set_blend(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha)
            .set_depth_write(false)
            .set_cull_mode(CullMode::None);
        let mesh = Mesh::new(ctx, PrimitiveMode::TriangleFan, None, vec![VertexBuffer::new(ctx, 3, None)?])?;
        Ok(Self { ctx: ctx.clone(), mesh, shader })
    }

    /// Draw every visible plane back to front
    ///
    /// Returns the number of planes drawn.
    pub fn draw_planes(
        &mut self,
        planes: &[Plane],
        camera_pose: &Pose,
        view: &Mat4,
        projection: &Mat4,
    ) -> RenderResult<usize> {
        let mut drawn = 0;
        for plane in visible_planes_back_to_front(planes, camera_pose) {
            let vertices = triangulate_plane(&plane.polygon);
            if vertices.is_empty() {
                log::trace!("Skipping degenerate plane {}", plane.id);
                continue;
            }
            self.mesh
                .vertex_buffer_mut(0)
                .ok_or_else(|| RenderError::RenderingFailed("plane mesh has no vertex buffer".to_string()))?
                .set(&vertices)?;

            let model = plane.center_pose.to_matrix();
            let normal = plane.normal();
            self.shader
                .set_mat4("u_Model", &model)
                .set_mat4("u_ModelViewProjection", &(projection * view * model))
                .set_vec3("u_Normal", [normal.x, normal.y, normal.z])
                .set_vec4("u_Color", plane_color(plane.id));
            self.ctx.draw(&self.mesh, &self.shader)?;
            drawn += 1;
        }
        Ok(drawn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Quat, Vec3};
    use crate::render::api::UniformValue;
    use crate::render::backends::HeadlessBackend;
    use crate::render::systems::test_support::context;
    use crate::tracking::PlaneType;
    use approx::assert_relative_eq;

    fn plane(id: u64, y: f32) -> Plane {
        Plane {
            id,
            plane_type: PlaneType::HorizontalUpwardFacing,
            center_pose: Pose::from_translation(0.0, y, -1.0),
            polygon: vec![[-0.5, -0.5], [0.5, -0.5], [0.5, 0.5], [-0.5, 0.5]],
            tracking_state: TrackingState::Tracking,
            subsumed_by: None,
        }
    }

    #[test]
    fn distance_is_signed_along_the_normal() {
        let floor = Pose::from_translation(0.0, -1.5, 0.0);
        assert_relative_eq!(calculate_distance_to_plane(&floor, &Pose::IDENTITY), 1.5);

        let ceiling = Pose::new(
            Vec3::new(0.0, 1.0, 0.0),
            Quat::from_axis_angle(&Vec3::x_axis(), std::f32::consts::PI),
        );
        assert_relative_eq!(calculate_distance_to_plane(&ceiling, &Pose::IDENTITY), 1.0, epsilon = 1e-5);
        assert_relative_eq!(
            calculate_distance_to_plane(&ceiling, &Pose::from_translation(0.0, 3.0, 0.0)),
            -2.0,
            epsilon = 1e-5
        );
    }

    #[test]
    fn fan_starts_at_centroid_and_closes() {
        let vertices = triangulate_plane(&[[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0]]);
        assert_eq!(vertices.len(), 6 * 3);
        assert_eq!(&vertices[..3], &[1.0, 1.0, CENTER_ALPHA]);
        assert_eq!(&vertices[3..6], &vertices[15..18]);
        assert!(triangulate_plane(&[[0.0, 0.0], [1.0, 0.0]]).is_empty());
    }

    #[test]
    fn hidden_planes_are_filtered_and_rest_sorted() {
        let mut paused = plane(2, -0.5);
        paused.tracking_state = TrackingState::Paused;
        let mut merged = plane(3, -0.5);
        merged.subsumed_by = Some(1);
        let planes = vec![plane(1, -0.5), paused, merged, plane(4, -2.0)];

        let order: Vec<u64> = visible_planes_back_to_front(&planes, &Pose::IDENTITY).iter().map(|p| p.id).collect();
        assert_eq!(order, vec![4, 1]);
    }

    #[test]
    fn palette_wraps_by_id() {
        assert_eq!(plane_color(0), plane_color(PLANE_COLORS.len() as u64));
        assert_ne!(plane_color(0), plane_color(1));
    }

    #[test]
    fn draws_one_call_per_visible_plane() {
        let ctx = context();
        let mut renderer = PlaneRenderer::new(&ctx).unwrap();
        let mut degenerate = plane(9, -1.0);
        degenerate.polygon.truncate(2);
        let planes = vec![plane(1, -0.5), plane(2, -3.0), degenerate];

        let drawn = renderer.draw_planes(&planes, &Pose::IDENTITY, &Mat4::identity(), &Mat4::identity()).unwrap();
        assert_eq!(drawn, 2);

        let draws: Vec<_> = ctx.inspect_backend(|b: &HeadlessBackend| b.draws().cloned().collect()).unwrap();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].uniform("u_Color"), Some(&UniformValue::Vec4(plane_color(2))));
        assert_eq!(draws[0].vertex_count, 6);
        assert!(!draws[0].pipeline.depth_write);
        assert_eq!(draws[1].uniform("u_Normal"), Some(&UniformValue::Vec3([0.0, 1.0, 0.0])));
    }
}
