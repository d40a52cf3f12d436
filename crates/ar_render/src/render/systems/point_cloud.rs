//! Feature point rendering

use crate::foundation::math::Mat4;
use crate::render::api::PrimitiveMode;
use crate::render::resources::{Mesh, RenderContext, Shader, VertexBuffer};
use crate::render::{RenderError, RenderResult};
use crate::tracking::PointCloud;

/// Draws the tracker's feature points as round sprites
///
/// Points are `(x, y, z, confidence)`. The vertex buffer is re-uploaded only
/// when a strictly newer point cloud arrives.
pub struct PointCloudRenderer {
    ctx: RenderContext,
    mesh: Mesh,
    shader: Shader,
    last_timestamp: Option<i64>,
}

impl PointCloudRenderer {
    /// Build the mesh and shader with the given point style
    pub fn new(ctx: &RenderContext, color: [f32; 4], point_size: f32) -> RenderResult<Self> {
        let mut shader = Shader::from_assets(ctx, "shaders/point_cloud.vert", "shaders/point_cloud.frag", None)?;
        shader.set_vec4("u_Color", color).set_float("u_PointSize", point_size);
        let mesh = Mesh::new(ctx, PrimitiveMode::Points, None, vec![VertexBuffer::new(ctx, 4, None)?])?;
        Ok(Self { ctx: ctx.clone(), mesh, shader, last_timestamp: None })
    }

    /// Upload `cloud` if it is newer than the last upload
    ///
    /// Returns whether an upload happened.
    pub fn update(&mut self, cloud: &PointCloud) -> RenderResult<bool> {
        if self.last_timestamp.is_some_and(|last| cloud.timestamp <= last) {
            return Ok(false);
        }
        self.mesh
            .vertex_buffer_mut(0)
            .ok_or_else(|| RenderError::RenderingFailed("point cloud mesh has no vertex buffer".to_string()))?
            .set(cloud.as_flat())?;
        self.last_timestamp = Some(cloud.timestamp);
        log::trace!("Uploaded {} feature points ({})", cloud.points.len(), cloud.timestamp);
        Ok(true)
    }

    /// Draw the last uploaded points
    pub fn draw(&mut self, view_projection: &Mat4) -> RenderResult<()> {
        self.shader.set_mat4("u_ModelViewProjection", view_projection);
        self.ctx.draw(&self.mesh, &self.shader)
    }

    /// Timestamp of the last uploaded cloud
    pub fn last_timestamp(&self) -> Option<i64> {
        self.last_timestamp
    }
}
