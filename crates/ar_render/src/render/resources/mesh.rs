//! Owned meshes
//!
//! A [`Mesh`] binds one or more [`VertexBuffer`]s (one per attribute
//! location, in order) and an optional [`IndexBuffer`]. The mesh owns its
//! buffers; dropping it releases the binding first and then the buffers.

use crate::assets::ObjLoader;
use crate::render::api::{MeshHandle, PrimitiveMode, VertexBinding};
use crate::render::{RenderError, RenderResult};

use super::{IndexBuffer, RenderContext, VertexBuffer};

/// Geometry ready to draw
pub struct Mesh {
    ctx: RenderContext,
    handle: MeshHandle,
    mode: PrimitiveMode,
    // Field drops run after `Drop::drop` has released the binding
    vertex_buffers: Vec<VertexBuffer>,
    index_buffer: Option<IndexBuffer>,
}

impl Mesh {
    /// Bind buffers into a mesh
    pub fn new(
        ctx: &RenderContext,
        mode: PrimitiveMode,
        index_buffer: Option<IndexBuffer>,
        vertex_buffers: Vec<VertexBuffer>,
    ) -> RenderResult<Self> {
        if vertex_buffers.is_empty() {
            return Err(RenderError::InvalidArgument("mesh needs at least one vertex buffer".to_string()));
        }
        let bindings: Vec<VertexBinding> = vertex_buffers
            .iter()
            .map(|vb| VertexBinding { buffer: vb.handle(), components: vb.components() })
            .collect();
        let index = index_buffer.as_ref().map(IndexBuffer::handle);
        let handle = ctx.with_backend(|b| b.create_mesh(mode, &bindings, index))?;
        Ok(Self { ctx: ctx.clone(), handle, mode, vertex_buffers, index_buffer })
    }

    /// Load a Wavefront OBJ asset as an indexed triangle mesh
    ///
    /// Attribute locations: 0 = position (xyz), 1 = texture coordinate (uv),
    /// 2 = normal (xyz).
    pub fn from_asset(ctx: &RenderContext, name: &str) -> RenderResult<Self> {
        let obj = ObjLoader::load(ctx.assets(), name)?;
        let positions: Vec<f32> = obj.positions.iter().flatten().copied().collect();
        let tex_coords: Vec<f32> = obj.tex_coords.iter().flatten().copied().collect();
        let normals: Vec<f32> = obj.normals.iter().flatten().copied().collect();

        let vertex_buffers = vec![
            VertexBuffer::new(ctx, 3, Some(&positions))?,
            VertexBuffer::new(ctx, 2, Some(&tex_coords))?,
            VertexBuffer::new(ctx, 3, Some(&normals))?,
        ];
        let index_buffer = IndexBuffer::new(ctx, Some(&obj.indices))?;
        log::debug!(
            "Mesh '{}': {} vertices, {} triangles",
            name,
            obj.vertex_count(),
            obj.indices.len() / 3
        );
        Self::new(ctx, PrimitiveMode::Triangles, Some(index_buffer), vertex_buffers)
    }

    /// Backend handle
    pub fn handle(&self) -> MeshHandle {
        self.handle
    }

    /// Primitive assembly mode
    pub fn mode(&self) -> PrimitiveMode {
        self.mode
    }

    /// Vertex buffer bound at an attribute location
    pub fn vertex_buffer(&self, location: usize) -> Option<&VertexBuffer> {
        self.vertex_buffers.get(location)
    }

    /// Mutable access, for streaming attributes
    pub fn vertex_buffer_mut(&mut self, location: usize) -> Option<&mut VertexBuffer> {
        self.vertex_buffers.get_mut(location)
    }

    /// Index buffer, for indexed meshes
    pub fn index_buffer(&self) -> Option<&IndexBuffer> {
        self.index_buffer.as_ref()
    }
}

impl Drop for Mesh {
    fn drop(&mut self) {
        let handle = self.handle;
        self.ctx.release("mesh", |b| b.release_mesh(handle));
    }
}
