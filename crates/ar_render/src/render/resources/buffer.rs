//! Owned vertex and index buffers
//!
//! Contents are `f32` attributes or `u32` indices, cast to bytes with
//! `bytemuck` for upload.

use crate::render::api::{BufferHandle, BufferKind};
use crate::render::{RenderError, RenderResult};

use super::RenderContext;

/// Per-vertex `f32` attribute data with a fixed component count
pub struct VertexBuffer {
    ctx: RenderContext,
    handle: BufferHandle,
    components: u32,
    len: usize,
}

impl VertexBuffer {
    /// Create a buffer with `components` floats per vertex and optional initial data
    pub fn new(ctx: &RenderContext, components: u32, entries: Option<&[f32]>) -> RenderResult<Self> {
        if components == 0 {
            return Err(RenderError::InvalidArgument("vertex buffer needs at least one component".to_string()));
        }
        let entries = entries.unwrap_or(&[]);
        check_multiple(entries.len(), components)?;
        let handle = ctx.with_backend(|b| b.create_buffer(BufferKind::Vertex, bytemuck::cast_slice(entries)))?;
        Ok(Self { ctx: ctx.clone(), handle, components, len: entries.len() })
    }

    /// Replace the contents
    pub fn set(&mut self, entries: &[f32]) -> RenderResult<()> {
        check_multiple(entries.len(), self.components)?;
        self.ctx.with_backend(|b| b.upload_buffer(self.handle, bytemuck::cast_slice(entries)))?;
        self.len = entries.len();
        Ok(())
    }

    /// Floats per vertex
    pub fn components(&self) -> u32 {
        self.components
    }

    /// Number of vertices currently stored
    pub fn vertex_count(&self) -> usize {
        self.len / self.components as usize
    }

    /// Backend handle
    pub fn handle(&self) -> BufferHandle {
        self.handle
    }
}

fn check_multiple(len: usize, components: u32) -> RenderResult<()> {
    if len % components as usize != 0 {
        return Err(RenderError::InvalidArgument(format!(
            "{} entries is not a multiple of {} components per vertex",
            len, components
        )));
    }
    Ok(())
}

impl Drop for VertexBuffer {
    fn drop(&mut self) {
        let handle = self.handle;
        self.ctx.release("vertex buffer", |b| b.release_buffer(handle));
    }
}

/// `u32` element indices
pub struct IndexBuffer {
    ctx: RenderContext,
    handle: BufferHandle,
    len: usize,
}

impl IndexBuffer {
    /// Create an index buffer with optional initial data
    pub fn new(ctx: &RenderContext, entries: Option<&[u32]>) -> RenderResult<Self> {
        let entries = entries.unwrap_or(&[]);
        let handle = ctx.with_backend(|b| b.create_buffer(BufferKind::Index, bytemuck::cast_slice(entries)))?;
        Ok(Self { ctx: ctx.clone(), handle, len: entries.len() })
    }

    /// Replace the contents
    pub fn set(&mut self, entries: &[u32]) -> RenderResult<()> {
        self.ctx.with_backend(|b| b.upload_buffer(self.handle, bytemuck::cast_slice(entries)))?;
        self.len = entries.len();
        Ok(())
    }

    /// Number of indices
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer holds no indices
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Backend handle
    pub fn handle(&self) -> BufferHandle {
        self.handle
    }
}

impl Drop for IndexBuffer {
    fn drop(&mut self) {
        let handle = self.handle;
        self.ctx.release("index buffer", |b| b.release_buffer(handle));
    }
}
