//! Backend abstraction trait for the rendering system
//!
//! This module defines the trait that rendering backends must implement to
//! provide a consistent interface for the resource layer and the frame
//! renderer. All calls happen on the render thread.

use super::types::{
    BufferHandle, BufferKind, ClearFlags, DrawCall, FramebufferHandle, MeshHandle, PrimitiveMode,
    RenderTarget, ShaderHandle, TextureHandle, TextureTarget, TextureUpload, UniformDecl,
    VertexBinding, WrapMode,
};
use crate::render::RenderError;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, RenderError>;

/// A linked program and the uniforms it declares
#[derive(Debug, Clone)]
pub struct CompiledShader {
    /// Program handle
    pub handle: ShaderHandle,
    /// Active uniform declarations
    pub uniforms: Vec<UniformDecl>,
}

/// Main rendering backend trait
///
/// Abstracts over graphics APIs. Every `create_*` call returns an opaque
/// handle; every handle must be released exactly once through the matching
/// `release_*` call. Using a released handle is an error.
pub trait RenderBackend {
    /// Short backend name for logging
    fn name(&self) -> &'static str;

    /// Create an empty texture
    fn create_texture(&mut self, target: TextureTarget, wrap: WrapMode) -> BackendResult<TextureHandle>;

    /// Replace a texture's storage and contents
    fn upload_texture(&mut self, texture: TextureHandle, upload: TextureUpload<'_>) -> BackendResult<()>;

    /// Release a texture
    fn release_texture(&mut self, texture: TextureHandle) -> BackendResult<()>;

    /// Create a buffer with initial contents (may be empty)
    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> BackendResult<BufferHandle>;

    /// Replace a buffer's contents
    fn upload_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> BackendResult<()>;

    /// Release a buffer
    fn release_buffer(&mut self, buffer: BufferHandle) -> BackendResult<()>;

    /// Bind vertex buffers and an optional index buffer into a mesh
    fn create_mesh(
        &mut self,
        mode: PrimitiveMode,
        vertex_buffers: &[VertexBinding],
        index_buffer: Option<BufferHandle>,
    ) -> BackendResult<MeshHandle>;

    /// Release a mesh; its buffers are released separately
    fn release_mesh(&mut self, mesh: MeshHandle) -> BackendResult<()>;

    /// Compile and link a program from preprocessed GLSL sources
    fn compile_shader(&mut self, vertex_source: &str, fragment_source: &str) -> BackendResult<CompiledShader>;

    /// Release a program
    fn release_shader(&mut self, shader: ShaderHandle) -> BackendResult<()>;

    /// Create a framebuffer rendering into the given color and depth textures
    fn create_framebuffer(
        &mut self,
        color: TextureHandle,
        depth: TextureHandle,
        width: u32,
        height: u32,
    ) -> BackendResult<FramebufferHandle>;

    /// Reallocate a framebuffer's attachments at a new size
    fn resize_framebuffer(&mut self, framebuffer: FramebufferHandle, width: u32, height: u32) -> BackendResult<()>;

    /// Release a framebuffer; its textures are released separately
    fn release_framebuffer(&mut self, framebuffer: FramebufferHandle) -> BackendResult<()>;

    /// Set the screen viewport size
    fn set_viewport(&mut self, width: u32, height: u32);

    /// Current screen viewport size
    fn viewport(&self) -> (u32, u32);

    /// Clear a target
    fn clear(&mut self, target: RenderTarget, flags: ClearFlags, color: [f32; 4]) -> BackendResult<()>;

    /// Issue one draw
    fn draw(&mut self, call: DrawCall<'_>) -> BackendResult<()>;

    /// Downcast to the concrete backend type for inspection
    fn as_any(&self) -> &dyn std::any::Any;

    /// Downcast to the mutable concrete backend type for inspection
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}
