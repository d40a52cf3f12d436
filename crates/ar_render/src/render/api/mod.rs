//! Public rendering API
//!
//! The backend trait and the backend-neutral types that flow through it.

pub mod render_backend;
pub mod types;

// Re-export commonly used types
pub use render_backend::{BackendResult, CompiledShader, RenderBackend};
pub use types::{
    BlendFactor, BufferHandle, BufferKind, ClearFlags, ColorFormat, CullMode, DrawCall,
    FramebufferHandle, MeshHandle, PipelineState, PrimitiveMode, RenderTarget, ShaderHandle,
    TextureFormat, TextureHandle, TextureTarget, TextureUpload, UniformDecl, UniformKind,
    UniformMap, UniformValue, VertexBinding, WrapMode,
};
