//! # Rendering System
//!
//! Per-frame composition of an AR view over a pluggable backend.
//!
//! ## Architecture
//!
//! - **api**: the backend-agnostic [`RenderBackend`](api::RenderBackend) trait
//!   and the plain data it consumes (handles, pipeline state, uniforms)
//! - **backends**: backend implementations; [`HeadlessBackend`](backends::HeadlessBackend)
//!   keeps everything in memory and records each draw
//! - **resources**: RAII wrappers (textures, buffers, meshes, shaders,
//!   framebuffers) sharing one [`RenderContext`](resources::RenderContext)
//! - **systems**: the individual passes: camera background, depth
//!   occlusion composite, point cloud, planes, lighting and anchored objects
//! - **frame_renderer**: the tick driver that sequences the passes for one
//!   frame
//!
//! ## Frame Order
//!
//! ```text
//! background ─▶ point cloud ─▶ planes ─▶ virtual scene (offscreen) ─▶ composite
//! ```
//!
//! Everything here runs on the render thread. Resources are `!Send`.

use thiserror::Error;

use crate::assets::AssetError;
use crate::tracking::SessionError;

pub mod api;
pub mod backends;
pub mod resources;
pub mod systems;
pub mod frame_renderer;


pub use frame_renderer::{ArFrameRenderer, FrameReport, FrameServices, SurfaceRenderer};
pub use systems::LightingError;

/// Rendering errors
#[derive(Error, Debug)]
pub enum RenderError {
    /// Renderer initialization failed during setup
    #[error("Renderer initialization failed: {0}")]
    InitializationFailed(String),

    /// A rendering operation failed during execution
    #[error("Rendering failed: {0}")]
    RenderingFailed(String),

    /// A handle was used after release or never existed
    #[error("Invalid {kind} handle {id}")]
    InvalidHandle {
        /// Resource kind, e.g. "texture"
        kind: &'static str,
        /// Raw handle value
        id: u64,
    },

    /// Arguments rejected before reaching the backend
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A shader program failed to preprocess, compile or link
    #[error("Shader compilation failed: {0}")]
    ShaderCompilation(String),

    /// A named asset could not be read or decoded
    #[error("Asset load failed: {0}")]
    AssetLoad(#[from] AssetError),

    /// Malformed light estimate
    #[error("Lighting error: {0}")]
    Lighting(#[from] LightingError),

    /// Tracking session failure surfaced during a tick
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Backend-specific error occurred
    #[error("Backend error: {0}")]
    BackendError(String),
}

impl RenderError {
    /// Whether this is an asset failure (missing/undecodable asset or a
    /// shader that does not compile), reported to the user as such
    pub fn is_asset_failure(&self) -> bool {
        matches!(self, Self::AssetLoad(_) | Self::ShaderCompilation(_))
    }
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
