//! Backend-neutral resource descriptions
//!
//! Handles are opaque `u64` newtypes minted by a [`RenderBackend`]. They
//! carry no ownership; the RAII wrappers in [`crate::render::resources`]
//! own them and release them on drop.
//!
//! [`RenderBackend`]: super::RenderBackend

use std::collections::BTreeMap;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Handle to a texture stored in the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TextureHandle(pub u64);

/// Handle to a vertex or index buffer stored in the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub u64);

/// Handle to a mesh (buffer bindings plus primitive mode)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshHandle(pub u64);

/// Handle to a linked shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderHandle(pub u64);

/// Handle to an off-screen framebuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FramebufferHandle(pub u64);

/// Texture binding target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureTarget {
    /// Regular 2D texture
    Texture2D,
    /// Camera image stream written by the tracking runtime
    ExternalCamera,
}

/// Texture coordinate wrapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapMode {
    /// Clamp to the border texel
    ClampToEdge,
    /// Mirror on every repeat
    MirroredRepeat,
    /// Tile
    Repeat,
}

/// How color texel values are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorFormat {
    /// Values are linear
    Linear,
    /// Values are sRGB-encoded and decoded on sampling
    Srgb,
}

/// Texel storage layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    /// Four 8-bit channels
    Rgba8,
    /// Two 8-bit channels
    Rg8,
    /// 24-bit depth attachment
    Depth24,
}

impl TextureFormat {
    /// Bytes per texel
    pub fn bytes_per_texel(self) -> usize {
        match self {
            Self::Rgba8 => 4,
            Self::Rg8 => 2,
            Self::Depth24 => 4,
        }
    }
}

/// Pixel data for a texture upload
#[derive(Debug, Clone, Copy)]
pub struct TextureUpload<'a> {
    /// Width in texels
    pub width: u32,
    /// Height in texels
    pub height: u32,
    /// Storage layout
    pub format: TextureFormat,
    /// Color interpretation
    pub color_format: ColorFormat,
    /// Row-major texel bytes
    pub data: &'a [u8],
}

/// Kind of GPU buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    /// Per-vertex `f32` attributes
    Vertex,
    /// `u32` element indices
    Index,
}

/// One vertex buffer bound to a mesh attribute slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexBinding {
    /// Buffer holding the attribute
    pub buffer: BufferHandle,
    /// `f32` components per vertex
    pub components: u32,
}

/// How vertices are assembled into primitives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveMode {
    /// Independent points
    Points,
    /// Connected line segments
    LineStrip,
    /// Closed line loop
    LineLoop,
    /// Independent triangles
    Triangles,
    /// Triangle strip
    TriangleStrip,
    /// Triangle fan
    TriangleFan,
}

/// Blend equation factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlendFactor {
    /// 0
    Zero,
    /// 1
    One,
    /// Source color
    SrcColor,
    /// 1 - source color
    OneMinusSrcColor,
    /// Destination color
    DstColor,
    /// 1 - destination color
    OneMinusDstColor,
    /// Source alpha
    SrcAlpha,
    /// 1 - source alpha
    OneMinusSrcAlpha,
    /// Destination alpha
    DstAlpha,
    /// 1 - destination alpha
    OneMinusDstAlpha,
}

/// Face culling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CullMode {
    /// Draw both faces
    None,
    /// Cull back faces
    Back,
    /// Cull front faces
    Front,
}

/// Fixed-function state applied while a shader draws
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineState {
    /// Depth test enabled
    pub depth_test: bool,
    /// Depth writes enabled
    pub depth_write: bool,
    /// Color blend factors `(src_rgb, dst_rgb, src_alpha, dst_alpha)`
    pub blend: (BlendFactor, BlendFactor, BlendFactor, BlendFactor),
    /// Face culling
    pub cull: CullMode,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            depth_test: true,
            depth_write: true,
            blend: (BlendFactor::One, BlendFactor::Zero, BlendFactor::One, BlendFactor::Zero),
            cull: CullMode::Back,
        }
    }
}

/// Declared type of a shader uniform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    /// `float`
    Float,
    /// `int`
    Int,
    /// `bool`
    Bool,
    /// `vec2`
    Vec2,
    /// `vec3`
    Vec3,
    /// `vec4`
    Vec4,
    /// `mat3`
    Mat3,
    /// `mat4`
    Mat4,
    /// `sampler2D`
    Sampler2D,
    /// `samplerExternalOES`
    SamplerExternal,
}

impl UniformKind {
    /// Parse a GLSL type name
    pub fn from_glsl(name: &str) -> Option<Self> {
        Some(match name {
            "float" => Self::Float,
            "int" => Self::Int,
            "bool" => Self::Bool,
            "vec2" => Self::Vec2,
            "vec3" => Self::Vec3,
            "vec4" => Self::Vec4,
            "mat3" => Self::Mat3,
            "mat4" => Self::Mat4,
            "sampler2D" => Self::Sampler2D,
            "samplerExternalOES" => Self::SamplerExternal,
            _ => return None,
        })
    }

    /// Whether this is a texture sampler
    pub fn is_sampler(self) -> bool {
        matches!(self, Self::Sampler2D | Self::SamplerExternal)
    }
}

/// A uniform declared by a compiled program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformDecl {
    /// GLSL name
    pub name: String,
    /// Declared type
    pub kind: UniformKind,
    /// Element count for arrays
    pub array_len: Option<usize>,
}

/// Value of a uniform as stored on a shader and captured by a draw
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    /// `float`
    Float(f32),
    /// `int`
    Int(i32),
    /// `bool`
    Bool(bool),
    /// `vec2`
    Vec2([f32; 2]),
    /// `vec3`
    Vec3([f32; 3]),
    /// `vec4`
    Vec4([f32; 4]),
    /// `mat4`, column-major
    Mat4([f32; 16]),
    /// `vec3[N]`
    Vec3Array(Vec<[f32; 3]>),
    /// Any sampler
    Texture(TextureHandle),
}

impl UniformValue {
    /// Whether this value can be assigned to a declaration
    pub fn matches(&self, decl: &UniformDecl) -> bool {
        match (self, decl.kind, decl.array_len) {
            (Self::Float(_), UniformKind::Float, None) => true,
            (Self::Int(_), UniformKind::Int, None) => true,
            (Self::Bool(_), UniformKind::Bool, None) => true,
            (Self::Vec2(_), UniformKind::Vec2, None) => true,
            (Self::Vec3(_), UniformKind::Vec3, None) => true,
            (Self::Vec4(_), UniformKind::Vec4, None) => true,
            (Self::Mat4(_), UniformKind::Mat4, None) => true,
            (Self::Vec3Array(values), UniformKind::Vec3, Some(len)) => values.len() <= len,
            (Self::Texture(_), kind, None) => kind.is_sampler(),
            _ => false,
        }
    }
}

/// Uniform values keyed by name
pub type UniformMap = BTreeMap<String, UniformValue>;

bitflags! {
    /// Which buffers a clear touches
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u32 {
        /// Color attachment
        const COLOR = 0b01;
        /// Depth attachment
        const DEPTH = 0b10;
    }
}

/// Where a draw or clear lands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTarget {
    /// The default framebuffer
    Screen,
    /// An off-screen framebuffer
    Framebuffer(FramebufferHandle),
}

/// Everything the backend needs to issue one draw
#[derive(Debug, Clone, Copy)]
pub struct DrawCall<'a> {
    /// Geometry
    pub mesh: MeshHandle,
    /// Program
    pub shader: ShaderHandle,
    /// Fixed-function state
    pub pipeline: PipelineState,
    /// Uniform values to bind
    pub uniforms: &'a UniformMap,
    /// Destination
    pub target: RenderTarget,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(kind: UniformKind, array_len: Option<usize>) -> UniformDecl {
        UniformDecl { name: "u".into(), kind, array_len }
    }

    #[test]
    fn textures_match_any_sampler() {
        let value = UniformValue::Texture(TextureHandle(1));
        assert!(value.matches(&decl(UniformKind::Sampler2D, None)));
        assert!(value.matches(&decl(UniformKind::SamplerExternal, None)));
        assert!(!value.matches(&decl(UniformKind::Vec4, None)));
    }

    #[test]
    fn vec3_arrays_respect_declared_length() {
        let value = UniformValue::Vec3Array(vec![[0.0; 3]; 9]);
        assert!(value.matches(&decl(UniformKind::Vec3, Some(9))));
        assert!(!value.matches(&decl(UniformKind::Vec3, Some(4))));
        assert!(!value.matches(&decl(UniformKind::Vec3, None)));
    }

    #[test]
    fn clear_flags_combine() {
        let flags = ClearFlags::COLOR | ClearFlags::DEPTH;
        assert!(flags.contains(ClearFlags::DEPTH));
        assert_eq!(ClearFlags::all(), flags);
    }
}
