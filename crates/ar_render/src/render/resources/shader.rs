//! Owned shader programs with a validated uniform interface
//!
//! Uniform values are kept on the [`Shader`] and snapshotted into every draw,
//! so a value set once (a texture, a color) stays bound until replaced.
//! Each setter checks the name and type against the uniforms the compiled
//! program declares. A mismatch is a programming error: debug builds panic,
//! release builds log it and leave the shader unchanged.
//!
//! Setters return `&mut Self` so they chain:
//!
//! ```ignore
//! shader
//!     .set_texture("u_CameraColorTexture", &camera_texture)
//!     .set_depth_test(false)
//!     .set_depth_write(false);
//! ```

use std::collections::BTreeMap;

use crate::foundation::math::{utils, Mat4};
use crate::render::api::{
    BlendFactor, CullMode, PipelineState, ShaderHandle, UniformDecl, UniformMap, UniformValue,
};
use crate::render::RenderResult;

use super::{RenderContext, Texture};

/// Preprocessor defines injected after the `#version` line
pub type ShaderDefines = BTreeMap<String, String>;

/// A linked program plus its pipeline state and uniform values
pub struct Shader {
    ctx: RenderContext,
    handle: ShaderHandle,
    label: String,
    declared: Vec<UniformDecl>,
    uniforms: UniformMap,
    pipeline: PipelineState,
}

/// Insert `#define NAME VALUE` lines directly after the `#version` line
pub fn inject_defines(source: &str, defines: &ShaderDefines) -> String {
    if defines.is_empty() {
        return source.to_string();
    }
    let block: String = defines.iter().map(|(name, value)| format!("#define {} {}\n", name, value)).collect();

    let mut out = String::with_capacity(source.len() + block.len());
    let mut injected = false;
    for line in source.split_inclusive('\n') {
        out.push_str(line);
        if !injected && line.trim_start().starts_with("#version") {
            if !line.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&block);
            injected = true;
        }
    }
    if !injected {
        // No #version line; the backend will reject the source anyway
        return format!("{}{}", block, source);
    }
    out
}

impl Shader {
    /// Load, preprocess and compile a vertex/fragment pair of named assets
    pub fn from_assets(
        ctx: &RenderContext,
        vertex_name: &str,
        fragment_name: &str,
        defines: Option<&ShaderDefines>,
    ) -> RenderResult<Self> {
        let vertex = ctx.assets().read_to_string(vertex_name)?;
        let fragment = ctx.assets().read_to_string(fragment_name)?;
        let label = match defines {
            Some(d) if !d.is_empty() => format!("{} + {} {:?}", vertex_name, fragment_name, d),
            _ => format!("{} + {}", vertex_name, fragment_name),
        };
        Self::from_sources(ctx, &label, &vertex, &fragment, defines)
    }

    /// Preprocess and compile in-memory sources
    pub fn from_sources(
        ctx: &RenderContext,
        label: &str,
        vertex_source: &str,
        fragment_source: &str,
        defines: Option<&ShaderDefines>,
    ) -> RenderResult<Self> {
        let empty = ShaderDefines::new();
        let defines = defines.unwrap_or(&empty);
        let vertex = inject_defines(vertex_source, defines);
        let fragment = inject_defines(fragment_source, defines);

        let compiled = ctx.with_backend(|b| b.compile_shader(&vertex, &fragment))?;
        log::debug!("Compiled shader '{}' ({} uniforms)", label, compiled.uniforms.len());

        Ok(Self {
            ctx: ctx.clone(),
            handle: compiled.handle,
            label: label.to_string(),
            declared: compiled.uniforms,
            uniforms: UniformMap::new(),
            pipeline: PipelineState::default(),
        })
    }

    /// Backend handle
    pub fn handle(&self) -> ShaderHandle {
        self.handle
    }

    /// Asset names the shader was built from
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether the program declares an active uniform with this name
    pub fn declares(&self, name: &str) -> bool {
        self.declared.iter().any(|d| d.name == name)
    }

    /// Current value of a uniform
    pub fn uniform(&self, name: &str) -> Option<&UniformValue> {
        self.uniforms.get(name)
    }

    /// All set uniform values
    pub fn uniforms(&self) -> &UniformMap {
        &self.uniforms
    }

    /// Fixed-function state
    pub fn pipeline(&self) -> &PipelineState {
        &self.pipeline
    }

    /// Enable or disable depth testing
    pub fn set_depth_test(&mut self, enabled: bool) -> &mut Self {
        self.pipeline.depth_test = enabled;
        self
    }

    /// Enable or disable depth writes
    pub fn set_depth_write(&mut self, enabled: bool) -> &mut Self {
        self.pipeline.depth_write = enabled;
        self
    }

    /// Face culling
    pub fn set_cull_mode(&mut self, cull: CullMode) -> &mut Self {
        self.pipeline.cull = cull;
        self
    }

    /// Same blend factors for color and alpha
    pub fn set_blend(&mut self, src: BlendFactor, dst: BlendFactor) -> &mut Self {
        self.pipeline.blend = (src, dst, src, dst);
        self
    }

    /// Separate blend factors for color and alpha
    pub fn set_blend_separate(
        &mut self,
        src_rgb: BlendFactor,
        dst_rgb: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    ) -> &mut Self {
        self.pipeline.blend = (src_rgb, dst_rgb, src_alpha, dst_alpha);
        self
    }

    /// Bind a texture to a sampler uniform
    pub fn set_texture(&mut self, name: &str, texture: &Texture) -> &mut Self {
        self.set_uniform(name, UniformValue::Texture(texture.handle()))
    }

    /// Set a `bool` uniform
    pub fn set_bool(&mut self, name: &str, value: bool) -> &mut Self {
        self.set_uniform(name, UniformValue::Bool(value))
    }

    /// Set an `int` uniform
    pub fn set_int(&mut self, name: &str, value: i32) -> &mut Self {
        self.set_uniform(name, UniformValue::Int(value))
    }

    /// Set a `float` uniform
    pub fn set_float(&mut self, name: &str, value: f32) -> &mut Self {
        self.set_uniform(name, UniformValue::Float(value))
    }

    /// Set a `vec2` uniform
    pub fn set_vec2(&mut self, name: &str, value: [f32; 2]) -> &mut Self {
        self.set_uniform(name, UniformValue::Vec2(value))
    }

    /// Set a `vec3` uniform
    pub fn set_vec3(&mut self, name: &str, value: [f32; 3]) -> &mut Self {
        self.set_uniform(name, UniformValue::Vec3(value))
    }

    /// Set a `vec4` uniform
    pub fn set_vec4(&mut self, name: &str, value: [f32; 4]) -> &mut Self {
        self.set_uniform(name, UniformValue::Vec4(value))
    }

    /// Set a `mat4` uniform
    pub fn set_mat4(&mut self, name: &str, value: &Mat4) -> &mut Self {
        self.set_uniform(name, UniformValue::Mat4(utils::to_column_major(value)))
    }

    /// Set a `vec3[N]` uniform from `3 * k` floats, `k <= N`
    pub fn set_vec3_array(&mut self, name: &str, values: &[f32]) -> &mut Self {
        if values.len() % 3 != 0 {
            self.report(format!("'{}': {} floats is not a whole number of vec3", name, values.len()));
            return self;
        }
        let vectors = values.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();
        self.set_uniform(name, UniformValue::Vec3Array(vectors))
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) -> &mut Self {
        match self.declared.iter().find(|d| d.name == name) {
            None => self.report(format!("uniform '{}' is not declared", name)),
            Some(decl) if !value.matches(decl) => {
                let message = format!("uniform '{}' is declared as {:?}, got {:?}", name, decl.kind, value);
                self.report(message);
            }
            Some(_) => {
                self.uniforms.insert(name.to_string(), value);
            }
        }
        self
    }

    fn report(&self, message: String) {
        let message = format!("Shader '{}': {}", self.label, message);
        if cfg!(debug_assertions) {
            panic!("{}", message);
        }
        log::error!("{}", message);
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        let handle = self.handle;
        log::trace!("Releasing shader '{}'", self.label);
        self.ctx.release("shader", |b| b.release_shader(handle));
    }
}

impl std::fmt::Debug for Shader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shader")
            .field("label", &self.label)
            .field("handle", &self.handle)
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defines_follow_version_line() {
        let mut defines = ShaderDefines::new();
        defines.insert("USE_OCCLUSION".into(), "1".into());
        let out = inject_defines("#version 300 es\nprecision mediump float;\n", &defines);
        assert_eq!(out, "#version 300 es\n#define USE_OCCLUSION 1\nprecision mediump float;\n");
    }

    #[test]
    fn defines_without_trailing_newline() {
        let mut defines = ShaderDefines::new();
        defines.insert("A".into(), "0".into());
        defines.insert("B".into(), "2".into());
        assert_eq!(inject_defines("#version 300 es", &defines), "#version 300 es\n#define A 0\n#define B 2\n");
    }

    #[test]
    fn no_defines_leaves_source_alone() {
        let source = "#version 300 es\nvoid main() {}\n";
        assert_eq!(inject_defines(source, &ShaderDefines::new()), source);
    }
}
