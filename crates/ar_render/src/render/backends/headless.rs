//! Headless rendering backend
//!
//! A complete in-memory [`RenderBackend`]. Resource contents live in slot
//! maps, so a released handle never resolves again even if its slot is
//! reused. Shaders go through the GLSL front end in [`super::glsl`].
//! Every clear and draw is appended to a command log together with the
//! uniform snapshot and pipeline state it was issued with, which is what the
//! viewer prints and what tests assert on.

use crate::foundation::collections::{key_to_raw, raw_to_key, HandleMap};
use crate::render::api::{
    BackendResult, BufferHandle, BufferKind, ClearFlags, ColorFormat, CompiledShader, DrawCall,
    FramebufferHandle, MeshHandle, PipelineState, PrimitiveMode, RenderBackend, RenderTarget,
    ShaderHandle, TextureFormat, TextureHandle, TextureTarget, TextureUpload, UniformDecl,
    UniformMap, UniformValue, VertexBinding, WrapMode,
};
use crate::render::RenderError;

use super::glsl::{self, Stage};

/// Stored texture
#[derive(Debug, Clone)]
pub struct TextureRecord {
    /// Binding target
    pub target: TextureTarget,
    /// Wrap mode
    pub wrap: WrapMode,
    /// Width in texels (0 until first upload)
    pub width: u32,
    /// Height in texels
    pub height: u32,
    /// Storage layout
    pub format: TextureFormat,
    /// Color interpretation
    pub color_format: ColorFormat,
    /// Texel bytes
    pub data: Vec<u8>,
    /// Number of uploads so far
    pub uploads: usize,
}

/// Stored buffer
#[derive(Debug, Clone)]
pub struct BufferRecord {
    /// Vertex or index
    pub kind: BufferKind,
    /// Contents
    pub data: Vec<u8>,
    /// Number of `upload_buffer` calls so far
    pub uploads: usize,
}

#[derive(Debug, Clone)]
struct MeshRecord {
    mode: PrimitiveMode,
    vertex_buffers: Vec<VertexBinding>,
    index_buffer: Option<BufferHandle>,
}

#[derive(Debug, Clone)]
struct ShaderRecord {
    uniforms: Vec<UniformDecl>,
}

#[derive(Debug, Clone)]
struct FramebufferRecord {
    color: TextureHandle,
    depth: TextureHandle,
    width: u32,
    height: u32,
}

/// One recorded draw
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    /// Geometry
    pub mesh: MeshHandle,
    /// Program
    pub shader: ShaderHandle,
    /// Destination
    pub target: RenderTarget,
    /// Fixed-function state
    pub pipeline: PipelineState,
    /// Primitive assembly
    pub primitive: PrimitiveMode,
    /// Vertices available in the bound buffers
    pub vertex_count: usize,
    /// Indices drawn, for indexed meshes
    pub index_count: Option<usize>,
    /// Uniform values at draw time
    pub uniforms: UniformMap,
}

impl DrawRecord {
    /// Uniform value by name
    pub fn uniform(&self, name: &str) -> Option<&UniformValue> {
        self.uniforms.get(name)
    }
}

/// One recorded command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// A clear
    Clear {
        /// Destination
        target: RenderTarget,
        /// Cleared attachments
        flags: ClearFlags,
        /// Clear color
        color: [f32; 4],
    },
    /// A draw
    Draw(DrawRecord),
}

impl Command {
    /// The draw record, if this is a draw
    pub fn as_draw(&self) -> Option<&DrawRecord> {
        match self {
            Command::Draw(draw) => Some(draw),
            Command::Clear { .. } => None,
        }
    }
}

/// Running totals since the backend was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendStats {
    /// Textures created
    pub textures_created: usize,
    /// Texture uploads
    pub texture_uploads: usize,
    /// Buffer content replacements
    pub buffer_uploads: usize,
    /// Successful shader compilations
    pub shaders_compiled: usize,
    /// Shaders released
    pub shaders_released: usize,
    /// Draws recorded
    pub draws: usize,
    /// Clears recorded
    pub clears: usize,
}

/// Counts of resources not yet released
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiveResources {
    /// Textures
    pub textures: usize,
    /// Buffers
    pub buffers: usize,
    /// Meshes
    pub meshes: usize,
    /// Shaders
    pub shaders: usize,
    /// Framebuffers
    pub framebuffers: usize,
}

impl LiveResources {
    /// Sum over all kinds
    pub fn total(&self) -> usize {
        self.textures + self.buffers + self.meshes + self.shaders + self.framebuffers
    }
}

/// In-memory backend
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    textures: HandleMap<TextureRecord>,
    buffers: HandleMap<BufferRecord>,
    meshes: HandleMap<MeshRecord>,
    shaders: HandleMap<ShaderRecord>,
    framebuffers: HandleMap<FramebufferRecord>,
    viewport: (u32, u32),
    commands: Vec<Command>,
    stats: BackendStats,
}

fn invalid(kind: &'static str, id: u64) -> RenderError {
    RenderError::InvalidHandle { kind, id }
}

impl HeadlessBackend {
    /// Create an empty backend with a 1x1 viewport
    pub fn new() -> Self {
        Self { viewport: (1, 1), ..Default::default() }
    }

    /// Recorded commands since the last [`take_commands`](Self::take_commands)
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Drain the command log
    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    /// Recorded draws only
    pub fn draws(&self) -> impl Iterator<Item = &DrawRecord> {
        self.commands.iter().filter_map(Command::as_draw)
    }

    /// Running totals
    pub fn stats(&self) -> BackendStats {
        self.stats
    }

    /// Resources not yet released
    pub fn live_resources(&self) -> LiveResources {
        LiveResources {
            textures: self.textures.len(),
            buffers: self.buffers.len(),
            meshes: self.meshes.len(),
            shaders: self.shaders.len(),
            framebuffers: self.framebuffers.len(),
        }
    }

    /// Inspect a texture
    pub fn texture(&self, texture: TextureHandle) -> Option<&TextureRecord> {
        self.textures.get(raw_to_key(texture.0))
    }

    /// Inspect a buffer
    pub fn buffer(&self, buffer: BufferHandle) -> Option<&BufferRecord> {
        self.buffers.get(raw_to_key(buffer.0))
    }

    /// Buffer contents as `f32` values
    pub fn buffer_floats(&self, buffer: BufferHandle) -> Option<Vec<f32>> {
        self.buffer(buffer).map(|b| {
            b.data
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect()
        })
    }

    /// Vertex buffers bound to a mesh
    pub fn mesh_bindings(&self, mesh: MeshHandle) -> Option<&[VertexBinding]> {
        self.meshes.get(raw_to_key(mesh.0)).map(|m| m.vertex_buffers.as_slice())
    }

    /// Size of a framebuffer
    pub fn framebuffer_size(&self, framebuffer: FramebufferHandle) -> Option<(u32, u32)> {
        self.framebuffers.get(raw_to_key(framebuffer.0)).map(|f| (f.width, f.height))
    }

    /// Uniforms a program declares
    pub fn shader_uniforms(&self, shader: ShaderHandle) -> Option<&[UniformDecl]> {
        self.shaders.get(raw_to_key(shader.0)).map(|s| s.uniforms.as_slice())
    }

    fn texture_mut(&mut self, texture: TextureHandle) -> BackendResult<&mut TextureRecord> {
        self.textures.get_mut(raw_to_key(texture.0)).ok_or_else(|| invalid("texture", texture.0))
    }

    fn allocate_attachment(&mut self, texture: TextureHandle, format: TextureFormat, width: u32, height: u32) -> BackendResult<()> {
        let record = self.texture_mut(texture)?;
        record.width = width;
        record.height = height;
        record.format = format;
        record.data = vec![0; width as usize * height as usize * format.bytes_per_texel()];
        Ok(())
    }

    fn vertex_count(&self, mesh: &MeshRecord) -> BackendResult<usize> {
        let mut count: Option<usize> = None;
        for binding in &mesh.vertex_buffers {
            let buffer = self.buffers.get(raw_to_key(binding.buffer.0)).ok_or_else(|| invalid("buffer", binding.buffer.0))?;
            let vertices = buffer.data.len() / 4 / binding.components.max(1) as usize;
            count = Some(count.map_or(vertices, |c| c.min(vertices)));
        }
        Ok(count.unwrap_or(0))
    }

    fn check_target(&self, target: RenderTarget) -> BackendResult<()> {
        match target {
            RenderTarget::Screen => Ok(()),
            RenderTarget::Framebuffer(fb) => self
                .framebuffers
                .get(raw_to_key(fb.0))
                .map(|_| ())
                .ok_or_else(|| invalid("framebuffer", fb.0)),
        }
    }
}

impl RenderBackend for HeadlessBackend {
    fn name(&self) -> &'static str {
        "headless"
    }

    fn create_texture(&mut self, target: TextureTarget, wrap: WrapMode) -> BackendResult<TextureHandle> {
        let key = self.textures.insert(TextureRecord {
            target,
            wrap,
            width: 0,
            height: 0,
            format: TextureFormat::Rgba8,
            color_format: ColorFormat::Linear,
            data: Vec::new(),
            uploads: 0,
        });
        self.stats.textures_created += 1;
        Ok(TextureHandle(key_to_raw(key)))
    }

    fn upload_texture(&mut self, texture: TextureHandle, upload: TextureUpload<'_>) -> BackendResult<()> {
        let expected = upload.width as usize * upload.height as usize * upload.format.bytes_per_texel();
        if upload.data.len() != expected {
            return Err(RenderError::InvalidArgument(format!(
                "texture upload of {}x{} {:?} needs {} bytes, got {}",
                upload.width,
                upload.height,
                upload.format,
                expected,
                upload.data.len()
            )));
        }
        let record = self.texture_mut(texture)?;
        record.width = upload.width;
        record.height = upload.height;
        record.format = upload.format;
        record.color_format = upload.color_format;
        record.data = upload.data.to_vec();
        record.uploads += 1;
        self.stats.texture_uploads += 1;
        Ok(())
    }

    fn release_texture(&mut self, texture: TextureHandle) -> BackendResult<()> {
        self.textures.remove(raw_to_key(texture.0)).map(|_| ()).ok_or_else(|| invalid("texture", texture.0))
    }

    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> BackendResult<BufferHandle> {
        if data.len() % 4 != 0 {
            return Err(RenderError::InvalidArgument(format!("buffer size {} is not a multiple of 4", data.len())));
        }
        let key = self.buffers.insert(BufferRecord { kind, data: data.to_vec(), uploads: 0 });
        Ok(BufferHandle(key_to_raw(key)))
    }

    fn upload_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> BackendResult<()> {
        if data.len() % 4 != 0 {
            return Err(RenderError::InvalidArgument(format!("buffer size {} is not a multiple of 4", data.len())));
        }
        let record = self.buffers.get_mut(raw_to_key(buffer.0)).ok_or_else(|| invalid("buffer", buffer.0))?;
        record.data.clear();
        record.data.extend_from_slice(data);
        record.uploads += 1;
        self.stats.buffer_uploads += 1;
        Ok(())
    }

    fn release_buffer(&mut self, buffer: BufferHandle) -> BackendResult<()> {
        self.buffers.remove(raw_to_key(buffer.0)).map(|_| ()).ok_or_else(|| invalid("buffer", buffer.0))
    }

    fn create_mesh(
        &mut self,
        mode: PrimitiveMode,
        vertex_buffers: &[VertexBinding],
        index_buffer: Option<BufferHandle>,
    ) -> BackendResult<MeshHandle> {
        if vertex_buffers.is_empty() {
            return Err(RenderError::InvalidArgument("mesh needs at least one vertex buffer".to_string()));
        }
        for binding in vertex_buffers {
            match self.buffer(binding.buffer) {
                Some(b) if b.kind == BufferKind::Vertex => {}
                Some(_) => return Err(RenderError::InvalidArgument("index buffer bound as vertex buffer".to_string())),
                None => return Err(invalid("buffer", binding.buffer.0)),
            }
        }
        if let Some(index) = index_buffer {
            match self.buffer(index) {
                Some(b) if b.kind == BufferKind::Index => {}
                Some(_) => return Err(RenderError::InvalidArgument("vertex buffer bound as index buffer".to_string())),
                None => return Err(invalid("buffer", index.0)),
            }
        }
        let key = self.meshes.insert(MeshRecord {
            mode,
            vertex_buffers: vertex_buffers.to_vec(),
            index_buffer,
        });
        Ok(MeshHandle(key_to_raw(key)))
    }

    fn release_mesh(&mut self, mesh: MeshHandle) -> BackendResult<()> {
        self.meshes.remove(raw_to_key(mesh.0)).map(|_| ()).ok_or_else(|| invalid("mesh", mesh.0))
    }

    fn compile_shader(&mut self, vertex_source: &str, fragment_source: &str) -> BackendResult<CompiledShader> {
        let vertex = glsl::compile_stage(vertex_source, Stage::Vertex).map_err(RenderError::ShaderCompilation)?;
        let fragment = glsl::compile_stage(fragment_source, Stage::Fragment).map_err(RenderError::ShaderCompilation)?;
        let uniforms = glsl::link(vertex, fragment).map_err(RenderError::ShaderCompilation)?;

        let key = self.shaders.insert(ShaderRecord { uniforms: uniforms.clone() });
        self.stats.shaders_compiled += 1;
        log::trace!("Compiled shader with {} active uniforms", uniforms.len());
        Ok(CompiledShader { handle: ShaderHandle(key_to_raw(key)), uniforms })
    }

    fn release_shader(&mut self, shader: ShaderHandle) -> BackendResult<()> {
        self.shaders.remove(raw_to_key(shader.0)).ok_or_else(|| invalid("shader", shader.0))?;
        self.stats.shaders_released += 1;
        Ok(())
    }

    fn create_framebuffer(
        &mut self,
        color: TextureHandle,
        depth: TextureHandle,
        width: u32,
        height: u32,
    ) -> BackendResult<FramebufferHandle> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidArgument(format!("framebuffer size {}x{}", width, height)));
        }
        self.allocate_attachment(color, TextureFormat::Rgba8, width, height)?;
        self.allocate_attachment(depth, TextureFormat::Depth24, width, height)?;
        let key = self.framebuffers.insert(FramebufferRecord { color, depth, width, height });
        Ok(FramebufferHandle(key_to_raw(key)))
    }

    fn resize_framebuffer(&mut self, framebuffer: FramebufferHandle, width: u32, height: u32) -> BackendResult<()> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidArgument(format!("framebuffer size {}x{}", width, height)));
        }
        let record = self
            .framebuffers
            .get_mut(raw_to_key(framebuffer.0))
            .ok_or_else(|| invalid("framebuffer", framebuffer.0))?;
        record.width = width;
        record.height = height;
        let (color, depth) = (record.color, record.depth);
        self.allocate_attachment(color, TextureFormat::Rgba8, width, height)?;
        self.allocate_attachment(depth, TextureFormat::Depth24, width, height)
    }

    fn release_framebuffer(&mut self, framebuffer: FramebufferHandle) -> BackendResult<()> {
        self.framebuffers
            .remove(raw_to_key(framebuffer.0))
            .map(|_| ())
            .ok_or_else(|| invalid("framebuffer", framebuffer.0))
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }

    fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    fn clear(&mut self, target: RenderTarget, flags: ClearFlags, color: [f32; 4]) -> BackendResult<()> {
        self.check_target(target)?;
        self.commands.push(Command::Clear { target, flags, color });
        self.stats.clears += 1;
        Ok(())
    }

    fn draw(&mut self, call: DrawCall<'_>) -> BackendResult<()> {
        self.check_target(call.target)?;
        let mesh = self.meshes.get(raw_to_key(call.mesh.0)).ok_or_else(|| invalid("mesh", call.mesh.0))?;
        let shader = self.shaders.get(raw_to_key(call.shader.0)).ok_or_else(|| invalid("shader", call.shader.0))?;

        for (name, value) in call.uniforms {
            let decl = shader.uniforms.iter().find(|d| &d.name == name).ok_or_else(|| {
                RenderError::InvalidArgument(format!("uniform '{}' is not declared by the program", name))
            })?;
            if !value.matches(decl) {
                return Err(RenderError::InvalidArgument(format!("uniform '{}' has the wrong type", name)));
            }
            if let UniformValue::Texture(texture) = value {
                if self.texture(*texture).is_none() {
                    return Err(invalid("texture", texture.0));
                }
            }
        }

        let vertex_count = self.vertex_count(mesh)?;
        let index_count = match mesh.index_buffer {
            Some(index) => Some(self.buffer(index).ok_or_else(|| invalid("buffer", index.0))?.data.len() / 4),
            None => None,
        };

        self.commands.push(Command::Draw(DrawRecord {
            mesh: call.mesh,
            shader: call.shader,
            target: call.target,
            pipeline: call.pipeline,
            primitive: mesh.mode,
            vertex_count,
            index_count,
            uniforms: call.uniforms.clone(),
        }));
        self.stats.draws += 1;
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERT: &str = "#version 300 es\nuniform mat4 u_ModelViewProjection;\nvoid main() {}\n";
    const FRAG: &str = "#version 300 es\nuniform sampler2D u_Texture;\nvoid main() {}\n";

    fn floats(values: &[f32]) -> Vec<u8> {
        bytemuck::cast_slice(values).to_vec()
    }

    #[test]
    fn released_handles_are_rejected() {
        let mut backend = HeadlessBackend::new();
        let texture = backend.create_texture(TextureTarget::Texture2D, WrapMode::ClampToEdge).unwrap();
        backend.release_texture(texture).unwrap();
        assert!(matches!(backend.release_texture(texture), Err(RenderError::InvalidHandle { .. })));
        let again = backend.create_texture(TextureTarget::Texture2D, WrapMode::ClampToEdge).unwrap();
        assert_ne!(again, texture);
        assert!(backend.texture(texture).is_none());
    }

    #[test]
    fn texture_upload_checks_size() {
        let mut backend = HeadlessBackend::new();
        let texture = backend.create_texture(TextureTarget::Texture2D, WrapMode::Repeat).unwrap();
        let upload = TextureUpload {
            width: 2,
            height: 1,
            format: TextureFormat::Rg8,
            color_format: ColorFormat::Linear,
            data: &[1, 2, 3, 4],
        };
        backend.upload_texture(texture, upload).unwrap();
        assert_eq!(backend.texture(texture).unwrap().uploads, 1);
        let short = TextureUpload { data: &[1, 2, 3], ..upload };
        assert!(backend.upload_texture(texture, short).is_err());
    }

    #[test]
    fn draws_are_recorded_with_uniform_snapshot() {
        let mut backend = HeadlessBackend::new();
        let positions = backend.create_buffer(BufferKind::Vertex, &floats(&[0.0; 6])).unwrap();
        let mesh = backend
            .create_mesh(PrimitiveMode::Triangles, &[VertexBinding { buffer: positions, components: 2 }], None)
            .unwrap();
        let shader = backend.compile_shader(VERT, FRAG).unwrap();
        assert_eq!(shader.uniforms.len(), 2);
        let texture = backend.create_texture(TextureTarget::Texture2D, WrapMode::ClampToEdge).unwrap();

        let mut uniforms = UniformMap::new();
        uniforms.insert("u_Texture".into(), UniformValue::Texture(texture));
        let call = DrawCall {
            mesh,
            shader: shader.handle,
            pipeline: PipelineState::default(),
            uniforms: &uniforms,
            target: RenderTarget::Screen,
        };
        backend.draw(call).unwrap();

        let draw = backend.draws().next().unwrap();
        assert_eq!(draw.vertex_count, 3);
        assert_eq!(draw.uniform("u_Texture"), Some(&UniformValue::Texture(texture)));

        backend.release_texture(texture).unwrap();
        assert!(backend.draw(call).is_err());
    }

    #[test]
    fn undeclared_uniform_is_rejected_at_draw() {
        let mut backend = HeadlessBackend::new();
        let buffer = backend.create_buffer(BufferKind::Vertex, &[]).unwrap();
        let mesh = backend
            .create_mesh(PrimitiveMode::Points, &[VertexBinding { buffer, components: 4 }], None)
            .unwrap();
        let shader = backend.compile_shader(VERT, FRAG).unwrap();
        let mut uniforms = UniformMap::new();
        uniforms.insert("u_Missing".into(), UniformValue::Float(1.0));
        let result = backend.draw(DrawCall {
            mesh,
            shader: shader.handle,
            pipeline: PipelineState::default(),
            uniforms: &uniforms,
            target: RenderTarget::Screen,
        });
        assert!(matches!(result, Err(RenderError::InvalidArgument(_))));
    }

    #[test]
    fn framebuffer_resize_reallocates_attachments() {
        let mut backend = HeadlessBackend::new();
        let color = backend.create_texture(TextureTarget::Texture2D, WrapMode::ClampToEdge).unwrap();
        let depth = backend.create_texture(TextureTarget::Texture2D, WrapMode::ClampToEdge).unwrap();
        let fb = backend.create_framebuffer(color, depth, 1, 1).unwrap();
        backend.resize_framebuffer(fb, 4, 2).unwrap();
        assert_eq!(backend.framebuffer_size(fb), Some((4, 2)));
        assert_eq!(backend.texture(color).unwrap().data.len(), 32);
        assert_eq!(backend.texture(depth).unwrap().format, TextureFormat::Depth24);
    }

    #[test]
    fn compile_errors_surface_as_shader_compilation() {
        let mut backend = HeadlessBackend::new();
        let result = backend.compile_shader("void main() {}", FRAG);
        assert!(matches!(result, Err(RenderError::ShaderCompilation(_))));
        assert_eq!(backend.live_resources().shaders, 0);
    }
}
