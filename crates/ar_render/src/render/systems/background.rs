//! Camera background and virtual scene composite
//!
//! Owns the full-screen quad and the two shaders drawn with it:
//!
//! - the **background** shader, showing either the camera image or a
//!   false-color rendering of the camera depth image
//! - the **occlusion** shader, compositing the offscreen virtual scene over
//!   the background, optionally hiding virtual fragments that lie behind
//!   real-world surfaces
//!
//! Both shaders are swapped lazily: a setter only rebuilds when its flag
//! actually changes, and the old program is released before the new one is
//! compiled.

use crate::render::api::{BlendFactor, ColorFormat, PrimitiveMode, TextureFormat, TextureTarget, WrapMode};
use crate::render::resources::{Framebuffer, Mesh, RenderContext, Shader, ShaderDefines, Texture, VertexBuffer};
use crate::render::{RenderError, RenderResult};
use crate::tracking::{DepthImage, Frame};

/// Full-screen quad in NDC, triangle-strip order
pub const NDC_QUAD_COORDS: [f32; 8] = [-1.0, -1.0, 1.0, -1.0, -1.0, 1.0, 1.0, 1.0];

/// Texture coordinates of the virtual scene framebuffer, matching [`NDC_QUAD_COORDS`]
pub const VIRTUAL_SCENE_TEX_COORDS: [f32; 8] = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0];

const CAMERA_TEX_COORDS_LOCATION: usize = 1;

/// Background and composite passes
pub struct BackgroundRenderer {
    ctx: RenderContext,
    mesh: Mesh,
    background_shader: Option<Shader>,
    occlusion_shader: Option<Shader>,
    camera_color_texture: Texture,
    camera_depth_texture: Texture,
    use_depth_visualization: bool,
    use_occlusion: bool,
    aspect_ratio: f32,
    camera_tex_coords_valid: bool,
}

impl BackgroundRenderer {
    /// Allocate the camera textures and the quad
    ///
    /// No shader is built yet; call [`set_use_depth_visualization`] and
    /// [`set_use_occlusion`] before drawing.
    ///
    /// [`set_use_depth_visualization`]: Self::set_use_depth_visualization
    /// [`set_use_occlusion`]: Self::set_use_occlusion
    pub fn new(ctx: &RenderContext) -> RenderResult<Self> {
        let camera_color_texture = Texture::new(ctx, TextureTarget::ExternalCamera, WrapMode::ClampToEdge)?;
        let camera_depth_texture = Texture::new(ctx, TextureTarget::Texture2D, WrapMode::ClampToEdge)?;

        // Camera coordinates stay empty until the first display geometry update
        let vertex_buffers = vec![
            VertexBuffer::new(ctx, 2, Some(&NDC_QUAD_COORDS))?,
            VertexBuffer::new(ctx, 2, None)?,
            VertexBuffer::new(ctx, 2, Some(&VIRTUAL_SCENE_TEX_COORDS))?,
        ];
        let mesh = Mesh::new(ctx, PrimitiveMode::TriangleStrip, None, vertex_buffers)?;

        Ok(Self {
            ctx: ctx.clone(),
            mesh,
            background_shader: None,
            occlusion_shader: None,
            camera_color_texture,
            camera_depth_texture,
            use_depth_visualization: false,
            use_occlusion: false,
            aspect_ratio: 0.0,
            camera_tex_coords_valid: false,
        })
    }

    /// Show the depth visualization instead of the camera image
    ///
    /// Rebuilds the background shader only when the flag changes or no
    /// shader exists yet. On failure no background shader is left and the
    /// next call retries.
    pub fn set_use_depth_visualization(&mut self, enabled: bool) -> RenderResult<()> {
        if self.background_shader.is_some() && self.use_depth_visualization == enabled {
            return Ok(());
        }
        self.background_shader = None;
        self.use_depth_visualization = enabled;

        let shader = if enabled {
            let mut shader = Shader::from_assets(
                &self.ctx,
                "shaders/background_show_depth_color_visualization.vert",
                "shaders/background_show_depth_color_visualization.frag",
                None,
            )?;
            shader.set_texture("u_CameraDepthTexture", &self.camera_depth_texture);
            shader
        } else {
            let mut shader = Shader::from_assets(
                &self.ctx,
                "shaders/background_show_camera.vert",
                "shaders/background_show_camera.frag",
                None,
            )?;
            shader.set_texture("u_CameraColorTexture", &self.camera_color_texture);
            shader
        };
        self.background_shader = Some(Self::fullscreen(shader));
        log::info!("Background shows {}", if enabled { "depth visualization" } else { "camera image" });
        Ok(())
    }

    /// Occlude virtual content with camera depth
    ///
    /// Rebuilds the occlusion shader with `USE_OCCLUSION` set to `1` or `0`
    /// only when the flag changes or no shader exists yet.
    pub fn set_use_occlusion(&mut self, enabled: bool) -> RenderResult<()> {
        if self.occlusion_shader.is_some() && self.use_occlusion == enabled {
            return Ok(());
        }
        self.occlusion_shader = None;
        self.use_occlusion = enabled;

        let mut defines = ShaderDefines::new();
        defines.insert("USE_OCCLUSION".to_string(), if enabled { "1" } else { "0" }.to_string());
        let mut shader = Self::fullscreen(Shader::from_assets(
            &self.ctx,
            "shaders/occlusion.vert",
            "shaders/occlusion.frag",
            Some(&defines),
        )?);
        shader.set_blend(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha);
        if enabled {
            shader
                .set_texture("u_CameraDepthTexture", &self.camera_depth_texture)
                .set_float("u_DepthAspectRatio", self.aspect_ratio);
        }
        self.occlusion_shader = Some(shader);
        log::info!("Occlusion {}", if enabled { "enabled" } else { "disabled" });
        Ok(())
    }

    fn fullscreen(mut shader: Shader) -> Shader {
        shader.set_depth_test(false).set_depth_write(false);
        shader
    }

    /// Recompute camera texture coordinates when the display changed
    ///
    /// Must run every frame before either draw. The first call always
    /// computes the coordinates, so the quad is never drawn without them.
    pub fn update_display_geometry(&mut self, frame: &Frame) -> RenderResult<()> {
        if self.camera_tex_coords_valid && !frame.display_geometry_changed {
            return Ok(());
        }
        let tex_coords = frame.transform_ndc_to_texture(&NDC_QUAD_COORDS);
        let buffer = self
            .mesh
            .vertex_buffer_mut(CAMERA_TEX_COORDS_LOCATION)
            .ok_or_else(|| RenderError::RenderingFailed("background quad lost its camera coordinates".to_string()))?;
        buffer.set(&tex_coords)?;
        self.camera_tex_coords_valid = true;
        log::debug!("Camera texture coordinates updated: {:?}", tex_coords);
        Ok(())
    }

    /// Upload a depth image as RG8 (low byte, high byte)
    ///
    /// While occlusion is enabled the image aspect ratio is pushed to the
    /// occlusion shader as well.
    pub fn update_camera_depth_texture(&mut self, image: &DepthImage) -> RenderResult<()> {
        if !image.is_well_formed() {
            return Err(RenderError::InvalidArgument(format!(
                "depth image {}x{} carries {} samples",
                image.width,
                image.height,
                image.millimeters.len()
            )));
        }
        self.camera_depth_texture.upload(
            image.width,
            image.height,
            TextureFormat::Rg8,
            ColorFormat::Linear,
            &image.to_rg8(),
        )?;
        if self.use_occlusion {
            self.aspect_ratio = image.aspect_ratio();
            if let Some(shader) = self.occlusion_shader.as_mut() {
                shader.set_float("u_DepthAspectRatio", self.aspect_ratio);
            }
        }
        Ok(())
    }

    /// Draw the camera image (or depth visualization) to the screen
    pub fn draw_background(&self) -> RenderResult<()> {
        match &self.background_shader {
            Some(shader) => self.ctx.draw(&self.mesh, shader),
            None => Ok(()),
        }
    }

    /// Composite the virtual scene framebuffer over the background
    pub fn draw_virtual_scene(&mut self, framebuffer: &Framebuffer, z_near: f32, z_far: f32) -> RenderResult<()> {
        let Some(shader) = self.occlusion_shader.as_mut() else {
            return Ok(());
        };
        shader.set_texture("u_VirtualSceneColorTexture", framebuffer.color_texture());
        if self.use_occlusion {
            shader
                .set_texture("u_VirtualSceneDepthTexture", framebuffer.depth_texture())
                .set_float("u_ZNear", z_near)
                .set_float("u_ZFar", z_far);
        }
        self.ctx.draw(&self.mesh, shader)
    }

    /// Texture the session streams camera images into
    pub fn camera_color_texture(&self) -> &Texture {
        &self.camera_color_texture
    }

    /// Texture holding the latest depth image
    pub fn camera_depth_texture(&self) -> &Texture {
        &self.camera_depth_texture
    }

    /// Whether the depth visualization is active
    pub fn use_depth_visualization(&self) -> bool {
        self.use_depth_visualization
    }

    /// Whether occlusion is active
    pub fn use_occlusion(&self) -> bool {
        self.use_occlusion
    }

    /// The quad shared by both passes
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::api::UniformValue;
    use crate::render::backends::HeadlessBackend;
    use crate::render::systems::test_support::context;
    use crate::tracking::DisplayUvTransform;

    fn stats(ctx: &RenderContext) -> crate::render::backends::BackendStats {
        ctx.inspect_backend(HeadlessBackend::stats).unwrap()
    }

    fn ready(ctx: &RenderContext) -> BackgroundRenderer {
        let mut background = BackgroundRenderer::new(ctx).unwrap();
        background.set_use_depth_visualization(false).unwrap();
        background.set_use_occlusion(false).unwrap();
        background
    }

    #[test]
    fn shader_swaps_only_when_the_flag_changes() {
        let ctx = context();
        let mut background = ready(&ctx);
        assert_eq!(stats(&ctx).shaders_compiled, 2);

        background.set_use_occlusion(false).unwrap();
        background.set_use_depth_visualization(false).unwrap();
        assert_eq!(stats(&ctx).shaders_compiled, 2);

        background.set_use_occlusion(true).unwrap();
        let after = stats(&ctx);
        assert_eq!(after.shaders_compiled, 3);
        assert_eq!(after.shaders_released, 1);
        let live = ctx.inspect_backend(|b: &HeadlessBackend| b.live_resources().shaders).unwrap();
        assert_eq!(live, 2);
        assert!(background.use_occlusion());
    }

    #[test]
    fn occlusion_define_controls_depth_uniforms() {
        let ctx = context();
        let mut background = ready(&ctx);
        assert!(!background.occlusion_shader.as_ref().unwrap().declares("u_ZNear"));
        background.set_use_occlusion(true).unwrap();
        assert!(background.occlusion_shader.as_ref().unwrap().declares("u_ZNear"));
    }

    #[test]
    fn first_geometry_update_always_computes_coordinates() {
        let ctx = context();
        let mut background = ready(&ctx);
        let mut frame = Frame { display_geometry_changed: false, ..Default::default() };
        background.update_display_geometry(&frame).unwrap();
        let handle = background.mesh().vertex_buffer(1).unwrap().handle();
        let coords = ctx.inspect_backend(|b: &HeadlessBackend| b.buffer_floats(handle)).flatten().unwrap();
        assert_eq!(coords, vec![0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0]);

        // Unflagged changes are ignored after the first update
        frame.display_uv_transform = DisplayUvTransform([0.0, 0.5, 0.5, 0.5, 0.0, 0.5]);
        background.update_display_geometry(&frame).unwrap();
        let uploads = ctx.inspect_backend(|b: &HeadlessBackend| b.buffer(handle).map(|r| r.uploads)).flatten();
        assert_eq!(uploads, Some(1));

        frame.display_geometry_changed = true;
        background.update_display_geometry(&frame).unwrap();
        let coords = ctx.inspect_backend(|b: &HeadlessBackend| b.buffer_floats(handle)).flatten().unwrap();
        assert_eq!(&coords[..2], &[0.0, 0.0]);
    }

    #[test]
    fn depth_upload_is_rg8_and_updates_aspect_ratio() {
        let ctx = context();
        let mut background = ready(&ctx);
        background.set_use_occlusion(true).unwrap();
        let image = DepthImage { width: 4, height: 2, millimeters: vec![0x0102; 8] };
        background.update_camera_depth_texture(&image).unwrap();

        let handle = background.camera_depth_texture().handle();
        let (format, first) = ctx
            .inspect_backend(|b: &HeadlessBackend| b.texture(handle).map(|t| (t.format, [t.data[0], t.data[1]])))
            .flatten()
            .unwrap();
        assert_eq!(format, TextureFormat::Rg8);
        assert_eq!(first, [0x02, 0x01]);
        assert_eq!(
            background.occlusion_shader.as_ref().unwrap().uniform("u_DepthAspectRatio"),
            Some(&UniformValue::Float(2.0))
        );
    }

    #[test]
    fn malformed_depth_is_rejected() {
        let ctx = context();
        let mut background = ready(&ctx);
        let image = DepthImage { width: 4, height: 2, millimeters: vec![0; 3] };
        assert!(background.update_camera_depth_texture(&image).is_err());
    }

    #[test]
    fn composite_sets_depth_uniforms_only_with_occlusion() {
        let ctx = context();
        let mut background = ready(&ctx);
        let framebuffer = Framebuffer::new(&ctx, 8, 8).unwrap();
        background.update_display_geometry(&Frame::default()).unwrap();

        background.draw_virtual_scene(&framebuffer, 0.1, 100.0).unwrap();
        background.set_use_occlusion(true).unwrap();
        background.draw_virtual_scene(&framebuffer, 0.1, 100.0).unwrap();

        let draws: Vec<_> = ctx.inspect_backend(|b: &HeadlessBackend| b.draws().cloned().collect()).unwrap();
        assert_eq!(draws.len(), 2);
        assert!(draws[0].uniform("u_ZNear").is_none());
        assert!(draws[0].uniform("u_VirtualSceneColorTexture").is_some());
        assert_eq!(draws[1].uniform("u_ZFar"), Some(&UniformValue::Float(100.0)));
        assert_eq!(draws[1].pipeline.blend.0, BlendFactor::SrcAlpha);
        assert!(!draws[1].pipeline.depth_test);
        assert_eq!(draws[1].vertex_count, 4);
    }

    #[test]
    fn background_draw_without_shader_is_a_no_op() {
        let ctx = context();
        let background = BackgroundRenderer::new(&ctx).unwrap();
        background.draw_background().unwrap();
        assert_eq!(stats(&ctx).draws, 0);
    }
}
