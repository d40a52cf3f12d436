//! Anchored object rendering
//!
//! Draws one copy of the object model per tracking anchor into the virtual
//! scene framebuffer, lit by the environmental HDR shader.

use crate::foundation::math::Mat4;
use crate::render::api::{ColorFormat, WrapMode};
use crate::render::resources::{Framebuffer, Mesh, RenderContext, Shader, Texture};
use crate::render::RenderResult;
use crate::tracking::{Anchor, TrackingState};

/// Asset names of the object model and its textures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualObjectAssets<'a> {
    /// Wavefront OBJ model
    pub mesh: &'a str,
    /// Base color, sRGB
    pub albedo: &'a str,
    /// Roughness (R), metallic (G), ambient occlusion (B), linear
    pub roughness_metallic_ao: &'a str,
}

impl Default for VirtualObjectAssets<'static> {
    fn default() -> Self {
        Self {
            mesh: "models/pawn.obj",
            albedo: "models/pawn_albedo.png",
            roughness_metallic_ao: "models/pawn_roughness_metallic_ao.png",
        }
    }
}

/// Transparent black: empty virtual scene
pub const VIRTUAL_SCENE_CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 0.0];

/// Draws the object model at each anchor
pub struct VirtualObjectRenderer {
    ctx: RenderContext,
    mesh: Mesh,
    shader: Shader,
    // Bound into the shader by handle; owned here so they live as long
    _albedo: Texture,
    _roughness_metallic_ao: Texture,
}

impl VirtualObjectRenderer {
    /// Load the model, its textures and the lit shader
    pub fn new(ctx: &RenderContext, assets: VirtualObjectAssets<'_>) -> RenderResult<Self> {
        let albedo = Texture::from_asset(ctx, assets.albedo, WrapMode::ClampToEdge, ColorFormat::Srgb)?;
        let roughness_metallic_ao =
            Texture::from_asset(ctx, assets.roughness_metallic_ao, WrapMode::ClampToEdge, ColorFormat::Linear)?;
        let mesh = Mesh::from_asset(ctx, assets.mesh)?;

        let mut shader = Shader::from_assets(
            ctx,
            "shaders/environmental_hdr.vert",
            "shaders/environmental_hdr.frag",
            None,
        )?;
        shader
            .set_texture("u_AlbedoTexture", &albedo)
            .set_texture("u_RoughnessMetallicAmbientOcclusionTexture", &roughness_metallic_ao)
            .set_bool("u_LightEstimateIsValid", false);

        Ok(Self {
            ctx: ctx.clone(),
            mesh,
            shader,
            _albedo: albedo,
            _roughness_metallic_ao: roughness_metallic_ao,
        })
    }

    /// The lit shader, for light estimate updates
    pub fn shader_mut(&mut self) -> &mut Shader {
        &mut self.shader
    }

    /// Clear `framebuffer` and draw the model at every tracking anchor
    ///
    /// Returns the number of objects drawn.
    pub fn draw_anchors<'a>(
        &mut self,
        anchors: impl IntoIterator<Item = &'a Anchor>,
        view: &Mat4,
        projection: &Mat4,
        framebuffer: &Framebuffer,
    ) -> RenderResult<usize> {
        self.ctx.clear(Some(framebuffer), VIRTUAL_SCENE_CLEAR_COLOR)?;

        let mut drawn = 0;
        for anchor in anchors {
            if anchor.tracking_state != TrackingState::Tracking {
                continue;
            }
            let model_view = view * anchor.pose.to_matrix();
            self.shader
                .set_mat4("u_ModelView", &model_view)
                .set_mat4("u_ModelViewProjection", &(projection * model_view));
            self.ctx.draw_into(&self.mesh, &self.shader, framebuffer)?;
            drawn += 1;
        }
        Ok(drawn)
    }
}
