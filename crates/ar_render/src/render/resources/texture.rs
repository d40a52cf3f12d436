//! Owned GPU textures

use crate::assets::ImageData;
use crate::render::api::{ColorFormat, TextureFormat, TextureHandle, TextureTarget, TextureUpload, WrapMode};
use crate::render::RenderResult;

use super::RenderContext;

/// A texture released when dropped
pub struct Texture {
    ctx: RenderContext,
    handle: TextureHandle,
    target: TextureTarget,
}

impl Texture {
    /// Create an empty texture
    pub fn new(ctx: &RenderContext, target: TextureTarget, wrap: WrapMode) -> RenderResult<Self> {
        let handle = ctx.with_backend(|b| b.create_texture(target, wrap))?;
        Ok(Self { ctx: ctx.clone(), handle, target })
    }

    /// Load a PNG or JPEG asset as an RGBA8 2D texture
    pub fn from_asset(
        ctx: &RenderContext,
        name: &str,
        wrap: WrapMode,
        color_format: ColorFormat,
    ) -> RenderResult<Self> {
        let image = ImageData::load(ctx.assets(), name)?;
        let texture = Self::new(ctx, TextureTarget::Texture2D, wrap)?;
        texture.upload(image.width, image.height, TextureFormat::Rgba8, color_format, &image.data)?;
        Ok(texture)
    }

    /// Replace the texture contents
    pub fn upload(
        &self,
        width: u32,
        height: u32,
        format: TextureFormat,
        color_format: ColorFormat,
        data: &[u8],
    ) -> RenderResult<()> {
        let upload = TextureUpload { width, height, format, color_format, data };
        self.ctx.with_backend(|b| b.upload_texture(self.handle, upload))
    }

    /// Backend handle
    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    /// Binding target
    pub fn target(&self) -> TextureTarget {
        self.target
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        let handle = self.handle;
        self.ctx.release("texture", |b| b.release_texture(handle));
    }
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture").field("handle", &self.handle).field("target", &self.target).finish()
    }
}
