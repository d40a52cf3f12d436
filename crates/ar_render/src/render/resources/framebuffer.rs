//! Off-screen render targets

use crate::render::api::{FramebufferHandle, TextureTarget, WrapMode};
use crate::render::RenderResult;

use super::{RenderContext, Texture};

/// A framebuffer with owned color and depth attachments
pub struct Framebuffer {
    ctx: RenderContext,
    handle: FramebufferHandle,
    width: u32,
    height: u32,
    color: Texture,
    depth: Texture,
}

impl Framebuffer {
    /// Create a framebuffer of the given size
    pub fn new(ctx: &RenderContext, width: u32, height: u32) -> RenderResult<Self> {
        let color = Texture::new(ctx, TextureTarget::Texture2D, WrapMode::ClampToEdge)?;
        let depth = Texture::new(ctx, TextureTarget::Texture2D, WrapMode::ClampToEdge)?;
        let handle = ctx.with_backend(|b| b.create_framebuffer(color.handle(), depth.handle(), width, height))?;
        Ok(Self { ctx: ctx.clone(), handle, width, height, color, depth })
    }

    /// Reallocate the attachments; no-op when the size is unchanged
    pub fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        if (width, height) == (self.width, self.height) {
            return Ok(());
        }
        self.ctx.with_backend(|b| b.resize_framebuffer(self.handle, width, height))?;
        log::debug!("Framebuffer resized to {}x{}", width, height);
        self.width = width;
        self.height = height;
        Ok(())
    }

    /// Backend handle
    pub fn handle(&self) -> FramebufferHandle {
        self.handle
    }

    /// `(width, height)`
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Color attachment
    pub fn color_texture(&self) -> &Texture {
        &self.color
    }

    /// Depth attachment
    pub fn depth_texture(&self) -> &Texture {
        &self.depth
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        let handle = self.handle;
        self.ctx.release("framebuffer", |b| b.release_framebuffer(handle));
    }
}
