//! Render-thread context shared by all GPU resources
//!
//! [`RenderContext`] is a cheap, clonable handle to the backend and the asset
//! source. It is deliberately `!Send`: every resource keeps a clone, so no
//! resource can leave the thread that created it.

use std::cell::RefCell;
use std::rc::Rc;

use crate::assets::AssetSource;
use crate::render::api::{ClearFlags, DrawCall, RenderBackend, RenderTarget};
use crate::render::RenderResult;

use super::{Framebuffer, Mesh, Shader};

struct ContextInner {
    backend: RefCell<Box<dyn RenderBackend>>,
    assets: Box<dyn AssetSource>,
}

/// Shared access to the backend and the asset source
#[derive(Clone)]
pub struct RenderContext {
    inner: Rc<ContextInner>,
}

impl RenderContext {
    /// Wrap a backend and an asset source
    pub fn new(backend: impl RenderBackend + 'static, assets: impl AssetSource + 'static) -> Self {
        log::info!("Render context created on '{}' backend", backend.name());
        Self {
            inner: Rc::new(ContextInner {
                backend: RefCell::new(Box::new(backend)),
                assets: Box::new(assets),
            }),
        }
    }

    /// Named asset lookup
    pub fn assets(&self) -> &dyn AssetSource {
        self.inner.assets.as_ref()
    }

    /// Run a closure with exclusive access to the backend
    pub fn with_backend<R>(&self, f: impl FnOnce(&mut dyn RenderBackend) -> R) -> R {
        let mut backend = self.inner.backend.borrow_mut();
        f(backend.as_mut())
    }

    /// Inspect the concrete backend, if it is a `B`
    pub fn inspect_backend<B: 'static, R>(&self, f: impl FnOnce(&B) -> R) -> Option<R> {
        let backend = self.inner.backend.borrow();
        backend.as_any().downcast_ref::<B>().map(f)
    }

    /// Mutable variant of [`inspect_backend`](Self::inspect_backend)
    pub fn inspect_backend_mut<B: 'static, R>(&self, f: impl FnOnce(&mut B) -> R) -> Option<R> {
        let mut backend = self.inner.backend.borrow_mut();
        backend.as_any_mut().downcast_mut::<B>().map(f)
    }

    /// Release a handle from a `Drop` impl
    ///
    /// Failures are logged, never propagated. If the backend is already
    /// borrowed (a panic unwinding through `with_backend`) the handle leaks.
    pub(crate) fn release(&self, what: &str, f: impl FnOnce(&mut dyn RenderBackend) -> RenderResult<()>) {
        match self.inner.backend.try_borrow_mut() {
            Ok(mut backend) => {
                if let Err(e) = f(backend.as_mut()) {
                    log::error!("Failed to release {}: {}", what, e);
                }
            }
            Err(_) => log::warn!("Backend busy while releasing {}; handle leaked", what),
        }
    }

    /// Set the screen viewport
    pub fn set_viewport(&self, width: u32, height: u32) {
        self.with_backend(|b| b.set_viewport(width, height));
    }

    /// Clear the screen, or a framebuffer when given, to a color
    pub fn clear(&self, framebuffer: Option<&Framebuffer>, color: [f32; 4]) -> RenderResult<()> {
        let target = framebuffer.map_or(RenderTarget::Screen, |fb| RenderTarget::Framebuffer(fb.handle()));
        self.with_backend(|b| b.clear(target, ClearFlags::COLOR | ClearFlags::DEPTH, color))
    }

    /// Draw a mesh to the screen
    pub fn draw(&self, mesh: &Mesh, shader: &Shader) -> RenderResult<()> {
        self.draw_to(mesh, shader, RenderTarget::Screen)
    }

    /// Draw a mesh into a framebuffer
    pub fn draw_into(&self, mesh: &Mesh, shader: &Shader, framebuffer: &Framebuffer) -> RenderResult<()> {
        self.draw_to(mesh, shader, RenderTarget::Framebuffer(framebuffer.handle()))
    }

    fn draw_to(&self, mesh: &Mesh, shader: &Shader, target: RenderTarget) -> RenderResult<()> {
        let call = DrawCall {
            mesh: mesh.handle(),
            shader: shader.handle(),
            pipeline: *shader.pipeline(),
            uniforms: shader.uniforms(),
            target,
        };
        self.with_backend(|b| b.draw(call))
    }
}

impl std::fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderContext").field("refs", &Rc::strong_count(&self.inner)).finish()
    }
}
