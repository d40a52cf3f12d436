//! GPU resource layer
//!
//! RAII wrappers over backend handles. Each wrapper keeps a
//! [`RenderContext`] clone and releases its handle in `Drop`, so resources
//! are freed on every exit path, including early returns on error.
//! Resources are created during surface creation and replaced or dropped
//! explicitly; nothing is reclaimed implicitly.

pub mod context;
pub mod texture;
pub mod buffer;
pub mod mesh;
pub mod shader;
pub mod framebuffer;

pub use context::RenderContext;
pub use texture::Texture;
pub use buffer::{IndexBuffer, VertexBuffer};
pub use mesh::Mesh;
pub use shader::{inject_defines, Shader, ShaderDefines};
pub use framebuffer::Framebuffer;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{builtin_shaders, MemoryAssets};
    use crate::render::api::{ColorFormat, PrimitiveMode, TextureFormat, TextureTarget, WrapMode};
    use crate::render::backends::HeadlessBackend;
    use crate::render::RenderError;

    const OBJ: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvt 1 0\nvt 0 1\nvn 0 0 1\nf 1/1/1 2/2/1 3/3/1\n";

    fn context() -> RenderContext {
        let assets = crate::assets::LayeredAssets::new()
            .with_layer(MemoryAssets::new().with("models/tri.obj", OBJ))
            .with_layer(builtin_shaders());
        RenderContext::new(HeadlessBackend::new(), assets)
    }

    fn live(ctx: &RenderContext) -> usize {
        ctx.inspect_backend(|b: &HeadlessBackend| b.live_resources().total()).unwrap()
    }

    #[test]
    fn dropping_resources_releases_handles() {
        let ctx = context();
        {
            let _texture = Texture::new(&ctx, TextureTarget::ExternalCamera, WrapMode::ClampToEdge).unwrap();
            let _framebuffer = Framebuffer::new(&ctx, 4, 4).unwrap();
            let _mesh = Mesh::from_asset(&ctx, "models/tri.obj").unwrap();
            let _shader = Shader::from_assets(&ctx, "shaders/point_cloud.vert", "shaders/point_cloud.frag", None).unwrap();
            assert!(live(&ctx) > 0);
        }
        assert_eq!(live(&ctx), 0);
    }

    #[test]
    fn missing_asset_is_an_asset_error() {
        let ctx = context();
        let result = Shader::from_assets(&ctx, "shaders/missing.vert", "shaders/missing.frag", None);
        assert!(matches!(result, Err(RenderError::AssetLoad(_))));
        assert!(result.err().is_some_and(|e| e.is_asset_failure()));
        assert!(Mesh::from_asset(&ctx, "models/missing.obj").is_err());
    }

    #[test]
    fn uniform_setters_store_declared_values() {
        let ctx = context();
        let mut shader = Shader::from_assets(&ctx, "shaders/point_cloud.vert", "shaders/point_cloud.frag", None).unwrap();
        shader.set_float("u_PointSize", 5.0).set_vec4("u_Color", [1.0, 0.0, 0.0, 1.0]).set_depth_write(false);
        assert!(shader.declares("u_ModelViewProjection"));
        assert_eq!(shader.uniform("u_PointSize"), Some(&crate::render::api::UniformValue::Float(5.0)));
        assert!(!shader.pipeline().depth_write);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "not declared")]
    fn unknown_uniform_panics_in_debug_builds() {
        let ctx = context();
        let mut shader = Shader::from_assets(&ctx, "shaders/point_cloud.vert", "shaders/point_cloud.frag", None).unwrap();
        shader.set_float("u_DoesNotExist", 1.0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "declared as")]
    fn mistyped_uniform_panics_in_debug_builds() {
        let ctx = context();
        let mut shader = Shader::from_assets(&ctx, "shaders/point_cloud.vert", "shaders/point_cloud.frag", None).unwrap();
        shader.set_vec3("u_PointSize", [1.0, 2.0, 3.0]);
    }

    #[test]
    fn framebuffer_resize_is_lazy() {
        let ctx = context();
        let mut framebuffer = Framebuffer::new(&ctx, 1, 1).unwrap();
        framebuffer.resize(1, 1).unwrap();
        framebuffer.resize(640, 480).unwrap();
        assert_eq!(framebuffer.size(), (640, 480));
        let size = ctx.inspect_backend(|b: &HeadlessBackend| b.framebuffer_size(framebuffer.handle())).unwrap();
        assert_eq!(size, Some((640, 480)));
    }

    #[test]
    fn vertex_buffer_rejects_partial_vertices() {
        let ctx = context();
        let mut buffer = VertexBuffer::new(&ctx, 4, None).unwrap();
        assert!(buffer.set(&[1.0, 2.0, 3.0]).is_err());
        buffer.set(&[1.0, 2.0, 3.0, 0.5]).unwrap();
        assert_eq!(buffer.vertex_count(), 1);
        let mesh = Mesh::new(&ctx, PrimitiveMode::Points, None, vec![buffer]).unwrap();
        assert_eq!(mesh.vertex_buffer(0).map(VertexBuffer::vertex_count), Some(1));
    }

    #[test]
    fn texture_upload_reaches_backend() {
        let ctx = context();
        let texture = Texture::new(&ctx, TextureTarget::Texture2D, WrapMode::ClampToEdge).unwrap();
        texture.upload(1, 1, TextureFormat::Rg8, ColorFormat::Linear, &[10, 20]).unwrap();
        let data = ctx.inspect_backend(|b: &HeadlessBackend| b.texture(texture.handle()).map(|t| t.data.clone()));
        assert_eq!(data.flatten(), Some(vec![10, 20]));
    }
}
