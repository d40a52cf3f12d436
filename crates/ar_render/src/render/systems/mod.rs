//! Rendering passes
//!
//! Each pass owns its meshes and shaders and draws through the shared
//! [`RenderContext`](crate::render::resources::RenderContext):
//!
//! - [`background`]: camera image, depth visualization, virtual scene composite
//! - [`occlusion`]: CPU reference of the composite's depth test
//! - [`point_cloud`], [`plane`], [`virtual_object`]: scene content
//! - [`lighting`]: light estimate to shader uniforms

pub mod background;
pub mod occlusion;
pub mod point_cloud;
pub mod plane;
pub mod virtual_object;
pub mod lighting;

pub use background::BackgroundRenderer;
pub use lighting::{premultiply_spherical_harmonics, update_light_estimation, LightingError, LightingUniforms};
pub use plane::{calculate_distance_to_plane, PlaneRenderer};
pub use point_cloud::PointCloudRenderer;
pub use virtual_object::{VirtualObjectAssets, VirtualObjectRenderer};
