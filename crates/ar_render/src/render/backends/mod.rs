//! Backend implementations for the render module
//!
//! Only the headless backend ships in-tree. GPU backends implement
//! [`crate::render::api::RenderBackend`] out of tree.

pub mod glsl;
pub mod headless;

pub use headless::{BackendStats, Command, DrawRecord, HeadlessBackend, LiveResources};
