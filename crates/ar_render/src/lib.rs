//! # AR Render
//!
//! Per-frame rendering and composition for augmented reality views.
//!
//! ## Features
//!
//! - **Camera Background**: camera image or depth visualization, with lazy shader swaps
//! - **Depth Occlusion**: virtual content hidden behind real geometry
//! - **Scene Content**: feature points, detected planes and anchored objects
//! - **Environmental Lighting**: main light plus spherical harmonics ambient term
//! - **Tap-to-Place**: hit testing with a bounded FIFO of anchors
//! - **Headless Backend**: every draw recorded for inspection and testing
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ar_render::prelude::*;
//!
//! fn main() -> Result<(), AppError> {
//!     let ctx = RenderContext::new(HeadlessBackend::new(), builtin_shaders());
//!     let recording = ReplayRecording::load_or_default("session.ron")?;
//!     let lifecycle = ArLifecycle::new(
//!         move || -> Result<Box<dyn TrackingSession>, SessionError> {
//!             Ok(Box::new(ReplaySession::new(recording.clone())))
//!         },
//!         NoopParticipant,
//!         NoopParticipant,
//!     );
//!     let mut app = ArApp::new(&ctx, AppConfig::default(), lifecycle, LogNotifier::new(false));
//!
//!     app.resume()?;
//!     app.surface_created();
//!     app.surface_changed(1080, 1920);
//!     app.tick()?;
//!     app.pause();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod core;
pub mod config;
pub mod foundation;
pub mod assets;
pub mod tracking;
pub mod render;
pub mod placement;
pub mod app;

pub use app::{AppError, ArApp};

/// Common imports for hosts
pub mod prelude {
    pub use crate::{
        app::{ArApp, ArLifecycle, AppError, LogNotifier, NoopParticipant, UserNotifier},
        assets::{builtin_shaders, DirectoryAssets, LayeredAssets},
        core::{AppConfig, Config},
        foundation::time::Timer,
        render::{backends::HeadlessBackend, resources::RenderContext},
        tracking::{ReplayRecording, ReplaySession, SessionError, TrackingSession},
    };
}
