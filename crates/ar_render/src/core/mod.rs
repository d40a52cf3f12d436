//! # Core Module
//!
//! Shared configuration consumed by the renderer, the placement policy and
//! the session lifecycle.

pub mod config;

pub use config::{
    AppConfig,
    RendererConfig,
    DepthSettings,
    InstantPlacementSettings,
    AssetConfig,
};
pub use crate::config::{Config, ConfigError};
