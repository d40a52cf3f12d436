//! Asset management system
//!
//! Named assets (shader sources, models, textures) are read through an
//! [`AssetSource`]. Loading happens once, during surface creation, and
//! failures are surfaced synchronously to the caller as [`AssetError`].

pub mod source;
pub mod obj_loader;
pub mod image_loader;

pub use source::{builtin_shaders, AssetSource, DirectoryAssets, LayeredAssets, MemoryAssets};
pub use obj_loader::{ObjLoader, ObjData};
pub use image_loader::ImageData;

use thiserror::Error;

/// Asset loading errors
#[derive(Error, Debug)]
pub enum AssetError {
    /// Asset not found
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// Failed to decode an asset that was found
    #[error("Failed to load asset: {0}")]
    LoadFailed(String),

    /// Invalid asset data
    #[error("Invalid data in {name}: {reason}")]
    InvalidData {
        /// Asset name
        name: String,
        /// What was wrong
        reason: String,
    },

    /// IO error during asset loading
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
