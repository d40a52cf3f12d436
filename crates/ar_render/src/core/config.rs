//! # Unified Configuration
//!
//! All persisted and tunable state lives here:
//!
//! - **Renderer Config**: clip planes, point cloud style, placement distance
//! - **Depth Settings**: occlusion and depth visualization toggles
//! - **Instant Placement Settings**: approximate-distance placement toggle
//! - **Asset Config**: where named assets are looked up
//!
//! Everything is `serde`-serializable so the whole [`AppConfig`] can be
//! saved with the [`Config`] trait as TOML or RON.

use serde::{Deserialize, Serialize};

use crate::config::Config;

/// # Renderer Configuration
///
/// Constants of the per-frame pipeline. The defaults reproduce the reference
/// look of the demo; they are not expected to change at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Near clip plane in metres
    pub z_near: f32,
    /// Far clip plane in metres
    pub z_far: f32,
    /// RGBA color of feature points
    pub point_cloud_color: [f32; 4],
    /// Rasterized point size in pixels
    pub point_size: f32,
    /// Assumed camera-to-surface distance for instant placement hit tests
    pub approximate_distance_meters: f32,
}

impl RendererConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(self.z_near > 0.0 && self.z_far > self.z_near) {
            return Err(format!(
                "Clip planes must satisfy 0 < near < far (got {} / {})",
                self.z_near, self.z_far
            ));
        }
        if self.point_size <= 0.0 {
            return Err("Point size must be positive".to_string());
        }
        if !(0.2..=2.0).contains(&self.approximate_distance_meters) {
            log::warn!(
                "Approximate placement distance {}m is outside the recommended [0.2, 2.0] range",
                self.approximate_distance_meters
            );
        }
        Ok(())
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            z_near: 0.1,
            z_far: 100.0,
            point_cloud_color: [31.0 / 255.0, 188.0 / 255.0, 210.0 / 255.0, 1.0],
            point_size: 5.0,
            approximate_distance_meters: 2.0,
        }
    }
}

/// # Depth Settings
///
/// User-facing depth toggles. On devices without depth support both toggles
/// are forced off (see [`DepthSettings::restrict_to_support`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthSettings {
    use_depth_for_occlusion: bool,
    depth_color_visualization_enabled: bool,
    depth_enable_dialog_shown: bool,
}

impl DepthSettings {
    /// Whether the virtual scene is occluded by real-world depth
    pub fn use_depth_for_occlusion(&self) -> bool {
        self.use_depth_for_occlusion
    }

    /// Toggle depth-based occlusion
    pub fn set_use_depth_for_occlusion(&mut self, enabled: bool) {
        self.use_depth_for_occlusion = enabled;
    }

    /// Whether the background shows a false-color depth map instead of the camera image
    pub fn depth_color_visualization_enabled(&self) -> bool {
        self.depth_color_visualization_enabled
    }

    /// Toggle the depth visualization background
    pub fn set_depth_color_visualization_enabled(&mut self, enabled: bool) {
        self.depth_color_visualization_enabled = enabled;
    }

    /// Whether any depth feature needs the depth image each frame
    pub fn needs_depth_image(&self) -> bool {
        self.use_depth_for_occlusion || self.depth_color_visualization_enabled
    }

    /// Returns `true` exactly once: the first time the "enable depth?"
    /// prompt may be shown. Subsequent calls return `false`.
    pub fn should_show_depth_enable_dialog(&mut self) -> bool {
        let show = !self.depth_enable_dialog_shown;
        self.depth_enable_dialog_shown = true;
        show
    }

    /// Force both toggles off when the session cannot produce depth
    pub fn restrict_to_support(&mut self, depth_supported: bool) {
        if !depth_supported && self.needs_depth_image() {
            log::info!("Depth is not supported on this device; disabling depth features");
            self.use_depth_for_occlusion = false;
            self.depth_color_visualization_enabled = false;
        }
    }
}

/// # Instant Placement Settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstantPlacementSettings {
    instant_placement_enabled: bool,
}

impl InstantPlacementSettings {
    /// Whether taps use approximate-distance instant placement
    pub fn is_instant_placement_enabled(&self) -> bool {
        self.instant_placement_enabled
    }

    /// Toggle instant placement
    pub fn set_instant_placement_enabled(&mut self, enabled: bool) {
        self.instant_placement_enabled = enabled;
    }
}

/// # Asset Configuration
///
/// Directories searched, in order, for named assets such as
/// `shaders/occlusion.frag` or `models/pawn.obj`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Search paths for named assets
    pub search_paths: Vec<String>,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            search_paths: vec!["assets".to_string(), "hello_ar/assets".to_string()],
        }
    }
}

/// # Complete Application Configuration
///
/// Top-level configuration the viewer loads at startup. An app given a
/// settings file (`ArApp::with_settings_file`) writes it back whenever the
/// depth or instant placement settings change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Rendering constants
    pub renderer: RendererConfig,
    /// Depth toggles
    pub depth: DepthSettings,
    /// Instant placement toggle
    pub instant_placement: InstantPlacementSettings,
    /// Asset lookup
    pub assets: AssetConfig,
}

impl AppConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), String> {
        self.renderer.validate()
    }
}

impl Config for AppConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_dialog_is_offered_once() {
        let mut settings = DepthSettings::default();
        assert!(settings.should_show_depth_enable_dialog());
        assert!(!settings.should_show_depth_enable_dialog());
    }

    #[test]
    fn unsupported_depth_forces_toggles_off() {
        let mut settings = DepthSettings::default();
        settings.set_use_depth_for_occlusion(true);
        settings.set_depth_color_visualization_enabled(true);
        settings.restrict_to_support(true);
        assert!(settings.needs_depth_image());
        settings.restrict_to_support(false);
        assert!(!settings.use_depth_for_occlusion());
        assert!(!settings.depth_color_visualization_enabled());
    }

    #[test]
    fn default_renderer_config_is_valid() {
        let config = RendererConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn inverted_clip_planes_are_rejected() {
        let config = RendererConfig { z_near: 10.0, z_far: 1.0, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_round_trips_through_toml_and_ron() {
        let dir = std::env::temp_dir().join(format!("ar_render_config_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let mut config = AppConfig::default();
        config.depth.set_use_depth_for_occlusion(true);
        config.instant_placement.set_instant_placement_enabled(true);

        for name in ["settings.toml", "settings.ron"] {
            let path = dir.join(name);
            config.save_to_file(&path).unwrap();
            let loaded = AppConfig::load_from_file(&path).unwrap();
            assert_eq!(loaded, config);
        }

        assert!(AppConfig::load_from_file(dir.join("settings.json")).is_err());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn anchor_capacity_is_not_a_setting() {
        let config: AppConfig = toml::from_str("[renderer]\nmax_anchors = 5\n").unwrap();
        assert_eq!(config.renderer, RendererConfig::default());
        assert_eq!(crate::placement::AnchorStore::default().capacity(), crate::placement::MAX_ANCHORS);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config: AppConfig = toml::from_str("[depth]\nuse_depth_for_occlusion = true\n").unwrap();
        assert!(config.depth.use_depth_for_occlusion());
        assert_eq!(config.renderer, RendererConfig::default());
    }
}
