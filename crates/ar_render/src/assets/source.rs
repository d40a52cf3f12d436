//! Named asset lookup

use std::collections::HashMap;
use std::path::PathBuf;

use super::AssetError;

/// Read-only source of named assets
///
/// Names are forward-slash relative paths such as `shaders/occlusion.frag`.
pub trait AssetSource {
    /// Read an asset's raw bytes
    fn read(&self, name: &str) -> Result<Vec<u8>, AssetError>;

    /// Read an asset as UTF-8 text
    fn read_to_string(&self, name: &str) -> Result<String, AssetError> {
        let bytes = self.read(name)?;
        String::from_utf8(bytes).map_err(|e| AssetError::InvalidData {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Assets resolved against an ordered list of directories
#[derive(Debug, Clone)]
pub struct DirectoryAssets {
    search_paths: Vec<PathBuf>,
}

impl DirectoryAssets {
    /// Create a source searching `search_paths` in order
    pub fn new<I, P>(search_paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            search_paths: search_paths.into_iter().map(Into::into).collect(),
        }
    }

    fn resolve(&self, name: &str) -> Option<PathBuf> {
        self.search_paths
            .iter()
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.is_file())
    }
}

impl AssetSource for DirectoryAssets {
    fn read(&self, name: &str) -> Result<Vec<u8>, AssetError> {
        let path = self
            .resolve(name)
            .ok_or_else(|| AssetError::NotFound(name.to_string()))?;
        log::debug!("Reading asset '{}' from {:?}", name, path);
        Ok(std::fs::read(path)?)
    }
}

/// In-memory assets, for embedded resources and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryAssets {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryAssets {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an asset
    pub fn insert(&mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> &mut Self {
        self.files.insert(name.into(), bytes.into());
        self
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(name, bytes);
        self
    }
}

impl AssetSource for MemoryAssets {
    fn read(&self, name: &str) -> Result<Vec<u8>, AssetError> {
        self.files
            .get(name)
            .cloned()
            .ok_or_else(|| AssetError::NotFound(name.to_string()))
    }
}

/// Several sources consulted in order
///
/// `NotFound` from one layer falls through to the next; any other error
/// stops the lookup.
#[derive(Default)]
pub struct LayeredAssets {
    layers: Vec<Box<dyn AssetSource>>,
}

impl LayeredAssets {
    /// Create an empty stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a lower-priority layer
    pub fn with_layer(mut self, layer: impl AssetSource + 'static) -> Self {
        self.layers.push(Box::new(layer));
        self
    }
}

impl AssetSource for LayeredAssets {
    fn read(&self, name: &str) -> Result<Vec<u8>, AssetError> {
        for layer in &self.layers {
            match layer.read(name) {
                Err(AssetError::NotFound(_)) => continue,
                result => return result,
            }
        }
        Err(AssetError::NotFound(name.to_string()))
    }
}

/// Shader sources compiled into the library
pub fn builtin_shaders() -> MemoryAssets {
    macro_rules! shader {
        ($assets:ident, $name:literal) => {
            $assets.insert(
                concat!("shaders/", $name),
                include_str!(concat!("../../assets/shaders/", $name)),
            );
        };
    }

    let mut assets = MemoryAssets::new();
    shader!(assets, "background_show_camera.vert");
    shader!(assets, "background_show_camera.frag");
    shader!(assets, "background_show_depth_color_visualization.vert");
    shader!(assets, "background_show_depth_color_visualization.frag");
    shader!(assets, "occlusion.vert");
    shader!(assets, "occlusion.frag");
    shader!(assets, "point_cloud.vert");
    shader!(assets, "point_cloud.frag");
    shader!(assets, "plane.vert");
    shader!(assets, "plane.frag");
    shader!(assets, "environmental_hdr.vert");
    shader!(assets, "environmental_hdr.frag");
    assets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_assets_report_missing_names() {
        let assets = MemoryAssets::new().with("shaders/a.vert", "void main() {}");
        assert_eq!(assets.read_to_string("shaders/a.vert").unwrap(), "void main() {}");
        assert!(matches!(assets.read("shaders/b.vert"), Err(AssetError::NotFound(name)) if name == "shaders/b.vert"));
    }

    #[test]
    fn invalid_utf8_is_invalid_data() {
        let assets = MemoryAssets::new().with("bad.txt", vec![0xff, 0xfe]);
        assert!(matches!(assets.read_to_string("bad.txt"), Err(AssetError::InvalidData { .. })));
    }

    #[test]
    fn layered_assets_fall_through_on_not_found() {
        let assets = LayeredAssets::new()
            .with_layer(MemoryAssets::new().with("shaders/occlusion.frag", "override"))
            .with_layer(builtin_shaders());
        assert_eq!(assets.read_to_string("shaders/occlusion.frag").unwrap(), "override");
        assert!(assets.read_to_string("shaders/plane.vert").unwrap().starts_with("#version"));
        assert!(matches!(assets.read("models/pawn.obj"), Err(AssetError::NotFound(_))));
    }

    #[test]
    fn directory_assets_search_in_order() {
        let root = std::env::temp_dir().join(format!("ar_render_assets_{}", std::process::id()));
        let first = root.join("first");
        let second = root.join("second");
        std::fs::create_dir_all(first.join("shaders")).unwrap();
        std::fs::create_dir_all(second.join("shaders")).unwrap();
        std::fs::write(second.join("shaders/x.frag"), "second").unwrap();
        std::fs::write(second.join("shaders/y.frag"), "only-second").unwrap();
        std::fs::write(first.join("shaders/x.frag"), "first").unwrap();

        let assets = DirectoryAssets::new([first, second]);
        assert_eq!(assets.read_to_string("shaders/x.frag").unwrap(), "first");
        assert_eq!(assets.read_to_string("shaders/y.frag").unwrap(), "only-second");
        assert!(assets.read("shaders/z.frag").is_err());

        std::fs::remove_dir_all(&root).ok();
    }
}
