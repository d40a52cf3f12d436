//! Image loading utilities for texture data
//!
//! Decodes PNG and other formats supported by the `image` crate into RGBA8
//! pixels ready for upload.

use super::{AssetError, AssetSource};

/// Loaded image data ready for GPU upload
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    /// Raw RGBA pixel data
    pub data: Vec<u8>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

impl ImageData {
    /// Load a named image asset
    pub fn load(assets: &dyn AssetSource, name: &str) -> Result<Self, AssetError> {
        let bytes = assets.read(name)?;
        let image = Self::from_bytes(&bytes)
            .map_err(|e| AssetError::LoadFailed(format!("{}: {}", name, e)))?;
        log::info!("Loaded image {}x{} from '{}'", image.width, image.height, name);
        Ok(image)
    }

    /// Decode an image from memory
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AssetError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| AssetError::LoadFailed(format!("Failed to decode image: {}", e)))?;

        let rgba_img = img.to_rgba8();
        let (width, height) = rgba_img.dimensions();

        Ok(Self {
            data: rgba_img.into_raw(),
            width,
            height,
        })
    }

    /// Create a solid color image (useful for defaults and tests)
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixel_count = width as usize * height as usize;
        Self {
            data: color.repeat(pixel_count),
            width,
            height,
        }
    }

    /// Size of the pixel data in bytes
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Encode as PNG
    pub fn to_png(&self) -> Result<Vec<u8>, AssetError> {
        let buffer = image::RgbaImage::from_raw(self.width, self.height, self.data.clone()).ok_or_else(|| {
            AssetError::LoadFailed(format!("{} bytes do not fill a {}x{} image", self.data.len(), self.width, self.height))
        })?;
        let mut bytes = std::io::Cursor::new(Vec::new());
        buffer
            .write_to(&mut bytes, image::ImageFormat::Png)
            .map_err(|e| AssetError::LoadFailed(format!("Failed to encode PNG: {}", e)))?;
        Ok(bytes.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryAssets;

    #[test]
    fn solid_color_image() {
        let img = ImageData::solid_color(4, 4, [255, 0, 0, 255]);
        assert_eq!(img.size_bytes(), 4 * 4 * 4);
        assert_eq!(&img.data[0..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn png_assets_decode_to_rgba() {
        let original = ImageData::solid_color(2, 3, [10, 20, 30, 255]);
        let assets = MemoryAssets::new().with("models/albedo.png", original.to_png().unwrap());
        let loaded = ImageData::load(&assets, "models/albedo.png").unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn short_pixel_data_cannot_be_encoded() {
        let image = ImageData { data: vec![0; 3], width: 1, height: 1 };
        assert!(image.to_png().is_err());
    }

    #[test]
    fn garbage_bytes_fail_to_load() {
        let assets = MemoryAssets::new().with("models/broken.png", vec![1, 2, 3]);
        assert!(matches!(ImageData::load(&assets, "models/broken.png"), Err(AssetError::LoadFailed(_))));
    }
}
