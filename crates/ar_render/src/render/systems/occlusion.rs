//! CPU reference of the occlusion composite
//!
//! Mirrors the arithmetic of `shaders/occlusion.frag` so occlusion can be
//! reasoned about (and tested) without a GPU. Sampling is nearest-texel with
//! clamp-to-edge addressing, matching the depth texture's wrap mode.

use crate::tracking::DepthImage;

/// Depth tolerance per millimetre of asset depth
pub const DEPTH_TOLERANCE_PER_MM: f32 = 0.015;

/// Depth samples below this ramp are unreliable (mm)
pub const NEAR_INVALID_RANGE_MM: (f32, f32) = (150.0, 200.0);

/// Depth samples above this ramp are unreliable (mm)
pub const FAR_INVALID_RANGE_MM: (f32, f32) = (7500.0, 8000.0);

/// Blur kernel half-extent in texture space
const KERNEL_SIZE_UV: f32 = 0.01;

/// Decode one RG8 texel into millimetres: `r + 256 * g`
pub fn decode_depth_millimeters(rg: [u8; 2]) -> f32 {
    let r = rg[0] as f32 / 255.0;
    let g = rg[1] as f32 / 255.0;
    r * 255.0 + g * 256.0 * 255.0
}

/// Convert a window-space depth in `[0, 1]` to a linear view depth
pub fn ndc_depth_to_view_depth(ndc_depth: f32, z_near: f32, z_far: f32) -> f32 {
    z_near * z_far / (z_far + ndc_depth * (z_near - z_far))
}

fn inverse_lerp(value: f32, min: f32, max: f32) -> f32 {
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

/// Visibility of a virtual fragment at `asset_depth_mm` against one real
/// depth sample: 0 is fully occluded, 1 fully visible
pub fn depth_visibility(depth_mm: f32, asset_depth_mm: f32) -> f32 {
    let occlusion = (0.5 * (depth_mm - asset_depth_mm) / (DEPTH_TOLERANCE_PER_MM * asset_depth_mm) + 0.5)
        .clamp(0.0, 1.0);
    let near = 1.0 - inverse_lerp(depth_mm, NEAR_INVALID_RANGE_MM.0, NEAR_INVALID_RANGE_MM.1);
    let far = inverse_lerp(depth_mm, FAR_INVALID_RANGE_MM.0, FAR_INVALID_RANGE_MM.1);
    occlusion.max(0.0).max(near.max(far))
}

/// Camera depth as uploaded to the GPU
#[derive(Debug, Clone)]
pub struct DepthTexels<'a> {
    width: u32,
    height: u32,
    millimeters: &'a [u16],
}

impl<'a> DepthTexels<'a> {
    /// View a depth image; `None` when its sample count does not match
    pub fn new(image: &'a DepthImage) -> Option<Self> {
        image.is_well_formed().then_some(Self {
            width: image.width,
            height: image.height,
            millimeters: &image.millimeters,
        })
    }

    /// Nearest sample at `uv`, clamped to the edge
    ///
    /// `width * height` equals the sample count, so the row offset stays in range.
    pub fn sample(&self, uv: [f32; 2]) -> f32 {
        let x = ((uv[0] * self.width as f32) as i64).clamp(0, self.width as i64 - 1) as usize;
        let y = ((uv[1] * self.height as f32) as i64).clamp(0, self.height as i64 - 1) as usize;
        let packed = self.millimeters[y * self.width as usize + x].to_le_bytes();
        decode_depth_millimeters(packed)
    }

    /// 3×3 average visibility around `uv`, kernel scaled by the aspect ratio
    pub fn blurred_visibility(&self, uv: [f32; 2], asset_depth_mm: f32, aspect_ratio: f32) -> f32 {
        let step = [KERNEL_SIZE_UV / aspect_ratio, KERNEL_SIZE_UV];
        let mut sum = 0.0;
        for x in -1..=1 {
            for y in -1..=1 {
                let at = [uv[0] + x as f32 * step[0], uv[1] + y as f32 * step[1]];
                sum += depth_visibility(self.sample(at), asset_depth_mm);
            }
        }
        sum / 9.0
    }
}

/// Occlusion inputs for compositing one texel
#[derive(Debug, Clone)]
pub struct OcclusionInputs<'a> {
    /// Camera depth
    pub depth: DepthTexels<'a>,
    /// Camera texture coordinate of the texel
    pub camera_uv: [f32; 2],
    /// Window-space depth of the virtual scene at the texel
    pub virtual_depth: f32,
    /// Near clip plane
    pub z_near: f32,
    /// Far clip plane
    pub z_far: f32,
    /// Depth image width / height
    pub aspect_ratio: f32,
}

/// Color a virtual-scene texel contributes before blending
///
/// Without occlusion inputs the texel passes through unchanged. Transparent
/// texels are never modified.
pub fn composite_texel(virtual_color: [f32; 4], occlusion: Option<&OcclusionInputs<'_>>) -> [f32; 4] {
    let Some(inputs) = occlusion else {
        return virtual_color;
    };
    if virtual_color[3] == 0.0 {
        return virtual_color;
    }
    let asset_depth_mm = ndc_depth_to_view_depth(inputs.virtual_depth, inputs.z_near, inputs.z_far) * 1000.0;
    let visibility = inputs.depth.blurred_visibility(inputs.camera_uv, asset_depth_mm, inputs.aspect_ratio);
    virtual_color.map(|c| c * visibility)
}

/// `SrcAlpha, OneMinusSrcAlpha` blend of a composited texel over the background
pub fn blend_over(src: [f32; 4], dst: [f32; 4]) -> [f32; 4] {
    let a = src[3];
    [
        src[0] * a + dst[0] * (1.0 - a),
        src[1] * a + dst[1] * (1.0 - a),
        src[2] * a + dst[2] * (1.0 - a),
        src[3] * a + dst[3] * (1.0 - a),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn uniform_depth(mm: u16) -> DepthImage {
        DepthImage { width: 4, height: 4, millimeters: vec![mm; 16] }
    }

    #[test]
    fn rg8_decodes_little_endian_millimeters() {
        assert_eq!(decode_depth_millimeters([0, 0]), 0.0);
        assert_relative_eq!(decode_depth_millimeters(1234u16.to_le_bytes()), 1234.0, epsilon = 1e-2);
        assert_relative_eq!(decode_depth_millimeters([255, 255]), 65535.0, epsilon = 1e-1);
    }

    #[test]
    fn view_depth_spans_clip_planes() {
        assert_relative_eq!(ndc_depth_to_view_depth(0.0, 0.1, 100.0), 0.1, epsilon = 1e-6);
        assert_relative_eq!(ndc_depth_to_view_depth(1.0, 0.1, 100.0), 100.0, max_relative = 1e-4);
    }

    #[test]
    fn visibility_ramps_across_the_real_surface() {
        // Real surface well behind the asset
        assert_eq!(depth_visibility(3000.0, 1000.0), 1.0);
        // Real surface well in front of the asset
        assert_eq!(depth_visibility(1000.0, 3000.0), 0.0);
        // Exactly coincident surfaces are half visible
        assert_relative_eq!(depth_visibility(2000.0, 2000.0), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn unreliable_depth_never_occludes() {
        assert_eq!(depth_visibility(0.0, 5000.0), 1.0);
        assert_eq!(depth_visibility(100.0, 5000.0), 1.0);
        assert_eq!(depth_visibility(9000.0, 20000.0), 1.0);
    }

    #[test]
    fn occlusion_darkens_virtual_content_behind_real_surfaces() {
        let image = uniform_depth(500);
        let inputs = OcclusionInputs {
            depth: DepthTexels::new(&image).unwrap(),
            camera_uv: [0.5, 0.5],
            // 0.9 window depth with near 0.1, far 100 is ~1m away
            virtual_depth: 0.9,
            z_near: 0.1,
            z_far: 100.0,
            aspect_ratio: 1.0,
        };
        let out = composite_texel([1.0, 0.5, 0.25, 1.0], Some(&inputs));
        assert_eq!(out, [0.0; 4]);
        assert_eq!(composite_texel([1.0, 0.5, 0.25, 1.0], None), [1.0, 0.5, 0.25, 1.0]);
    }

    #[test]
    fn transparent_texels_are_untouched() {
        let image = uniform_depth(500);
        let inputs = OcclusionInputs {
            depth: DepthTexels::new(&image).unwrap(),
            camera_uv: [0.5, 0.5],
            virtual_depth: 0.9,
            z_near: 0.1,
            z_far: 100.0,
            aspect_ratio: 1.0,
        };
        assert_eq!(composite_texel([0.3, 0.3, 0.3, 0.0], Some(&inputs)), [0.3, 0.3, 0.3, 0.0]);
    }

    #[test]
    fn malformed_depth_is_rejected() {
        let image = DepthImage { width: 4, height: 4, millimeters: vec![0; 3] };
        assert!(DepthTexels::new(&image).is_none());
        let huge = DepthImage { width: u32::MAX, height: u32::MAX, millimeters: vec![0; 1] };
        assert!(DepthTexels::new(&huge).is_none());
    }

    #[test]
    fn opaque_source_replaces_destination() {
        assert_eq!(blend_over([1.0, 0.0, 0.0, 1.0], [0.0, 1.0, 0.0, 1.0]), [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(blend_over([0.0; 4], [0.0, 1.0, 0.0, 1.0]), [0.0, 1.0, 0.0, 1.0]);
    }
}
