//! Environmental HDR lighting uniforms
//!
//! Converts a [`LightEstimate`] into the uniforms of the object shader. The
//! ambient term arrives as 9 spherical-harmonics coefficients per color
//! channel. Before upload each coefficient is multiplied by the constant of
//! its band, which folds the normalized real SH basis and the Lambertian
//! convolution into the coefficients. The shader then evaluates diffuse
//! irradiance as a plain polynomial in the surface normal.

use thiserror::Error;

use crate::foundation::math::{utils, Mat4};
use crate::render::resources::Shader;
use crate::tracking::LightEstimate;

/// Number of ambient coefficients: 9 bands × 3 channels
pub const SPHERICAL_HARMONICS_COEFFICIENT_COUNT: usize = 27;

/// Per-band basis × Lambertian convolution constants, bands 0..=8
pub const SPHERICAL_HARMONIC_FACTORS: [f32; 9] = [
    0.282095,  // Y00
    -0.325735, // Y1-1
    0.325735,  // Y10
    -0.325735, // Y11
    0.273137,  // Y2-2
    -0.273137, // Y2-1
    0.078848,  // Y20
    -0.273137, // Y21
    0.136569,  // Y22
];

/// Lighting input errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LightingError {
    /// Ambient coefficients were not exactly 27 floats
    #[error("Expected {expected} spherical harmonics coefficients, got {actual}")]
    CoefficientCount {
        /// Required count
        expected: usize,
        /// Supplied count
        actual: usize,
    },
}

/// Multiply each coefficient by the constant of its band
///
/// `out[i] = coefficients[i] * SPHERICAL_HARMONIC_FACTORS[i / 3]`. Input of
/// any length other than 27 is rejected, never truncated or padded.
pub fn premultiply_spherical_harmonics(coefficients: &[f32]) -> Result<[f32; 27], LightingError> {
    if coefficients.len() != SPHERICAL_HARMONICS_COEFFICIENT_COUNT {
        return Err(LightingError::CoefficientCount {
            expected: SPHERICAL_HARMONICS_COEFFICIENT_COUNT,
            actual: coefficients.len(),
        });
    }
    let mut out = [0.0; SPHERICAL_HARMONICS_COEFFICIENT_COUNT];
    for (i, (o, c)) in out.iter_mut().zip(coefficients).enumerate() {
        *o = c * SPHERICAL_HARMONIC_FACTORS[i / 3];
    }
    Ok(out)
}

/// Uniform values derived from a valid estimate
#[derive(Debug, Clone, PartialEq)]
pub struct LightingUniforms {
    /// Inverse of the view matrix
    pub view_inverse: Mat4,
    /// Main light direction in view space, `w = 0`
    pub view_light_direction: [f32; 4],
    /// Main light intensity, linear RGB
    pub light_intensity: [f32; 3],
    /// Premultiplied ambient coefficients
    pub spherical_harmonics: [f32; 27],
}

impl LightingUniforms {
    /// Derive the uniforms, or `None` for an invalid estimate
    pub fn derive(estimate: &LightEstimate, view: &Mat4) -> Result<Option<Self>, LightingError> {
        if !estimate.is_valid() {
            return Ok(None);
        }
        let spherical_harmonics = premultiply_spherical_harmonics(&estimate.ambient_spherical_harmonics)?;
        let direction = utils::transform_direction(view, estimate.main_light_direction);
        Ok(Some(Self {
            // Rigid view matrices are always invertible; fall back to identity otherwise
            view_inverse: view.try_inverse().unwrap_or_else(Mat4::identity),
            view_light_direction: [direction.x, direction.y, direction.z, direction.w],
            light_intensity: estimate.main_light_intensity,
            spherical_harmonics,
        }))
    }
}

/// Push the light estimate into the object shader
///
/// An invalid estimate sets only `u_LightEstimateIsValid = false`; every
/// other lighting uniform keeps its previous value. A malformed estimate
/// leaves the shader untouched and returns the error.
pub fn update_light_estimation(
    shader: &mut Shader,
    estimate: &LightEstimate,
    view: &Mat4,
) -> Result<(), LightingError> {
    let Some(uniforms) = LightingUniforms::derive(estimate, view)? else {
        shader.set_bool("u_LightEstimateIsValid", false);
        return Ok(());
    };
    shader
        .set_bool("u_LightEstimateIsValid", true)
        .set_mat4("u_ViewInverse", &uniforms.view_inverse)
        .set_vec4("u_ViewLightDirection", uniforms.view_light_direction)
        .set_vec3("u_LightIntensity", uniforms.light_intensity)
        .set_vec3_array("u_SphericalHarmonicsCoefficients", &uniforms.spherical_harmonics);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Pose, Quat, Vec3};
    use crate::tracking::LightEstimateState;
    use approx::assert_relative_eq;

    fn ramp() -> Vec<f32> {
        (0..27).map(|i| i as f32 * 0.5 - 3.0).collect()
    }

    #[test]
    fn premultiply_scales_each_band() {
        let input = ramp();
        let out = premultiply_spherical_harmonics(&input).unwrap();
        for i in 0..27 {
            assert_eq!(out[i], input[i] * SPHERICAL_HARMONIC_FACTORS[i / 3]);
        }
    }

    #[test]
    fn premultiply_is_deterministic_and_linear() {
        let input = ramp();
        let first = premultiply_spherical_harmonics(&input).unwrap();
        let _ = premultiply_spherical_harmonics(&[1.0; 27]).unwrap();
        let second = premultiply_spherical_harmonics(&input).unwrap();
        assert_eq!(first, second);

        let doubled: Vec<f32> = input.iter().map(|c| c * 2.0).collect();
        let out = premultiply_spherical_harmonics(&doubled).unwrap();
        for i in 0..27 {
            assert_relative_eq!(out[i], first[i] * 2.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn wrong_coefficient_count_is_rejected() {
        for len in [0, 9, 26, 28] {
            let err = premultiply_spherical_harmonics(&vec![1.0; len]).unwrap_err();
            assert_eq!(err, LightingError::CoefficientCount { expected: 27, actual: len });
        }
    }

    #[test]
    fn direction_is_transformed_as_a_vector() {
        let estimate = LightEstimate {
            state: LightEstimateState::Valid,
            main_light_direction: [0.0, 1.0, 0.0],
            main_light_intensity: [2.0, 1.5, 1.0],
            ambient_spherical_harmonics: vec![0.0; 27],
        };
        let camera = Pose::new(
            Vec3::new(3.0, 4.0, 5.0),
            Quat::from_axis_angle(&Vec3::x_axis(), std::f32::consts::FRAC_PI_2),
        );
        let view = camera.inverse().to_matrix();
        let uniforms = LightingUniforms::derive(&estimate, &view).unwrap().unwrap();

        // Translation must not leak into a direction
        assert_eq!(uniforms.view_light_direction[3], 0.0);
        // Looking along world +Y, world up points away from the viewer
        assert_relative_eq!(uniforms.view_light_direction[0], 0.0, epsilon = 1e-5);
        assert_relative_eq!(uniforms.view_light_direction[1], 0.0, epsilon = 1e-5);
        assert_relative_eq!(uniforms.view_light_direction[2], -1.0, epsilon = 1e-5);
        assert_eq!(uniforms.light_intensity, [2.0, 1.5, 1.0]);
        assert_relative_eq!(uniforms.view_inverse, camera.to_matrix(), epsilon = 1e-5);
    }

    #[test]
    fn invalid_estimate_derives_nothing() {
        let estimate = LightEstimate { ambient_spherical_harmonics: vec![1.0; 3], ..Default::default() };
        assert_eq!(LightingUniforms::derive(&estimate, &Mat4::identity()), Ok(None));
    }
}
