//! Math utilities and types
//!
//! Provides the vector/matrix aliases used by the renderer and the [`Pose`]
//! type used for tracked entities. Matrices follow the OpenGL convention:
//! column-major storage, column vectors, right-handed view space looking
//! down -Z.

use serde::{Deserialize, Serialize};

pub use nalgebra::{Matrix4, Quaternion, Unit, UnitQuaternion, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = UnitQuaternion<f32>;

/// Rigid transform from an entity's local frame to world space
///
/// Stored as plain arrays so recorded sessions stay readable:
/// `translation = [tx, ty, tz]`, `rotation = [qx, qy, qz, qw]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Translation in metres
    pub translation: [f32; 3],
    /// Rotation quaternion, scalar last
    pub rotation: [f32; 4],
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    /// Identity pose at the world origin
    pub const IDENTITY: Pose = Pose {
        translation: [0.0, 0.0, 0.0],
        rotation: [0.0, 0.0, 0.0, 1.0],
    };

    /// Create a pose from a translation and a rotation
    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        let q = rotation.quaternion();
        Self {
            translation: [translation.x, translation.y, translation.z],
            rotation: [q.i, q.j, q.k, q.w],
        }
    }

    /// Create a pure translation
    pub fn from_translation(x: f32, y: f32, z: f32) -> Self {
        Self {
            translation: [x, y, z],
            ..Self::IDENTITY
        }
    }

    /// Translation as a vector
    pub fn translation(&self) -> Vec3 {
        Vec3::from(self.translation)
    }

    /// Rotation as a normalized unit quaternion
    pub fn rotation(&self) -> Quat {
        let [x, y, z, w] = self.rotation;
        Quat::from_quaternion(Quaternion::new(w, x, y, z))
    }

    /// Homogeneous local-to-world matrix
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.translation()) * self.rotation().to_homogeneous()
    }

    /// Transform a point from local to world space
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation() * point + self.translation()
    }

    /// Rotate a direction from local to world space
    pub fn rotate_vector(&self, vector: Vec3) -> Vec3 {
        self.rotation() * vector
    }

    /// Local +Y axis expressed in world space (a plane's normal)
    pub fn y_axis(&self) -> Vec3 {
        self.rotate_vector(Vec3::y())
    }

    /// Compose `self * other` (apply `other` first)
    pub fn compose(&self, other: &Pose) -> Pose {
        Pose::new(
            self.transform_point(other.translation()),
            self.rotation() * other.rotation(),
        )
    }

    /// Inverse transform
    pub fn inverse(&self) -> Pose {
        let inv_rotation = self.rotation().inverse();
        Pose::new(inv_rotation * -self.translation(), inv_rotation)
    }
}

/// Math utility functions
pub mod utils {
    use super::{Mat4, Vec4};

    /// Transform a direction (w = 0) by a matrix, ignoring translation
    pub fn transform_direction(matrix: &Mat4, direction: [f32; 3]) -> Vec4 {
        matrix * Vec4::new(direction[0], direction[1], direction[2], 0.0)
    }

    /// OpenGL perspective projection (`z` mapped to `[-1, 1]`)
    pub fn perspective_gl(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        Mat4::new_perspective(aspect, fov_y, near, far)
    }

    /// Flatten a matrix into column-major order for uniform upload
    pub fn to_column_major(matrix: &Mat4) -> [f32; 16] {
        let mut out = [0.0; 16];
        out.copy_from_slice(matrix.as_slice());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn pose_matrix_matches_point_transform() {
        let pose = Pose::new(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_axis_angle(&Vec3::y_axis(), std::f32::consts::FRAC_PI_2),
        );
        let p = Vec3::new(1.0, 0.0, 0.0);
        let via_matrix = pose.to_matrix().transform_point(&Point3::from(p));
        let direct = pose.transform_point(p);
        assert_relative_eq!(via_matrix.coords, direct, epsilon = 1e-5);
        assert_relative_eq!(direct, Vec3::new(1.0, 2.0, 2.0), epsilon = 1e-5);
    }

    #[test]
    fn pose_inverse_cancels() {
        let pose = Pose::new(
            Vec3::new(-0.5, 1.5, 4.0),
            Quat::from_euler_angles(0.3, -0.7, 1.1),
        );
        let identity = pose.compose(&pose.inverse());
        assert_relative_eq!(identity.translation(), Vec3::zeros(), epsilon = 1e-5);
        assert_relative_eq!(identity.rotation().angle(), 0.0, epsilon = 1e-3);
    }

    #[test]
    fn directions_ignore_translation() {
        let matrix = Mat4::new_translation(&Vec3::new(5.0, 5.0, 5.0));
        let dir = utils::transform_direction(&matrix, [0.0, 1.0, 0.0]);
        assert_eq!(dir, Vec4::new(0.0, 1.0, 0.0, 0.0));
    }

    #[test]
    fn column_major_layout_places_translation_last() {
        let matrix = Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0));
        let flat = utils::to_column_major(&matrix);
        assert_eq!(&flat[12..15], &[1.0, 2.0, 3.0]);
    }
}
