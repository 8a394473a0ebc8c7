//! Math utilities and types
//!
//! Provides fundamental math types for 3D graphics and skeletal animation.
//! All matrices are column-major (nalgebra storage order), which is also the
//! layout handed to the GPU backend.

pub use nalgebra::{
    Vector2, Vector3, Vector4,
    Matrix3, Matrix4,
    Quaternion,
    Unit,
};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Normalized quaternion type for rotations
pub type Quat = nalgebra::UnitQuaternion<f32>;

/// Raw (possibly unnormalized) quaternion, as produced by keyframe lerping
pub type RawQuat = Quaternion<f32>;

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Pi / 2
    pub const HALF_PI: f32 = PI * 0.5;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// Radians to degrees conversion factor
    pub const RAD_TO_DEG: f32 = 180.0 / PI;
}

/// Math utility functions
pub mod utils {
    use super::{constants, Quat, RawQuat, Vec3};

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Convert radians to degrees
    pub fn rad_to_deg(radians: f32) -> f32 {
        radians * constants::RAD_TO_DEG
    }

    /// Linear interpolation
    pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }

    /// Rotation composed as yaw (around +Y) followed by pitch (around +X), in degrees
    pub fn quat_from_yaw_pitch(yaw_degrees: f32, pitch_degrees: f32) -> Quat {
        let yaw = Quat::from_axis_angle(&Vec3::y_axis(), deg_to_rad(yaw_degrees));
        let pitch = Quat::from_axis_angle(&Vec3::x_axis(), deg_to_rad(pitch_degrees));
        yaw * pitch
    }

    /// Normalize a raw quaternion, falling back to identity for a zero quaternion
    pub fn normalize_or_identity(q: &RawQuat) -> Quat {
        Quat::try_new(*q, f32::EPSILON).unwrap_or_else(Quat::identity)
    }

    /// Build a raw quaternion from `[x, y, z, w]` components
    pub fn raw_quat_from_xyzw(xyzw: [f32; 4]) -> RawQuat {
        RawQuat::new(xyzw[3], xyzw[0], xyzw[1], xyzw[2])
    }
}

/// Extension trait for Mat4 with additional convenience methods
pub trait Mat4Ext {
    /// Create a right-handed look-at view matrix
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;

    /// Create a perspective projection matrix (`fov_y` in radians)
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Create an orthographic projection matrix
    fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4;

    /// Inverse-transpose of the upper 3x3 block
    ///
    /// A singular block (zero scale) yields the zero matrix rather than an error.
    fn normal_matrix(&self) -> Mat3;

    /// Inverse, or the zero matrix when the matrix is singular
    fn inverse_or_zero(&self) -> Mat4;

    /// Transform a point (w = 1) and drop the homogeneous coordinate
    fn transform_point3(&self, point: &Vec3) -> Vec3;

    /// Column-major flattening, as uploaded to the GPU
    fn to_cols_array(&self) -> [f32; 16];

    /// Rebuild a matrix from a column-major array
    fn from_cols_array(cols: &[f32; 16]) -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        Mat4::look_at_rh(&Point3::from(eye), &Point3::from(target), &up)
    }

    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        Mat4::new_perspective(aspect, fov_y, near, far)
    }

    fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
        Mat4::new_orthographic(left, right, bottom, top, near, far)
    }

    fn normal_matrix(&self) -> Mat3 {
        let upper: Mat3 = self.fixed_view::<3, 3>(0, 0).into_owned();
        upper
            .try_inverse()
            .map_or_else(Mat3::zeros, |inverse| inverse.transpose())
    }

    fn inverse_or_zero(&self) -> Mat4 {
        self.try_inverse().unwrap_or_else(Mat4::zeros)
    }

    fn transform_point3(&self, point: &Vec3) -> Vec3 {
        self.transform_point(&Point3::from(*point)).coords
    }

    fn to_cols_array(&self) -> [f32; 16] {
        let mut out = [0.0; 16];
        out.copy_from_slice(self.as_slice());
        out
    }

    fn from_cols_array(cols: &[f32; 16]) -> Mat4 {
        Mat4::from_column_slice(cols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_yaw_pitch_composition_order() {
        // Yaw 90 rotates +Z onto +X; pitch is applied first in object space
        let q = utils::quat_from_yaw_pitch(90.0, 0.0);
        assert_relative_eq!(q * Vec3::z(), Vec3::x(), epsilon = 1e-6);

        let q = utils::quat_from_yaw_pitch(90.0, 90.0);
        let expected = utils::quat_from_yaw_pitch(90.0, 0.0) * (utils::quat_from_yaw_pitch(0.0, 90.0) * Vec3::y());
        assert_relative_eq!(q * Vec3::y(), expected, epsilon = 1e-6);
    }

    #[test]
    fn test_cols_array_is_column_major() {
        let m = Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0));
        let cols = m.to_cols_array();
        assert_eq!(&cols[12..15], &[1.0, 2.0, 3.0]);
        assert_eq!(Mat4::from_cols_array(&cols), m);
    }

    #[test]
    fn test_normal_matrix_of_degenerate_scale_is_zero() {
        let m = Mat4::new_nonuniform_scaling(&Vec3::new(0.0, 1.0, 1.0));
        assert_eq!(m.normal_matrix(), Mat3::zeros());
    }

    #[test]
    fn test_normalize_zero_quaternion_falls_back_to_identity() {
        let q = utils::normalize_or_identity(&RawQuat::new(0.0, 0.0, 0.0, 0.0));
        assert_relative_eq!(q, Quat::identity(), epsilon = 1e-6);
    }
}
