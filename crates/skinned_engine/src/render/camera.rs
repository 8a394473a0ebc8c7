//! # 3D Camera
//!
//! Perspective camera producing view/projection matrices for the main pass
//! and world-space rays for picking.

use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec3, Vec4};

/// Perspective camera
///
/// Uses a right-handed Y-up view space. Matrices are computed on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,

    /// Point the camera is looking at in world space
    pub target: Vec3,

    /// Up vector for camera orientation (typically [0, 1, 0])
    pub up: Vec3,

    /// Vertical field of view in radians
    pub fov: f32,

    /// Aspect ratio (width / height)
    pub aspect: f32,

    /// Distance to near clipping plane
    pub near: f32,

    /// Distance to far clipping plane
    pub far: f32,
}

impl Camera {
    /// Create a perspective camera looking at the origin
    ///
    /// # Arguments
    /// * `position` - Camera position in world space
    /// * `fov_degrees` - Vertical field of view in degrees
    /// * `aspect` - Aspect ratio (width / height) of the viewport
    /// * `near` - Distance to near clipping plane (must be > 0)
    /// * `far` - Distance to far clipping plane (must be > near)
    pub fn perspective(position: Vec3, fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            target: Vec3::zeros(),
            up: Vec3::new(0.0, 1.0, 0.0),
            fov: utils::deg_to_rad(fov_degrees),
            aspect,
            near,
            far,
        }
    }

    /// Move the camera, keeping its target
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        log::trace!("Camera position updated to: {:?}", position);
    }

    /// Point the camera at `target` with a custom up vector
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        self.target = target;
        self.up = up;
        log::trace!("Camera look_at updated - target: {:?}, up: {:?}", target, up);
    }

    /// Update the aspect ratio after a viewport change
    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        if (self.aspect - aspect).abs() > 0.01 {
            log::info!("Camera aspect ratio changed: {:.3} -> {:.3}", self.aspect, aspect);
        }
        self.aspect = aspect;
    }

    /// World-to-view matrix
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.position, self.target, self.up)
    }

    /// View-to-clip matrix
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective(self.fov, self.aspect, self.near, self.far)
    }

    /// `projection × view`
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// World-space ray through a point given in NDC (`[-1, 1]`, Y up)
    ///
    /// Returns `(origin, normalized direction)`, or `None` when the
    /// view-projection matrix is singular.
    pub fn screen_to_world_ray(&self, ndc_x: f32, ndc_y: f32) -> Option<(Vec3, Vec3)> {
        let inverse = self.view_projection_matrix().try_inverse()?;
        let unproject = |z: f32| {
            let h = inverse * Vec4::new(ndc_x, ndc_y, z, 1.0);
            h.xyz() / h.w
        };
        let near = unproject(-1.0);
        let far = unproject(1.0);
        let direction = (far - near).try_normalize(f32::EPSILON)?;
        Some((near, direction))
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::perspective(Vec3::new(0.0, 2.0, 6.0), 60.0, 16.0 / 9.0, 0.1, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_center_ray_points_at_target() {
        let camera = Camera::perspective(Vec3::new(0.0, 0.0, 5.0), 60.0, 1.0, 0.1, 100.0);
        let (origin, direction) = camera.screen_to_world_ray(0.0, 0.0).unwrap();
        assert_relative_eq!(direction, Vec3::new(0.0, 0.0, -1.0), epsilon = 1e-4);
        assert_relative_eq!(origin.z, 4.9, epsilon = 1e-3);
    }

    #[test]
    fn test_target_projects_to_screen_center() {
        let camera = Camera::perspective(Vec3::new(3.0, 2.0, 5.0), 45.0, 1.5, 0.1, 50.0);
        let clip = camera.view_projection_matrix() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(clip.x / clip.w, 0.0, epsilon = 1e-5);
        assert_relative_eq!(clip.y / clip.w, 0.0, epsilon = 1e-5);
    }
}
