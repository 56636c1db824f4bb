//! # 3D Camera
//!
//! Camera abstraction consumed by culling, LOD selection and the passes. It
//! exposes a world position plus view and projection matrices; everything
//! else is derived on demand.
//!
//! Uses the standard right-handed Y-up convention with the camera looking
//! down -Z in view space and clip depth in [-1, 1].

use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec3};

/// Projection model of a camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Perspective projection with a vertical field of view in radians
    Perspective {
        /// Vertical field of view in radians
        fov_y: f32,
    },
    /// Orthographic projection covering `height` world units vertically
    Orthographic {
        /// Visible height in world units
        height: f32,
    },
}

/// 3D camera for perspective and orthographic projections
#[derive(Debug, Clone)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,

    /// Point the camera is looking at in world space
    pub target: Vec3,

    /// Up vector for camera orientation (typically [0, 1, 0])
    pub up: Vec3,

    /// Projection model
    pub projection: Projection,

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
    /// # Example
    /// ```rust
    /// use frame_pipeline::foundation::math::Vec3;
    /// use frame_pipeline::render::Camera;
    ///
    /// let camera = Camera::perspective(Vec3::new(0.0, 2.0, 5.0), 75.0, 16.0 / 9.0, 0.1, 100.0);
    /// assert_eq!(camera.position, Vec3::new(0.0, 2.0, 5.0));
    /// ```
    pub fn perspective(position: Vec3, fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            target: Vec3::zeros(),
            up: Vec3::y(),
            projection: Projection::Perspective { fov_y: utils::deg_to_rad(fov_degrees) },
            aspect,
            near,
            far,
        }
    }

    /// Create an orthographic camera looking at the origin
    pub fn orthographic(position: Vec3, height: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            target: Vec3::zeros(),
            up: Vec3::y(),
            projection: Projection::Orthographic { height },
            aspect,
            near,
            far,
        }
    }

    /// Update camera position in world space
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        log::trace!("Camera position updated to: {:?}", position);
    }

    /// Update camera target (look-at point)
    pub fn set_target(&mut self, target: Vec3) {
        self.target = target;
    }

    /// Update the aspect ratio, e.g. after a window resize
    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        } else {
            log::warn!("Ignoring invalid aspect ratio {aspect}");
        }
    }

    /// World-to-view matrix
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.position, self.target, self.up)
    }

    /// View-to-clip matrix
    pub fn projection_matrix(&self) -> Mat4 {
        match self.projection {
            Projection::Perspective { fov_y } => Mat4::perspective(fov_y, self.aspect, self.near, self.far),
            Projection::Orthographic { height } => {
                let half_h = height * 0.5;
                let half_w = half_h * self.aspect;
                Mat4::orthographic(-half_w, half_w, -half_h, half_h, self.near, self.far)
            }
        }
    }

    /// Combined projection * view matrix
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Point3;
    use approx::assert_relative_eq;

    #[test]
    fn test_target_projects_to_screen_center() {
        let mut camera = Camera::perspective(Vec3::new(3.0, 4.0, 5.0), 60.0, 1.5, 0.1, 100.0);
        camera.set_target(Vec3::new(-2.0, 0.0, 1.0));

        let clip = camera.view_projection_matrix().transform_point(&Point3::from(camera.target));
        assert_relative_eq!(clip.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(clip.y, 0.0, epsilon = 1e-5);
        assert!(clip.z > -1.0 && clip.z < 1.0);
    }

    #[test]
    fn test_invalid_aspect_ignored() {
        let mut camera = Camera::perspective(Vec3::new(0.0, 0.0, 5.0), 60.0, 1.5, 0.1, 100.0);
        camera.set_aspect_ratio(0.0);
        assert_eq!(camera.aspect, 1.5);
        camera.set_aspect_ratio(2.0);
        assert_eq!(camera.aspect, 2.0);
    }
}
