//! Frustum culling
//!
//! Planes are extracted from a combined view-projection matrix with the
//! Gribb-Hartmann method. Visibility is conservative: a sphere is only
//! reported outside when it lies entirely behind one plane.

use crate::foundation::math::{Aabb, Mat4, Vec3, Vec4};
use crate::render::Camera;

/// Plane defined by normal and distance from origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Normal vector pointing into the frustum
    pub normal: Vec3,
    /// Signed offset along the normal
    pub distance: f32,
}

impl Plane {
    /// Build a normalized plane from `(a, b, c, d)` coefficients
    pub fn from_coefficients(v: Vec4) -> Self {
        let normal = Vec3::new(v.x, v.y, v.z);
        let length = normal.magnitude();
        if length <= f32::EPSILON {
            // Degenerate rows accept everything.
            return Self { normal: Vec3::zeros(), distance: 0.0 };
        }
        Self { normal: normal / length, distance: v.w / length }
    }

    /// Calculate signed distance from plane to point
    pub fn distance_to_point(&self, point: &Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }
}

/// Six frustum planes: left, right, bottom, top, near, far
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    /// Planes with inward-facing normals
    pub planes: [Plane; 6],
}

/// Index of the near plane in [`Frustum::planes`]
const NEAR: usize = 4;

/// Slack absorbing float error in extracted plane offsets
const PLANE_EPSILON: f32 = 1e-3;

impl Frustum {
    /// Extract frustum planes from a view-projection matrix (clip depth in [-w, w])
    pub fn from_matrix(m: &Mat4) -> Self {
        let row = |i: usize| -> Vec4 { m.row(i).transpose() };
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));
        Self {
            planes: [
                Plane::from_coefficients(r3 + r0),
                Plane::from_coefficients(r3 - r0),
                Plane::from_coefficients(r3 + r1),
                Plane::from_coefficients(r3 - r1),
                Plane::from_coefficients(r3 + r2),
                Plane::from_coefficients(r3 - r2),
            ],
        }
    }
}

/// Tests bounding volumes against the current view frustum
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrustumCuller {
    frustum: Frustum,
}

impl FrustumCuller {
    /// Derive the six planes from a combined view-projection matrix.
    ///
    /// For perspective projections the near plane is moved back to the eye
    /// recovered from the matrix, so geometry between the eye and the near
    /// plane is never rejected.
    pub fn extract_frustum_planes(view_proj: &Mat4) -> Self {
        let mut culler = Self { frustum: Frustum::from_matrix(view_proj) };
        if let Some(eye) = projection_center(view_proj) {
            culler.relax_near_plane(&eye);
        }
        culler
    }

    /// Culler for a camera, with the near plane moved back to the eye.
    ///
    /// Also covers orthographic cameras, whose matrix carries no eye.
    pub fn from_camera(camera: &Camera) -> Self {
        let mut culler = Self::extract_frustum_planes(&camera.view_projection_matrix());
        culler.relax_near_plane(&camera.position);
        culler
    }

    /// Shift the near plane so it passes through `eye`
    pub fn relax_near_plane(&mut self, eye: &Vec3) {
        let near = &mut self.frustum.planes[NEAR];
        if near.distance_to_point(eye) < 0.0 {
            near.distance = -near.normal.dot(eye);
        }
    }

    /// Extracted planes
    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    /// False only when the sphere is completely outside some plane
    pub fn test_sphere(&self, center: &Vec3, radius: f32) -> bool {
        self.frustum
            .planes
            .iter()
            .all(|plane| plane.distance_to_point(center) >= -(radius + PLANE_EPSILON))
    }

    /// False only when the box is completely outside some plane
    pub fn test_aabb(&self, aabb: &Aabb) -> bool {
        self.frustum.planes.iter().all(|plane| {
            // Corner furthest along the plane normal
            let p = Vec3::new(
                if plane.normal.x >= 0.0 { aabb.max.x } else { aabb.min.x },
                if plane.normal.y >= 0.0 { aabb.max.y } else { aabb.min.y },
                if plane.normal.z >= 0.0 { aabb.max.z } else { aabb.min.z },
            );
            plane.distance_to_point(&p) >= -PLANE_EPSILON
        })
    }
}

/// World-space center of projection, the point mapped to clip `x = y = w = 0`.
///
/// `None` for orthographic (and degenerate) matrices.
fn projection_center(view_proj: &Mat4) -> Option<Vec3> {
    let h = view_proj.try_inverse()? * Vec4::new(0.0, 0.0, 1.0, 0.0);
    (h.w.abs() > 1e-6).then(|| h.xyz() / h.w)
}
