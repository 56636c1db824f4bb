//! Math utilities and types
//!
//! Provides fundamental math types for 3D graphics on top of nalgebra.

pub use nalgebra::{Vector3, Vector4, Matrix4};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl Aabb {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// An inverted box that any `extend` call will overwrite
    pub fn empty() -> Self {
        Self {
            min: Vec3::repeat(f32::MAX),
            max: Vec3::repeat(f32::MIN),
        }
    }

    /// True when no point has been added yet
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Grow the box to contain `point`
    pub fn extend(&mut self, point: Vec3) {
        self.min = self.min.inf(&point);
        self.max = self.max.sup(&point);
    }

    /// Grow the box to contain a sphere
    pub fn extend_sphere(&mut self, center: Vec3, radius: f32) {
        self.extend(center - Vec3::repeat(radius));
        self.extend(center + Vec3::repeat(radius));
    }

    /// The eight corners of the box
    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    /// Conservative bounding sphere: midpoint center, radius to the far corner
    pub fn bounding_sphere(&self) -> BoundingSphere {
        BoundingSphere {
            center: self.center(),
            radius: self.extents().magnitude(),
        }
    }
}

/// Bounding sphere used for cheap distance and visibility tests
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    /// Sphere center
    pub center: Vec3,
    /// Sphere radius
    pub radius: f32,
}

impl BoundingSphere {
    /// Create a new sphere
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Transform the sphere into another space.
    ///
    /// The radius is scaled by the largest axis scale of `matrix`, which keeps the
    /// result conservative under non-uniform scaling.
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        let center = matrix.transform_point(&Point3::from(self.center)).coords;
        Self {
            center,
            radius: self.radius * max_axis_scale(matrix),
        }
    }
}

/// Largest column length of the upper 3x3 block
pub fn max_axis_scale(matrix: &Mat4) -> f32 {
    let sx = Vec3::new(matrix.m11, matrix.m21, matrix.m31).magnitude();
    let sy = Vec3::new(matrix.m12, matrix.m22, matrix.m32).magnitude();
    let sz = Vec3::new(matrix.m13, matrix.m23, matrix.m33).magnitude();
    sx.max(sy).max(sz)
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }
}

/// Extension trait for Mat4 with additional convenience methods
pub trait Mat4Ext {
    /// Create a perspective projection matrix (right-handed, clip depth in [-1, 1])
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Create an orthographic projection matrix
    fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4;

    /// Create a right-handed look-at view matrix
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        Mat4::new_perspective(aspect, fov_y, near, far)
    }

    fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
        Mat4::new_orthographic(left, right, bottom, top, near, far)
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        Mat4::look_at_rh(&Point3::from(eye), &Point3::from(target), &up)
    }
}

/// Pick an up vector that is not parallel to `direction`
pub fn stable_up(direction: &Vec3) -> Vec3 {
    if direction.normalize().y.abs() > 0.99 {
        Vec3::z()
    } else {
        Vec3::y()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_aabb_bounding_sphere_reaches_far_corner() {
        let aabb = Aabb::new(Vec3::new(-1.0, -2.0, -2.0), Vec3::new(1.0, 2.0, 2.0));
        let sphere = aabb.bounding_sphere();

        assert_relative_eq!(sphere.center, Vec3::zeros());
        assert_relative_eq!(sphere.radius, 3.0);
        for corner in aabb.corners() {
            assert!((corner - sphere.center).magnitude() <= sphere.radius + 1e-5);
        }
    }

    #[test]
    fn test_empty_aabb_extend() {
        let mut aabb = Aabb::empty();
        assert!(aabb.is_empty());

        aabb.extend_sphere(Vec3::new(10.0, 0.0, 0.0), 1.0);
        assert!(!aabb.is_empty());
        assert_relative_eq!(aabb.min, Vec3::new(9.0, -1.0, -1.0));
        assert_relative_eq!(aabb.max, Vec3::new(11.0, 1.0, 1.0));
    }

    #[test]
    fn test_sphere_transform_uses_largest_scale() {
        let sphere = BoundingSphere::new(Vec3::new(1.0, 0.0, 0.0), 1.0);
        let matrix = Mat4::new_translation(&Vec3::new(0.0, 5.0, 0.0))
            * Mat4::new_nonuniform_scaling(&Vec3::new(2.0, 1.0, 3.0));

        let world = sphere.transformed(&matrix);
        assert_relative_eq!(world.center, Vec3::new(2.0, 5.0, 0.0));
        assert_relative_eq!(world.radius, 3.0);
    }
}
