//! Renderable object representation for the scene
//!
//! A renderable is one drawable instance: a mesh (held by id, never owned),
//! the vertex layout it is drawn with, its material and shader, a world
//! transform and the currently selected LOD.

use crate::foundation::collections::MeshId;
use crate::foundation::math::{BoundingSphere, Mat4, Vec3};
use crate::render::resources::MaterialId;

use super::mesh::{Mesh, VertexLayout};

/// Which pass family draws an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderLayer {
    /// Opaque scene geometry (geometry and shadow passes)
    #[default]
    Opaque,
    /// Terrain patches (terrain pass)
    Terrain,
    /// Additive effects (visual effects pass)
    Effect,
}

/// Cached rendering data for one drawable instance
#[derive(Debug, Clone)]
pub struct RenderableObject {
    /// Mesh drawn by this object
    pub mesh: MeshId,

    /// Vertex layout the mesh is interleaved with
    pub layout: VertexLayout,

    /// Material to use for rendering
    pub material_id: MaterialId,

    /// Shader program key
    pub shader_key: String,

    /// World-space transform matrix
    pub transform: Mat4,

    /// Pass family
    pub layer: RenderLayer,

    /// Static objects cast shadows
    pub is_static: bool,

    current_lod: usize,
    lod_count: usize,
    local_sphere: BoundingSphere,
}

impl RenderableObject {
    /// Create a renderable for `mesh`, starting at LOD 0.
    ///
    /// The mesh's LOD count and object-space bounds are captured here so LOD
    /// and culling work never has to reach back into the arena.
    pub fn new(
        mesh_id: MeshId,
        mesh: &Mesh,
        layout: VertexLayout,
        material_id: MaterialId,
        shader_key: impl Into<String>,
        transform: Mat4,
    ) -> Self {
        Self {
            mesh: mesh_id,
            layout,
            material_id,
            shader_key: shader_key.into(),
            transform,
            layer: RenderLayer::Opaque,
            is_static: true,
            current_lod: 0,
            lod_count: mesh.lod_count(),
            local_sphere: mesh.bounding_sphere(),
        }
    }

    /// Builder-style layer override
    pub fn with_layer(mut self, layer: RenderLayer) -> Self {
        self.layer = layer;
        self
    }

    /// Builder-style static flag override
    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    /// Bounding sphere center in world space
    pub fn world_center(&self) -> Vec3 {
        self.world_sphere().center
    }

    /// Bounding sphere radius in world space
    pub fn bounding_sphere_radius(&self) -> f32 {
        self.world_sphere().radius
    }

    /// Bounding sphere in world space
    pub fn world_sphere(&self) -> BoundingSphere {
        self.local_sphere.transformed(&self.transform)
    }

    /// Distance from `point` to the bounding sphere surface, zero inside it
    pub fn distance_to(&self, point: &Vec3) -> f32 {
        let sphere = self.world_sphere();
        ((point - sphere.center).magnitude() - sphere.radius).max(0.0)
    }

    /// Currently selected LOD
    pub fn current_lod(&self) -> usize {
        self.current_lod
    }

    /// Number of LODs of the mesh
    pub fn lod_count(&self) -> usize {
        self.lod_count
    }

    /// Highest valid LOD index
    pub fn max_lod(&self) -> usize {
        self.lod_count.saturating_sub(1)
    }

    /// Select a LOD, clamped to `[0, max_lod]`. Returns whether it changed.
    pub fn set_lod(&mut self, level: usize) -> bool {
        let level = level.min(self.max_lod());
        if level == self.current_lod {
            return false;
        }
        self.current_lod = level;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::MeshArena;
    use approx::assert_relative_eq;

    fn cube_object(lods: usize, transform: Mat4) -> RenderableObject {
        let mut arena = MeshArena::new();
        let mesh = Mesh::cube(lods);
        let id = arena.insert(mesh.clone());
        RenderableObject::new(id, &mesh, VertexLayout::STANDARD, MaterialId(0), "lit", transform)
    }

    #[test]
    fn test_distance_is_zero_inside_sphere() {
        let obj = cube_object(1, Mat4::new_translation(&Vec3::new(10.0, 0.0, 0.0)));
        let radius = obj.bounding_sphere_radius();

        assert_relative_eq!(radius, 3.0f32.sqrt(), epsilon = 1e-5);
        assert_eq!(obj.distance_to(&Vec3::new(10.0, 0.0, 0.0)), 0.0);
        assert_eq!(obj.distance_to(&Vec3::new(10.5, 0.5, 0.0)), 0.0);
    }

    #[test]
    fn test_distance_outside_sphere() {
        let obj = cube_object(1, Mat4::new_translation(&Vec3::new(10.0, 0.0, 0.0)));
        let point = Vec3::new(10.0, 0.0, 20.0);
        assert_relative_eq!(obj.distance_to(&point), 20.0 - 3.0f32.sqrt(), epsilon = 1e-5);
    }

    #[test]
    fn test_set_lod_clamps_and_reports_change() {
        let mut obj = cube_object(3, Mat4::identity());

        assert!(obj.set_lod(5));
        assert_eq!(obj.current_lod(), 2);
        assert!(!obj.set_lod(2));
        assert!(!obj.set_lod(9));
        assert!(obj.set_lod(0));
        assert_eq!(obj.current_lod(), 0);
    }

    #[test]
    fn test_scaled_object_grows_radius() {
        let obj = cube_object(1, Mat4::new_scaling(4.0));
        assert_relative_eq!(obj.bounding_sphere_radius(), 4.0 * 3.0f32.sqrt(), epsilon = 1e-4);
    }
}
