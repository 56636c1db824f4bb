//! Hierarchical transform graph
//!
//! Nodes are stored in a flat, append-only vector. A node's parent always has
//! a smaller index than the node itself, so the tree can never contain a
//! cycle and indices stay valid until [`TransformGraph::clear`].

use crate::foundation::math::{Aabb, BoundingSphere, Mat4, Vec3};
use crate::render::{RenderError, RenderResult};

use super::culling::FrustumCuller;

/// One (mesh, material) pair attached to a node.
///
/// Both indices refer to the scene loader's tables; the graph does not
/// interpret them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshReference {
    /// Index into the scene's mesh table
    pub mesh_index: usize,
    /// Index into the scene's material table
    pub material_index: usize,
}

/// A node in the transform graph
#[derive(Debug, Clone)]
pub struct TransformNode {
    /// Parent index, `None` for roots
    pub parent: Option<usize>,
    /// Child indices in insertion order
    pub children: Vec<usize>,
    /// Transform relative to the parent
    pub local: Mat4,
    /// Transform relative to the world, valid after recalculation
    pub global: Mat4,
    /// Object-space bounds
    pub aabb: Aabb,
    /// Object-space bounding sphere
    pub sphere: BoundingSphere,
    /// Attached (mesh, material) pairs
    pub meshes: Vec<MeshReference>,
    /// Debug name
    pub name: String,
}

impl TransformNode {
    fn new(parent: Option<usize>, name: String) -> Self {
        Self {
            parent,
            children: Vec::new(),
            local: Mat4::identity(),
            global: Mat4::identity(),
            aabb: Aabb::new(Vec3::zeros(), Vec3::zeros()),
            sphere: BoundingSphere::new(Vec3::zeros(), 0.0),
            meshes: Vec::new(),
            name,
        }
    }

    /// Bounding sphere in world space (uses the last computed global transform)
    pub fn world_sphere(&self) -> BoundingSphere {
        self.sphere.transformed(&self.global)
    }
}

/// Flat-storage scene hierarchy
#[derive(Debug, Default)]
pub struct TransformGraph {
    nodes: Vec<TransformNode>,
    globals_dirty: bool,
}

impl TransformGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node under `parent` (or as a root) and return its index
    pub fn add_node(&mut self, parent: Option<usize>, name: impl Into<String>) -> RenderResult<usize> {
        let index = self.nodes.len();
        if let Some(parent) = parent {
            let parent_node = self.nodes.get_mut(parent).ok_or_else(|| {
                RenderError::InvalidReference(format!("parent node {parent} of {index}"))
            })?;
            parent_node.children.push(index);
        }
        self.nodes.push(TransformNode::new(parent, name.into()));
        self.globals_dirty = true;
        Ok(index)
    }

    /// Replace a node's local transform
    pub fn set_local_transform(&mut self, node: usize, matrix: Mat4) -> RenderResult<()> {
        self.node_mut(node)?.local = matrix;
        self.globals_dirty = true;
        Ok(())
    }

    /// Set explicit object-space bounds of a node
    pub fn set_bounding_volumes(&mut self, node: usize, min: Vec3, max: Vec3, center: Vec3, radius: f32) -> RenderResult<()> {
        let n = self.node_mut(node)?;
        n.aabb = Aabb::new(min, max);
        n.sphere = BoundingSphere::new(center, radius);
        Ok(())
    }

    /// Set bounds from an AABB, deriving the conservative sphere from it
    pub fn set_bounds_from_aabb(&mut self, node: usize, min: Vec3, max: Vec3) -> RenderResult<()> {
        let sphere = Aabb::new(min, max).bounding_sphere();
        self.set_bounding_volumes(node, min, max, sphere.center, sphere.radius)
    }

    /// Attach a (mesh, material) pair to a node
    pub fn add_mesh_reference(&mut self, node: usize, mesh_index: usize, material_index: usize) -> RenderResult<()> {
        self.node_mut(node)?.meshes.push(MeshReference { mesh_index, material_index });
        Ok(())
    }

    /// Recompute every global transform top-down from the roots
    pub fn recalculate_global_transforms(&mut self) {
        let mut stack: Vec<(usize, Mat4)> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.parent.is_none())
            .map(|(i, _)| (i, Mat4::identity()))
            .collect();

        while let Some((index, parent_global)) = stack.pop() {
            let node = &mut self.nodes[index];
            node.global = parent_global * node.local;
            let global = node.global;
            stack.extend(node.children.iter().map(|&child| (child, global)));
        }
        self.globals_dirty = false;
    }

    /// True when an edit happened since the last recalculation
    pub fn needs_recalculation(&self) -> bool {
        self.globals_dirty
    }

    /// Depth-first pre-order walk from every root.
    ///
    /// Returning `false` from the visitor skips that node's subtree.
    pub fn traverse_dfs<F>(&self, mut visitor: F)
    where
        F: FnMut(usize, &TransformNode) -> bool,
    {
        let mut stack: Vec<usize> = self
            .nodes
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, n)| n.parent.is_none())
            .map(|(i, _)| i)
            .collect();

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if visitor(index, node) {
                stack.extend(node.children.iter().rev());
            }
        }
    }

    /// Nodes carrying meshes whose world sphere passes the frustum.
    ///
    /// A node outside the frustum prunes its subtree only when its sphere is
    /// non-degenerate; zero-radius nodes are treated as pure grouping nodes.
    pub fn visible_nodes(&self, culler: &FrustumCuller) -> Vec<usize> {
        let mut visible = Vec::new();
        self.traverse_dfs(|index, node| {
            let sphere = node.world_sphere();
            if sphere.radius > 0.0 && !culler.test_sphere(&sphere.center, sphere.radius) {
                return false;
            }
            if !node.meshes.is_empty() {
                visible.push(index);
            }
            true
        });
        visible
    }

    /// Look up a node
    pub fn node(&self, index: usize) -> Option<&TransformNode> {
        self.nodes.get(index)
    }

    /// All nodes in index order
    pub fn nodes(&self) -> &[TransformNode] {
        &self.nodes
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drop every node (scene clear)
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.globals_dirty = false;
    }

    fn node_mut(&mut self, index: usize) -> RenderResult<&mut TransformNode> {
        self.nodes
            .get_mut(index)
            .ok_or_else(|| RenderError::InvalidReference(format!("transform node {index}")))
    }
}
