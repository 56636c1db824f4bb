//! Mesh representation with level-of-detail index ranges
//!
//! A mesh owns its vertex streams and an ordered list of index ranges, one per
//! LOD (LOD 0 is the most detailed). Meshes live in a [`MeshArena`] for the
//! lifetime of a scene; renderables and batches refer to them by [`MeshId`]
//! and never own them.

use bitflags::bitflags;

use crate::foundation::collections::{MeshId, MeshMap};
use crate::foundation::math::{Aabb, BoundingSphere, Vec3};
use crate::render::{RenderError, RenderResult};

bitflags! {
    /// Set of vertex attributes interleaved into a vertex buffer.
    ///
    /// Attributes are always interleaved in declaration order:
    /// position, normal, texcoord, tangent, color.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct VertexLayout: u32 {
        /// Two-component position
        const POSITION_2D = 1 << 0;
        /// Three-component position
        const POSITION_3D = 1 << 1;
        /// Three-component normal
        const NORMAL = 1 << 2;
        /// Two-component texture coordinate
        const TEXCOORD = 1 << 3;
        /// Three-component tangent
        const TANGENT = 1 << 4;
        /// Four-component vertex color
        const COLOR = 1 << 5;
    }
}

impl VertexLayout {
    /// Position, normal and texture coordinates
    pub const STANDARD: Self = Self::POSITION_3D.union(Self::NORMAL).union(Self::TEXCOORD);

    /// Standard layout plus tangents for normal mapping
    pub const STANDARD_TANGENT: Self = Self::STANDARD.union(Self::TANGENT);

    /// Position dimensionality, or `None` when the layout names zero or both
    pub fn position_dims(self) -> Option<usize> {
        match (self.contains(Self::POSITION_2D), self.contains(Self::POSITION_3D)) {
            (true, false) => Some(2),
            (false, true) => Some(3),
            _ => None,
        }
    }

    /// Floats per interleaved vertex
    pub fn stride_floats(self) -> usize {
        let mut stride = self.position_dims().unwrap_or(0);
        if self.contains(Self::NORMAL) {
            stride += 3;
        }
        if self.contains(Self::TEXCOORD) {
            stride += 2;
        }
        if self.contains(Self::TANGENT) {
            stride += 3;
        }
        if self.contains(Self::COLOR) {
            stride += 4;
        }
        stride
    }

    /// Bytes per interleaved vertex
    pub fn stride_bytes(self) -> usize {
        self.stride_floats() * std::mem::size_of::<f32>()
    }
}

/// Position stream in either two or three dimensions
#[derive(Debug, Clone, PartialEq)]
pub enum Positions {
    /// Planar positions (sprites, UI geometry, 2D shapes)
    Dim2(Vec<[f32; 2]>),
    /// Spatial positions
    Dim3(Vec<[f32; 3]>),
}

impl Positions {
    /// Number of vertices
    pub fn len(&self) -> usize {
        match self {
            Self::Dim2(p) => p.len(),
            Self::Dim3(p) => p.len(),
        }
    }

    /// True when there are no vertices
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Component count per position
    pub fn dims(&self) -> usize {
        match self {
            Self::Dim2(_) => 2,
            Self::Dim3(_) => 3,
        }
    }

    /// Position `i` lifted to 3D (z = 0 for planar data)
    pub fn point(&self, i: usize) -> Vec3 {
        match self {
            Self::Dim2(p) => Vec3::new(p[i][0], p[i][1], 0.0),
            Self::Dim3(p) => Vec3::new(p[i][0], p[i][1], p[i][2]),
        }
    }
}

/// Separate (non-interleaved) vertex attribute streams
#[derive(Debug, Clone, PartialEq)]
pub struct VertexStreams {
    /// Required positions
    pub positions: Positions,
    /// Optional normals
    pub normals: Option<Vec<[f32; 3]>>,
    /// Optional texture coordinates
    pub tex_coords: Option<Vec<[f32; 2]>>,
    /// Optional tangents
    pub tangents: Option<Vec<[f32; 3]>>,
    /// Optional vertex colors
    pub colors: Option<Vec<[f32; 4]>>,
}

impl VertexStreams {
    /// Streams holding only 3D positions
    pub fn from_positions(positions: Vec<[f32; 3]>) -> Self {
        Self {
            positions: Positions::Dim3(positions),
            normals: None,
            tex_coords: None,
            tangents: None,
            colors: None,
        }
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Append one vertex to `out`, interleaved per `layout`. Streams the layout
    /// asks for but the mesh lacks are zero-filled.
    pub fn write_vertex(&self, index: usize, layout: VertexLayout, out: &mut Vec<f32>) {
        match (&self.positions, layout.position_dims()) {
            (Positions::Dim2(p), Some(2)) => out.extend_from_slice(&p[index]),
            (Positions::Dim3(p), Some(3)) => out.extend_from_slice(&p[index]),
            // Dimensionality is checked before interleaving starts.
            (_, dims) => out.extend(std::iter::repeat(0.0).take(dims.unwrap_or(0))),
        }
        if layout.contains(VertexLayout::NORMAL) {
            push_or_zero(out, self.normals.as_deref().map(|n| &n[index][..]), 3);
        }
        if layout.contains(VertexLayout::TEXCOORD) {
            push_or_zero(out, self.tex_coords.as_deref().map(|t| &t[index][..]), 2);
        }
        if layout.contains(VertexLayout::TANGENT) {
            push_or_zero(out, self.tangents.as_deref().map(|t| &t[index][..]), 3);
        }
        if layout.contains(VertexLayout::COLOR) {
            push_or_zero(out, self.colors.as_deref().map(|c| &c[index][..]), 4);
        }
    }

    fn check_stream_lengths(&self) -> RenderResult<()> {
        let count = self.vertex_count();
        let lengths = [
            ("normals", self.normals.as_ref().map(Vec::len)),
            ("tex_coords", self.tex_coords.as_ref().map(Vec::len)),
            ("tangents", self.tangents.as_ref().map(Vec::len)),
            ("colors", self.colors.as_ref().map(Vec::len)),
        ];
        for (name, len) in lengths {
            if let Some(len) = len {
                if len != count {
                    return Err(RenderError::InconsistentLayout(format!(
                        "{name} stream has {len} entries, expected {count}"
                    )));
                }
            }
        }
        Ok(())
    }
}

fn push_or_zero(out: &mut Vec<f32>, values: Option<&[f32]>, width: usize) {
    match values {
        Some(values) => out.extend_from_slice(values),
        None => out.extend(std::iter::repeat(0.0).take(width)),
    }
}

/// 3D mesh with vertex streams and per-LOD index lists
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Debug name
    pub name: String,
    streams: VertexStreams,
    lods: Vec<Vec<u32>>,
    bounds: Aabb,
    sphere: BoundingSphere,
}

impl Mesh {
    /// Create a mesh, validating stream lengths and index ranges.
    ///
    /// Object-space bounds are derived from the positions.
    pub fn new(name: impl Into<String>, streams: VertexStreams, lods: Vec<Vec<u32>>) -> RenderResult<Self> {
        let name = name.into();
        if lods.is_empty() {
            return Err(RenderError::InvalidReference(format!("mesh '{name}' has no LOD index ranges")));
        }
        streams.check_stream_lengths()?;

        let vertex_count = streams.vertex_count();
        for (level, indices) in lods.iter().enumerate() {
            if let Some(bad) = indices.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(RenderError::InvalidReference(format!(
                    "mesh '{name}' LOD {level} references vertex {bad} of {vertex_count}"
                )));
            }
        }

        let mut bounds = Aabb::empty();
        for i in 0..vertex_count {
            bounds.extend(streams.positions.point(i));
        }
        if bounds.is_empty() {
            bounds = Aabb::new(Vec3::zeros(), Vec3::zeros());
        }
        let sphere = bounds.bounding_sphere();

        Ok(Self { name, streams, lods, bounds, sphere })
    }

    /// Vertex streams
    pub fn streams(&self) -> &VertexStreams {
        &self.streams
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.streams.vertex_count()
    }

    /// Number of LOD levels (at least one)
    pub fn lod_count(&self) -> usize {
        self.lods.len()
    }

    /// Highest valid LOD index
    pub fn max_lod(&self) -> usize {
        self.lods.len() - 1
    }

    /// Indices of `level`; absent levels fall back to the coarsest available one
    pub fn lod_indices(&self, level: usize) -> &[u32] {
        &self.lods[level.min(self.max_lod())]
    }

    /// All LOD index lists, most detailed first
    pub fn lods(&self) -> &[Vec<u32>] {
        &self.lods
    }

    /// Object-space axis-aligned bounds
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Object-space bounding sphere
    pub fn bounding_sphere(&self) -> BoundingSphere {
        self.sphere
    }

    /// Unit cube (half-extent 1) with normals and texture coordinates.
    ///
    /// LOD `k` keeps the first `12 >> k` triangles (at least one), which is
    /// enough to exercise the LOD machinery with a real mesh.
    pub fn cube(lod_count: usize) -> Self {
        let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
            ([0.0, 0.0, 1.0], [[-1.0, -1.0, 1.0], [1.0, -1.0, 1.0], [1.0, 1.0, 1.0], [-1.0, 1.0, 1.0]]),
            ([0.0, 0.0, -1.0], [[1.0, -1.0, -1.0], [-1.0, -1.0, -1.0], [-1.0, 1.0, -1.0], [1.0, 1.0, -1.0]]),
            ([1.0, 0.0, 0.0], [[1.0, -1.0, 1.0], [1.0, -1.0, -1.0], [1.0, 1.0, -1.0], [1.0, 1.0, 1.0]]),
            ([-1.0, 0.0, 0.0], [[-1.0, -1.0, -1.0], [-1.0, -1.0, 1.0], [-1.0, 1.0, 1.0], [-1.0, 1.0, -1.0]]),
            ([0.0, 1.0, 0.0], [[-1.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, -1.0], [-1.0, 1.0, -1.0]]),
            ([0.0, -1.0, 0.0], [[-1.0, -1.0, -1.0], [1.0, -1.0, -1.0], [1.0, -1.0, 1.0], [-1.0, -1.0, 1.0]]),
        ];
        let uvs = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

        let mut positions = Vec::with_capacity(24);
        let mut normals = Vec::with_capacity(24);
        let mut tex_coords = Vec::with_capacity(24);
        let mut full = Vec::with_capacity(36);
        for (face, (normal, corners)) in faces.iter().enumerate() {
            let base = (face * 4) as u32;
            for (corner, uv) in corners.iter().zip(uvs.iter()) {
                positions.push(*corner);
                normals.push(*normal);
                tex_coords.push(*uv);
            }
            full.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
        }

        let lods = (0..lod_count.max(1))
            .map(|level| {
                let triangles = (12usize >> level.min(4)).max(1);
                full[..triangles * 3].to_vec()
            })
            .collect();

        let streams = VertexStreams {
            positions: Positions::Dim3(positions),
            normals: Some(normals),
            tex_coords: Some(tex_coords),
            tangents: None,
            colors: None,
        };
        let bounds = Aabb::new(Vec3::repeat(-1.0), Vec3::repeat(1.0));
        Self {
            name: "cube".to_string(),
            streams,
            lods,
            bounds,
            sphere: bounds.bounding_sphere(),
        }
    }
}

/// Arena owning every mesh of the scene
#[derive(Debug, Default)]
pub struct MeshArena {
    meshes: MeshMap<Mesh>,
}

impl MeshArena {
    /// Create an empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a mesh and return its id
    pub fn insert(&mut self, mesh: Mesh) -> MeshId {
        self.meshes.insert(mesh)
    }

    /// Look up a mesh
    pub fn get(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(id)
    }

    /// Look up a mesh, failing with `MissingResource`
    pub fn require(&self, id: MeshId) -> RenderResult<&Mesh> {
        self.meshes
            .get(id)
            .ok_or_else(|| RenderError::MissingResource(format!("mesh {id:?}")))
    }

    /// Number of stored meshes
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    /// True when the arena is empty
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Drop every mesh (scene clear)
    pub fn clear(&mut self) {
        self.meshes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_strides() {
        assert_eq!(VertexLayout::STANDARD.stride_floats(), 8);
        assert_eq!(VertexLayout::STANDARD_TANGENT.stride_bytes(), 44);
        assert_eq!((VertexLayout::POSITION_2D | VertexLayout::COLOR).stride_floats(), 6);
        assert_eq!((VertexLayout::POSITION_2D | VertexLayout::POSITION_3D).position_dims(), None);
    }

    #[test]
    fn test_missing_tangents_are_zero_filled() {
        let mesh = Mesh::cube(1);
        let mut out = Vec::new();
        mesh.streams().write_vertex(0, VertexLayout::STANDARD_TANGENT, &mut out);

        assert_eq!(out.len(), 11);
        assert_eq!(&out[0..3], &[-1.0, -1.0, 1.0]);
        assert_eq!(&out[8..11], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_cube_lods_shrink() {
        let mesh = Mesh::cube(3);
        assert_eq!(mesh.lod_count(), 3);
        assert_eq!(mesh.lod_indices(0).len(), 36);
        assert_eq!(mesh.lod_indices(1).len(), 18);
        assert_eq!(mesh.lod_indices(2).len(), 9);
        // Absent levels fall back to the coarsest one.
        assert_eq!(mesh.lod_indices(7).len(), 9);
    }

    #[test]
    fn test_out_of_range_index_rejected() {
        let streams = VertexStreams::from_positions(vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        let result = Mesh::new("tri", streams, vec![vec![0, 1, 3]]);
        assert!(matches!(result, Err(RenderError::InvalidReference(_))));
    }

    #[test]
    fn test_mismatched_stream_rejected() {
        let mut streams = VertexStreams::from_positions(vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        streams.normals = Some(vec![[0.0, 0.0, 1.0]]);
        let result = Mesh::new("tri", streams, vec![vec![0, 1, 2]]);
        assert!(matches!(result, Err(RenderError::InconsistentLayout(_))));
    }

    #[test]
    fn test_arena_require_missing() {
        let mut arena = MeshArena::new();
        let id = arena.insert(Mesh::cube(1));
        assert!(arena.require(id).is_ok());

        arena.clear();
        assert!(matches!(arena.require(id), Err(RenderError::MissingResource(_))));
    }
}
