//! Scene-side data consumed by the batching layer
//!
//! - **TransformGraph**: hierarchical node tree with local/global transforms
//! - **Mesh / MeshArena**: vertex streams plus ordered LOD index ranges
//! - **RenderableObject**: one drawable instance referencing a mesh by id
//! - **LodSelector**: distance-band LOD selection
//! - **FrustumCuller**: view-frustum plane extraction and sphere tests

pub mod mesh;
pub mod transform_graph;
pub mod renderable_object;
pub mod lod;
pub mod culling;

pub use mesh::{Mesh, MeshArena, Positions, VertexLayout, VertexStreams};
pub use transform_graph::{MeshReference, TransformGraph, TransformNode};
pub use renderable_object::{RenderLayer, RenderableObject};
pub use lod::{LodSelector, DEFAULT_LOD_THRESHOLDS};
pub use culling::{Frustum, FrustumCuller, Plane};
pub use crate::foundation::collections::MeshId;
