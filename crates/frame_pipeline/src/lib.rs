//! # Frame Pipeline
//!
//! Batched, LOD-aware, multi-pass frame rendering.
//!
//! ## Features
//!
//! - **Draw batching**: objects sharing shader, material, vertex layout and
//!   layer share one vertex buffer, one index buffer and one indirect command
//!   buffer, drawn with a single multi-draw submission
//! - **Level of detail**: every LOD is baked into the batch up front; switching
//!   LOD patches one indirect command in place
//! - **Culling**: view-frustum sphere tests per batch and per graph node
//! - **Pass pipeline**: shadow, skybox, grid, geometry, debug lights, terrain,
//!   visual effects and post-processing, run in fixed order each frame
//! - **Backend agnostic**: everything talks to a [`render::GraphicsDevice`];
//!   [`render::backends::HeadlessDevice`] runs the whole pipeline in memory
//!
//! ## Quick Start
//!
//! ```rust
//! use frame_pipeline::prelude::*;
//!
//! let mut device = HeadlessDevice::new();
//! let mut renderer = Renderer::new(RendererConfig::default(), &mut device).unwrap();
//!
//! let cube = Mesh::cube(3);
//! let mesh_id = renderer.add_mesh(cube.clone());
//! for x in 0..4 {
//!     let transform = Mat4::new_translation(&Vec3::new(x as f32 * 3.0, 0.0, 0.0));
//!     let object = RenderableObject::new(mesh_id, &cube, VertexLayout::STANDARD, MaterialId(1), "lit", transform);
//!     renderer.add_render_object(object).unwrap();
//! }
//! renderer.build_batches(&mut device);
//! assert_eq!(renderer.batches().len(), 1);
//!
//! let camera = Camera::perspective(Vec3::new(0.0, 5.0, 20.0), 60.0, 4.0 / 3.0, 0.1, 500.0);
//! renderer.cull_and_lod_update(&camera, &mut device);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod config;
pub mod scene;
pub mod render;

mod renderer;

pub use renderer::{GraphBindings, Renderer, RendererError};

/// Common imports for pipeline users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, PostSettings, RendererConfig, ShadowSettings},
        foundation::math::{Aabb, Mat4, Vec3},
        render::{
            backends::HeadlessDevice,
            Camera, FrameStats, GraphicsDevice, Light, Material, MaterialId, MaterialRegistry, RenderError,
            RenderResult, ResourceContext, ShaderHandle, ShaderRegistry, TextureRegistry,
        },
        scene::{
            FrustumCuller, LodSelector, Mesh, MeshArena, MeshId, RenderLayer, RenderableObject, TransformGraph,
            VertexLayout,
        },
        GraphBindings, Renderer, RendererError,
    };
}
