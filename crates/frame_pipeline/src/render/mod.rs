//! # Rendering System
//!
//! Turns placed scene objects into an ordered sequence of draw submissions
//! across the frame's render passes.
//!
//! ## Architecture
//!
//! - **DrawBatch / BatchRegistry**: objects sharing shader, material and
//!   vertex layout are merged into shared buffers drawn with one indirect
//!   multi-draw; LOD switches patch single commands in place
//! - **Passes**: shadow, skybox, grid, geometry, debug lights, terrain, visual
//!   effects and post-processing, each a variant of [`passes::RenderPass`]
//! - **FrameOrchestrator**: owns the pass list and framebuffers and runs one
//!   frame in fixed order
//! - **GraphicsDevice**: the backend contract; [`backends::HeadlessDevice`]
//!   implements it in memory
//!
//! ## Failure model
//!
//! Nothing here aborts a frame. Missing resources skip the affected pass or
//! batch, failed rebuilds drop only the affected batch, and every such event
//! is logged.

pub mod api;
pub mod backends;
pub mod batching;
pub mod camera;
pub mod framebuffer;
pub mod frame;
pub mod lighting;
pub mod passes;
pub mod resources;

pub use api::{BufferHandle, FramebufferHandle, GraphicsDevice, PassState, ShaderHandle, TextureHandle};
pub use batching::{BatchKey, BatchRegistry, BatchStats, DrawBatch, DrawCommand, LodRange};
pub use camera::{Camera, Projection};
pub use framebuffer::{Framebuffer, RenderTargets};
pub use frame::{FrameOrchestrator, FrameStats, SceneView};
pub use lighting::{Light, LightType};
pub use passes::{PassKind, RenderPass};
pub use resources::{Material, MaterialId, MaterialRegistry, ResourceContext, ShaderRegistry, TextureRegistry};

use thiserror::Error;

/// Errors produced by the rendering pipeline
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// A node, object, buffer or mesh index does not exist
    ///
    /// Returned by construction-time calls; the call has no effect.
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// A shader, material, mesh or texture handle is absent at bind time
    ///
    /// The affected pass or batch is skipped for the frame.
    #[error("Missing resource: {0}")]
    MissingResource(String),

    /// A sub-range update would write past the allocated buffer
    ///
    /// The write is rejected and the owning batch is scheduled for a full rebuild.
    #[error("Buffer overflow: {size} bytes at offset {offset} exceed capacity {capacity}")]
    BufferOverflow {
        /// Byte offset of the rejected write
        offset: u64,
        /// Size of the rejected write
        size: usize,
        /// Allocated capacity of the buffer
        capacity: usize,
    },

    /// Objects with incompatible vertex layouts or dimensionality were batched
    ///
    /// The batch is rejected at build time; other batches are unaffected.
    #[error("Inconsistent layout: {0}")]
    InconsistentLayout(String),

    /// Backend-specific failure (allocation, device loss, ...)
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
