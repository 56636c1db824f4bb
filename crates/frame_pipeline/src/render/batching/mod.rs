//! # Batching
//!
//! Objects sharing shader, material, vertex layout and render layer are
//! merged into one [`DrawBatch`]: a combined vertex buffer, a combined index
//! buffer holding every LOD of every member, and one indirect draw command
//! per member. The [`BatchRegistry`] owns all batches and routes LOD changes.

pub mod draw_batch;
pub mod batch_registry;

pub use draw_batch::{BatchGeometry, BatchKey, DrawBatch, DrawCommand, GpuBuffers, LodRange, COMMAND_STRIDE};
pub use batch_registry::{BatchRegistry, BatchStats};
