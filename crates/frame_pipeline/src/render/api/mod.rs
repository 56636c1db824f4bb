//! Public rendering API
//!
//! Backend-facing contract of the pipeline: opaque resource handles, the
//! per-pass fixed-function state value and the `GraphicsDevice` trait every
//! backend implements.

pub mod handles;
pub mod pass_state;
pub mod device;

pub use handles::{BufferHandle, BufferKind, FramebufferHandle, ShaderHandle, TextureHandle};
pub use pass_state::{BlendMode, CullMode, DepthBias, DepthTest, PassState};
pub use device::{BackendResult, FramebufferDesc, FramebufferTargets, GraphicsDevice};
