//! Opaque handles to backend resources
//!
//! The pipeline never looks inside these; they are minted by a
//! [`GraphicsDevice`](super::GraphicsDevice) or by the application's
//! registries and passed back verbatim.

/// Handle to a GPU buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub u64);

/// Handle to an offscreen framebuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FramebufferHandle(pub u64);

/// Handle to a texture (framebuffer attachment or sampled image)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u64);

/// Handle to a compiled shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderHandle(pub u64);

/// What a buffer is bound as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// Interleaved vertex data
    Vertex,
    /// 32-bit index data
    Index,
    /// Indexed indirect draw commands
    Indirect,
}
