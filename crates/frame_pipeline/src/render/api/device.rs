//! Backend abstraction trait for the rendering pipeline
//!
//! This trait abstracts over graphics backends and provides the small command
//! surface the batches and passes need. Window, device and context creation
//! stay with the application; it hands the pipeline something implementing
//! [`GraphicsDevice`].

use crate::foundation::math::Mat4;
use crate::render::RenderError;
use crate::scene::VertexLayout;

use super::handles::{BufferHandle, BufferKind, FramebufferHandle, ShaderHandle, TextureHandle};
use super::pass_state::PassState;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, RenderError>;

/// Description of an offscreen framebuffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramebufferDesc {
    /// Debug label
    pub label: String,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Create a color attachment
    pub color: bool,
    /// Create a depth attachment
    pub depth: bool,
}

/// A created framebuffer and its attachment textures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferTargets {
    /// Framebuffer handle
    pub framebuffer: FramebufferHandle,
    /// Color attachment, if requested
    pub color: Option<TextureHandle>,
    /// Depth attachment, if requested
    pub depth: Option<TextureHandle>,
}

/// Main rendering backend trait
///
/// All calls happen on the frame thread in submission order. Implementations
/// are free to defer work until [`present`](GraphicsDevice::present).
pub trait GraphicsDevice {
    /// Create a buffer initialised with `data`; its capacity is `data.len()`
    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> BackendResult<BufferHandle>;

    /// Overwrite `data.len()` bytes at `offset`. Writes past the capacity fail
    /// with [`RenderError::BufferOverflow`].
    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) -> BackendResult<()>;

    /// Release a buffer
    fn destroy_buffer(&mut self, buffer: BufferHandle);

    /// Create an offscreen framebuffer
    fn create_framebuffer(&mut self, desc: &FramebufferDesc) -> BackendResult<FramebufferTargets>;

    /// Release a framebuffer and its attachments
    fn destroy_framebuffer(&mut self, framebuffer: FramebufferHandle);

    /// Make `framebuffer` the render target; `None` selects the presentation surface
    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferHandle>, width: u32, height: u32);

    /// Clear the bound target
    fn clear(&mut self, color: Option<[f32; 4]>, depth: Option<f32>);

    /// Apply the complete fixed-function state
    fn apply_state(&mut self, state: &PassState);

    /// Bind a shader program
    fn bind_shader(&mut self, shader: ShaderHandle);

    /// Set a matrix uniform on the bound shader
    fn set_uniform_mat4(&mut self, name: &str, value: &Mat4);

    /// Set a vector uniform on the bound shader
    fn set_uniform_vec4(&mut self, name: &str, value: [f32; 4]);

    /// Bind a texture to a sampler slot
    fn bind_texture(&mut self, slot: u32, texture: TextureHandle);

    /// Bind vertex (and optionally index) buffers with the given layout
    fn bind_geometry(&mut self, vertex: BufferHandle, index: Option<BufferHandle>, layout: VertexLayout);

    /// Non-indexed draw from the bound vertex buffer; a missing vertex buffer
    /// means vertices are generated in the shader
    fn draw_arrays(&mut self, first_vertex: u32, vertex_count: u32);

    /// One submission drawing `draw_count` indexed commands from `indirect`
    fn multi_draw_indexed_indirect(&mut self, indirect: BufferHandle, draw_count: u32, stride: u32);

    /// Finish the frame
    fn present(&mut self);
}
