//! In-memory graphics backend
//!
//! `HeadlessDevice` keeps the bytes of every buffer it creates, enforces
//! buffer capacities exactly like a GPU allocation would, and records every
//! call it receives. Tests inspect the call log and read buffers back to check
//! what the pipeline submitted.

use std::collections::HashMap;

use crate::foundation::math::Mat4;
use crate::render::api::{
    BackendResult, BufferHandle, BufferKind, FramebufferDesc, FramebufferHandle, FramebufferTargets,
    GraphicsDevice, PassState, ShaderHandle, TextureHandle,
};
use crate::render::RenderError;
use crate::scene::VertexLayout;

/// One recorded device call
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    /// Buffer created
    CreateBuffer {
        /// New handle
        buffer: BufferHandle,
        /// Binding kind
        kind: BufferKind,
        /// Capacity in bytes
        size: usize,
    },
    /// Sub-range write
    WriteBuffer {
        /// Target buffer
        buffer: BufferHandle,
        /// Byte offset
        offset: u64,
        /// Byte count
        size: usize,
    },
    /// Buffer released
    DestroyBuffer(BufferHandle),
    /// Framebuffer created
    CreateFramebuffer {
        /// New handle
        framebuffer: FramebufferHandle,
        /// Width in pixels
        width: u32,
        /// Height in pixels
        height: u32,
    },
    /// Framebuffer released
    DestroyFramebuffer(FramebufferHandle),
    /// Render target selected
    BindFramebuffer {
        /// Target, `None` for the presentation surface
        framebuffer: Option<FramebufferHandle>,
        /// Viewport width
        width: u32,
        /// Viewport height
        height: u32,
    },
    /// Target cleared
    Clear {
        /// Clear color, if cleared
        color: Option<[f32; 4]>,
        /// Clear depth, if cleared
        depth: Option<f32>,
    },
    /// Fixed-function state applied
    ApplyState(PassState),
    /// Shader bound
    BindShader(ShaderHandle),
    /// Matrix uniform set
    SetUniformMat4 {
        /// Uniform name
        name: String,
        /// Value
        value: Mat4,
    },
    /// Vector uniform set
    SetUniformVec4 {
        /// Uniform name
        name: String,
        /// Value
        value: [f32; 4],
    },
    /// Texture bound
    BindTexture {
        /// Sampler slot
        slot: u32,
        /// Texture
        texture: TextureHandle,
    },
    /// Geometry bound
    BindGeometry {
        /// Vertex buffer
        vertex: BufferHandle,
        /// Index buffer
        index: Option<BufferHandle>,
        /// Vertex layout
        layout: VertexLayout,
    },
    /// Non-indexed draw
    DrawArrays {
        /// First vertex
        first_vertex: u32,
        /// Vertex count
        vertex_count: u32,
    },
    /// Indirect multi-draw submission
    MultiDrawIndexedIndirect {
        /// Command buffer
        indirect: BufferHandle,
        /// Number of commands
        draw_count: u32,
        /// Command stride in bytes
        stride: u32,
    },
    /// Frame presented
    Present,
}

/// Headless backend that records calls and stores buffer contents
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    next_handle: u64,
    buffers: HashMap<BufferHandle, (BufferKind, Vec<u8>)>,
    framebuffers: HashMap<FramebufferHandle, FramebufferDesc>,
    calls: Vec<DeviceCall>,
    memory_budget: Option<usize>,
    frames_presented: u64,
}

impl HeadlessDevice {
    /// Create an empty device
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the total bytes of live buffers; creations past the cap fail
    pub fn with_memory_budget(mut self, bytes: usize) -> Self {
        self.memory_budget = Some(bytes);
        self
    }

    /// Every call since creation or the last [`clear_calls`](Self::clear_calls)
    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    /// Forget recorded calls (buffers and framebuffers stay alive)
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Number of recorded calls matching `predicate`
    pub fn count_calls(&self, predicate: impl Fn(&DeviceCall) -> bool) -> usize {
        self.calls.iter().filter(|c| predicate(c)).count()
    }

    /// Draw submissions (multi-draws and array draws) recorded
    pub fn draw_submissions(&self) -> usize {
        self.count_calls(|c| {
            matches!(c, DeviceCall::MultiDrawIndexedIndirect { .. } | DeviceCall::DrawArrays { .. })
        })
    }

    /// Current bytes of a live buffer
    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(|(_, bytes)| bytes.as_slice())
    }

    /// Number of live buffers
    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Number of live framebuffers
    pub fn live_framebuffers(&self) -> usize {
        self.framebuffers.len()
    }

    /// Description of a live framebuffer
    pub fn framebuffer(&self, framebuffer: FramebufferHandle) -> Option<&FramebufferDesc> {
        self.framebuffers.get(&framebuffer)
    }

    /// Frames presented so far
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    fn allocate(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn live_bytes(&self) -> usize {
        self.buffers.values().map(|(_, bytes)| bytes.len()).sum()
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> BackendResult<BufferHandle> {
        if let Some(budget) = self.memory_budget {
            if self.live_bytes() + data.len() > budget {
                return Err(RenderError::Backend(format!(
                    "out of device memory: {} bytes requested, {} of {} in use",
                    data.len(),
                    self.live_bytes(),
                    budget
                )));
            }
        }
        let buffer = BufferHandle(self.allocate());
        self.buffers.insert(buffer, (kind, data.to_vec()));
        self.calls.push(DeviceCall::CreateBuffer { buffer, kind, size: data.len() });
        Ok(buffer)
    }

    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) -> BackendResult<()> {
        let (_, bytes) = self
            .buffers
            .get_mut(&buffer)
            .ok_or_else(|| RenderError::InvalidReference(format!("buffer {buffer:?}")))?;
        let start = usize::try_from(offset).map_err(|_| RenderError::BufferOverflow {
            offset,
            size: data.len(),
            capacity: bytes.len(),
        })?;
        let end = start.checked_add(data.len()).filter(|&end| end <= bytes.len()).ok_or(
            RenderError::BufferOverflow { offset, size: data.len(), capacity: bytes.len() },
        )?;
        bytes[start..end].copy_from_slice(data);
        self.calls.push(DeviceCall::WriteBuffer { buffer, offset, size: data.len() });
        Ok(())
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        if self.buffers.remove(&buffer).is_some() {
            self.calls.push(DeviceCall::DestroyBuffer(buffer));
        } else {
            log::warn!("Destroying unknown buffer {:?}", buffer);
        }
    }

    fn create_framebuffer(&mut self, desc: &FramebufferDesc) -> BackendResult<FramebufferTargets> {
        if desc.width == 0 || desc.height == 0 {
            return Err(RenderError::Backend(format!(
                "framebuffer '{}' has zero size {}x{}",
                desc.label, desc.width, desc.height
            )));
        }
        let framebuffer = FramebufferHandle(self.allocate());
        let color = desc.color.then(|| TextureHandle(self.allocate()));
        let depth = desc.depth.then(|| TextureHandle(self.allocate()));
        self.framebuffers.insert(framebuffer, desc.clone());
        self.calls.push(DeviceCall::CreateFramebuffer { framebuffer, width: desc.width, height: desc.height });
        Ok(FramebufferTargets { framebuffer, color, depth })
    }

    fn destroy_framebuffer(&mut self, framebuffer: FramebufferHandle) {
        if self.framebuffers.remove(&framebuffer).is_some() {
            self.calls.push(DeviceCall::DestroyFramebuffer(framebuffer));
        }
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferHandle>, width: u32, height: u32) {
        self.calls.push(DeviceCall::BindFramebuffer { framebuffer, width, height });
    }

    fn clear(&mut self, color: Option<[f32; 4]>, depth: Option<f32>) {
        self.calls.push(DeviceCall::Clear { color, depth });
    }

    fn apply_state(&mut self, state: &PassState) {
        self.calls.push(DeviceCall::ApplyState(*state));
    }

    fn bind_shader(&mut self, shader: ShaderHandle) {
        self.calls.push(DeviceCall::BindShader(shader));
    }

    fn set_uniform_mat4(&mut self, name: &str, value: &Mat4) {
        self.calls.push(DeviceCall::SetUniformMat4 { name: name.to_string(), value: *value });
    }

    fn set_uniform_vec4(&mut self, name: &str, value: [f32; 4]) {
        self.calls.push(DeviceCall::SetUniformVec4 { name: name.to_string(), value });
    }

    fn bind_texture(&mut self, slot: u32, texture: TextureHandle) {
        self.calls.push(DeviceCall::BindTexture { slot, texture });
    }

    fn bind_geometry(&mut self, vertex: BufferHandle, index: Option<BufferHandle>, layout: VertexLayout) {
        self.calls.push(DeviceCall::BindGeometry { vertex, index, layout });
    }

    fn draw_arrays(&mut self, first_vertex: u32, vertex_count: u32) {
        self.calls.push(DeviceCall::DrawArrays { first_vertex, vertex_count });
    }

    fn multi_draw_indexed_indirect(&mut self, indirect: BufferHandle, draw_count: u32, stride: u32) {
        self.calls.push(DeviceCall::MultiDrawIndexedIndirect { indirect, draw_count, stride });
    }

    fn present(&mut self) {
        self.frames_presented += 1;
        self.calls.push(DeviceCall::Present);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_within_capacity() {
        let mut device = HeadlessDevice::new();
        let buffer = device.create_buffer(BufferKind::Indirect, &[0u8; 16]).unwrap();
        device.write_buffer(buffer, 4, &[1, 2, 3, 4]).unwrap();

        assert_eq!(&device.buffer_contents(buffer).unwrap()[4..8], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_write_past_capacity_overflows() {
        let mut device = HeadlessDevice::new();
        let buffer = device.create_buffer(BufferKind::Indirect, &[0u8; 16]).unwrap();
        let result = device.write_buffer(buffer, 12, &[0u8; 8]);

        assert!(matches!(result, Err(RenderError::BufferOverflow { capacity: 16, .. })));
        assert_eq!(device.buffer_contents(buffer).unwrap(), &[0u8; 16]);
    }

    #[test]
    fn test_memory_budget() {
        let mut device = HeadlessDevice::new().with_memory_budget(32);
        let first = device.create_buffer(BufferKind::Vertex, &[0u8; 24]).unwrap();
        assert!(device.create_buffer(BufferKind::Index, &[0u8; 16]).is_err());

        device.destroy_buffer(first);
        assert!(device.create_buffer(BufferKind::Index, &[0u8; 16]).is_ok());
    }

    #[test]
    fn test_framebuffer_attachments() {
        let mut device = HeadlessDevice::new();
        let desc = FramebufferDesc { label: "shadow".into(), width: 512, height: 512, color: false, depth: true };
        let targets = device.create_framebuffer(&desc).unwrap();

        assert!(targets.color.is_none());
        assert!(targets.depth.is_some());
        assert_eq!(device.live_framebuffers(), 1);
    }
}
