//! Offscreen render targets and the named textures passes exchange
//!
//! Passes never hold each other's state. A pass that produces an image
//! publishes its attachment under a well-known name in [`RenderTargets`];
//! consumers look it up by that name at execute time.

use std::collections::HashMap;

use crate::render::api::{FramebufferDesc, FramebufferHandle, GraphicsDevice, TextureHandle};
use crate::render::{RenderError, RenderResult};

/// Scene color attachment, written by the scene passes, read by post-processing
pub const SCENE_COLOR: &str = "scene_color";

/// Scene depth attachment
pub const SCENE_DEPTH: &str = "scene_depth";

/// Shadow map depth attachment, written by the shadow pass
pub const SHADOW_DEPTH: &str = "shadow_depth";

/// A framebuffer together with its attachments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framebuffer {
    desc: FramebufferDesc,
    handle: FramebufferHandle,
    color: Option<TextureHandle>,
    depth: Option<TextureHandle>,
}

impl Framebuffer {
    /// Create a framebuffer on the device
    pub fn create(device: &mut dyn GraphicsDevice, desc: FramebufferDesc) -> RenderResult<Self> {
        let targets = device.create_framebuffer(&desc)?;
        log::debug!(
            "Created framebuffer '{}' {}x{} ({:?})",
            desc.label,
            desc.width,
            desc.height,
            targets.framebuffer
        );
        Ok(Self { desc, handle: targets.framebuffer, color: targets.color, depth: targets.depth })
    }

    /// Color plus depth target for scene rendering
    pub fn scene(device: &mut dyn GraphicsDevice, width: u32, height: u32) -> RenderResult<Self> {
        Self::create(
            device,
            FramebufferDesc { label: "scene".to_string(), width, height, color: true, depth: true },
        )
    }

    /// Square depth-only target for shadow maps
    pub fn shadow_map(device: &mut dyn GraphicsDevice, size: u32) -> RenderResult<Self> {
        Self::create(
            device,
            FramebufferDesc { label: "shadow_map".to_string(), width: size, height: size, color: false, depth: true },
        )
    }

    /// Release the framebuffer
    pub fn destroy(self, device: &mut dyn GraphicsDevice) {
        device.destroy_framebuffer(self.handle);
    }

    /// Device handle
    pub fn handle(&self) -> FramebufferHandle {
        self.handle
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.desc.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.desc.height
    }

    /// Color attachment
    pub fn color_texture(&self) -> Option<TextureHandle> {
        self.color
    }

    /// Depth attachment
    pub fn depth_texture(&self) -> Option<TextureHandle> {
        self.depth
    }
}

/// Named texture handles shared between passes
#[derive(Debug, Default, Clone)]
pub struct RenderTargets {
    textures: HashMap<&'static str, TextureHandle>,
}

impl RenderTargets {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish (or replace) a texture under `name`
    pub fn publish(&mut self, name: &'static str, texture: TextureHandle) {
        self.textures.insert(name, texture);
    }

    /// Publish a framebuffer's attachments under the given names
    pub fn publish_framebuffer(&mut self, framebuffer: &Framebuffer, color: Option<&'static str>, depth: Option<&'static str>) {
        if let (Some(name), Some(texture)) = (color, framebuffer.color_texture()) {
            self.publish(name, texture);
        }
        if let (Some(name), Some(texture)) = (depth, framebuffer.depth_texture()) {
            self.publish(name, texture);
        }
    }

    /// Withdraw a texture
    pub fn withdraw(&mut self, name: &str) -> Option<TextureHandle> {
        self.textures.remove(name)
    }

    /// Look up a texture
    pub fn get(&self, name: &str) -> Option<TextureHandle> {
        self.textures.get(name).copied()
    }

    /// Look up a texture that must exist
    pub fn require(&self, name: &str) -> RenderResult<TextureHandle> {
        self.get(name).ok_or_else(|| RenderError::MissingResource(format!("texture '{name}'")))
    }
}
