//! Shader, material and texture registries
//!
//! Explicit registries owned by the application and lent to the pipeline
//! through [`ResourceContext`]. Each exposes a `bind` contract invoked right
//! before a draw; a missing entry surfaces as
//! [`RenderError::MissingResource`] and only the affected draw is skipped.

use std::collections::HashMap;

use super::api::{GraphicsDevice, ShaderHandle, TextureHandle};
use super::{RenderError, RenderResult};

/// Unique identifier for materials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct MaterialId(pub u32);

/// Texture slot the shadow map is bound to during lit passes
pub const SHADOW_MAP_SLOT: u32 = 7;

/// Maps string shader keys to compiled programs
#[derive(Debug, Default, Clone)]
pub struct ShaderRegistry {
    shaders: HashMap<String, ShaderHandle>,
}

impl ShaderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a shader under `key`
    pub fn register(&mut self, key: impl Into<String>, shader: ShaderHandle) {
        let key = key.into();
        if let Some(previous) = self.shaders.insert(key.clone(), shader) {
            log::debug!("Shader '{}' replaced ({:?} -> {:?})", key, previous, shader);
        }
    }

    /// Look up a shader
    pub fn get(&self, key: &str) -> Option<ShaderHandle> {
        self.shaders.get(key).copied()
    }

    /// Bind the shader registered under `key`
    pub fn bind(&self, key: &str, device: &mut dyn GraphicsDevice) -> RenderResult<ShaderHandle> {
        let shader = self
            .get(key)
            .ok_or_else(|| RenderError::MissingResource(format!("shader '{key}'")))?;
        device.bind_shader(shader);
        Ok(shader)
    }

    /// Number of registered shaders
    pub fn len(&self) -> usize {
        self.shaders.len()
    }

    /// True when no shader is registered
    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }
}

/// Surface parameters shared by every object of a batch
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Base color (linear RGBA)
    pub base_color: [f32; 4],
    /// Textures bound to sampler slots
    pub textures: Vec<(u32, TextureHandle)>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            base_color: [1.0, 1.0, 1.0, 1.0],
            textures: Vec::new(),
        }
    }
}

impl Material {
    /// Untextured material with a base color
    pub fn with_color(base_color: [f32; 4]) -> Self {
        Self { base_color, textures: Vec::new() }
    }
}

/// Central store of materials keyed by numeric id
#[derive(Debug, Default, Clone)]
pub struct MaterialRegistry {
    materials: HashMap<MaterialId, Material>,
}

impl MaterialRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a material
    pub fn register(&mut self, id: MaterialId, material: Material) {
        self.materials.insert(id, material);
    }

    /// Get a material by id
    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(&id)
    }

    /// Upload the material's parameters and bind its textures
    pub fn bind(&self, id: MaterialId, device: &mut dyn GraphicsDevice) -> RenderResult<()> {
        let material = self
            .get(id)
            .ok_or_else(|| RenderError::MissingResource(format!("material {}", id.0)))?;
        device.set_uniform_vec4("u_base_color", material.base_color);
        for &(slot, texture) in &material.textures {
            device.bind_texture(slot, texture);
        }
        Ok(())
    }

    /// Number of registered materials
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    /// True when no material is registered
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

/// Named sampled textures (skybox cubemap, lookup tables, ...)
#[derive(Debug, Default, Clone)]
pub struct TextureRegistry {
    textures: HashMap<String, TextureHandle>,
}

impl TextureRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a texture under `name`
    pub fn register(&mut self, name: impl Into<String>, texture: TextureHandle) {
        self.textures.insert(name.into(), texture);
    }

    /// Look up a texture
    pub fn get(&self, name: &str) -> Option<TextureHandle> {
        self.textures.get(name).copied()
    }

    /// Bind the texture registered under `name` to `slot`
    pub fn bind(&self, name: &str, slot: u32, device: &mut dyn GraphicsDevice) -> RenderResult<()> {
        let texture = self
            .get(name)
            .ok_or_else(|| RenderError::MissingResource(format!("texture '{name}'")))?;
        device.bind_texture(slot, texture);
        Ok(())
    }
}

/// Registries lent to the pipeline for one frame
#[derive(Debug, Clone, Copy)]
pub struct ResourceContext<'a> {
    /// Shader programs
    pub shaders: &'a ShaderRegistry,
    /// Materials
    pub materials: &'a MaterialRegistry,
    /// Sampled textures
    pub textures: &'a TextureRegistry,
}

impl<'a> ResourceContext<'a> {
    /// Bundle the three registries
    pub fn new(shaders: &'a ShaderRegistry, materials: &'a MaterialRegistry, textures: &'a TextureRegistry) -> Self {
        Self { shaders, materials, textures }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::{DeviceCall, HeadlessDevice};

    #[test]
    fn test_missing_shader_reports_missing_resource() {
        let registry = ShaderRegistry::new();
        let mut device = HeadlessDevice::new();
        let result = registry.bind("lit", &mut device);

        assert!(matches!(result, Err(RenderError::MissingResource(_))));
        assert!(device.calls().is_empty());
    }

    #[test]
    fn test_material_bind_uploads_color_and_textures() {
        let mut registry = MaterialRegistry::new();
        registry.register(
            MaterialId(3),
            Material { base_color: [0.5, 0.25, 1.0, 1.0], textures: vec![(0, TextureHandle(42))] },
        );
        let mut device = HeadlessDevice::new();
        registry.bind(MaterialId(3), &mut device).unwrap();

        assert_eq!(
            device.calls(),
            &[
                DeviceCall::SetUniformVec4 { name: "u_base_color".to_string(), value: [0.5, 0.25, 1.0, 1.0] },
                DeviceCall::BindTexture { slot: 0, texture: TextureHandle(42) },
            ]
        );
        assert!(registry.bind(MaterialId(4), &mut device).is_err());
    }
}
