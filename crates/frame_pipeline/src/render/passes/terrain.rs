//! Terrain layer, drawn after the main geometry with the same lighting

use super::geometry::set_lighting_uniforms;
use super::{draw_layer, Executable, PassTarget, Resizable};
use crate::config::ShadowSettings;
use crate::render::api::{GraphicsDevice, PassState};
use crate::render::frame::SceneView;
use crate::render::framebuffer::{Framebuffer, RenderTargets};
use crate::render::RenderResult;
use crate::scene::RenderLayer;

/// Draws every visible `Terrain` batch
#[derive(Debug)]
pub struct TerrainPass {
    pub(super) target: PassTarget,
    shadows: ShadowSettings,
}

impl TerrainPass {
    /// Create the pass; `shadows` must match the shadow pass settings
    pub fn new(shadows: ShadowSettings) -> Self {
        Self { target: PassTarget::default(), shadows }
    }
}

impl Executable for TerrainPass {
    fn state(&self) -> PassState {
        PassState::opaque()
    }

    fn execute(
        &mut self,
        scene: &SceneView<'_>,
        targets: &RenderTargets,
        device: &mut dyn GraphicsDevice,
    ) -> RenderResult<usize> {
        self.target.bind(device)?;
        let shadows = self.shadows;
        Ok(draw_layer(scene, RenderLayer::Terrain, device, |device| {
            set_lighting_uniforms(scene, targets, &shadows, device);
        }))
    }
}

impl Resizable for TerrainPass {
    fn update_framebuffer(&mut self, framebuffer: &Framebuffer) {
        self.target.update(framebuffer);
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::Fixture;
    use super::*;
    use crate::render::backends::{DeviceCall, HeadlessDevice};

    #[test]
    fn test_draws_terrain_batch_only() {
        let mut device = HeadlessDevice::new();
        let fixture = Fixture::new(&mut device);
        let mut pass = TerrainPass::new(ShadowSettings::default());
        pass.update_framebuffer(&fixture.scene);
        device.clear_calls();

        assert_eq!(pass.execute(&fixture.view(), &fixture.targets, &mut device).unwrap(), 1);
        let terrain = fixture.shaders.get("terrain").unwrap();
        assert!(device.calls().contains(&DeviceCall::BindShader(terrain)));
    }
}
