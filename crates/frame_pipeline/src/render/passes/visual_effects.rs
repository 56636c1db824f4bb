//! Additive effect geometry (particles, glows) over the lit scene

use super::{draw_layer, set_camera_uniforms, Executable, PassTarget, Resizable};
use crate::render::api::{BlendMode, DepthTest, GraphicsDevice, PassState};
use crate::render::frame::SceneView;
use crate::render::framebuffer::{Framebuffer, RenderTargets};
use crate::render::RenderResult;
use crate::scene::RenderLayer;

/// Draws every visible `Effect` batch with additive blending.
///
/// Effects are depth tested against the scene but never write depth, and
/// both faces are drawn.
#[derive(Debug, Default)]
pub struct VisualEffectsPass {
    pub(super) target: PassTarget,
}

impl VisualEffectsPass {
    /// Create the pass
    pub fn new() -> Self {
        Self::default()
    }
}

impl Executable for VisualEffectsPass {
    fn state(&self) -> PassState {
        PassState::depth_read_only(BlendMode::Additive, DepthTest::Less)
    }

    fn execute(
        &mut self,
        scene: &SceneView<'_>,
        _targets: &RenderTargets,
        device: &mut dyn GraphicsDevice,
    ) -> RenderResult<usize> {
        self.target.bind(device)?;
        Ok(draw_layer(scene, RenderLayer::Effect, device, |device| set_camera_uniforms(scene, device)))
    }
}

impl Resizable for VisualEffectsPass {
    fn update_framebuffer(&mut self, framebuffer: &Framebuffer) {
        self.target.update(framebuffer);
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::Fixture;
    use super::*;
    use crate::render::backends::HeadlessDevice;

    #[test]
    fn test_effect_state_and_draw() {
        let mut device = HeadlessDevice::new();
        let fixture = Fixture::new(&mut device);
        let mut pass = VisualEffectsPass::new();
        pass.update_framebuffer(&fixture.scene);

        assert_eq!(pass.execute(&fixture.view(), &fixture.targets, &mut device).unwrap(), 1);
        let state = pass.state();
        assert_eq!(state.depth_test, DepthTest::Less);
        assert!(!state.depth_write);
    }
}
