//! Tone mapping of the scene color into the presentation target

use super::{Executable, PassTarget, Resizable};
use crate::config::PostSettings;
use crate::render::api::{BlendMode, GraphicsDevice, PassState};
use crate::render::frame::SceneView;
use crate::render::framebuffer::{Framebuffer, RenderTargets, SCENE_COLOR};
use crate::render::{RenderError, RenderResult};

/// Shader key of the tone mapping program
pub const POST_SHADER: &str = "post_process";

/// Samples `scene_color` with a fullscreen triangle and writes the
/// presentation target at the scene resolution.
#[derive(Debug)]
pub struct PostProcessingPass {
    pub(super) target: PassTarget,
    settings: PostSettings,
}

impl PostProcessingPass {
    /// Create the pass
    pub fn new(settings: PostSettings) -> Self {
        Self { target: PassTarget::default(), settings }
    }

    /// Current tone mapping settings
    pub fn settings(&self) -> PostSettings {
        self.settings
    }

    /// Replace the tone mapping settings
    pub fn set_settings(&mut self, settings: PostSettings) {
        self.settings = settings;
    }
}

impl Executable for PostProcessingPass {
    fn state(&self) -> PassState {
        PassState::overlay(BlendMode::Opaque)
    }

    fn execute(
        &mut self,
        scene: &SceneView<'_>,
        targets: &RenderTargets,
        device: &mut dyn GraphicsDevice,
    ) -> RenderResult<usize> {
        let source = targets.require(SCENE_COLOR)?;
        let (width, height) = self.target.size();
        if width == 0 || height == 0 {
            return Err(RenderError::MissingResource("presentation size".to_string()));
        }
        scene.resources.shaders.bind(POST_SHADER, device)?;

        device.bind_framebuffer(None, width, height);
        device.bind_texture(0, source);
        device.set_uniform_vec4(
            "u_tonemap",
            [self.settings.exposure, self.settings.gamma, 1.0 / width as f32, 1.0 / height as f32],
        );
        device.draw_arrays(0, 3);
        Ok(1)
    }
}

impl Resizable for PostProcessingPass {
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
    fn test_writes_presentation_target_from_scene_color() {
        let mut device = HeadlessDevice::new();
        let fixture = Fixture::new(&mut device);
        let mut pass = PostProcessingPass::new(PostSettings { exposure: 1.5, gamma: 2.0 });
        pass.update_framebuffer(&fixture.scene);
        device.clear_calls();

        pass.execute(&fixture.view(), &fixture.targets, &mut device).unwrap();

        let calls = device.calls();
        assert!(calls.contains(&DeviceCall::BindFramebuffer { framebuffer: None, width: 800, height: 600 }));
        assert!(calls.contains(&DeviceCall::BindTexture {
            slot: 0,
            texture: fixture.scene.color_texture().unwrap(),
        }));
        assert!(calls.contains(&DeviceCall::DrawArrays { first_vertex: 0, vertex_count: 3 }));
    }

    #[test]
    fn test_missing_scene_color_skips_pass() {
        let mut device = HeadlessDevice::new();
        let mut fixture = Fixture::new(&mut device);
        fixture.targets.withdraw(SCENE_COLOR);
        let mut pass = PostProcessingPass::new(PostSettings::default());
        pass.update_framebuffer(&fixture.scene);
        device.clear_calls();

        let result = pass.execute(&fixture.view(), &fixture.targets, &mut device);
        assert!(matches!(result, Err(RenderError::MissingResource(_))));
        assert!(device.calls().is_empty());
    }
}
