//! Diagnostic markers at the position of every point light

use super::{set_camera_uniforms, Executable, PassTarget, Resizable};
use crate::foundation::math::Mat4;
use crate::render::api::{GraphicsDevice, PassState};
use crate::render::frame::SceneView;
use crate::render::framebuffer::{Framebuffer, RenderTargets};
use crate::render::RenderResult;

/// Shader key of the unlit marker program
pub const DEBUG_LIGHT_SHADER: &str = "debug_light";

/// Draws a small unlit cube per positioned light
#[derive(Debug)]
pub struct DebugLightsPass {
    pub(super) target: PassTarget,
    marker_size: f32,
}

impl Default for DebugLightsPass {
    fn default() -> Self {
        Self { target: PassTarget::default(), marker_size: 0.25 }
    }
}

impl DebugLightsPass {
    /// Create the pass
    pub fn new() -> Self {
        Self::default()
    }
}

impl Executable for DebugLightsPass {
    fn state(&self) -> PassState {
        PassState::opaque()
    }

    fn execute(
        &mut self,
        scene: &SceneView<'_>,
        _targets: &RenderTargets,
        device: &mut dyn GraphicsDevice,
    ) -> RenderResult<usize> {
        scene.resources.shaders.bind(DEBUG_LIGHT_SHADER, device)?;
        self.target.bind(device)?;
        set_camera_uniforms(scene, device);

        let mut draws = 0;
        for light in scene.lights {
            let Some(position) = light.position() else {
                continue;
            };
            let model = Mat4::new_translation(&position) * Mat4::new_scaling(self.marker_size);
            device.set_uniform_mat4("u_model", &model);
            device.set_uniform_vec4("u_color", light.radiance());
            device.draw_arrays(0, 36);
            draws += 1;
        }
        Ok(draws)
    }
}

impl Resizable for DebugLightsPass {
    fn update_framebuffer(&mut self, framebuffer: &Framebuffer) {
        self.target.update(framebuffer);
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::Fixture;
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::render::backends::HeadlessDevice;
    use crate::render::lighting::Light;

    #[test]
    fn test_one_marker_per_point_light() {
        let mut device = HeadlessDevice::new();
        let mut fixture = Fixture::new(&mut device);
        fixture.lights.push(Light::point(Vec3::new(5.0, 1.0, 0.0), 4.0, Vec3::new(0.0, 1.0, 0.0), 1.0));
        let mut pass = DebugLightsPass::new();
        pass.update_framebuffer(&fixture.scene);
        device.clear_calls();

        // The fixture's first light is directional and has no marker.
        assert_eq!(pass.execute(&fixture.view(), &fixture.targets, &mut device).unwrap(), 2);
        assert_eq!(device.draw_submissions(), 2);
    }
}
