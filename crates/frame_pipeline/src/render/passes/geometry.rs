//! Main opaque pass: every visible opaque batch, lit by the primary light

use super::shadow::light_space_matrix;
use super::{draw_layer, set_camera_uniforms, Executable, PassTarget, Resizable};
use crate::config::ShadowSettings;
use crate::foundation::math::Mat4;
use crate::render::api::{GraphicsDevice, PassState};
use crate::render::frame::SceneView;
use crate::render::framebuffer::{Framebuffer, RenderTargets, SHADOW_DEPTH};
use crate::render::resources::SHADOW_MAP_SLOT;
use crate::render::RenderResult;
use crate::scene::RenderLayer;

/// Upload camera, primary light and shadow lookup uniforms for a lit program.
///
/// The light-space matrix is derived from the same inputs the shadow pass
/// uses, so both agree without sharing state. Shadows are disabled in the
/// shader when the shadow map has not been published.
pub(crate) fn set_lighting_uniforms(
    scene: &SceneView<'_>,
    targets: &RenderTargets,
    shadows: &ShadowSettings,
    device: &mut dyn GraphicsDevice,
) {
    set_camera_uniforms(scene, device);

    let Some(light) = scene.lights.first() else {
        device.set_uniform_vec4("u_light_radiance", [0.0; 4]);
        device.set_uniform_vec4("u_shadow_params", [0.0; 4]);
        return;
    };
    device.set_uniform_vec4("u_light", light.shader_vector().into());
    device.set_uniform_vec4("u_light_radiance", light.radiance());

    let light_space = light_space_matrix(light, &scene.shadow_bounds, shadows);
    match (light_space, targets.get(SHADOW_DEPTH)) {
        (Some(matrix), Some(shadow_map)) => {
            device.set_uniform_mat4("u_light_space", &matrix);
            device.bind_texture(SHADOW_MAP_SLOT, shadow_map);
            device.set_uniform_vec4("u_shadow_params", [1.0, shadows.bias.constant, shadows.bias.slope, 0.0]);
        }
        _ => {
            device.set_uniform_mat4("u_light_space", &Mat4::identity());
            device.set_uniform_vec4("u_shadow_params", [0.0; 4]);
        }
    }
}

/// Draws the opaque layer
#[derive(Debug)]
pub struct GeometryPass {
    pub(super) target: PassTarget,
    shadows: ShadowSettings,
}

impl GeometryPass {
    /// Create the pass; `shadows` must match the shadow pass settings
    pub fn new(shadows: ShadowSettings) -> Self {
        Self { target: PassTarget::default(), shadows }
    }
}

impl Executable for GeometryPass {
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
        Ok(draw_layer(scene, RenderLayer::Opaque, device, |device| {
            set_lighting_uniforms(scene, targets, &shadows, device);
        }))
    }
}

impl Resizable for GeometryPass {
    fn update_framebuffer(&mut self, framebuffer: &Framebuffer) {
        self.target.update(framebuffer);
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::Fixture;
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::render::api::{BufferHandle, ShaderHandle, TextureHandle};
    use crate::render::backends::{DeviceCall, HeadlessDevice};
    use crate::render::camera::Camera;
    use crate::render::resources::ShaderRegistry;
    use crate::scene::FrustumCuller;

    fn bound_vertex_buffers(device: &HeadlessDevice) -> Vec<BufferHandle> {
        device
            .calls()
            .iter()
            .filter_map(|c| match c {
                DeviceCall::BindGeometry { vertex, .. } => Some(*vertex),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_draws_visible_opaque_batches_only() {
        let mut device = HeadlessDevice::new();
        let mut fixture = Fixture::new(&mut device);
        let mut pass = GeometryPass::new(ShadowSettings::default());
        pass.update_framebuffer(&fixture.scene);
        device.clear_calls();

        assert_eq!(pass.execute(&fixture.view(), &fixture.targets, &mut device).unwrap(), 2);
        let opaque: Vec<_> = fixture.registry.batches()[..2].iter().map(|b| b.buffers().unwrap().vertex).collect();
        assert_eq!(bound_vertex_buffers(&device), opaque);

        let far_away = Camera::perspective(Vec3::new(0.0, 0.0, 1000.0), 60.0, 1.0, 0.1, 10.0);
        fixture.registry.cull(Some(&FrustumCuller::from_camera(&far_away)));
        device.clear_calls();
        assert_eq!(pass.execute(&fixture.view(), &fixture.targets, &mut device).unwrap(), 0);
        assert!(bound_vertex_buffers(&device).is_empty());
    }

    #[test]
    fn test_shader_bound_once_per_program() {
        let mut device = HeadlessDevice::new();
        let fixture = Fixture::new(&mut device);
        let mut pass = GeometryPass::new(ShadowSettings::default());
        pass.update_framebuffer(&fixture.scene);
        device.clear_calls();

        pass.execute(&fixture.view(), &fixture.targets, &mut device).unwrap();

        let lit = fixture.shaders.get("lit").unwrap();
        assert_eq!(device.count_calls(|c| *c == DeviceCall::BindShader(lit)), 1);
    }

    #[test]
    fn test_missing_batch_shader_skips_batch_not_pass() {
        let mut device = HeadlessDevice::new();
        let fixture = Fixture::new(&mut device);
        let empty = ShaderRegistry::new();
        let mut pass = GeometryPass::new(ShadowSettings::default());
        pass.update_framebuffer(&fixture.scene);

        let draws = pass.execute(&fixture.view_without_shaders(&empty), &fixture.targets, &mut device).unwrap();
        assert_eq!(draws, 0);
        assert_eq!(device.count_calls(|c| matches!(c, DeviceCall::BindShader(ShaderHandle(_)))), 0);
    }

    #[test]
    fn test_shadow_map_bound_when_published() {
        let mut device = HeadlessDevice::new();
        let mut fixture = Fixture::new(&mut device);
        let mut pass = GeometryPass::new(ShadowSettings::default());
        pass.update_framebuffer(&fixture.scene);
        fixture.targets.publish(SHADOW_DEPTH, TextureHandle(77));
        device.clear_calls();

        pass.execute(&fixture.view(), &fixture.targets, &mut device).unwrap();

        assert!(device
            .calls()
            .contains(&DeviceCall::BindTexture { slot: SHADOW_MAP_SLOT, texture: TextureHandle(77) }));
        let expected = light_space_matrix(&fixture.lights[0], &fixture.registry.shadow_bounds(), &ShadowSettings::default());
        assert!(device
            .calls()
            .contains(&DeviceCall::SetUniformMat4 { name: "u_light_space".to_string(), value: expected.unwrap() }));
    }
}
