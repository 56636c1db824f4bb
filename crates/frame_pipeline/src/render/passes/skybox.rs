//! Environment background drawn behind everything else

use super::{Executable, PassTarget, Resizable};
use crate::foundation::math::Mat4;
use crate::render::api::{BlendMode, DepthTest, GraphicsDevice, PassState};
use crate::render::frame::SceneView;
use crate::render::framebuffer::{Framebuffer, RenderTargets};
use crate::render::RenderResult;

/// Shader key of the skybox program
pub const SKYBOX_SHADER: &str = "skybox";

/// Texture registry name of the optional environment cube map
pub const SKYBOX_TEXTURE: &str = "skybox";

/// Vertices of the unit cube the skybox shader expands
const CUBE_VERTICES: u32 = 36;

/// Draws a camera-centred cube at the far plane
#[derive(Debug, Default)]
pub struct SkyboxPass {
    pub(super) target: PassTarget,
}

impl SkyboxPass {
    /// Create the pass
    pub fn new() -> Self {
        Self::default()
    }
}

/// View matrix with the translation removed, so the sky follows the camera
fn rotation_only(view: &Mat4) -> Mat4 {
    let mut rotation = *view;
    rotation.fixed_view_mut::<3, 1>(0, 3).fill(0.0);
    rotation
}

impl Executable for SkyboxPass {
    fn state(&self) -> PassState {
        // The shader writes depth 1.0; LessEqual lets it pass against the cleared buffer.
        PassState::depth_read_only(BlendMode::Opaque, DepthTest::LessEqual)
    }

    fn execute(
        &mut self,
        scene: &SceneView<'_>,
        _targets: &RenderTargets,
        device: &mut dyn GraphicsDevice,
    ) -> RenderResult<usize> {
        scene.resources.shaders.bind(SKYBOX_SHADER, device)?;
        self.target.bind(device)?;

        let camera = scene.camera;
        let sky = camera.projection_matrix() * rotation_only(&camera.view_matrix());
        device.set_uniform_mat4("u_view_projection", &sky);
        if scene.resources.textures.get(SKYBOX_TEXTURE).is_some() {
            scene.resources.textures.bind(SKYBOX_TEXTURE, 0, device)?;
        }
        device.draw_arrays(0, CUBE_VERTICES);
        Ok(1)
    }
}

impl Resizable for SkyboxPass {
    fn update_framebuffer(&mut self, framebuffer: &Framebuffer) {
        self.target.update(framebuffer);
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::Fixture;
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::render::api::TextureHandle;
    use crate::render::backends::{DeviceCall, HeadlessDevice};

    #[test]
    fn test_rotation_only_drops_translation() {
        let view = Mat4::new_translation(&Vec3::new(3.0, -2.0, 7.0)) * Mat4::new_rotation(Vec3::new(0.0, 0.5, 0.0));
        let rotation = rotation_only(&view);

        assert_eq!(rotation.fixed_view::<3, 3>(0, 0), view.fixed_view::<3, 3>(0, 0));
        assert_eq!(rotation.m14, 0.0);
        assert_eq!(rotation.m24, 0.0);
        assert_eq!(rotation.m34, 0.0);
    }

    #[test]
    fn test_draws_one_cube_into_scene_target() {
        let mut device = HeadlessDevice::new();
        let mut fixture = Fixture::new(&mut device);
        fixture.textures.register(SKYBOX_TEXTURE, TextureHandle(900));
        let mut pass = SkyboxPass::new();
        pass.update_framebuffer(&fixture.scene);
        device.clear_calls();

        assert_eq!(pass.execute(&fixture.view(), &fixture.targets, &mut device).unwrap(), 1);
        let calls = device.calls();
        assert!(calls.contains(&DeviceCall::BindFramebuffer {
            framebuffer: Some(fixture.scene.handle()),
            width: 800,
            height: 600,
        }));
        assert!(calls.contains(&DeviceCall::BindTexture { slot: 0, texture: TextureHandle(900) }));
        assert!(calls.contains(&DeviceCall::DrawArrays { first_vertex: 0, vertex_count: 36 }));
    }
}
