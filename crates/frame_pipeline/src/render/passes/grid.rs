//! Reference grid on the ground plane

use super::{set_camera_uniforms, Executable, PassTarget, Resizable};
use crate::render::api::{BlendMode, DepthTest, GraphicsDevice, PassState};
use crate::render::frame::SceneView;
use crate::render::framebuffer::{Framebuffer, RenderTargets};
use crate::render::RenderResult;

/// Shader key of the grid program
pub const GRID_SHADER: &str = "grid";

/// Alpha-blended grid on y = 0, faded with distance in the shader
#[derive(Debug)]
pub struct GridPass {
    pub(super) target: PassTarget,
    spacing: f32,
    extent: f32,
}

impl Default for GridPass {
    fn default() -> Self {
        Self { target: PassTarget::default(), spacing: 1.0, extent: 100.0 }
    }
}

impl GridPass {
    /// Create the pass with 1 unit cells out to 100 units
    pub fn new() -> Self {
        Self::default()
    }

    /// Change cell size and half extent
    pub fn with_dimensions(mut self, spacing: f32, extent: f32) -> Self {
        self.spacing = spacing;
        self.extent = extent;
        self
    }
}

impl Executable for GridPass {
    fn state(&self) -> PassState {
        PassState::depth_read_only(BlendMode::Alpha, DepthTest::Less)
    }

    fn execute(
        &mut self,
        scene: &SceneView<'_>,
        _targets: &RenderTargets,
        device: &mut dyn GraphicsDevice,
    ) -> RenderResult<usize> {
        scene.resources.shaders.bind(GRID_SHADER, device)?;
        self.target.bind(device)?;
        set_camera_uniforms(scene, device);
        device.set_uniform_vec4("u_grid", [self.spacing, self.extent, 0.0, 0.0]);
        // One quad, expanded to `extent` in the vertex shader.
        device.draw_arrays(0, 6);
        Ok(1)
    }
}

impl Resizable for GridPass {
    fn update_framebuffer(&mut self, framebuffer: &Framebuffer) {
        self.target.update(framebuffer);
    }
}
