//! Shadow map rendering from the primary light
//!
//! Directional lights get an orthographic projection fitted to the scene
//! bounds as seen from the light; point lights get a 90 degree perspective
//! aimed at the scene center. Front faces are culled and a constant plus
//! slope bias is applied to keep surfaces from shadowing themselves.

use super::{Executable, PassTarget, Resizable};
use crate::config::ShadowSettings;
use crate::foundation::math::{stable_up, utils, Aabb, Mat4, Mat4Ext, Point3, Vec3};
use crate::render::api::{GraphicsDevice, PassState};
use crate::render::frame::SceneView;
use crate::render::framebuffer::{Framebuffer, RenderTargets};
use crate::render::lighting::{Light, LightType};
use crate::render::RenderResult;

/// Shader key of the depth-only program
pub const SHADOW_SHADER: &str = "shadow_depth";

/// Light-space view-projection for `light` covering `bounds`.
///
/// Returns `None` when there is nothing to fit: an empty scene for a
/// directional light, or a zero direction.
pub fn light_space_matrix(light: &Light, bounds: &Aabb, settings: &ShadowSettings) -> Option<Mat4> {
    match light.light_type {
        LightType::Directional { direction } => {
            if bounds.is_empty() {
                return None;
            }
            let direction = direction.try_normalize(1e-6)?;
            let center = bounds.center();
            let reach = bounds.extents().magnitude() + settings.ortho_padding;
            let view = Mat4::look_at(center - direction * reach, center, stable_up(&direction));

            let mut min = Vec3::repeat(f32::MAX);
            let mut max = Vec3::repeat(f32::MIN);
            for corner in bounds.corners() {
                let p = view.transform_point(&Point3::from(corner)).coords;
                min = min.inf(&p);
                max = max.sup(&p);
            }
            let pad = settings.ortho_padding;
            // View space looks down -z, so the nearest corner has the largest z.
            let projection = Mat4::orthographic(
                min.x - pad,
                max.x + pad,
                min.y - pad,
                max.y + pad,
                -max.z - pad,
                -min.z + pad,
            );
            Some(projection * view)
        }
        LightType::Point { position, range } => {
            let center = if bounds.is_empty() { position - Vec3::y() } else { bounds.center() };
            let target = if (center - position).magnitude() > 1e-4 { center } else { position - Vec3::y() };
            let view = Mat4::look_at(position, target, stable_up(&(target - position)));
            let near = settings.point_near;
            let projection = Mat4::perspective(utils::deg_to_rad(90.0), 1.0, near, range.max(near * 2.0));
            Some(projection * view)
        }
    }
}

/// Renders static batches into a depth-only shadow map
#[derive(Debug)]
pub struct ShadowPass {
    settings: ShadowSettings,
    map: Framebuffer,
    scene_target: PassTarget,
    light_space: Option<Mat4>,
}

impl ShadowPass {
    /// Create the pass and its shadow map
    pub fn new(settings: ShadowSettings, device: &mut dyn GraphicsDevice) -> RenderResult<Self> {
        let map = Framebuffer::shadow_map(device, settings.map_size)?;
        Ok(Self { settings, map, scene_target: PassTarget::default(), light_space: None })
    }

    /// The shadow map, sized by settings rather than by the window
    pub fn shadow_map(&self) -> &Framebuffer {
        &self.map
    }

    /// Light-space matrix used by the last executed frame
    pub fn light_space(&self) -> Option<Mat4> {
        self.light_space
    }

    /// Scene framebuffer bookkeeping; the shadow pass never draws into it
    pub fn scene_target(&self) -> &PassTarget {
        &self.scene_target
    }

    /// Release the shadow map
    pub fn destroy(self, device: &mut dyn GraphicsDevice) {
        self.map.destroy(device);
    }
}

impl Executable for ShadowPass {
    fn state(&self) -> PassState {
        PassState::shadow_depth(self.settings.bias)
    }

    fn execute(
        &mut self,
        scene: &SceneView<'_>,
        _targets: &RenderTargets,
        device: &mut dyn GraphicsDevice,
    ) -> RenderResult<usize> {
        self.light_space = None;
        let Some(light) = scene.lights.first() else {
            return Ok(0);
        };
        let Some(light_space) = light_space_matrix(light, &scene.shadow_bounds, &self.settings) else {
            log::trace!("No shadow casters in view of the primary light");
            return Ok(0);
        };

        scene.resources.shaders.bind(SHADOW_SHADER, device)?;
        device.bind_framebuffer(Some(self.map.handle()), self.map.width(), self.map.height());
        device.clear(None, Some(1.0));
        device.set_uniform_mat4("u_light_space", &light_space);

        let mut draws = 0;
        for batch in scene.batches {
            if batch.casts_shadows() {
                batch.render(device);
                draws += 1;
            }
        }
        self.light_space = Some(light_space);
        Ok(draws)
    }
}

impl Resizable for ShadowPass {
    fn update_framebuffer(&mut self, framebuffer: &Framebuffer) {
        self.scene_target.update(framebuffer);
    }
}
