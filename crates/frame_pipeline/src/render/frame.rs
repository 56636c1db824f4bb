//! Frame orchestration
//!
//! One frame is: clear the scene target, run every enabled pass in fixed
//! order, present. The orchestrator owns the scene framebuffer and the pass
//! list; the shadow map belongs to the shadow pass.

use crate::config::RendererConfig;
use crate::foundation::math::Aabb;
use crate::render::api::GraphicsDevice;
use crate::render::batching::DrawBatch;
use crate::render::camera::Camera;
use crate::render::framebuffer::{Framebuffer, RenderTargets, SCENE_COLOR, SCENE_DEPTH, SHADOW_DEPTH};
use crate::render::lighting::Light;
use crate::render::passes::{
    DebugLightsPass, GeometryPass, GridPass, PassKind, PostProcessingPass, RenderPass, ShadowPass, SkyboxPass,
    TerrainPass, VisualEffectsPass,
};
use crate::render::resources::ResourceContext;
use crate::render::RenderResult;

/// Everything a pass may read while recording a frame
#[derive(Debug, Clone, Copy)]
pub struct SceneView<'a> {
    /// Batches with their visibility already decided
    pub batches: &'a [DrawBatch],
    /// Viewing camera
    pub camera: &'a Camera,
    /// Scene lights; the first is the primary light
    pub lights: &'a [Light],
    /// Bounds of the shadow-casting batches, for shadow fitting
    pub shadow_bounds: Aabb,
    /// Shader, material and texture registries
    pub resources: ResourceContext<'a>,
}

/// Per-frame statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frame counter, starting at 1
    pub frame_index: u64,
    /// Passes that ran to completion
    pub passes_executed: usize,
    /// Enabled passes skipped because a resource was missing
    pub passes_skipped: usize,
    /// Batches that passed visibility testing
    pub batches_visible: usize,
    /// Batches rejected by visibility testing
    pub batches_culled: usize,
    /// Draw submissions across all passes
    pub draw_submissions: usize,
}

#[derive(Debug)]
struct PassSlot {
    pass: RenderPass,
    enabled: bool,
}

/// Owns the ordered pass list and the scene framebuffer
#[derive(Debug)]
pub struct FrameOrchestrator {
    passes: Vec<PassSlot>,
    scene: Framebuffer,
    targets: RenderTargets,
    clear_color: [f32; 4],
    frame_index: u64,
    scene_recreations: u32,
}

impl FrameOrchestrator {
    /// Create framebuffers and the pass list from `config`
    pub fn new(config: &RendererConfig, device: &mut dyn GraphicsDevice) -> RenderResult<Self> {
        let scene = Framebuffer::scene(device, config.width, config.height)?;
        let shadow = match ShadowPass::new(config.shadows, device) {
            Ok(shadow) => shadow,
            Err(e) => {
                scene.destroy(device);
                return Err(e);
            }
        };

        let mut targets = RenderTargets::new();
        targets.publish_framebuffer(&scene, Some(SCENE_COLOR), Some(SCENE_DEPTH));

        let passes = vec![
            RenderPass::Shadow(shadow),
            RenderPass::Skybox(SkyboxPass::new()),
            RenderPass::Grid(GridPass::new()),
            RenderPass::Geometry(GeometryPass::new(config.shadows)),
            RenderPass::DebugLights(DebugLightsPass::new()),
            RenderPass::Terrain(TerrainPass::new(config.shadows)),
            RenderPass::VisualEffects(VisualEffectsPass::new()),
            RenderPass::PostProcessing(PostProcessingPass::new(config.post)),
        ];
        let mut passes: Vec<PassSlot> = passes
            .into_iter()
            .map(|pass| {
                let enabled = match pass.kind() {
                    PassKind::Grid => config.grid,
                    PassKind::DebugLights => config.debug_lights,
                    _ => true,
                };
                PassSlot { pass, enabled }
            })
            .collect();
        for slot in &mut passes {
            slot.pass.update_framebuffer(&scene);
        }

        log::info!("Frame orchestrator ready at {}x{}", config.width, config.height);
        Ok(Self {
            passes,
            scene,
            targets,
            clear_color: config.clear_color,
            frame_index: 0,
            scene_recreations: 0,
        })
    }

    /// Record and present one frame.
    ///
    /// A pass that cannot start is logged and skipped; the frame is always
    /// presented. The shadow map is published only for frames in which the
    /// shadow pass rendered it, so lit passes fall back to no shadow otherwise.
    pub fn execute_frame(&mut self, scene: &SceneView<'_>, device: &mut dyn GraphicsDevice) -> FrameStats {
        self.frame_index += 1;
        let mut stats = FrameStats { frame_index: self.frame_index, ..Default::default() };

        device.bind_framebuffer(Some(self.scene.handle()), self.scene.width(), self.scene.height());
        device.clear(Some(self.clear_color), Some(1.0));
        self.targets.withdraw(SHADOW_DEPTH);

        for slot in self.passes.iter_mut().filter(|s| s.enabled) {
            match slot.pass.execute(scene, &self.targets, device) {
                Ok(draws) => {
                    stats.passes_executed += 1;
                    stats.draw_submissions += draws;
                    if let RenderPass::Shadow(shadow) = &slot.pass {
                        if shadow.light_space().is_some() {
                            self.targets.publish_framebuffer(shadow.shadow_map(), None, Some(SHADOW_DEPTH));
                        }
                    }
                }
                Err(e) => {
                    stats.passes_skipped += 1;
                    log::warn!("Skipping {} pass for frame {}: {}", slot.pass.name(), self.frame_index, e);
                }
            }
        }

        device.present();

        stats.batches_visible = scene.batches.iter().filter(|b| b.is_visible()).count();
        stats.batches_culled = scene.batches.len() - stats.batches_visible;
        stats
    }

    /// Recreate the scene framebuffer at the new size and hand it to every pass.
    ///
    /// Zero sizes (minimised windows) and unchanged sizes are ignored. If the
    /// new framebuffer cannot be created the old one stays in use.
    pub fn on_window_resize(&mut self, width: u32, height: u32, device: &mut dyn GraphicsDevice) -> RenderResult<()> {
        if width == 0 || height == 0 {
            log::debug!("Ignoring resize to {}x{}", width, height);
            return Ok(());
        }
        if (width, height) == self.size() {
            return Ok(());
        }

        let scene = Framebuffer::scene(device, width, height)?;
        std::mem::replace(&mut self.scene, scene).destroy(device);
        self.targets.publish_framebuffer(&self.scene, Some(SCENE_COLOR), Some(SCENE_DEPTH));
        for slot in &mut self.passes {
            slot.pass.update_framebuffer(&self.scene);
        }
        self.scene_recreations += 1;

        log::info!("Scene framebuffer recreated at {}x{}", width, height);
        Ok(())
    }

    /// Enable or disable a pass; returns false if no such pass exists
    pub fn set_pass_enabled(&mut self, kind: PassKind, enabled: bool) -> bool {
        match self.passes.iter_mut().find(|s| s.pass.kind() == kind) {
            Some(slot) => {
                slot.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Whether a pass runs each frame
    pub fn is_pass_enabled(&self, kind: PassKind) -> bool {
        self.passes.iter().any(|s| s.pass.kind() == kind && s.enabled)
    }

    /// Passes in execution order
    pub fn passes(&self) -> impl Iterator<Item = &RenderPass> {
        self.passes.iter().map(|s| &s.pass)
    }

    /// A pass by kind
    pub fn pass(&self, kind: PassKind) -> Option<&RenderPass> {
        self.passes().find(|p| p.kind() == kind)
    }

    /// A pass by kind, mutably
    pub fn pass_mut(&mut self, kind: PassKind) -> Option<&mut RenderPass> {
        self.passes.iter_mut().map(|s| &mut s.pass).find(|p| p.kind() == kind)
    }

    /// The scene color and depth target
    pub fn scene_framebuffer(&self) -> &Framebuffer {
        &self.scene
    }

    /// Named textures published by the framebuffers
    pub fn targets(&self) -> &RenderTargets {
        &self.targets
    }

    /// Current scene size
    pub fn size(&self) -> (u32, u32) {
        (self.scene.width(), self.scene.height())
    }

    /// Change the scene clear color
    pub fn set_clear_color(&mut self, color: [f32; 4]) {
        self.clear_color = color;
    }

    /// Frames executed so far
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Times the scene framebuffer was recreated by a resize
    pub fn scene_recreations(&self) -> u32 {
        self.scene_recreations
    }

    /// Release every framebuffer
    pub fn destroy(self, device: &mut dyn GraphicsDevice) {
        for slot in self.passes {
            slot.pass.destroy(device);
        }
        self.scene.destroy(device);
    }
}
