//! # Render passes
//!
//! Every pass is a variant of the closed [`RenderPass`] enum. A pass has two
//! capabilities: [`Executable`] (draw one frame under a fixed [`PassState`])
//! and [`Resizable`] (follow the scene framebuffer when the window changes).
//! The enum dispatches both through one indirection so the orchestrator never
//! needs to know which pass it is holding.

pub mod shadow;
pub mod skybox;
pub mod grid;
pub mod geometry;
pub mod debug_lights;
pub mod terrain;
pub mod visual_effects;
pub mod post_processing;

pub use debug_lights::DebugLightsPass;
pub use geometry::GeometryPass;
pub use grid::GridPass;
pub use post_processing::PostProcessingPass;
pub use shadow::ShadowPass;
pub use skybox::SkyboxPass;
pub use terrain::TerrainPass;
pub use visual_effects::VisualEffectsPass;

use crate::foundation::math::Vec4;
use crate::render::api::{FramebufferHandle, GraphicsDevice, PassState};
use crate::render::frame::SceneView;
use crate::render::framebuffer::{Framebuffer, RenderTargets};
use crate::render::{RenderError, RenderResult};
use crate::scene::RenderLayer;

/// Identifies a pass independently of its state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    /// Depth from the primary light
    Shadow,
    /// Environment background
    Skybox,
    /// Reference ground grid
    Grid,
    /// Opaque batches
    Geometry,
    /// Light markers
    DebugLights,
    /// Terrain batches
    Terrain,
    /// Additive effect batches
    VisualEffects,
    /// Tone mapping into the presentation target
    PostProcessing,
}

impl PassKind {
    /// Execution order within a frame
    pub const ORDER: [Self; 8] = [
        Self::Shadow,
        Self::Skybox,
        Self::Grid,
        Self::Geometry,
        Self::DebugLights,
        Self::Terrain,
        Self::VisualEffects,
        Self::PostProcessing,
    ];

    /// Human-readable name used in logs
    pub fn name(self) -> &'static str {
        match self {
            Self::Shadow => "shadow",
            Self::Skybox => "skybox",
            Self::Grid => "grid",
            Self::Geometry => "geometry",
            Self::DebugLights => "debug_lights",
            Self::Terrain => "terrain",
            Self::VisualEffects => "visual_effects",
            Self::PostProcessing => "post_processing",
        }
    }
}

/// Drawing capability of a pass
pub trait Executable {
    /// Fixed-function state applied for the whole pass
    fn state(&self) -> PassState;

    /// Record the pass. Returns the number of draw submissions issued.
    ///
    /// An error means the pass could not start (a required resource is
    /// missing); the caller logs it and moves on to the next pass.
    fn execute(
        &mut self,
        scene: &SceneView<'_>,
        targets: &RenderTargets,
        device: &mut dyn GraphicsDevice,
    ) -> RenderResult<usize>;
}

/// Resize capability of a pass
pub trait Resizable {
    /// Adopt a (re)created scene framebuffer
    fn update_framebuffer(&mut self, framebuffer: &Framebuffer);
}

/// The framebuffer a pass last received, and how many times it changed
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassTarget {
    framebuffer: Option<FramebufferHandle>,
    width: u32,
    height: u32,
    updates: u32,
}

impl PassTarget {
    /// Record a new framebuffer
    pub fn update(&mut self, framebuffer: &Framebuffer) {
        self.framebuffer = Some(framebuffer.handle());
        self.width = framebuffer.width();
        self.height = framebuffer.height();
        self.updates += 1;
    }

    /// Bind the recorded framebuffer
    pub fn bind(&self, device: &mut dyn GraphicsDevice) -> RenderResult<()> {
        let framebuffer = self
            .framebuffer
            .ok_or_else(|| RenderError::MissingResource("pass has no framebuffer".to_string()))?;
        device.bind_framebuffer(Some(framebuffer), self.width, self.height);
        Ok(())
    }

    /// Last framebuffer handle received
    pub fn framebuffer(&self) -> Option<FramebufferHandle> {
        self.framebuffer
    }

    /// Size of the last framebuffer received
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of framebuffer updates received
    pub fn updates(&self) -> u32 {
        self.updates
    }
}

/// A frame pass
#[derive(Debug)]
pub enum RenderPass {
    /// See [`ShadowPass`]
    Shadow(ShadowPass),
    /// See [`SkyboxPass`]
    Skybox(SkyboxPass),
    /// See [`GridPass`]
    Grid(GridPass),
    /// See [`GeometryPass`]
    Geometry(GeometryPass),
    /// See [`DebugLightsPass`]
    DebugLights(DebugLightsPass),
    /// See [`TerrainPass`]
    Terrain(TerrainPass),
    /// See [`VisualEffectsPass`]
    VisualEffects(VisualEffectsPass),
    /// See [`PostProcessingPass`]
    PostProcessing(PostProcessingPass),
}

impl RenderPass {
    /// Which pass this is
    pub fn kind(&self) -> PassKind {
        match self {
            Self::Shadow(_) => PassKind::Shadow,
            Self::Skybox(_) => PassKind::Skybox,
            Self::Grid(_) => PassKind::Grid,
            Self::Geometry(_) => PassKind::Geometry,
            Self::DebugLights(_) => PassKind::DebugLights,
            Self::Terrain(_) => PassKind::Terrain,
            Self::VisualEffects(_) => PassKind::VisualEffects,
            Self::PostProcessing(_) => PassKind::PostProcessing,
        }
    }

    /// Log name
    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    fn executable(&self) -> &dyn Executable {
        match self {
            Self::Shadow(p) => p,
            Self::Skybox(p) => p,
            Self::Grid(p) => p,
            Self::Geometry(p) => p,
            Self::DebugLights(p) => p,
            Self::Terrain(p) => p,
            Self::VisualEffects(p) => p,
            Self::PostProcessing(p) => p,
        }
    }

    fn executable_mut(&mut self) -> &mut dyn Executable {
        match self {
            Self::Shadow(p) => p,
            Self::Skybox(p) => p,
            Self::Grid(p) => p,
            Self::Geometry(p) => p,
            Self::DebugLights(p) => p,
            Self::Terrain(p) => p,
            Self::VisualEffects(p) => p,
            Self::PostProcessing(p) => p,
        }
    }

    fn resizable_mut(&mut self) -> &mut dyn Resizable {
        match self {
            Self::Shadow(p) => p,
            Self::Skybox(p) => p,
            Self::Grid(p) => p,
            Self::Geometry(p) => p,
            Self::DebugLights(p) => p,
            Self::Terrain(p) => p,
            Self::VisualEffects(p) => p,
            Self::PostProcessing(p) => p,
        }
    }

    /// Fixed-function state of the pass
    pub fn state(&self) -> PassState {
        self.executable().state()
    }

    /// Run the pass with its state applied, restoring the default state after.
    ///
    /// The state is reset even when the pass fails to start.
    pub fn execute(
        &mut self,
        scene: &SceneView<'_>,
        targets: &RenderTargets,
        device: &mut dyn GraphicsDevice,
    ) -> RenderResult<usize> {
        device.apply_state(&self.state());
        let result = self.executable_mut().execute(scene, targets, device);
        device.apply_state(&PassState::default());
        result
    }

    /// Forward a new scene framebuffer to the pass
    pub fn update_framebuffer(&mut self, framebuffer: &Framebuffer) {
        self.resizable_mut().update_framebuffer(framebuffer);
    }

    /// The pass's framebuffer bookkeeping
    pub fn target(&self) -> &PassTarget {
        match self {
            Self::Shadow(p) => p.scene_target(),
            Self::Skybox(p) => &p.target,
            Self::Grid(p) => &p.target,
            Self::Geometry(p) => &p.target,
            Self::DebugLights(p) => &p.target,
            Self::Terrain(p) => &p.target,
            Self::VisualEffects(p) => &p.target,
            Self::PostProcessing(p) => &p.target,
        }
    }

    /// Release resources the pass owns
    pub fn destroy(self, device: &mut dyn GraphicsDevice) {
        if let Self::Shadow(pass) = self {
            pass.destroy(device);
        }
    }
}

/// Upload the camera block shared by every scene shader
pub(crate) fn set_camera_uniforms(scene: &SceneView<'_>, device: &mut dyn GraphicsDevice) {
    let camera = scene.camera;
    let p = camera.position;
    device.set_uniform_mat4("u_view", &camera.view_matrix());
    device.set_uniform_mat4("u_projection", &camera.projection_matrix());
    device.set_uniform_mat4("u_view_projection", &camera.view_projection_matrix());
    device.set_uniform_vec4("u_camera_position", Vec4::new(p.x, p.y, p.z, 1.0).into());
}

/// Draw every visible batch of `layer`.
///
/// Batches whose shader or material is missing are logged and skipped.
/// `per_program` runs after each shader switch to upload frame uniforms.
pub(crate) fn draw_layer(
    scene: &SceneView<'_>,
    layer: RenderLayer,
    device: &mut dyn GraphicsDevice,
    mut per_program: impl FnMut(&mut dyn GraphicsDevice),
) -> usize {
    let mut bound: Option<&str> = None;
    let mut draws = 0;
    for batch in scene.batches.iter().filter(|b| b.key().layer == layer && b.is_visible()) {
        if batch.buffers().is_none() {
            continue;
        }
        let key = batch.key();
        if bound != Some(key.shader_key.as_str()) {
            if let Err(e) = scene.resources.shaders.bind(&key.shader_key, device) {
                log::warn!("Skipping {:?} batch: {}", layer, e);
                bound = None;
                continue;
            }
            bound = Some(key.shader_key.as_str());
            per_program(&mut *device);
        }
        if let Err(e) = scene.resources.materials.bind(key.material_id, device) {
            log::warn!("Skipping {:?} batch '{}': {}", layer, key.shader_key, e);
            continue;
        }
        batch.render(device);
        draws += 1;
    }
    draws
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::foundation::math::{Mat4, Vec3};
    use crate::render::api::ShaderHandle;
    use crate::render::backends::HeadlessDevice;
    use crate::render::batching::BatchRegistry;
    use crate::render::camera::Camera;
    use crate::render::frame::SceneView;
    use crate::render::framebuffer::{Framebuffer, RenderTargets, SCENE_COLOR, SCENE_DEPTH};
    use crate::render::lighting::Light;
    use crate::render::resources::{Material, MaterialId, MaterialRegistry, ResourceContext, ShaderRegistry, TextureRegistry};
    use crate::scene::{Mesh, MeshArena, RenderLayer, RenderableObject, VertexLayout};

    pub const SHADERS: [&str; 8] = ["lit", "terrain", "effect", "shadow_depth", "skybox", "grid", "debug_light", "post_process"];

    /// A small scene: static and dynamic opaque batches, one terrain and one effect batch
    pub struct Fixture {
        pub registry: BatchRegistry,
        pub shaders: ShaderRegistry,
        pub materials: MaterialRegistry,
        pub textures: TextureRegistry,
        pub camera: Camera,
        pub lights: Vec<Light>,
        pub scene: Framebuffer,
        pub targets: RenderTargets,
    }

    impl Fixture {
        pub fn new(device: &mut HeadlessDevice) -> Self {
            let mut shaders = ShaderRegistry::new();
            for (i, key) in SHADERS.iter().enumerate() {
                shaders.register(*key, ShaderHandle(100 + i as u64));
            }
            let mut materials = MaterialRegistry::new();
            materials.register(MaterialId(1), Material::with_color([1.0, 1.0, 1.0, 1.0]));
            materials.register(MaterialId(2), Material::with_color([0.8, 0.1, 0.1, 1.0]));

            let mut arena = MeshArena::new();
            let mut registry = BatchRegistry::new();
            let placements = [
                ("lit", 1, RenderLayer::Opaque, true, 0.0),
                ("lit", 2, RenderLayer::Opaque, false, 4.0),
                ("terrain", 1, RenderLayer::Terrain, true, -4.0),
                ("effect", 1, RenderLayer::Effect, true, 8.0),
            ];
            for (shader, material, layer, is_static, x) in placements {
                let mesh = Mesh::cube(2);
                let id = arena.insert(mesh.clone());
                let object = RenderableObject::new(
                    id,
                    &mesh,
                    VertexLayout::STANDARD,
                    MaterialId(material),
                    shader,
                    Mat4::new_translation(&Vec3::new(x, 0.0, 0.0)),
                )
                .with_layer(layer)
                .with_static(is_static);
                registry.add_object(object);
            }
            registry.build(&arena, device);

            let mut camera = Camera::perspective(Vec3::new(0.0, 5.0, 20.0), 60.0, 4.0 / 3.0, 0.1, 200.0);
            camera.set_target(Vec3::zeros());

            let scene = Framebuffer::scene(device, 800, 600).unwrap_or_else(|e| panic!("{e}"));
            let mut targets = RenderTargets::new();
            targets.publish_framebuffer(&scene, Some(SCENE_COLOR), Some(SCENE_DEPTH));

            Self {
                registry,
                shaders,
                materials,
                textures: TextureRegistry::new(),
                camera,
                lights: vec![
                    Light::directional(Vec3::new(-1.0, -2.0, -1.0), Vec3::new(1.0, 1.0, 1.0), 1.0),
                    Light::point(Vec3::new(0.0, 3.0, 0.0), 10.0, Vec3::new(1.0, 0.5, 0.2), 2.0),
                ],
                scene,
                targets,
            }
        }

        pub fn view(&self) -> SceneView<'_> {
            SceneView {
                batches: self.registry.batches(),
                camera: &self.camera,
                lights: &self.lights,
                shadow_bounds: self.registry.shadow_bounds(),
                resources: ResourceContext::new(&self.shaders, &self.materials, &self.textures),
            }
        }

        pub fn view_without_shaders<'a>(&'a self, empty: &'a ShaderRegistry) -> SceneView<'a> {
            SceneView { resources: ResourceContext::new(empty, &self.materials, &self.textures), ..self.view() }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::Fixture;
    use super::*;
    use crate::render::api::{BlendMode, CullMode};
    use crate::render::backends::{DeviceCall, HeadlessDevice};
    use crate::render::resources::ShaderRegistry;

    #[test]
    fn test_execute_brackets_pass_with_state() {
        let mut device = HeadlessDevice::new();
        let fixture = Fixture::new(&mut device);
        let mut pass = RenderPass::VisualEffects(VisualEffectsPass::new());
        pass.update_framebuffer(&fixture.scene);
        device.clear_calls();

        pass.execute(&fixture.view(), &fixture.targets, &mut device).unwrap();

        let calls = device.calls();
        assert_eq!(calls.first(), Some(&DeviceCall::ApplyState(pass.state())));
        assert_eq!(calls.last(), Some(&DeviceCall::ApplyState(PassState::default())));
        assert_eq!(pass.state().blend, BlendMode::Additive);
        assert_eq!(pass.state().cull, CullMode::None);
    }

    #[test]
    fn test_state_reset_even_when_pass_cannot_start() {
        let mut device = HeadlessDevice::new();
        let fixture = Fixture::new(&mut device);
        let empty = ShaderRegistry::new();
        let mut pass = RenderPass::Skybox(SkyboxPass::new());
        pass.update_framebuffer(&fixture.scene);
        device.clear_calls();

        let result = pass.execute(&fixture.view_without_shaders(&empty), &fixture.targets, &mut device);

        assert!(matches!(result, Err(RenderError::MissingResource(_))));
        assert_eq!(device.calls().last(), Some(&DeviceCall::ApplyState(PassState::default())));
        assert_eq!(device.draw_submissions(), 0);
    }

    #[test]
    fn test_draw_layer_skips_batches_with_missing_material() {
        let mut device = HeadlessDevice::new();
        let mut fixture = Fixture::new(&mut device);
        fixture.materials = crate::render::resources::MaterialRegistry::new();
        device.clear_calls();

        let draws = draw_layer(&fixture.view(), RenderLayer::Opaque, &mut device, |_| {});

        assert_eq!(draws, 0);
        assert_eq!(device.draw_submissions(), 0);
    }

    #[test]
    fn test_pass_order_and_names() {
        let names: Vec<_> = PassKind::ORDER.iter().map(|k| k.name()).collect();
        assert_eq!(
            names,
            ["shadow", "skybox", "grid", "geometry", "debug_lights", "terrain", "visual_effects", "post_processing"]
        );
    }
}
