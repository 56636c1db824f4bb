//! High-level renderer tying scene, batching and frame orchestration together
//!
//! The [`Renderer`] is what a scene loader and a window loop talk to. It owns
//! the mesh arena, the batch registry, the LOD selector and the frame
//! orchestrator; the graphics device and the resource registries stay with
//! the application and are lent per call.

use crate::config::{ConfigError, RendererConfig};
use crate::foundation::math::Mat4;
use crate::render::api::GraphicsDevice;
use crate::render::batching::{BatchRegistry, BatchStats, DrawBatch};
use crate::render::camera::Camera;
use crate::render::frame::{FrameOrchestrator, FrameStats, SceneView};
use crate::render::lighting::Light;
use crate::render::resources::{MaterialId, ResourceContext};
use crate::render::{RenderError, RenderResult};
use crate::scene::{FrustumCuller, LodSelector, Mesh, MeshArena, MeshId, RenderableObject, TransformGraph, VertexLayout};

/// Renderer construction errors
#[derive(thiserror::Error, Debug)]
pub enum RendererError {
    /// Configuration rejected
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Device setup failed
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
}

/// How transform graph mesh references map onto renderables
#[derive(Debug, Clone, Copy)]
pub struct GraphBindings<'a> {
    /// Mesh table indexed by `MeshReference::mesh_index`
    pub meshes: &'a [MeshId],
    /// Material table indexed by `MeshReference::material_index`
    pub materials: &'a [MaterialId],
    /// Shader used for every instance
    pub shader_key: &'a str,
    /// Vertex layout used for every instance
    pub layout: VertexLayout,
}

/// Batched, LOD-aware scene renderer
#[derive(Debug)]
pub struct Renderer {
    config: RendererConfig,
    meshes: MeshArena,
    registry: BatchRegistry,
    lod: LodSelector,
    frames: FrameOrchestrator,
}

impl Renderer {
    /// Validate `config` and create the frame pipeline
    pub fn new(config: RendererConfig, device: &mut dyn GraphicsDevice) -> Result<Self, RendererError> {
        config.validate()?;
        let frames = FrameOrchestrator::new(&config, device)?;
        let lod = LodSelector::new(config.lod_thresholds.clone());
        Ok(Self { config, meshes: MeshArena::new(), registry: BatchRegistry::new(), lod, frames })
    }

    /// Store a mesh in the arena
    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        self.meshes.insert(mesh)
    }

    /// The mesh arena
    pub fn meshes(&self) -> &MeshArena {
        &self.meshes
    }

    /// Register a renderable and return its index.
    ///
    /// Batches are rebuilt on the next [`build_batches`](Self::build_batches)
    /// or [`cull_and_lod_update`](Self::cull_and_lod_update).
    pub fn add_render_object(&mut self, object: RenderableObject) -> RenderResult<usize> {
        self.meshes.require(object.mesh)?;
        Ok(self.registry.add_object(object))
    }

    /// Create one renderable per mesh reference in `graph`, placed at the
    /// node's global transform.
    ///
    /// Every reference is checked before anything is added, so a bad index
    /// leaves the renderer unchanged.
    pub fn add_graph_instances(
        &mut self,
        graph: &mut TransformGraph,
        bindings: &GraphBindings<'_>,
    ) -> RenderResult<Vec<usize>> {
        if graph.needs_recalculation() {
            graph.recalculate_global_transforms();
        }

        let mut pending: Vec<(MeshId, MaterialId, Mat4)> = Vec::new();
        let mut failure = None;
        graph.traverse_dfs(|index, node| {
            for reference in &node.meshes {
                let mesh = bindings.meshes.get(reference.mesh_index);
                let material = bindings.materials.get(reference.material_index);
                match (mesh, material) {
                    (Some(&mesh), Some(&material)) => pending.push((mesh, material, node.global)),
                    _ => {
                        failure.get_or_insert_with(|| {
                            RenderError::InvalidReference(format!(
                                "node {} '{}' references mesh {} / material {}",
                                index, node.name, reference.mesh_index, reference.material_index
                            ))
                        });
                    }
                }
            }
            true
        });
        if let Some(e) = failure {
            return Err(e);
        }

        let mut objects = Vec::with_capacity(pending.len());
        for (mesh_id, material, transform) in pending {
            let mesh = self.meshes.require(mesh_id)?;
            objects.push(RenderableObject::new(mesh_id, mesh, bindings.layout, material, bindings.shader_key, transform));
        }
        log::debug!("Instantiated {} renderables from {} graph nodes", objects.len(), graph.len());
        Ok(objects.into_iter().map(|o| self.registry.add_object(o)).collect())
    }

    /// Rebuild batches if objects changed since the last build
    pub fn build_batches(&mut self, device: &mut dyn GraphicsDevice) {
        self.registry.build(&self.meshes, device);
    }

    /// Current batches
    pub fn batches(&self) -> &[DrawBatch] {
        self.registry.batches()
    }

    /// Registered renderables
    pub fn objects(&self) -> &[RenderableObject] {
        self.registry.objects()
    }

    /// Update LODs for `camera` and decide batch visibility.
    ///
    /// Pending rebuilds (new objects, failed LOD patches) run first. Returns
    /// the number of visible batches.
    pub fn cull_and_lod_update(&mut self, camera: &Camera, device: &mut dyn GraphicsDevice) -> usize {
        self.registry.build(&self.meshes, device);
        let patched = self.registry.update_lods(&camera.position, &self.lod, device);
        if patched > 0 {
            log::trace!("{} LOD commands patched", patched);
        }
        let culler = self.config.frustum_culling.then(|| FrustumCuller::from_camera(camera));
        self.registry.cull(culler.as_ref())
    }

    /// Record and present one frame
    pub fn render_frame(
        &mut self,
        camera: &Camera,
        lights: &[Light],
        resources: ResourceContext<'_>,
        device: &mut dyn GraphicsDevice,
    ) -> FrameStats {
        let view = SceneView {
            batches: self.registry.batches(),
            camera,
            lights,
            shadow_bounds: self.registry.shadow_bounds(),
            resources,
        };
        self.frames.execute_frame(&view, device)
    }

    /// Follow a window size change
    pub fn on_window_resize(&mut self, width: u32, height: u32, device: &mut dyn GraphicsDevice) -> RenderResult<()> {
        self.frames.on_window_resize(width, height, device)?;
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
        }
        Ok(())
    }

    /// Put every object at `level`, clamped per object
    pub fn force_lod(&mut self, level: usize, device: &mut dyn GraphicsDevice) -> usize {
        self.registry.force_lod(level, device)
    }

    /// Replace the LOD distance bands
    pub fn set_lod_thresholds(&mut self, thresholds: Vec<f32>) {
        self.lod = LodSelector::new(thresholds);
        self.config.lod_thresholds = self.lod.thresholds().to_vec();
    }

    /// Toggle frustum culling
    pub fn set_frustum_culling(&mut self, enabled: bool) {
        self.config.frustum_culling = enabled;
    }

    /// Drop every object, batch and mesh
    pub fn clear(&mut self, device: &mut dyn GraphicsDevice) {
        self.registry.clear(device);
        self.meshes.clear();
    }

    /// Batching statistics
    pub fn batch_stats(&self) -> BatchStats {
        self.registry.stats()
    }

    /// The frame orchestrator
    pub fn frames(&self) -> &FrameOrchestrator {
        &self.frames
    }

    /// The frame orchestrator, for enabling passes
    pub fn frames_mut(&mut self) -> &mut FrameOrchestrator {
        &mut self.frames
    }

    /// Active configuration
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Release every device resource
    pub fn destroy(mut self, device: &mut dyn GraphicsDevice) {
        self.registry.clear(device);
        self.frames.destroy(device);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::render::backends::HeadlessDevice;

    fn renderer(device: &mut HeadlessDevice) -> Renderer {
        Renderer::new(RendererConfig::default(), device).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut device = HeadlessDevice::new();
        let config = RendererConfig { lod_thresholds: vec![5.0, 1.0], ..Default::default() };
        assert!(matches!(Renderer::new(config, &mut device), Err(RendererError::Config(_))));
        assert_eq!(device.live_framebuffers(), 0);
    }

    #[test]
    fn test_object_with_unknown_mesh_rejected() {
        let mut device = HeadlessDevice::new();
        let mut renderer = renderer(&mut device);
        let mesh = Mesh::cube(1);
        // Keyed in another arena; the renderer's arena is still empty.
        let id = MeshArena::new().insert(mesh.clone());
        let object = RenderableObject::new(id, &mesh, VertexLayout::STANDARD, MaterialId(0), "lit", Mat4::identity());

        assert!(matches!(renderer.add_render_object(object), Err(RenderError::MissingResource(_))));
        assert!(renderer.objects().is_empty());
    }

    #[test]
    fn test_graph_instances_use_global_transforms() {
        let mut device = HeadlessDevice::new();
        let mut renderer = renderer(&mut device);
        let cube = renderer.add_mesh(Mesh::cube(2));

        let mut graph = TransformGraph::new();
        let root = graph.add_node(None, "root").unwrap();
        let child = graph.add_node(Some(root), "child").unwrap();
        graph.set_local_transform(root, Mat4::new_translation(&Vec3::new(10.0, 0.0, 0.0))).unwrap();
        graph.set_local_transform(child, Mat4::new_translation(&Vec3::new(0.0, 5.0, 0.0))).unwrap();
        graph.add_mesh_reference(child, 0, 0).unwrap();

        let bindings =
            GraphBindings { meshes: &[cube], materials: &[MaterialId(3)], shader_key: "lit", layout: VertexLayout::STANDARD };
        let added = renderer.add_graph_instances(&mut graph, &bindings).unwrap();

        assert_eq!(added, vec![0]);
        let object = &renderer.objects()[0];
        assert_eq!(object.world_center(), Vec3::new(10.0, 5.0, 0.0));
        assert_eq!(object.material_id, MaterialId(3));
        assert_eq!(object.lod_count(), 2);
    }

    #[test]
    fn test_bad_graph_reference_adds_nothing() {
        let mut device = HeadlessDevice::new();
        let mut renderer = renderer(&mut device);
        let cube = renderer.add_mesh(Mesh::cube(1));
        let mut graph = TransformGraph::new();
        let a = graph.add_node(None, "a").unwrap();
        let b = graph.add_node(None, "b").unwrap();
        graph.add_mesh_reference(a, 0, 0).unwrap();
        graph.add_mesh_reference(b, 4, 0).unwrap();

        let bindings =
            GraphBindings { meshes: &[cube], materials: &[MaterialId(1)], shader_key: "lit", layout: VertexLayout::STANDARD };
        let result = renderer.add_graph_instances(&mut graph, &bindings);

        assert!(matches!(result, Err(RenderError::InvalidReference(_))));
        assert!(renderer.objects().is_empty());
    }

    #[test]
    fn test_cull_and_lod_update_builds_pending_batches() {
        let mut device = HeadlessDevice::new();
        let mut renderer = renderer(&mut device);
        let cube = renderer.add_mesh(Mesh::cube(3));
        for x in [0.0, 120.0] {
            let mesh = renderer.meshes().get(cube).unwrap().clone();
            let object = RenderableObject::new(
                cube,
                &mesh,
                VertexLayout::STANDARD,
                MaterialId(1),
                "lit",
                Mat4::new_translation(&Vec3::new(0.0, 0.0, -x)),
            );
            renderer.add_render_object(object).unwrap();
        }
        let mut camera = Camera::perspective(Vec3::new(0.0, 0.0, 10.0), 60.0, 1.0, 0.1, 500.0);
        camera.set_target(Vec3::new(0.0, 0.0, -1.0));

        assert_eq!(renderer.cull_and_lod_update(&camera, &mut device), 1);
        assert_eq!(renderer.batches().len(), 1);
        assert_eq!(renderer.objects()[0].current_lod(), 0);
        assert_eq!(renderer.objects()[1].current_lod(), 2);
        assert_eq!(renderer.batch_stats().lod_patches, 1);
    }

    #[test]
    fn test_resize_updates_config() {
        let mut device = HeadlessDevice::new();
        let mut renderer = renderer(&mut device);

        renderer.on_window_resize(1280, 720, &mut device).unwrap();
        renderer.on_window_resize(0, 0, &mut device).unwrap();

        assert_eq!((renderer.config().width, renderer.config().height), (1280, 720));
        assert_eq!(renderer.frames().size(), (1280, 720));
    }
}
