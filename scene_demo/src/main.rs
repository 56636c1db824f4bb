//! Headless scene demo
//!
//! Builds a field of cubes with three LODs, a terrain slab and a few glowing
//! effect cubes, then flies the camera across it for a number of frames on
//! the in-memory backend, logging batching and frame statistics.
//!
//! Usage: `scene_demo [config.toml|config.ron]`

use frame_pipeline::foundation::logging;
use frame_pipeline::prelude::*;
use frame_pipeline::render::PassKind;

const FIELD_SIZE: i32 = 12;
const SPACING: f32 = 15.0;
const FRAMES: u32 = 240;

fn load_config() -> Result<RendererConfig, ConfigError> {
    match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading renderer config from {}", path);
            let config = RendererConfig::load_from_file(&path)?;
            config.validate()?;
            Ok(config)
        }
        None => Ok(RendererConfig { grid: true, debug_lights: true, ..Default::default() }),
    }
}

fn registries() -> (ShaderRegistry, MaterialRegistry, TextureRegistry) {
    let mut shaders = ShaderRegistry::new();
    let programs = ["lit", "terrain", "effect", "shadow_depth", "skybox", "grid", "debug_light", "post_process"];
    for (i, key) in programs.into_iter().enumerate() {
        shaders.register(key, ShaderHandle(i as u64 + 1));
    }

    let mut materials = MaterialRegistry::new();
    materials.register(MaterialId(1), Material::with_color([0.8, 0.7, 0.5, 1.0]));
    materials.register(MaterialId(2), Material::with_color([0.3, 0.5, 0.2, 1.0]));
    materials.register(MaterialId(3), Material::with_color([1.0, 0.6, 0.1, 1.0]));

    (shaders, materials, TextureRegistry::new())
}

fn populate(renderer: &mut Renderer) -> Result<(), RenderError> {
    let cube = Mesh::cube(3);
    let cube_id = renderer.add_mesh(cube.clone());

    let half = FIELD_SIZE as f32 * SPACING * 0.5;
    for x in 0..FIELD_SIZE {
        for z in 0..FIELD_SIZE {
            let position = Vec3::new(x as f32 * SPACING - half, 1.0, z as f32 * SPACING - half);
            let object = RenderableObject::new(
                cube_id,
                &cube,
                VertexLayout::STANDARD,
                MaterialId(1),
                "lit",
                Mat4::new_translation(&position),
            );
            renderer.add_render_object(object)?;
        }
    }

    let slab = Mat4::new_nonuniform_scaling(&Vec3::new(half, 0.1, half));
    let terrain = RenderableObject::new(cube_id, &cube, VertexLayout::STANDARD, MaterialId(2), "terrain", slab)
        .with_layer(RenderLayer::Terrain);
    renderer.add_render_object(terrain)?;

    for i in 0..4 {
        let position = Vec3::new(i as f32 * 20.0 - 30.0, 8.0, 0.0);
        let glow = RenderableObject::new(
            cube_id,
            &cube,
            VertexLayout::STANDARD,
            MaterialId(3),
            "effect",
            Mat4::new_translation(&position) * Mat4::new_scaling(0.5),
        )
        .with_layer(RenderLayer::Effect)
        .with_static(false);
        renderer.add_render_object(glow)?;
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_with_level("info");

    let config = load_config()?;
    let mut device = HeadlessDevice::new();
    let mut renderer = Renderer::new(config.clone(), &mut device)?;
    populate(&mut renderer)?;
    renderer.build_batches(&mut device);

    let stats = renderer.batch_stats();
    log::info!(
        "{} objects in {} batches ({} commands, {:.1} per batch, {} vertices, {} indices)",
        renderer.objects().len(),
        stats.batch_count,
        stats.total_commands,
        stats.avg_commands_per_batch(),
        stats.vertex_count,
        stats.index_count
    );

    let (shaders, materials, textures) = registries();
    let lights = [
        Light::directional(Vec3::new(-0.4, -1.0, -0.3), Vec3::new(1.0, 0.95, 0.9), 3.0),
        Light::point(Vec3::new(0.0, 12.0, 0.0), 40.0, Vec3::new(1.0, 0.6, 0.2), 5.0),
    ];
    let aspect = config.width as f32 / config.height as f32;
    let mut camera = Camera::perspective(Vec3::new(0.0, 20.0, 250.0), 60.0, aspect, 0.1, 1000.0);

    for frame in 0..FRAMES {
        let t = frame as f32 / FRAMES as f32;
        camera.set_position(Vec3::new(0.0, 20.0, 250.0 - 400.0 * t));
        camera.set_target(Vec3::new(0.0, 0.0, 200.0 - 400.0 * t));

        if frame == FRAMES / 2 {
            renderer.on_window_resize(1920, 1080, &mut device)?;
            camera.set_aspect_ratio(1920.0 / 1080.0);
        }
        if frame == FRAMES * 3 / 4 {
            renderer.frames_mut().set_pass_enabled(PassKind::Grid, false);
        }

        let visible = renderer.cull_and_lod_update(&camera, &mut device);
        let resources = ResourceContext::new(&shaders, &materials, &textures);
        let frame_stats = renderer.render_frame(&camera, &lights, resources, &mut device);

        if frame % 60 == 0 {
            log::info!(
                "frame {}: {} visible batches, {} culled, {} passes, {} draw submissions",
                frame_stats.frame_index,
                visible,
                frame_stats.batches_culled,
                frame_stats.passes_executed,
                frame_stats.draw_submissions
            );
        }
    }

    let stats = renderer.batch_stats();
    log::info!(
        "Done: {} frames presented, {} LOD patches, {} redundant LOD updates skipped",
        device.frames_presented(),
        stats.lod_patches,
        stats.redundant_lod_updates
    );

    renderer.destroy(&mut device);
    log::info!("{} buffers and {} framebuffers left alive", device.live_buffers(), device.live_framebuffers());
    Ok(())
}
