//! End-to-end scenarios driven through the public API on the headless backend

use frame_pipeline::foundation::logging;
use frame_pipeline::prelude::*;
use frame_pipeline::render::backends::DeviceCall;
use frame_pipeline::render::batching::COMMAND_STRIDE;
use frame_pipeline::render::PassKind;
use frame_pipeline::scene::{Positions, VertexStreams};

fn device() -> HeadlessDevice {
    logging::init();
    HeadlessDevice::new()
}

fn shaders() -> ShaderRegistry {
    let mut shaders = ShaderRegistry::new();
    let keys = ["lit", "terrain", "effect", "shadow_depth", "skybox", "grid", "debug_light", "post_process"];
    for (i, key) in keys.into_iter().enumerate() {
        shaders.register(key, ShaderHandle(i as u64 + 1));
    }
    shaders
}

fn materials() -> MaterialRegistry {
    let mut materials = MaterialRegistry::new();
    materials.register(MaterialId(1), Material::with_color([0.7, 0.7, 0.7, 1.0]));
    materials
}

fn add_cube(renderer: &mut Renderer, lods: usize, position: Vec3) -> usize {
    let mesh = Mesh::cube(lods);
    let id = renderer.add_mesh(mesh.clone());
    let object =
        RenderableObject::new(id, &mesh, VertexLayout::STANDARD, MaterialId(1), "lit", Mat4::new_translation(&position));
    renderer.add_render_object(object).unwrap()
}

fn camera() -> Camera {
    let mut camera = Camera::perspective(Vec3::new(0.0, 4.0, 25.0), 60.0, 4.0 / 3.0, 0.1, 1000.0);
    camera.set_target(Vec3::zeros());
    camera
}

#[test]
fn test_three_cubes_with_mixed_lod_counts_share_one_batch() {
    let mut device = device();
    let mut renderer = Renderer::new(RendererConfig::default(), &mut device).unwrap();
    for (i, lods) in [3, 1, 2].into_iter().enumerate() {
        add_cube(&mut renderer, lods, Vec3::new(i as f32 * 3.0, 0.0, 0.0));
    }

    renderer.build_batches(&mut device);

    let batches = renderer.batches();
    assert_eq!(batches.len(), 1);
    let batch = &batches[0];
    assert_eq!(batch.commands().len(), 3);
    let table_sizes: Vec<usize> = (0..3).map(|slot| batch.lod_table(slot).unwrap().len()).collect();
    assert_eq!(table_sizes, vec![3, 1, 2]);

    renderer.force_lod(5, &mut device);
    assert_eq!(renderer.objects()[0].current_lod(), 2);
    assert_eq!(renderer.objects()[1].current_lod(), 0);
    assert_eq!(renderer.objects()[2].current_lod(), 1);
    let batch = &renderer.batches()[0];
    assert_eq!(batch.commands()[0].first_index, batch.lod_table(0).unwrap()[2].offset);
    assert_eq!(batch.commands()[0].index_count, batch.lod_table(0).unwrap()[2].count);
}

#[test]
fn test_n_objects_one_batch_with_summed_buffers() {
    let mut device = device();
    let mut renderer = Renderer::new(RendererConfig::default(), &mut device).unwrap();
    let n = 7;
    for i in 0..n {
        add_cube(&mut renderer, 1 + i % 3, Vec3::new(i as f32 * 2.5, 0.0, 0.0));
    }

    renderer.build_batches(&mut device);

    let batch = &renderer.batches()[0];
    let buffers = batch.buffers().unwrap();
    let expected_indices: usize = renderer
        .objects()
        .iter()
        .map(|o| renderer.meshes().get(o.mesh).unwrap().lods().iter().map(Vec::len).sum::<usize>())
        .sum();
    assert_eq!(renderer.batches().len(), 1);
    assert_eq!(batch.commands().len(), n);
    assert_eq!(device.buffer_contents(buffers.vertex).unwrap().len(), n * 24 * VertexLayout::STANDARD.stride_bytes());
    assert_eq!(device.buffer_contents(buffers.index).unwrap().len(), expected_indices * 4);
    assert_eq!(device.buffer_contents(buffers.indirect).unwrap().len(), n * COMMAND_STRIDE as usize);
}

#[test]
fn test_render_issues_one_command_per_object_in_one_submission() {
    let mut device = device();
    let mut renderer = Renderer::new(RendererConfig::default(), &mut device).unwrap();
    for i in (0..5).rev() {
        add_cube(&mut renderer, 2, Vec3::new(i as f32 * 2.0 - 4.0, 0.0, 0.0));
    }
    renderer.build_batches(&mut device);
    device.clear_calls();

    renderer.batches()[0].render(&mut device);

    assert_eq!(device.draw_submissions(), 1);
    let draw_count = device.calls().iter().find_map(|c| match c {
        DeviceCall::MultiDrawIndexedIndirect { draw_count, .. } => Some(*draw_count),
        _ => None,
    });
    assert_eq!(draw_count, Some(5));
}

#[test]
fn test_repeated_lod_updates_do_not_rewrite_commands() {
    let mut device = device();
    let mut renderer = Renderer::new(RendererConfig::default(), &mut device).unwrap();
    add_cube(&mut renderer, 3, Vec3::zeros());
    add_cube(&mut renderer, 3, Vec3::new(0.0, 0.0, -300.0));
    let camera = camera();

    renderer.cull_and_lod_update(&camera, &mut device);
    let indirect = renderer.batches()[0].buffers().unwrap().indirect;
    let snapshot = device.buffer_contents(indirect).unwrap().to_vec();
    device.clear_calls();

    renderer.cull_and_lod_update(&camera, &mut device);
    renderer.force_lod(2, &mut device);
    renderer.force_lod(2, &mut device);

    let writes = device.count_calls(|c| matches!(c, DeviceCall::WriteBuffer { .. }));
    assert_eq!(writes, 1, "only object 0 moves to LOD 2, once");
    assert_ne!(device.buffer_contents(indirect).unwrap(), snapshot.as_slice());
    assert_eq!(renderer.objects()[1].current_lod(), 2);
}

#[test]
fn test_resize_recreates_scene_framebuffer_once_and_updates_every_pass() {
    let mut device = device();
    let config = RendererConfig { width: 800, height: 600, ..Default::default() };
    let mut renderer = Renderer::new(config, &mut device).unwrap();
    let old_scene = renderer.frames().scene_framebuffer().handle();
    let updates_before: Vec<u32> = renderer.frames().passes().map(|p| p.target().updates()).collect();
    device.clear_calls();

    renderer.on_window_resize(1920, 1080, &mut device).unwrap();

    assert_eq!(device.count_calls(|c| matches!(c, DeviceCall::CreateFramebuffer { .. })), 1);
    let new_scene = renderer.frames().scene_framebuffer().handle();
    assert_ne!(new_scene, old_scene);
    for (pass, before) in renderer.frames().passes().zip(updates_before) {
        assert_eq!(pass.target().updates(), before + 1);
        assert_eq!(pass.target().framebuffer(), Some(new_scene));
    }
    assert_eq!(renderer.frames().passes().count(), PassKind::ORDER.len());
}

#[test]
fn test_full_frame_degrades_instead_of_failing() {
    let mut device = device();
    let mut renderer = Renderer::new(RendererConfig::default(), &mut device).unwrap();
    add_cube(&mut renderer, 2, Vec3::zeros());
    let terrain_mesh = Mesh::cube(1);
    let terrain_id = renderer.add_mesh(terrain_mesh.clone());
    renderer
        .add_render_object(
            RenderableObject::new(terrain_id, &terrain_mesh, VertexLayout::STANDARD, MaterialId(9), "terrain", Mat4::identity())
                .with_layer(RenderLayer::Terrain),
        )
        .unwrap();
    let camera = camera();
    let lights = [Light::directional(Vec3::new(-0.3, -1.0, -0.2), Vec3::new(1.0, 1.0, 1.0), 3.0)];
    let shaders = shaders();
    let materials = materials();
    let textures = TextureRegistry::new();

    renderer.cull_and_lod_update(&camera, &mut device);
    let stats = renderer.render_frame(&camera, &lights, ResourceContext::new(&shaders, &materials, &textures), &mut device);

    // The terrain material is unknown: its batch is skipped but every pass still runs.
    assert_eq!(stats.passes_executed, 6);
    assert_eq!(stats.passes_skipped, 0);
    assert_eq!(stats.batches_visible, 2);
    assert_eq!(device.frames_presented(), 1);
    assert_eq!(device.calls().last(), Some(&DeviceCall::Present));
}

#[test]
fn test_flat_and_solid_meshes_never_share_a_batch() {
    let mut device = device();
    let mut renderer = Renderer::new(RendererConfig::default(), &mut device).unwrap();
    add_cube(&mut renderer, 1, Vec3::zeros());
    let flat = Mesh::new(
        "sprite",
        VertexStreams {
            positions: Positions::Dim2(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]),
            normals: None,
            tex_coords: None,
            tangents: None,
            colors: None,
        },
        vec![vec![0, 1, 2]],
    )
    .unwrap();
    let flat_id = renderer.add_mesh(flat.clone());
    let layout = VertexLayout::POSITION_2D | VertexLayout::TEXCOORD;
    renderer
        .add_render_object(RenderableObject::new(flat_id, &flat, layout, MaterialId(1), "lit", Mat4::identity()))
        .unwrap();

    renderer.build_batches(&mut device);

    assert_eq!(renderer.batches().len(), 2);
    assert_eq!(renderer.batches()[1].vertex_count(), 3);
    assert_eq!(renderer.batch_stats().rejected_buckets, 0);
}

#[test]
fn test_frame_without_shadow_program_renders_unshadowed() {
    let mut device = device();
    let mut renderer = Renderer::new(RendererConfig::default(), &mut device).unwrap();
    add_cube(&mut renderer, 1, Vec3::zeros());
    let camera = camera();
    let lights = [Light::directional(Vec3::new(-0.3, -1.0, -0.2), Vec3::new(1.0, 1.0, 1.0), 3.0)];
    let mut shaders = ShaderRegistry::new();
    for (i, key) in ["lit", "skybox", "post_process"].into_iter().enumerate() {
        shaders.register(key, ShaderHandle(i as u64 + 1));
    }
    let materials = materials();
    let textures = TextureRegistry::new();

    renderer.cull_and_lod_update(&camera, &mut device);
    device.clear_calls();
    let stats = renderer.render_frame(&camera, &lights, ResourceContext::new(&shaders, &materials, &textures), &mut device);

    assert_eq!(stats.passes_skipped, 1);
    let shadow_params: Vec<[f32; 4]> = device
        .calls()
        .iter()
        .filter_map(|c| match c {
            DeviceCall::SetUniformVec4 { name, value } if name == "u_shadow_params" => Some(*value),
            _ => None,
        })
        .collect();
    assert_eq!(shadow_params, vec![[0.0; 4]]);
}
