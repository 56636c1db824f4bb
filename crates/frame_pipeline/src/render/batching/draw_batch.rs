//! One batch: shared buffers plus one indirect command per member
//!
//! Every LOD of every member is baked into the combined index buffer at build
//! time, with indices already rebased by the member's base vertex. Switching
//! LOD later only rewrites the `(first_index, index_count)` of one command.

use bytemuck::{Pod, Zeroable};

use crate::foundation::math::Aabb;
use crate::render::api::{BufferHandle, BufferKind, GraphicsDevice};
use crate::render::resources::MaterialId;
use crate::render::{RenderError, RenderResult};
use crate::scene::{MeshArena, RenderLayer, RenderableObject, VertexLayout};

/// Indexed indirect draw command, laid out as the GPU consumes it
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct DrawCommand {
    /// Number of indices to draw
    pub index_count: u32,
    /// Number of instances (always 1)
    pub instance_count: u32,
    /// First index in the combined index buffer
    pub first_index: u32,
    /// Added to every index (0: indices are pre-rebased)
    pub base_vertex: i32,
    /// First instance id
    pub base_instance: u32,
}

/// Byte stride between consecutive commands
pub const COMMAND_STRIDE: u32 = std::mem::size_of::<DrawCommand>() as u32;

impl DrawCommand {
    fn for_range(range: LodRange) -> Self {
        Self {
            index_count: range.count,
            instance_count: 1,
            first_index: range.offset,
            base_vertex: 0,
            base_instance: 0,
        }
    }
}

/// Location of one LOD inside the combined index buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LodRange {
    /// First index
    pub offset: u32,
    /// Index count
    pub count: u32,
}

/// Grouping key of a batch
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BatchKey {
    /// Shader program key
    pub shader_key: String,
    /// Material id
    pub material_id: MaterialId,
    /// Shared vertex layout
    pub layout: VertexLayout,
    /// Pass family
    pub layer: RenderLayer,
}

impl BatchKey {
    /// The key an object is grouped under
    pub fn of(object: &RenderableObject) -> Self {
        Self {
            shader_key: object.shader_key.clone(),
            material_id: object.material_id,
            layout: object.layout,
            layer: object.layer,
        }
    }
}

/// CPU-side result of assembling a batch, before upload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchGeometry {
    /// Interleaved vertex data
    pub vertices: Vec<f32>,
    /// Rebased indices of every LOD of every member
    pub indices: Vec<u32>,
    /// Per member, per LOD location in `indices`
    pub lod_tables: Vec<Vec<LodRange>>,
    /// One command per member, at its current LOD
    pub commands: Vec<DrawCommand>,
    /// Number of interleaved vertices
    pub vertex_count: usize,
}

impl BatchGeometry {
    /// Interleave and concatenate the members' meshes.
    ///
    /// Fails with `InconsistentLayout` when a member's layout differs from
    /// `layout` or its position dimensionality does not match, and with
    /// `MissingResource` when a mesh is not in the arena.
    pub fn assemble(layout: VertexLayout, members: &[&RenderableObject], meshes: &MeshArena) -> RenderResult<Self> {
        let dims = layout.position_dims().ok_or_else(|| {
            RenderError::InconsistentLayout(format!("layout {layout:?} must name exactly one position format"))
        })?;

        let mut geometry = Self::default();
        for (slot, object) in members.iter().enumerate() {
            if object.layout != layout {
                return Err(RenderError::InconsistentLayout(format!(
                    "member {slot} uses {:?}, batch uses {layout:?}",
                    object.layout
                )));
            }
            let mesh = meshes.require(object.mesh)?;
            let streams = mesh.streams();
            if streams.positions.dims() != dims {
                return Err(RenderError::InconsistentLayout(format!(
                    "mesh '{}' has {}D positions, batch layout is {dims}D",
                    mesh.name,
                    streams.positions.dims()
                )));
            }

            let base_vertex = to_u32(geometry.vertex_count)?;
            geometry.vertices.reserve(mesh.vertex_count() * layout.stride_floats());
            for v in 0..mesh.vertex_count() {
                streams.write_vertex(v, layout, &mut geometry.vertices);
            }
            geometry.vertex_count += mesh.vertex_count();

            let mut table = Vec::with_capacity(mesh.lod_count());
            for lod in mesh.lods() {
                let offset = to_u32(geometry.indices.len())?;
                geometry.indices.extend(lod.iter().map(|&i| i + base_vertex));
                table.push(LodRange { offset, count: to_u32(lod.len())? });
            }

            let current = table[object.current_lod().min(table.len() - 1)];
            geometry.commands.push(DrawCommand::for_range(current));
            geometry.lod_tables.push(table);
        }
        to_u32(geometry.vertex_count)?;
        Ok(geometry)
    }
}

fn to_u32(value: usize) -> RenderResult<u32> {
    u32::try_from(value).map_err(|_| RenderError::Backend(format!("batch exceeds 32-bit index range ({value})")))
}

/// GPU buffers exclusively owned by one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuBuffers {
    /// Combined vertex buffer
    pub vertex: BufferHandle,
    /// Combined index buffer
    pub index: BufferHandle,
    /// Indirect command buffer
    pub indirect: BufferHandle,
    /// Allocated bytes of the indirect buffer
    pub indirect_capacity: u64,
}

/// A group of renderables drawn with one multi-draw submission
#[derive(Debug)]
pub struct DrawBatch {
    key: BatchKey,
    members: Vec<usize>,
    lod_tables: Vec<Vec<LodRange>>,
    commands: Vec<DrawCommand>,
    vertex_count: usize,
    index_count: usize,
    bounds: Aabb,
    is_static: bool,
    visible: bool,
    buffers: Option<GpuBuffers>,
}

impl DrawBatch {
    /// Assemble and upload a batch.
    ///
    /// `members` pairs each object with its registry index; command `i`
    /// belongs to `members[i]`. Building from zero objects yields an empty
    /// batch that owns no buffers and draws nothing.
    pub fn build(
        key: BatchKey,
        members: &[(usize, &RenderableObject)],
        meshes: &MeshArena,
        device: &mut dyn GraphicsDevice,
    ) -> RenderResult<Self> {
        let mut batch = Self {
            key,
            members: members.iter().map(|(index, _)| *index).collect(),
            lod_tables: Vec::new(),
            commands: Vec::new(),
            vertex_count: 0,
            index_count: 0,
            bounds: Aabb::empty(),
            is_static: members.iter().all(|(_, o)| o.is_static),
            visible: true,
            buffers: None,
        };
        if members.is_empty() {
            return Ok(batch);
        }

        let objects: Vec<&RenderableObject> = members.iter().map(|(_, o)| *o).collect();
        let geometry = BatchGeometry::assemble(batch.key.layout, &objects, meshes)?;
        for object in &objects {
            let sphere = object.world_sphere();
            batch.bounds.extend_sphere(sphere.center, sphere.radius);
        }

        batch.buffers = Some(upload(&geometry, device)?);
        batch.vertex_count = geometry.vertex_count;
        batch.index_count = geometry.indices.len();
        batch.lod_tables = geometry.lod_tables;
        batch.commands = geometry.commands;

        log::debug!(
            "Built batch '{}' material {} ({:?}): {} objects, {} vertices, {} indices",
            batch.key.shader_key,
            batch.key.material_id.0,
            batch.key.layer,
            batch.members.len(),
            batch.vertex_count,
            batch.index_count
        );
        Ok(batch)
    }

    /// Bind the shared buffers once and submit every command in one call
    pub fn render(&self, device: &mut dyn GraphicsDevice) {
        let Some(buffers) = self.buffers else {
            return;
        };
        device.bind_geometry(buffers.vertex, Some(buffers.index), self.key.layout);
        device.multi_draw_indexed_indirect(buffers.indirect, self.commands.len() as u32, COMMAND_STRIDE);
    }

    /// Point command `slot` at LOD `level` of its member.
    ///
    /// Levels the mesh lacks fall back to its coarsest level. Returns `false`
    /// without touching the device when the command already matches.
    pub fn update_lod(&mut self, slot: usize, level: usize, device: &mut dyn GraphicsDevice) -> RenderResult<bool> {
        let table = self.lod_tables.get(slot).ok_or_else(|| {
            RenderError::InvalidReference(format!("command slot {slot} of {}", self.commands.len()))
        })?;
        let range = table[level.min(table.len() - 1)];
        let command = self.commands[slot];
        if command.first_index == range.offset && command.index_count == range.count {
            return Ok(false);
        }

        let buffers = self
            .buffers
            .ok_or_else(|| RenderError::MissingResource("indirect buffer of unbuilt batch".to_string()))?;
        let offset = u64::from(COMMAND_STRIDE) * slot as u64;
        if offset + u64::from(COMMAND_STRIDE) > buffers.indirect_capacity {
            return Err(RenderError::BufferOverflow {
                offset,
                size: COMMAND_STRIDE as usize,
                capacity: buffers.indirect_capacity as usize,
            });
        }

        let patched = DrawCommand { first_index: range.offset, index_count: range.count, ..command };
        device.write_buffer(buffers.indirect, offset, bytemuck::bytes_of(&patched))?;
        self.commands[slot] = patched;
        Ok(true)
    }

    /// Release the GPU buffers; the batch draws nothing afterwards
    pub fn release(&mut self, device: &mut dyn GraphicsDevice) {
        if let Some(buffers) = self.buffers.take() {
            device.destroy_buffer(buffers.vertex);
            device.destroy_buffer(buffers.index);
            device.destroy_buffer(buffers.indirect);
        }
    }

    /// Command slot of a registry object, if it belongs to this batch
    pub fn slot_of(&self, object_index: usize) -> Option<usize> {
        self.members.iter().position(|&m| m == object_index)
    }

    /// Grouping key
    pub fn key(&self) -> &BatchKey {
        &self.key
    }

    /// Registry indices of the members, in command order
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    /// CPU mirror of the indirect command buffer
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// LOD table of the member in `slot`
    pub fn lod_table(&self, slot: usize) -> Option<&[LodRange]> {
        self.lod_tables.get(slot).map(Vec::as_slice)
    }

    /// Interleaved vertices in the combined buffer
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Indices in the combined buffer
    pub fn index_count(&self) -> usize {
        self.index_count
    }

    /// World bounds of the members at build time
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// True when every member is static (shadow casters)
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Drawn into the shadow map: static, not an effect, and uploaded
    pub fn casts_shadows(&self) -> bool {
        self.is_static && self.key.layer != RenderLayer::Effect && self.buffers.is_some()
    }

    /// Result of the last visibility test
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Store the visibility test result
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Owned GPU buffers, `None` for empty or released batches
    pub fn buffers(&self) -> Option<GpuBuffers> {
        self.buffers
    }
}

fn upload(geometry: &BatchGeometry, device: &mut dyn GraphicsDevice) -> RenderResult<GpuBuffers> {
    let vertex = device.create_buffer(BufferKind::Vertex, bytemuck::cast_slice(&geometry.vertices))?;
    let index = match device.create_buffer(BufferKind::Index, bytemuck::cast_slice(&geometry.indices)) {
        Ok(index) => index,
        Err(e) => {
            device.destroy_buffer(vertex);
            return Err(e);
        }
    };
    let command_bytes: &[u8] = bytemuck::cast_slice(&geometry.commands);
    let indirect = match device.create_buffer(BufferKind::Indirect, command_bytes) {
        Ok(indirect) => indirect,
        Err(e) => {
            device.destroy_buffer(vertex);
            device.destroy_buffer(index);
            return Err(e);
        }
    };
    Ok(GpuBuffers { vertex, index, indirect, indirect_capacity: command_bytes.len() as u64 })
}
