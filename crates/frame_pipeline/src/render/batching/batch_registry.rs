//! Owner of every renderable and every batch built from them

use std::collections::HashMap;

use super::draw_batch::{BatchKey, DrawBatch};
use crate::foundation::math::{Aabb, Vec3};
use crate::render::api::GraphicsDevice;
use crate::render::RenderError;
use crate::scene::{FrustumCuller, LodSelector, MeshArena, RenderableObject};

/// Batching and LOD statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Number of live batches
    pub batch_count: usize,

    /// Draw commands across all batches
    pub total_commands: usize,

    /// Interleaved vertices across all batches
    pub vertex_count: usize,

    /// Indices across all batches
    pub index_count: usize,

    /// Buckets that failed to build in the last build
    pub rejected_buckets: usize,

    /// Full rebuilds performed
    pub rebuilds: u64,

    /// Indirect commands rewritten by LOD changes
    pub lod_patches: u64,

    /// LOD updates skipped because the command already matched
    pub redundant_lod_updates: u64,
}

impl BatchStats {
    /// Calculate average commands per batch
    pub fn avg_commands_per_batch(&self) -> f32 {
        if self.batch_count == 0 {
            0.0
        } else {
            self.total_commands as f32 / self.batch_count as f32
        }
    }
}

/// Registry of renderables and the batches grouping them.
///
/// Objects are addressed by the index returned from [`add_object`](Self::add_object).
/// Batches are rebuilt only when the registry is dirty; LOD changes patch
/// commands in place.
#[derive(Debug, Default)]
pub struct BatchRegistry {
    objects: Vec<RenderableObject>,
    batches: Vec<DrawBatch>,
    dirty: bool,
    stats: BatchStats,
}

impl BatchRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an object and return its index; marks the registry dirty
    pub fn add_object(&mut self, object: RenderableObject) -> usize {
        self.objects.push(object);
        self.dirty = true;
        self.objects.len() - 1
    }

    /// Force a full rebuild on the next [`build`](Self::build)
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Whether the next build will do any work
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Group objects by [`BatchKey`] and build one batch per group.
    ///
    /// Does nothing unless dirty. Previous batches are released first. A
    /// bucket that fails to build is logged and skipped; the others are kept.
    /// Groups appear in the order their first object was added.
    pub fn build(&mut self, meshes: &MeshArena, device: &mut dyn GraphicsDevice) {
        if !self.dirty {
            return;
        }
        self.release_batches(device);

        let mut order: Vec<(BatchKey, Vec<usize>)> = Vec::new();
        let mut lookup: HashMap<BatchKey, usize> = HashMap::new();
        for (index, object) in self.objects.iter().enumerate() {
            let key = BatchKey::of(object);
            let bucket = *lookup.entry(key.clone()).or_insert_with(|| {
                order.push((key, Vec::new()));
                order.len() - 1
            });
            order[bucket].1.push(index);
        }

        let mut rejected = 0;
        for (key, indices) in order {
            let members: Vec<(usize, &RenderableObject)> = indices.iter().map(|&i| (i, &self.objects[i])).collect();
            match DrawBatch::build(key.clone(), &members, meshes, device) {
                Ok(batch) => self.batches.push(batch),
                Err(e) => {
                    rejected += 1;
                    log::error!(
                        "Skipping batch '{}' material {} ({} objects): {}",
                        key.shader_key,
                        key.material_id.0,
                        members.len(),
                        e
                    );
                }
            }
        }

        self.dirty = false;
        self.stats.rebuilds += 1;
        self.stats.rejected_buckets = rejected;
        self.refresh_totals();
        log::info!(
            "Built {} batches from {} objects ({} rejected)",
            self.batches.len(),
            self.objects.len(),
            rejected
        );
    }

    /// Release every batch and forget every object
    pub fn clear(&mut self, device: &mut dyn GraphicsDevice) {
        self.release_batches(device);
        self.objects.clear();
        self.dirty = false;
        self.refresh_totals();
    }

    /// Select a LOD for every object by distance and patch changed commands.
    ///
    /// Returns the number of commands rewritten. A command that cannot be
    /// patched in place marks the registry dirty so the next build rebuilds.
    pub fn update_lods(&mut self, camera_position: &Vec3, selector: &LodSelector, device: &mut dyn GraphicsDevice) -> usize {
        let desired = selector.evaluate_lods(&self.objects, camera_position);
        let mut patched = 0;
        for (index, level) in desired.into_iter().enumerate() {
            if self.objects[index].set_lod(level) && self.patch(index, device) {
                patched += 1;
            }
        }
        patched
    }

    /// Put every batched object at `level` (clamped per object), ignoring distance
    pub fn force_lod(&mut self, level: usize, device: &mut dyn GraphicsDevice) -> usize {
        let mut patched = 0;
        for index in 0..self.objects.len() {
            self.objects[index].set_lod(level);
            if self.patch(index, device) {
                patched += 1;
            }
        }
        patched
    }

    /// Sync the command of object `index` with its current LOD
    fn patch(&mut self, index: usize, device: &mut dyn GraphicsDevice) -> bool {
        let level = self.objects[index].current_lod();
        let Some((batch, slot)) = self.batches.iter_mut().find_map(|b| {
            let slot = b.slot_of(index)?;
            Some((b, slot))
        }) else {
            log::trace!("Object {} is not in any batch", index);
            return false;
        };

        match batch.update_lod(slot, level, device) {
            Ok(true) => {
                self.stats.lod_patches += 1;
                true
            }
            Ok(false) => {
                self.stats.redundant_lod_updates += 1;
                false
            }
            Err(e @ RenderError::BufferOverflow { .. }) => {
                log::warn!("LOD patch for object {} overflowed, scheduling rebuild: {}", index, e);
                self.dirty = true;
                false
            }
            Err(e) => {
                log::warn!("LOD patch for object {} failed: {}", index, e);
                false
            }
        }
    }

    /// Test every batch against `culler`; `None` marks everything visible.
    ///
    /// A batch is visible when any member's world sphere passes. Returns the
    /// number of visible batches.
    pub fn cull(&mut self, culler: Option<&FrustumCuller>) -> usize {
        let objects = &self.objects;
        let mut visible = 0;
        for batch in &mut self.batches {
            let pass = culler.map_or(true, |c| {
                batch.members().iter().any(|&m| {
                    let sphere = objects[m].world_sphere();
                    c.test_sphere(&sphere.center, sphere.radius)
                })
            });
            batch.set_visible(pass);
            if pass {
                visible += 1;
            }
        }
        visible
    }

    /// World bounds of the built batches that cast shadows.
    ///
    /// Empty when nothing would be drawn into the shadow map.
    pub fn shadow_bounds(&self) -> Aabb {
        let mut bounds = Aabb::empty();
        for batch in self.batches.iter().filter(|b| b.casts_shadows()) {
            let batch_bounds = batch.bounds();
            if !batch_bounds.is_empty() {
                bounds.extend(batch_bounds.min);
                bounds.extend(batch_bounds.max);
            }
        }
        bounds
    }

    /// Registered objects in index order
    pub fn objects(&self) -> &[RenderableObject] {
        &self.objects
    }

    /// Object by index
    pub fn object(&self, index: usize) -> Option<&RenderableObject> {
        self.objects.get(index)
    }

    /// Live batches
    pub fn batches(&self) -> &[DrawBatch] {
        &self.batches
    }

    /// Current statistics
    pub fn stats(&self) -> BatchStats {
        self.stats
    }

    fn release_batches(&mut self, device: &mut dyn GraphicsDevice) {
        for batch in &mut self.batches {
            batch.release(device);
        }
        self.batches.clear();
    }

    fn refresh_totals(&mut self) {
        self.stats.batch_count = self.batches.len();
        self.stats.total_commands = self.batches.iter().map(|b| b.commands().len()).sum();
        self.stats.vertex_count = self.batches.iter().map(DrawBatch::vertex_count).sum();
        self.stats.index_count = self.batches.iter().map(DrawBatch::index_count).sum();
    }
}
