//! Distance-band LOD selection
//!
//! One shared threshold table applies to every object. An object whose
//! bounding-sphere distance exceeds the first `i` thresholds wants LOD `i`,
//! clamped to its own LOD count.

use crate::foundation::math::Vec3;

use super::renderable_object::RenderableObject;

/// Default distance bands in world units
pub const DEFAULT_LOD_THRESHOLDS: [f32; 4] = [50.0, 100.0, 200.0, 400.0];

/// Computes the desired LOD of each object from camera distance
#[derive(Debug, Clone, PartialEq)]
pub struct LodSelector {
    thresholds: Vec<f32>,
}

impl Default for LodSelector {
    fn default() -> Self {
        Self::new(DEFAULT_LOD_THRESHOLDS.to_vec())
    }
}

impl LodSelector {
    /// Create a selector; thresholds are sorted ascending
    pub fn new(mut thresholds: Vec<f32>) -> Self {
        thresholds.sort_by(f32::total_cmp);
        Self { thresholds }
    }

    /// Distance bands in ascending order
    pub fn thresholds(&self) -> &[f32] {
        &self.thresholds
    }

    /// LOD for an object `distance` away that has `lod_count` levels
    pub fn select(&self, distance: f32, lod_count: usize) -> usize {
        let band = self.thresholds.iter().take_while(|&&t| distance > t).count();
        band.min(lod_count.saturating_sub(1))
    }

    /// Desired LOD for every object, indexed like `objects`
    pub fn evaluate_lods(&self, objects: &[RenderableObject], camera_position: &Vec3) -> Vec<usize> {
        objects
            .iter()
            .map(|obj| self.select(obj.distance_to(camera_position), obj.lod_count()))
            .collect()
    }
}
