//! Specialized collection types

pub use slotmap::{SlotMap, new_key_type};

new_key_type! {
    /// Stable key of a mesh stored in a [`crate::scene::MeshArena`]
    pub struct MeshId;
}

/// Handle-based map keyed by [`MeshId`]
pub type MeshMap<T> = SlotMap<MeshId, T>;
