//! Fixed-capacity per-slot attribute storage.
//!
//! The circular buffer holds one entry per slot: a vertex id (`-1` when the
//! slot was spawned while the emitter was disabled), the base position
//! captured at spawn time and, for world relative emitters, the spawn-time
//! orientation. Writes overwrite in place and widen the attribute's dirty
//! range; the render layer drains the ranges once per frame.

use glam::{Quat, Vec3};
use stardust_common::DirtyRange;

/// Attributes of one slot as seen by the evaluator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotAttributes {
    /// Slot index, or `-1` for a disabled slot
    pub vertex_id: f32,
    /// Spawn-time base position
    pub position: Vec3,
    /// Spawn-time orientation
    pub orientation: Quat,
}

/// Dirty ranges per attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirtyRanges {
    /// Vertex ids
    pub vertex_ids: DirtyRange,
    /// Base positions
    pub positions: DirtyRange,
    /// Orientations
    pub orientations: DirtyRange,
}

impl DirtyRanges {
    /// Whether nothing needs uploading.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertex_ids.is_empty() && self.positions.is_empty() && self.orientations.is_empty()
    }
}

/// Circular slot buffer.
#[derive(Debug, Clone)]
pub struct SlotBuffer {
    vertex_ids: Vec<f32>,
    positions: Vec<[f32; 3]>,
    orientations: Option<Vec<[f32; 4]>>,
    dirty: DirtyRanges,
}

impl SlotBuffer {
    /// Allocates `count` slots. Orientations are only stored for world
    /// relative emitters.
    #[must_use]
    pub fn new(count: u32, with_orientations: bool) -> Self {
        let len = count as usize;
        let full = DirtyRange::new(0, count);
        Self {
            vertex_ids: (0..count).map(|i| i as f32).collect(),
            positions: vec![[0.0; 3]; len],
            orientations: with_orientations.then(|| vec![Quat::IDENTITY.to_array(); len]),
            dirty: DirtyRanges {
                vertex_ids: full,
                positions: full,
                orientations: if with_orientations { full } else { DirtyRange::default() },
            },
        }
    }

    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> u32 {
        self.vertex_ids.len() as u32
    }

    /// Whether the buffer has no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertex_ids.is_empty()
    }

    /// Reads one slot.
    #[must_use]
    pub fn attributes(&self, slot: u32) -> SlotAttributes {
        let i = slot as usize;
        SlotAttributes {
            vertex_id: self.vertex_ids[i],
            position: Vec3::from_array(self.positions[i]),
            orientation: self
                .orientations
                .as_ref()
                .map_or(Quat::IDENTITY, |o| Quat::from_array(o[i])),
        }
    }

    /// Writes a slot's vertex id.
    pub fn set_vertex_id(&mut self, slot: u32, id: f32) {
        self.vertex_ids[slot as usize] = id;
    }

    /// Writes a slot's base position.
    pub fn set_position(&mut self, slot: u32, position: Vec3) {
        self.positions[slot as usize] = position.to_array();
    }

    /// Writes a slot's orientation. Ignored without orientation storage.
    pub fn set_orientation(&mut self, slot: u32, orientation: Quat) {
        if let Some(orientations) = self.orientations.as_mut() {
            orientations[slot as usize] = orientation.to_array();
        }
    }

    /// Widens the dirty ranges of the selected attributes.
    pub fn mark_dirty(&mut self, range: DirtyRange, vertex_ids: bool, positions: bool, orientations: bool) {
        if vertex_ids {
            self.dirty.vertex_ids = self.dirty.vertex_ids.union(range);
        }
        if positions {
            self.dirty.positions = self.dirty.positions.union(range);
        }
        if orientations && self.orientations.is_some() {
            self.dirty.orientations = self.dirty.orientations.union(range);
        }
    }

    /// Pending dirty ranges.
    #[must_use]
    pub fn dirty(&self) -> DirtyRanges {
        self.dirty
    }

    /// Returns and clears the pending dirty ranges.
    pub fn take_dirty(&mut self) -> DirtyRanges {
        std::mem::take(&mut self.dirty)
    }

    /// Raw vertex ids.
    #[must_use]
    pub fn vertex_ids(&self) -> &[f32] {
        &self.vertex_ids
    }

    /// Raw base positions.
    #[must_use]
    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    /// Raw orientations, if stored.
    #[must_use]
    pub fn orientations(&self) -> Option<&[[f32; 4]]> {
        self.orientations.as_deref()
    }
}
