//! Spawn-time slot attribute writes.
//!
//! For every slot claimed by the scheduler the synchronizer records what the
//! evaluator cannot recompute later: the emitter's world transform at spawn
//! time (world relative emitters), a random point on the source surface, and
//! whether the emitter was enabled when the slot was claimed.

use glam::{Mat4, Quat, Vec3};
use stardust_common::Aabb;
use tracing::debug;

use crate::scheduler::SpawnBatch;
use crate::slots::SlotBuffer;

/// Triangle soup that particles spawn on.
#[derive(Debug, Clone)]
pub struct SourceSurface {
    triangles: Vec<[Vec3; 3]>,
    cumulative_area: Vec<f32>,
    bounds: Aabb,
}

impl SourceSurface {
    /// Builds a surface from flat triangle vertices, scaled by `scale`.
    ///
    /// Returns `None` when `positions` holds no complete triangle.
    #[must_use]
    pub fn from_positions(positions: &[[f32; 3]], scale: Vec3) -> Option<Self> {
        let triangles: Vec<[Vec3; 3]> = positions
            .chunks_exact(3)
            .map(|t| [0, 1, 2].map(|i| Vec3::from_array(t[i]) * scale))
            .collect();
        let bounds = Aabb::from_points(triangles.iter().flatten().copied())?;

        let mut total = 0.0;
        let cumulative_area = triangles
            .iter()
            .map(|[a, b, c]| {
                total += (*b - *a).cross(*c - *a).length() * 0.5;
                total
            })
            .collect();

        debug!("Source surface with {} triangles, area {total}", triangles.len());
        Some(Self {
            triangles,
            cumulative_area,
            bounds,
        })
    }

    /// Number of triangles.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Bounds of the scaled surface.
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Uniform random point on the surface.
    ///
    /// Triangles are picked proportionally to their area; a surface with no
    /// area falls back to picking triangles uniformly.
    pub fn sample(&self, rng: &mut fastrand::Rng) -> Vec3 {
        let total = self.cumulative_area.last().copied().unwrap_or(0.0);
        let index = if total > 0.0 {
            let target = rng.f32() * total;
            self.cumulative_area
                .partition_point(|&area| area <= target)
                .min(self.triangles.len() - 1)
        } else {
            rng.usize(..self.triangles.len())
        };

        let [a, b, c] = self.triangles[index];
        let (u, v) = loop {
            let (u, v) = (rng.f32(), rng.f32());
            if u + v <= 1.0 {
                break (u, v);
            }
        };
        a + (b - a) * u + (c - a) * v
    }
}

/// Writes spawn-time attributes for claimed slots.
#[derive(Debug, Clone)]
pub struct TransformSynchronizer {
    world_relative: bool,
    managed: bool,
    surface: Option<SourceSurface>,
    num_enabled: u32,
    num_disabled: u32,
    rng: fastrand::Rng,
}

impl TransformSynchronizer {
    /// Creates a synchronizer for a buffer of `capacity` slots, all enabled.
    #[must_use]
    pub fn new(world_relative: bool, capacity: u32, rng: fastrand::Rng) -> Self {
        Self {
            world_relative,
            managed: world_relative,
            surface: None,
            num_enabled: capacity,
            num_disabled: 0,
            rng,
        }
    }

    /// Marks a freshly allocated buffer of `capacity` slots as all enabled.
    pub fn reset(&mut self, capacity: u32) {
        self.num_enabled = capacity;
        self.num_disabled = 0;
    }

    /// Switches to host-managed ids. Once managed, ids stay managed.
    pub fn manage_ids(&mut self) {
        if !self.managed {
            debug!("Switching to host managed particle ids");
        }
        self.managed = true;
    }

    /// Whether the host writes vertex ids and publishes the last spawned id.
    #[must_use]
    pub fn is_managed(&self) -> bool {
        self.managed
    }

    /// Installs the source surface, or removes it with `None`.
    pub fn set_surface(&mut self, surface: Option<SourceSurface>) {
        if surface.is_some() {
            self.manage_ids();
        }
        self.surface = surface;
    }

    /// Current source surface.
    #[must_use]
    pub fn surface(&self) -> Option<&SourceSurface> {
        self.surface.as_ref()
    }

    /// Writes attributes for every slot in `batch` and marks the written
    /// attributes dirty over the batch's dirty range.
    ///
    /// World relative emitters store the spawn transform; the surface sample
    /// only becomes the base position when the emitter is not world relative.
    pub fn sync(&mut self, batch: &SpawnBatch, slots: &mut SlotBuffer, world: &Mat4, enabled: bool) {
        if batch.is_empty() {
            return;
        }

        let (_, rotation, translation) = if self.world_relative {
            world.to_scale_rotation_translation()
        } else {
            (Vec3::ONE, Quat::IDENTITY, Vec3::ZERO)
        };

        let capacity = slots.len();
        let mut ids_written = false;
        for claim in batch.claims() {
            if self.world_relative {
                slots.set_position(claim.slot, translation);
                slots.set_orientation(claim.slot, rotation);
            } else if let Some(surface) = &self.surface {
                let point = surface.sample(&mut self.rng);
                slots.set_position(claim.slot, point);
            }

            if !self.managed {
                continue;
            }
            // Stop rewriting once the whole buffer holds the current state.
            let streak = if enabled {
                self.num_disabled = 0;
                &mut self.num_enabled
            } else {
                self.num_enabled = 0;
                &mut self.num_disabled
            };
            if *streak < capacity {
                *streak += 1;
                let id = if enabled { claim.slot as f32 } else { -1.0 };
                slots.set_vertex_id(claim.slot, id);
                ids_written = true;
            }
        }

        let positions = self.world_relative || self.surface.is_some();
        slots.mark_dirty(batch.dirty, ids_written, positions, self.world_relative);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::SlotLayout;
    use stardust_common::DirtyRange;

    fn batch(start: u32, claimed: u32, capacity: u32) -> SpawnBatch {
        let layout = SlotLayout {
            particle_count: capacity,
            trail_count: 1,
        };
        SpawnBatch {
            claimed,
            dirty: DirtyRange::new(start, claimed),
            last_particle_id: Some(start + claimed - 1),
            ..SpawnBatch::empty(layout, start)
        }
    }

    const QUAD: [[f32; 3]; 6] = [
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [1.0, 1.0, 0.0],
        [0.0, 0.0, 0.0],
        [1.0, 1.0, 0.0],
        [0.0, 1.0, 0.0],
    ];

    #[test]
    fn test_surface_samples_stay_on_surface() {
        let surface = SourceSurface::from_positions(&QUAD, Vec3::new(2.0, 3.0, 1.0)).expect("surface");
        assert_eq!(surface.triangle_count(), 2);
        assert_eq!(surface.bounds().max, Vec3::new(2.0, 3.0, 0.0));

        let mut rng = fastrand::Rng::with_seed(5);
        for _ in 0..500 {
            let p = surface.sample(&mut rng);
            assert!(surface.bounds().contains(p));
            assert!(p.z.abs() < f32::EPSILON);
        }
    }

    #[test]
    fn test_surface_picks_by_area() {
        // A large triangle and a tiny sliver.
        let positions = [
            [0.0, 0.0, 0.0],
            [10.0, 0.0, 0.0],
            [0.0, 10.0, 0.0],
            [20.0, 0.0, 0.0],
            [20.01, 0.0, 0.0],
            [20.0, 0.01, 0.0],
        ];
        let surface = SourceSurface::from_positions(&positions, Vec3::ONE).expect("surface");
        let mut rng = fastrand::Rng::with_seed(9);
        let on_sliver = (0..1000).filter(|_| surface.sample(&mut rng).x >= 20.0).count();
        assert!(on_sliver < 10);
    }

    #[test]
    fn test_degenerate_surface() {
        assert!(SourceSurface::from_positions(&[[0.0; 3]; 2], Vec3::ONE).is_none());
        let flat = SourceSurface::from_positions(&[[1.0, 2.0, 3.0]; 3], Vec3::ONE).expect("surface");
        let p = flat.sample(&mut fastrand::Rng::with_seed(1));
        assert!(p.abs_diff_eq(Vec3::new(1.0, 2.0, 3.0), 1e-6));
    }

    #[test]
    fn test_world_relative_captures_transform() {
        let mut slots = SlotBuffer::new(4, true);
        let _ = slots.take_dirty();
        let mut sync = TransformSynchronizer::new(true, 4, fastrand::Rng::with_seed(2));
        let rotation = Quat::from_rotation_z(0.5);
        let world = Mat4::from_scale_rotation_translation(Vec3::splat(2.0), rotation, Vec3::new(5.0, 0.0, 1.0));

        sync.sync(&batch(1, 2, 4), &mut slots, &world, true);
        let dirty = slots.dirty();
        assert_eq!(dirty.positions, DirtyRange::new(1, 2));
        assert_eq!(dirty.orientations, DirtyRange::new(1, 2));
        assert!(dirty.vertex_ids.is_empty());

        let attrs = slots.attributes(2);
        assert!(attrs.position.abs_diff_eq(Vec3::new(5.0, 0.0, 1.0), 1e-5));
        assert!(attrs.orientation.abs_diff_eq(rotation, 1e-5));
        assert_eq!(slots.attributes(0).position, Vec3::ZERO);
    }

    #[test]
    fn test_world_relative_ignores_surface_sample() {
        let mut slots = SlotBuffer::new(4, true);
        let mut sync = TransformSynchronizer::new(true, 4, fastrand::Rng::with_seed(2));
        sync.set_surface(SourceSurface::from_positions(&QUAD, Vec3::splat(10.0)));
        let rotation = Quat::from_rotation_y(1.0);
        let translation = Vec3::new(-3.0, 2.0, 7.0);
        let world = Mat4::from_rotation_translation(rotation, translation);

        sync.sync(&batch(0, 4, 4), &mut slots, &world, true);
        for slot in 0..4 {
            let attrs = slots.attributes(slot);
            assert!(attrs.position.abs_diff_eq(translation, 1e-5));
            assert!(attrs.orientation.abs_diff_eq(rotation, 1e-5));
        }
    }

    #[test]
    fn test_disabled_slots_get_negative_ids() {
        let mut slots = SlotBuffer::new(4, false);
        let _ = slots.take_dirty();
        let mut sync = TransformSynchronizer::new(false, 4, fastrand::Rng::with_seed(2));
        sync.manage_ids();

        sync.sync(&batch(0, 3, 4), &mut slots, &Mat4::IDENTITY, false);
        assert_eq!(slots.dirty().vertex_ids, DirtyRange::new(0, 3));
        assert!(slots.vertex_ids()[..3].iter().all(|&id| (id + 1.0).abs() < f32::EPSILON));
        assert!((slots.vertex_ids()[3] - 3.0).abs() < f32::EPSILON);

        sync.sync(&batch(3, 2, 4), &mut slots, &Mat4::IDENTITY, true);
        assert!((slots.vertex_ids()[3] - 3.0).abs() < f32::EPSILON);
        assert!(slots.vertex_ids()[0].abs() < f32::EPSILON);
    }

    #[test]
    fn test_reenabled_emitter_restores_every_id() {
        let mut slots = SlotBuffer::new(4, false);
        let mut sync = TransformSynchronizer::new(false, 4, fastrand::Rng::with_seed(2));
        sync.manage_ids();

        sync.sync(&batch(0, 3, 4), &mut slots, &Mat4::IDENTITY, false);
        for start in [3, 0, 1, 2] {
            sync.sync(&batch(start, 1, 4), &mut slots, &Mat4::IDENTITY, true);
        }
        let expected = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(slots.vertex_ids(), expected.as_slice());

        // A full buffer of enabled claims stops further id writes.
        let _ = slots.take_dirty();
        sync.sync(&batch(3, 1, 4), &mut slots, &Mat4::IDENTITY, true);
        assert!(slots.dirty().vertex_ids.is_empty());
    }

    #[test]
    fn test_short_disable_rewrites_whole_buffer_on_enable() {
        let mut slots = SlotBuffer::new(4, false);
        let mut sync = TransformSynchronizer::new(false, 4, fastrand::Rng::with_seed(2));
        sync.manage_ids();

        for start in 0..3 {
            sync.sync(&batch(start, 1, 4), &mut slots, &Mat4::IDENTITY, start != 1);
        }
        assert!((slots.vertex_ids()[1] + 1.0).abs() < f32::EPSILON);
        for start in [3, 0, 1, 2] {
            sync.sync(&batch(start, 1, 4), &mut slots, &Mat4::IDENTITY, true);
        }
        assert!(slots.vertex_ids().iter().all(|&id| id >= 0.0));
    }

    #[test]
    fn test_enabled_emitter_skips_id_writes() {
        let mut slots = SlotBuffer::new(4, false);
        let _ = slots.take_dirty();
        let mut sync = TransformSynchronizer::new(false, 4, fastrand::Rng::with_seed(2));
        sync.sync(&batch(0, 2, 4), &mut slots, &Mat4::IDENTITY, true);
        assert!(slots.dirty().is_empty());
    }

    #[test]
    fn test_surface_positions_for_local_emitter() {
        let mut slots = SlotBuffer::new(4, false);
        let _ = slots.take_dirty();
        let mut sync = TransformSynchronizer::new(false, 4, fastrand::Rng::with_seed(2));
        sync.set_surface(SourceSurface::from_positions(&QUAD, Vec3::ONE));
        assert!(sync.is_managed());

        sync.sync(&batch(0, 4, 4), &mut slots, &Mat4::IDENTITY, true);
        assert_eq!(slots.dirty().positions, DirtyRange::new(0, 4));
        let bounds = sync.surface().map(SourceSurface::bounds).expect("bounds");
        assert!((0..4).all(|i| bounds.contains(slots.attributes(i).position)));
    }
}
