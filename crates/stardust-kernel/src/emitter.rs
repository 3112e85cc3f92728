//! Sprite emitter: configuration, bookkeeping and evaluation in one place.
//!
//! A [`SpriteEmitter`] owns its parameter blocks, scheduler, slot buffer and
//! bounds. The host drives it with [`SpriteEmitter::update`] for
//! configuration edits and [`SpriteEmitter::tick`] once per frame, then
//! reads blocks, dirty ranges and bounds, or evaluates sprites directly.

use glam::{Mat4, Vec3};
use stardust_common::ConfigError;
use tracing::{debug, info, warn};

use crate::blocks::{BlockChanges, ParamBlocks};
use crate::bounds::{self, BoundingVolume};
use crate::config::{EmitterConfig, Relative};
use crate::evaluator::{Evaluator, SpriteInstance};
use crate::features::Features;
use crate::gpu::EmitterUniforms;
use crate::scheduler::{SpawnBatch, SpawnScheduler};
use crate::slots::{DirtyRanges, SlotBuffer};
use crate::sync::{SourceSurface, TransformSynchronizer};

/// Outcome of a configuration update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Downstream work the accepted changes caused
    pub changes: BlockChanges,
    /// Rejected changes
    pub diagnostics: Vec<ConfigError>,
}

impl UpdateReport {
    /// Whether every requested change was applied.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// One particle emitter.
#[derive(Debug, Clone)]
pub struct SpriteEmitter {
    config: EmitterConfig,
    blocks: ParamBlocks,
    features: Features,
    scheduler: SpawnScheduler,
    slots: SlotBuffer,
    sync: TransformSynchronizer,
    bounds: BoundingVolume,
    rng: fastrand::Rng,
    playing: bool,
    surface_pending: bool,
}

impl SpriteEmitter {
    /// Builds an emitter with an entropy-seeded generator.
    #[must_use]
    pub fn new(config: EmitterConfig) -> Self {
        Self::with_rng(config, fastrand::Rng::new())
    }

    /// Builds an emitter whose random choices (base seed when `seed < 0`,
    /// surface points) are reproducible.
    #[must_use]
    pub fn with_seed(config: EmitterConfig, seed: u64) -> Self {
        Self::with_rng(config, fastrand::Rng::with_seed(seed))
    }

    fn with_rng(config: EmitterConfig, mut rng: fastrand::Rng) -> Self {
        let config = config.validated();
        let blocks = ParamBlocks::new(&config, &mut rng);
        let features = Features::from_blocks(&blocks);
        let capacity = blocks.params.layout.count();
        let world_relative = config.relative == Relative::World;

        let mut sync = TransformSynchronizer::new(world_relative, capacity, rng.fork());
        if !config.enable {
            sync.manage_ids();
        }

        info!(
            "Created emitter: {} slots, features [{}]",
            capacity,
            features.names()
        );

        Self {
            scheduler: SpawnScheduler::new(&blocks),
            slots: SlotBuffer::new(capacity, world_relative),
            bounds: bounds::estimate(&blocks, features, None),
            config,
            blocks,
            features,
            sync,
            rng,
            playing: false,
            surface_pending: false,
        }
    }

    /// Applies a new configuration.
    ///
    /// While playing, changes to fields that decide the slot layout, new
    /// kinematic or curve terms and any change of `relative` are rejected;
    /// the rest of the update still applies.
    pub fn update(&mut self, config: EmitterConfig) -> UpdateReport {
        let mut next = config.validated();
        let mut diagnostics = Vec::new();

        if next.relative != self.config.relative {
            diagnostics.push(ConfigError::RelativeChange);
            next.relative = self.config.relative;
        }

        if self.playing {
            let fields = self.config.shape_changes(&next);
            if !fields.is_empty() {
                diagnostics.extend(
                    fields
                        .into_iter()
                        .map(|field| ConfigError::ShapeChangeWhileLive { field }),
                );
                next.keep_shape_of(&self.config);
            }
        }

        let changes = self.blocks.apply(Some(&self.config), &next, &mut self.rng);

        let derived = Features::from_blocks(&self.blocks);
        let mut features_changed = false;
        if self.playing {
            let added = derived - self.features;
            if !added.is_empty() {
                diagnostics.push(ConfigError::FeaturesWhileLive {
                    attributes: added.names(),
                });
            }
        } else if derived != self.features {
            debug!("Emitter features now [{}]", derived.names());
            self.features = derived;
            features_changed = true;
        }

        if !next.enable {
            self.sync.manage_ids();
        }

        self.scheduler.configure(&self.blocks);
        if changes.capacity {
            let capacity = self.blocks.params.layout.count();
            debug!("Rebuilding slot buffer with {capacity} slots");
            self.slots = SlotBuffer::new(capacity, self.blocks.world_relative);
            self.sync.reset(capacity);
            self.blocks.params.managed_particle_id = -1.0;
        }
        if changes.clock_reset {
            debug!("Duration changed, restarting emission");
            self.scheduler.reset();
            self.blocks.params.time = 0.0;
            self.blocks.params.managed_particle_id = -1.0;
        }
        if changes.bounds || features_changed {
            self.refresh_bounds();
        }

        for error in &diagnostics {
            warn!("{error}");
        }

        self.config = next;
        UpdateReport { changes, diagnostics }
    }

    fn refresh_bounds(&mut self) {
        let surface = self.sync.surface().map(SourceSurface::bounds);
        let center = self.bounds.sphere.center;
        self.bounds = bounds::estimate(&self.blocks, self.features, surface);
        if self.blocks.world_relative {
            self.bounds = self.bounds.centered_at(center);
        }
    }

    /// Starts or resumes the emission clock. Shape changes are refused from
    /// now on.
    pub fn play(&mut self) {
        self.playing = true;
    }

    /// Stops the emission clock. Shape changes are accepted again.
    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// Whether the emitter is playing.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Marks a source surface as requested but not yet loaded. Ticks are
    /// skipped until [`SpriteEmitter::set_surface`] provides it.
    pub fn await_surface(&mut self) {
        self.surface_pending = true;
        self.sync.manage_ids();
    }

    /// Installs the source surface from triangle soup `positions`, scaled by
    /// `scale` unless it is the identity. Returns `false` (and keeps spawning
    /// at the emitter origin) when the soup holds no triangle.
    pub fn set_surface(&mut self, positions: &[[f32; 3]], scale: Vec3) -> bool {
        let surface = SourceSurface::from_positions(positions, scale);
        let loaded = surface.is_some();
        if !loaded {
            warn!("Source surface has no triangles, spawning at the emitter origin");
        }
        self.sync.set_surface(surface);
        self.sync.manage_ids();
        self.surface_pending = false;
        self.refresh_bounds();
        loaded
    }

    /// Removes the source surface.
    pub fn clear_surface(&mut self) {
        self.sync.set_surface(None);
        self.surface_pending = false;
        self.refresh_bounds();
    }

    /// Advances the emitter by `dt` seconds with the emitter's current world
    /// transform. Returns the slots claimed, or `None` when paused or waiting
    /// for a surface.
    pub fn tick(&mut self, dt: f32, world: &Mat4) -> Option<SpawnBatch> {
        if !self.playing || self.surface_pending {
            return None;
        }

        let batch = self.scheduler.tick(dt);
        self.blocks.params.time = self.scheduler.time();

        if self.sync.is_managed() {
            self.sync.sync(&batch, &mut self.slots, world, self.config.enable);
            if let Some(id) = batch.last_particle_id {
                self.blocks.params.managed_particle_id = id as f32;
            }
        }

        if self.blocks.world_relative {
            self.bounds = self.bounds.centered_at(world.w_axis.truncate());
        }
        Some(batch)
    }

    /// Current configuration (after validation and rejected changes).
    #[must_use]
    pub fn config(&self) -> &EmitterConfig {
        &self.config
    }

    /// Parameter blocks.
    #[must_use]
    pub fn blocks(&self) -> &ParamBlocks {
        &self.blocks
    }

    /// Enabled evaluation terms.
    #[must_use]
    pub fn features(&self) -> Features {
        self.features
    }

    /// Emitter clock in seconds.
    #[must_use]
    pub fn time(&self) -> f32 {
        self.blocks.params.time
    }

    /// Slot attributes.
    #[must_use]
    pub fn slots(&self) -> &SlotBuffer {
        &self.slots
    }

    /// Slot attributes, for draining dirty ranges during upload.
    pub fn slots_mut(&mut self) -> &mut SlotBuffer {
        &mut self.slots
    }

    /// Returns and clears the pending dirty ranges.
    pub fn take_dirty(&mut self) -> DirtyRanges {
        self.slots.take_dirty()
    }

    /// Bounding volume.
    #[must_use]
    pub fn bounds(&self) -> BoundingVolume {
        self.bounds
    }

    /// Whether ids are written by the host.
    #[must_use]
    pub fn manages_ids(&self) -> bool {
        self.sync.is_managed()
    }

    /// Evaluator at the current clock.
    #[must_use]
    pub fn evaluator(&self) -> Evaluator<'_> {
        Evaluator::new(&self.blocks, self.features)
    }

    /// Evaluates every slot at the current clock.
    pub fn evaluate_all(&self, out: &mut Vec<SpriteInstance>) {
        self.evaluator().evaluate_all(&self.slots, out);
    }

    /// Uniform block for upload.
    #[must_use]
    pub fn uniforms(&self) -> EmitterUniforms {
        EmitterUniforms::from_blocks(&self.blocks)
    }
}
