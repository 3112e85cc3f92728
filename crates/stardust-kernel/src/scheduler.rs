//! Emission clock and circular slot allocation.
//!
//! The scheduler advances the emitter clock and claims slots in order,
//! wrapping at the buffer capacity. Every claimed particle takes
//! `trail_count` consecutive slots. Continuous emitters claim one particle
//! every `1 / spawn_rate` seconds; burst emitters fill the whole buffer at
//! once and then wait out the longest particle plus trail life.

use stardust_common::DirtyRange;

use crate::blocks::{ParamBlocks, SlotLayout};
use crate::config::SpawnType;

/// Longest step the clock advances in one tick.
pub const MAX_TICK: f32 = 0.1;

/// Slots claimed by one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnBatch {
    /// First claimed slot
    pub start: u32,
    /// Number of claimed slots
    pub claimed: u32,
    /// Buffer capacity
    pub capacity: u32,
    /// Slots per particle
    pub trail_count: u32,
    /// Nominal spawn time of the first claimed particle
    pub first_spawn_time: f32,
    /// Nominal time between consecutive claimed particles
    pub spawn_delta: f32,
    /// Slots whose attributes changed
    pub dirty: DirtyRange,
    /// Particle id of the last claimed slot
    pub last_particle_id: Option<u32>,
}

/// One claimed slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Claim {
    /// Slot index
    pub slot: u32,
    /// Nominal spawn time of the owning particle
    pub spawn_time: f32,
}

impl SpawnBatch {
    /// Batch that claimed nothing.
    #[must_use]
    pub fn empty(layout: SlotLayout, next_id: u32) -> Self {
        Self {
            start: next_id,
            claimed: 0,
            capacity: layout.count(),
            trail_count: layout.trail_count,
            first_spawn_time: 0.0,
            spawn_delta: 0.0,
            dirty: DirtyRange::default(),
            last_particle_id: None,
        }
    }

    /// Whether no slot was claimed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.claimed == 0
    }

    /// Whether the claim wrapped past the end of the buffer.
    #[must_use]
    pub fn wrapped(&self) -> bool {
        self.claimed > 0 && self.start + self.claimed > self.capacity
    }

    /// Claimed slots in claim order.
    pub fn claims(&self) -> impl Iterator<Item = Claim> + '_ {
        (0..self.claimed).map(move |i| Claim {
            slot: (self.start + i) % self.capacity,
            spawn_time: self.first_spawn_time + (i / self.trail_count) as f32 * self.spawn_delta,
        })
    }
}

/// Emission clock and slot allocator.
#[derive(Debug, Clone)]
pub struct SpawnScheduler {
    time: f32,
    next_time: f32,
    next_id: u32,
    layout: SlotLayout,
    spawn_type: SpawnType,
    spawn_rate: f32,
    burst_wait: f32,
}

impl SpawnScheduler {
    /// Creates a scheduler for the given blocks.
    #[must_use]
    pub fn new(blocks: &ParamBlocks) -> Self {
        let mut scheduler = Self {
            time: 0.0,
            next_time: 0.0,
            next_id: 0,
            layout: blocks.params.layout,
            spawn_type: blocks.params.spawn_type,
            spawn_rate: blocks.params.spawn_rate,
            burst_wait: blocks.max_age(),
        };
        scheduler.configure(blocks);
        scheduler
    }

    /// Picks up cadence changes. A layout change restarts slot allocation.
    pub fn configure(&mut self, blocks: &ParamBlocks) {
        let params = &blocks.params;
        if params.layout != self.layout {
            self.layout = params.layout;
            self.next_id = 0;
        }
        self.spawn_type = params.spawn_type;
        self.spawn_rate = params.spawn_rate;
        self.burst_wait = blocks.max_age();
    }

    /// Restarts the emission clock and allocation from slot 0.
    pub fn reset(&mut self) {
        self.time = 0.0;
        self.next_time = 0.0;
        self.next_id = 0;
    }

    /// Emitter clock in seconds.
    #[must_use]
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Next slot to be claimed.
    #[must_use]
    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    /// Current buffer layout.
    #[must_use]
    pub fn layout(&self) -> SlotLayout {
        self.layout
    }

    /// Advances the clock by `dt` (clamped to [`MAX_TICK`]) and claims every
    /// slot whose spawn time has passed.
    pub fn tick(&mut self, dt: f32) -> SpawnBatch {
        let dt = if dt.is_finite() { dt.clamp(0.0, MAX_TICK) } else { 0.0 };
        self.time += dt;

        let capacity = self.layout.count();
        let trail_count = self.layout.trail_count;
        let spawn_delta = match self.spawn_type {
            SpawnType::Continuous => 1.0 / self.spawn_rate,
            SpawnType::Burst => 0.0,
        };

        let mut batch = SpawnBatch::empty(self.layout, self.next_id);
        batch.first_spawn_time = self.next_time;
        batch.spawn_delta = spawn_delta;

        let mut last = None;
        while self.next_time < self.time && batch.claimed < capacity {
            for _ in 0..trail_count {
                last = Some(self.next_id);
                self.next_id = (self.next_id + 1) % capacity;
                batch.claimed += 1;
            }
            self.next_time += spawn_delta;
        }

        let Some(last) = last else {
            return batch;
        };

        if self.spawn_type == SpawnType::Burst {
            self.next_time += self.burst_wait;
        }

        batch.last_particle_id = Some(last / trail_count);
        batch.dirty = if batch.wrapped() || self.next_id < batch.start {
            DirtyRange::new(0, capacity)
        } else {
            DirtyRange::new(batch.start, batch.claimed)
        };
        batch
    }
}
