//! # Stardust Kernel
//!
//! Procedural sprite particles without per-particle simulation state.
//!
//! This crate provides:
//! - The range/curve text codec for designer-facing values
//! - Parameter blocks encoding every kinematic and curve quantity
//! - The spawn scheduler and circular slot allocator
//! - Spawn-time world transform and surface sampling
//! - Conservative bounding volumes
//! - The stateless per-slot evaluator
//! - GPU layouts and buffer upload
//!
//! ## Architecture
//!
//! The host ticks each [`SpriteEmitter`] once per frame. Ticking advances the
//! emission clock and claims slots; only spawn-time facts (world transform,
//! surface point, enabled state) are written per slot. Everything else about
//! a particle is a pure function of its slot index, the clock and the
//! parameter blocks, so evaluation can run data-parallel on the CPU or in a
//! vertex shader fed by [`EmitterGpuBuffers`].
//!
//! ## Determinism
//!
//! A particle's random draws are keyed by its virtual id (slot and loop) and
//! the emitter's base seed. Evaluating the same slot at the same time always
//! yields the same sprite.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod blocks;
pub mod bounds;
pub mod config;
pub mod emitter;
pub mod evaluator;
pub mod features;
pub mod gpu;
pub mod random;
pub mod range;
pub mod scheduler;
pub mod slots;
pub mod sync;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::blocks::*;
    pub use crate::bounds::BoundingVolume;
    pub use crate::config::*;
    pub use crate::emitter::*;
    pub use crate::evaluator::*;
    pub use crate::features::*;
    pub use crate::gpu::*;
    pub use crate::random::ParticleRng;
    pub use crate::range::*;
    pub use crate::scheduler::*;
    pub use crate::slots::*;
    pub use crate::sync::*;
}

pub use prelude::*;
