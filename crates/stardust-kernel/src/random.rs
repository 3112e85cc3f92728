//! Deterministic per-particle random numbers.
//!
//! A particle's random stream is keyed by its seed (derived from the virtual
//! id and the emitter's base seed) and a fixed call index per sampled
//! quantity, so any quantity can be drawn in any order and still yield the
//! same value for the same particle on the same loop.

use glam::{Vec2, Vec3};

use crate::blocks::RANDOM_REPEAT_COUNT;
use crate::config::MAX_OVER_TIME_SLOTS;

/// 2^32 as a float, the modulus of the seed mix.
const TWO_POW_32: f64 = 4_294_967_296.0;

/// Fixed call indices for each sampled quantity.
pub mod draw {
    use super::MAX_OVER_TIME_SLOTS;

    /// Particle life time
    pub const LIFE_TIME: u32 = 0;
    /// Trail segment life time
    pub const TRAIL_LIFE_TIME: u32 = 1;
    /// Linear offset (3 draws)
    pub const OFFSET: u32 = 2;
    /// Linear velocity (3 draws)
    pub const VELOCITY: u32 = 5;
    /// Linear acceleration (3 draws)
    pub const ACCELERATION: u32 = 8;
    /// Radial angles (2 draws)
    pub const THETA: u32 = 11;
    /// Radial offset
    pub const RADIAL_OFFSET: u32 = 13;
    /// Radial velocity
    pub const RADIAL_VELOCITY: u32 = 14;
    /// Radial acceleration
    pub const RADIAL_ACCELERATION: u32 = 15;
    /// Angular velocity (3 draws)
    pub const ANGULAR_VELOCITY: u32 = 16;
    /// Angular acceleration (3 draws)
    pub const ANGULAR_ACCELERATION: u32 = 19;
    /// Orbital velocity
    pub const ORBITAL_VELOCITY: u32 = 22;
    /// Orbital acceleration
    pub const ORBITAL_ACCELERATION: u32 = 23;
    /// Orbit axis reference vector (3 draws)
    pub const ORBIT_AXIS: u32 = 24;
    /// Color keys (3 draws per key)
    pub const COLOR_KEYS: u32 = 32;
    /// Opacity keys (1 draw per key)
    pub const OPACITY_KEYS: u32 = COLOR_KEYS + 3 * 2 * MAX_OVER_TIME_SLOTS;
    /// Rotation keys (1 draw per key)
    pub const ROTATION_KEYS: u32 = OPACITY_KEYS + 2 * MAX_OVER_TIME_SLOTS;
    /// Scale keys (1 draw per key)
    pub const SCALE_KEYS: u32 = ROTATION_KEYS + 2 * MAX_OVER_TIME_SLOTS;
}

/// Virtual id of a particle on a given loop, wrapped to keep float precision.
#[must_use]
pub fn virtual_id(particle_id: f32, loop_index: f32, particle_count: f32) -> f32 {
    (particle_id + loop_index * particle_count).rem_euclid(RANDOM_REPEAT_COUNT as f32)
}

/// Mixes a virtual id with the base seed into a particle seed in `0..1`.
#[must_use]
pub fn particle_seed(virtual_id: f32, base_seed: f32) -> f32 {
    let mixed = (1_664_525.0 * f64::from(virtual_id) * f64::from(base_seed) * 110.0
        + 1_013_904_223.0)
        .rem_euclid(TWO_POW_32);
    (mixed / TWO_POW_32) as f32
}

/// Integer finaliser with good avalanche behaviour.
#[inline]
fn mix(mut x: u32) -> u32 {
    x ^= x >> 16;
    x = x.wrapping_mul(0x7feb_352d);
    x ^= x >> 15;
    x = x.wrapping_mul(0x846c_a68b);
    x ^= x >> 16;
    x
}

/// Random stream of one particle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticleRng {
    key: u32,
}

impl ParticleRng {
    /// Creates the stream for a particle seed.
    #[must_use]
    pub fn new(seed: f32) -> Self {
        Self {
            key: mix(seed.to_bits() ^ 0x9e37_79b9),
        }
    }

    /// Uniform value in `0..1` for call `index`.
    #[must_use]
    #[inline]
    pub fn draw(&self, index: u32) -> f32 {
        let bits = mix(self.key ^ mix(index.wrapping_add(0x632b_e5ab)));
        // 24 bits keep the result strictly below 1.0
        (bits >> 8) as f32 / (1u32 << 24) as f32
    }

    /// Two consecutive draws starting at `index`.
    #[must_use]
    pub fn draw2(&self, index: u32) -> Vec2 {
        Vec2::new(self.draw(index), self.draw(index + 1))
    }

    /// Three consecutive draws starting at `index`.
    #[must_use]
    pub fn draw3(&self, index: u32) -> Vec3 {
        Vec3::new(self.draw(index), self.draw(index + 1), self.draw(index + 2))
    }
}
