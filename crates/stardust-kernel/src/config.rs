//! Designer-facing emitter configuration.
//!
//! Every field mirrors one entry of the emitter's configuration surface.
//! Kinematic quantities are range strings (see [`crate::range`]), curves are
//! comma separated range lists. Enumerations parse case-insensitively and fall
//! back to their default on unknown input.

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::warn;

/// Smallest accepted spawn rate (particles per second).
pub const MIN_SPAWN_RATE: f32 = 0.001;

/// Largest accepted number of over-time curve keys.
pub const MAX_OVER_TIME_SLOTS: u32 = 64;

/// Emission cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpawnType {
    /// A new particle every `1 / spawnRate` seconds.
    #[default]
    Continuous,
    /// All particles at once, then wait for the whole population to expire.
    Burst,
}

/// Whether spawned particles follow the emitter or stay where they spawned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Relative {
    /// Particles move with the emitter.
    #[default]
    Local,
    /// Particles keep the emitter transform captured at spawn time.
    World,
}

/// Shape used for radial offsets, velocities and accelerations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RadialType {
    /// Radial directions in the XY plane.
    #[default]
    Circle,
    /// Radial directions over the whole sphere.
    Sphere,
}

/// Playback direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Particles age forward.
    #[default]
    Forward,
    /// Particles play back from the end of the loop.
    Backward,
}

/// Error for an unrecognised enumeration keyword.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown variant `{0}`")]
pub struct UnknownVariant(pub String);

macro_rules! keyword_enum {
    ($ty:ty { $($name:literal => $variant:expr),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($name => Ok($variant),)+
                    other => Err(UnknownVariant(other.to_string())),
                }
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let text = String::deserialize(deserializer)?;
                Ok(text.parse().unwrap_or_else(|e| {
                    warn!("{e}, using `{:?}`", <$ty>::default());
                    <$ty>::default()
                }))
            }
        }
    };
}

keyword_enum!(SpawnType { "continuous" => SpawnType::Continuous, "burst" => SpawnType::Burst });
keyword_enum!(Relative { "local" => Relative::Local, "world" => Relative::World });
keyword_enum!(RadialType { "circle" => RadialType::Circle, "sphere" => RadialType::Sphere });
keyword_enum!(Direction { "forward" => Direction::Forward, "backward" => Direction::Backward });

/// Emitter configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmitterConfig {
    // === Emission ===
    /// Whether newly spawned particles are visible
    pub enable: bool,
    /// Total emission time in seconds (`<= 0` = forever)
    pub duration: f32,
    /// Emission cadence
    pub spawn_type: SpawnType,
    /// Particles per second
    pub spawn_rate: f32,
    /// Local or world relative particles
    pub relative: Relative,
    /// Particle life time range in seconds
    pub life_time: String,
    /// Seconds between trail segments (`0` = no trails)
    pub trail_interval: f32,
    /// Trail segment life time range (`0` = use the particle life time)
    pub trail_life_time: String,
    /// Random seed in `0..1` (`< 0` = pick one at configuration time)
    pub seed: f32,
    /// Number of keys available to each over-time curve
    pub over_time_slots: u32,
    /// Play particles forwards or backwards
    pub direction: Direction,

    // === Kinematics ===
    /// Spawn offset range
    pub position: String,
    /// Velocity range
    pub velocity: String,
    /// Acceleration range
    pub acceleration: String,
    /// Shape of the radial terms
    pub radial_type: RadialType,
    /// Radial offset range
    pub radial_position: String,
    /// Radial velocity range
    pub radial_velocity: String,
    /// Radial acceleration range
    pub radial_acceleration: String,
    /// Angular velocity range (degrees per second, Euler YXZ)
    pub angular_velocity: String,
    /// Angular acceleration range (degrees per second squared)
    pub angular_acceleration: String,
    /// Orbital velocity range (degrees per second)
    pub orbital_velocity: String,
    /// Orbital acceleration range (degrees per second squared)
    pub orbital_acceleration: String,
    /// Drag in `0..1`, slows particles towards the end of their life
    pub drag: f32,

    // === Appearance ===
    /// Scale over time curve
    pub scale: String,
    /// Color over time curve (color names or hex)
    pub color: String,
    /// Rotation over time curve (degrees)
    pub rotation: String,
    /// Opacity over time curve
    pub opacity: String,
    /// Color multiplied into every particle
    pub emitter_color: String,
    /// Texture atlas columns and rows
    pub texture_frame: [f32; 2],
    /// Frames used from the atlas (`0` = columns * rows)
    pub texture_count: u32,
    /// Times the frame animation loops over a particle's life
    pub texture_loop: f32,
    /// Stretch particles along their screen velocity (`0` = off)
    pub velocity_scale: f32,
    /// Clamp for the velocity stretch
    pub velocity_scale_min_max: [f32; 2],
    /// Sprite size in pixels
    pub particle_size: f32,
    /// Shrink sprites with distance
    pub use_perspective: bool,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            // Emission
            enable: true,
            duration: -1.0,
            spawn_type: SpawnType::Continuous,
            spawn_rate: 10.0,
            relative: Relative::Local,
            life_time: "1".to_string(),
            trail_interval: 0.0,
            trail_life_time: "0".to_string(),
            seed: -1.0,
            over_time_slots: 5,
            direction: Direction::Forward,

            // Kinematics
            position: "0 0 0".to_string(),
            velocity: "0 0 0".to_string(),
            acceleration: "0 0 0".to_string(),
            radial_type: RadialType::Circle,
            radial_position: "0".to_string(),
            radial_velocity: "0".to_string(),
            radial_acceleration: "0".to_string(),
            angular_velocity: "0 0 0".to_string(),
            angular_acceleration: "0 0 0".to_string(),
            orbital_velocity: "0".to_string(),
            orbital_acceleration: "0".to_string(),
            drag: 0.0,

            // Appearance
            scale: "1".to_string(),
            color: "white".to_string(),
            rotation: "0".to_string(),
            opacity: "1".to_string(),
            emitter_color: "white".to_string(),
            texture_frame: [1.0, 1.0],
            texture_count: 0,
            texture_loop: 1.0,
            velocity_scale: 0.0,
            velocity_scale_min_max: [0.0, 3.0],
            particle_size: 100.0,
            use_perspective: true,
        }
    }
}

impl EmitterConfig {
    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        if !self.spawn_rate.is_finite() || self.spawn_rate < MIN_SPAWN_RATE {
            self.spawn_rate = MIN_SPAWN_RATE;
        }
        if !self.trail_interval.is_finite() || self.trail_interval < 0.0 {
            self.trail_interval = 0.0;
        }
        if !self.duration.is_finite() {
            self.duration = -1.0;
        }
        if !self.seed.is_finite() {
            self.seed = -1.0;
        } else if self.seed >= 1.0 {
            self.seed = self.seed.fract();
        }
        self.over_time_slots = self.over_time_slots.clamp(1, MAX_OVER_TIME_SLOTS);
        self.drag = if self.drag.is_finite() { self.drag.clamp(0.0, 1.0) } else { 0.0 };
        self.particle_size = self.particle_size.max(0.0);
        self.texture_frame = self.texture_frame.map(|v| v.max(1.0));
        self.texture_loop = self.texture_loop.max(0.0);
        self.velocity_scale = self.velocity_scale.max(0.0);
        let [min, max] = self.velocity_scale_min_max;
        self.velocity_scale_min_max = [
            if min.is_finite() { min } else { 0.0 },
            if max.is_finite() { max } else { 3.0 },
        ];
    }

    /// Returns a validated copy.
    #[must_use]
    pub fn validated(mut self) -> Self {
        self.validate();
        self
    }

    /// Names of the fields that decide slot capacity or block shape and
    /// differ between `self` and `other`.
    #[must_use]
    pub fn shape_changes(&self, other: &Self) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.life_time != other.life_time {
            changed.push("lifeTime");
        }
        if self.spawn_rate.to_bits() != other.spawn_rate.to_bits() {
            changed.push("spawnRate");
        }
        if self.spawn_type != other.spawn_type {
            changed.push("spawnType");
        }
        if self.trail_interval.to_bits() != other.trail_interval.to_bits() {
            changed.push("trailInterval");
        }
        if self.trail_life_time != other.trail_life_time {
            changed.push("trailLifeTime");
        }
        if self.over_time_slots != other.over_time_slots {
            changed.push("overTimeSlots");
        }
        changed
    }

    /// Copies every shape-deciding field from `shape`.
    pub fn keep_shape_of(&mut self, shape: &Self) {
        self.life_time.clone_from(&shape.life_time);
        self.spawn_rate = shape.spawn_rate;
        self.spawn_type = shape.spawn_type;
        self.trail_interval = shape.trail_interval;
        self.trail_life_time.clone_from(&shape.trail_life_time);
        self.over_time_slots = shape.over_time_slots;
    }

    /// Whether trail segments are emitted.
    #[must_use]
    pub fn has_trails(&self) -> bool {
        self.trail_interval > 0.0
    }
}
