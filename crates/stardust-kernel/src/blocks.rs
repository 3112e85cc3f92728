//! Parameter blocks shared between the host and the evaluator.
//!
//! Each kinematic or curve quantity of an emitter is encoded once into a
//! fixed-layout block and re-encoded in place whenever the configuration
//! field it depends on changes. The block shapes (curve capacity, slot
//! layout) are fixed when the emitter is built; only their contents change
//! afterwards.

use glam::Vec3;
use stardust_common::Color;
use tracing::debug;

use crate::config::{Direction, EmitterConfig, RadialType, Relative, SpawnType};
use crate::range::{parse_color_range_list, parse_range, parse_range_list};

/// Random numbers start repeating after this many virtual particle ids.
pub const RANDOM_REPEAT_COUNT: u32 = 131_072;

/// Min/max range of a vector quantity.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VecRange {
    /// Minimum value
    pub min: Vec3,
    /// Maximum value
    pub max: Vec3,
}

impl VecRange {
    /// Creates a range.
    #[must_use]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Builds a range from a flat `[min.xyz, max.xyz]` array.
    fn from_flat(values: &[f32]) -> Self {
        Self::new(Vec3::from_slice(&values[0..3]), Vec3::from_slice(&values[3..6]))
    }

    /// Interpolates per component.
    #[must_use]
    pub fn lerp(&self, t: Vec3) -> Vec3 {
        self.min + (self.max - self.min) * t
    }

    /// Componentwise lower bound.
    #[must_use]
    pub fn lower(&self) -> Vec3 {
        self.min.min(self.max)
    }

    /// Componentwise upper bound.
    #[must_use]
    pub fn upper(&self) -> Vec3 {
        self.min.max(self.max)
    }

    /// Whether both ends are zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.min == Vec3::ZERO && self.max == Vec3::ZERO
    }

    fn to_radians(self) -> Self {
        Self::new(
            self.min.to_array().map(f32::to_radians).into(),
            self.max.to_array().map(f32::to_radians).into(),
        )
    }
}

/// Min/max range of a scalar quantity.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScalarRange {
    /// Minimum value
    pub min: f32,
    /// Maximum value
    pub max: f32,
}

impl ScalarRange {
    /// Creates a range.
    #[must_use]
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Degenerate range holding a single value.
    #[must_use]
    pub const fn splat(value: f32) -> Self {
        Self::new(value, value)
    }

    fn from_flat(values: &[f32]) -> Self {
        Self::new(values[0], values[1])
    }

    /// Interpolates between min and max.
    #[must_use]
    pub fn lerp(&self, t: f32) -> f32 {
        self.min + (self.max - self.min) * t
    }

    /// Smaller end.
    #[must_use]
    pub fn lower(&self) -> f32 {
        self.min.min(self.max)
    }

    /// Larger end.
    #[must_use]
    pub fn upper(&self) -> f32 {
        self.min.max(self.max)
    }

    /// Whether both ends are zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.min == 0.0 && self.max == 0.0
    }
}

/// Linear range plus a radial scalar range sharing the same time term.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct KinematicBlock {
    /// XYZ component
    pub linear: VecRange,
    /// Radial component
    pub radial: ScalarRange,
}

/// Texture atlas animation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureFrames {
    /// Atlas columns
    pub columns: f32,
    /// Atlas rows
    pub rows: f32,
    /// Frames in use
    pub count: f32,
    /// Animation loops per particle life
    pub loops: f32,
}

impl Default for TextureFrames {
    fn default() -> Self {
        Self {
            columns: 1.0,
            rows: 1.0,
            count: 1.0,
            loops: 1.0,
        }
    }
}

/// Velocity stretch settings.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VelocityScale {
    /// Stretch factor (`0` = off)
    pub scale: f32,
    /// Lower clamp
    pub min: f32,
    /// Upper clamp
    pub max: f32,
}

/// Circular buffer dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotLayout {
    /// Logical particles in the buffer
    pub particle_count: u32,
    /// Slots per particle (leading particle plus trail segments)
    pub trail_count: u32,
}

impl SlotLayout {
    /// Computes the layout needed so no slot is reused while alive.
    #[must_use]
    pub fn compute(
        life_time_max: f32,
        trail_life_time_max: f32,
        spawn_rate: f32,
        trail_interval: f32,
    ) -> Self {
        let trails = trail_interval > 0.0;
        let max_trail_life_time = if trails { trail_life_time_max } else { 0.0 };
        let max_age = life_time_max + max_trail_life_time;
        let particle_count = ((max_age * spawn_rate).ceil() as u32).max(1);
        let trail_count = 1 + if trails {
            (max_trail_life_time / trail_interval).ceil() as u32
        } else {
            0
        };
        Self {
            particle_count,
            trail_count,
        }
    }

    /// Total slot count.
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.particle_count * self.trail_count
    }
}

/// Scalar parameters read by the evaluator every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmitterParams {
    /// Emitter clock in seconds
    pub time: f32,
    /// Last spawned particle id written by the host, `-1` when unmanaged
    pub managed_particle_id: f32,
    /// Radial shape
    pub radial_type: RadialType,
    /// Emission cut-off (`<= 0` = forever)
    pub duration: f32,
    /// Cadence
    pub spawn_type: SpawnType,
    /// Particles per second
    pub spawn_rate: f32,
    /// Base seed in `0..1`
    pub seed: f32,
    /// Sprite size in pixels
    pub particle_size: f32,
    /// Perspective sprite sizing
    pub use_perspective: bool,
    /// Playback direction
    pub direction: Direction,
    /// Drag in `0..1`
    pub drag: f32,
    /// Seconds between trail segments
    pub trail_interval: f32,
    /// Buffer layout
    pub layout: SlotLayout,
}

/// Over-time curves with their key counts stored in entry 0.
///
/// Both arrays hold `2 * slots + 1` entries: the metadata entry followed by
/// min/max pairs for each key.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveBlocks {
    slots: u32,
    /// `[color keys, opacity keys, 0, 0]`, then rgb in xyz and opacity in w
    color_over_time: Vec<[f32; 4]>,
    /// `[rotation keys, scale keys]`, then rotation (radians) in x and scale in y
    rotation_scale_over_time: Vec<[f32; 2]>,
}

impl CurveBlocks {
    /// Allocates zeroed curves for `slots` keys.
    #[must_use]
    pub fn new(slots: u32) -> Self {
        let len = Self::array_len(slots);
        Self {
            slots,
            color_over_time: vec![[0.0; 4]; len],
            rotation_scale_over_time: vec![[0.0; 2]; len],
        }
    }

    /// Entries needed for `slots` keys.
    #[must_use]
    pub const fn array_len(slots: u32) -> usize {
        slots as usize * 2 + 1
    }

    /// Key capacity.
    #[must_use]
    pub const fn slots(&self) -> u32 {
        self.slots
    }

    /// Color/opacity block.
    #[must_use]
    pub fn color_over_time(&self) -> &[[f32; 4]] {
        &self.color_over_time
    }

    /// Rotation/scale block.
    #[must_use]
    pub fn rotation_scale_over_time(&self) -> &[[f32; 2]] {
        &self.rotation_scale_over_time
    }

    /// Active color keys.
    #[must_use]
    pub fn color_keys(&self) -> usize {
        self.color_over_time[0][0] as usize
    }

    /// Active opacity keys.
    #[must_use]
    pub fn opacity_keys(&self) -> usize {
        self.color_over_time[0][1] as usize
    }

    /// Active rotation keys.
    #[must_use]
    pub fn rotation_keys(&self) -> usize {
        self.rotation_scale_over_time[0][0] as usize
    }

    /// Active scale keys.
    #[must_use]
    pub fn scale_keys(&self) -> usize {
        self.rotation_scale_over_time[0][1] as usize
    }

    /// Largest scale reachable by any key.
    #[must_use]
    pub fn max_scale(&self) -> f32 {
        self.rotation_scale_over_time[1..]
            .iter()
            .map(|entry| entry[1])
            .fold(0.0, f32::max)
    }

    fn truncate<T>(values: &mut Vec<T>, slots: u32, what: &str) {
        let cap = slots as usize * 2;
        if values.len() > cap {
            debug!(
                "{what} curve has {} keys, truncating to {slots}",
                values.len() / 2
            );
            values.truncate(cap);
        }
    }

    /// Re-encodes the color and opacity curves.
    pub fn encode_color(&mut self, color: &str, opacity: &str) {
        let mut colors = parse_color_range_list(color);
        let mut opacities = parse_range_list(opacity, &[1.0]);
        Self::truncate(&mut colors, self.slots, "color");
        Self::truncate(&mut opacities, self.slots, "opacity");

        self.color_over_time.fill([0.0; 4]);
        self.color_over_time[0][0] = (colors.len() / 2) as f32;
        self.color_over_time[0][1] = (opacities.len() / 2) as f32;

        for (entry, col) in self.color_over_time[1..].iter_mut().zip(&colors) {
            entry[..3].copy_from_slice(&col.to_array());
        }
        for (entry, alpha) in self.color_over_time[1..].iter_mut().zip(&opacities) {
            entry[3] = *alpha;
        }
    }

    /// Re-encodes the rotation (degrees) and scale curves.
    pub fn encode_rotation_scale(&mut self, rotation: &str, scale: &str) {
        let mut rotations = parse_range_list(rotation, &[0.0]);
        let mut scales = parse_range_list(scale, &[1.0]);
        Self::truncate(&mut rotations, self.slots, "rotation");
        Self::truncate(&mut scales, self.slots, "scale");

        self.rotation_scale_over_time.fill([0.0; 2]);
        self.rotation_scale_over_time[0][0] = (rotations.len() / 2) as f32;
        self.rotation_scale_over_time[0][1] = (scales.len() / 2) as f32;

        for (entry, degrees) in self.rotation_scale_over_time[1..].iter_mut().zip(&rotations) {
            entry[0] = degrees.to_radians();
        }
        for (entry, value) in self.rotation_scale_over_time[1..].iter_mut().zip(&scales) {
            entry[1] = *value;
        }
    }
}

/// Which downstream work a configuration change requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockChanges {
    /// Bounding volume must be recomputed
    pub bounds: bool,
    /// Slot capacity changed and the buffer must be rebuilt
    pub capacity: bool,
    /// Emission clock must restart
    pub clock_reset: bool,
    /// Curve storage was reallocated
    pub curves: bool,
}

/// Every block of one emitter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamBlocks {
    /// Spawn offset (radial: radial position)
    pub offset: KinematicBlock,
    /// Velocity (radial: radial velocity)
    pub velocity: KinematicBlock,
    /// Acceleration (radial: radial acceleration)
    pub acceleration: KinematicBlock,
    /// Angular velocity in radians per second
    pub angular_velocity: VecRange,
    /// Angular acceleration in radians per second squared
    pub angular_acceleration: VecRange,
    /// Particle life time
    pub life_time: ScalarRange,
    /// Trail segment life time
    pub trail_life_time: ScalarRange,
    /// Orbital velocity in radians per second
    pub orbital_velocity: ScalarRange,
    /// Orbital acceleration in radians per second squared
    pub orbital_acceleration: ScalarRange,
    /// Over-time curves
    pub curves: CurveBlocks,
    /// Scalar parameters
    pub params: EmitterParams,
    /// Atlas animation
    pub texture_frames: TextureFrames,
    /// Velocity stretch
    pub velocity_scale: VelocityScale,
    /// Color multiplied into every particle
    pub emitter_color: Color,
    /// Particles keep their spawn-time emitter transform
    pub world_relative: bool,
}

impl ParamBlocks {
    /// Encodes every block from `config`.
    #[must_use]
    pub fn new(config: &EmitterConfig, rng: &mut fastrand::Rng) -> Self {
        let mut blocks = Self {
            offset: KinematicBlock::default(),
            velocity: KinematicBlock::default(),
            acceleration: KinematicBlock::default(),
            angular_velocity: VecRange::default(),
            angular_acceleration: VecRange::default(),
            life_time: ScalarRange::splat(1.0),
            trail_life_time: ScalarRange::splat(1.0),
            orbital_velocity: ScalarRange::default(),
            orbital_acceleration: ScalarRange::default(),
            curves: CurveBlocks::new(config.over_time_slots),
            params: EmitterParams {
                time: 0.0,
                managed_particle_id: -1.0,
                radial_type: config.radial_type,
                duration: config.duration,
                spawn_type: config.spawn_type,
                spawn_rate: config.spawn_rate,
                seed: 0.0,
                particle_size: config.particle_size,
                use_perspective: config.use_perspective,
                direction: config.direction,
                drag: config.drag,
                trail_interval: config.trail_interval,
                layout: SlotLayout::compute(1.0, 0.0, config.spawn_rate, 0.0),
            },
            texture_frames: TextureFrames::default(),
            velocity_scale: VelocityScale::default(),
            emitter_color: Color::WHITE,
            world_relative: config.relative == Relative::World,
        };
        blocks.apply(None, config, rng);
        blocks
    }

    /// Re-encodes the blocks affected by the difference between `old` and
    /// `new` (every block when `old` is `None`).
    pub fn apply(
        &mut self,
        old: Option<&EmitterConfig>,
        new: &EmitterConfig,
        rng: &mut fastrand::Rng,
    ) -> BlockChanges {
        let mut changes = BlockChanges {
            bounds: old.map_or(true, |o| o.particle_size.to_bits() != new.particle_size.to_bits()),
            ..BlockChanges::default()
        };

        if old.map_or(true, |o| o.over_time_slots != new.over_time_slots) {
            self.curves = CurveBlocks::new(new.over_time_slots);
            changes.curves = true;
        }

        let params = &mut self.params;
        params.particle_size = new.particle_size;
        params.use_perspective = new.use_perspective;
        params.radial_type = new.radial_type;
        params.direction = new.direction;
        params.drag = new.drag.clamp(0.0, 1.0);

        self.texture_frames = TextureFrames {
            columns: new.texture_frame[0],
            rows: new.texture_frame[1],
            count: if new.texture_count > 0 {
                new.texture_count as f32
            } else {
                new.texture_frame[0] * new.texture_frame[1]
            },
            loops: new.texture_loop,
        };
        self.velocity_scale = VelocityScale {
            scale: new.velocity_scale,
            min: new.velocity_scale_min_max[0],
            max: new.velocity_scale_min_max[1],
        };

        if old.map_or(true, |o| o.seed.to_bits() != new.seed.to_bits()) {
            params.seed = if new.seed >= 0.0 { new.seed } else { rng.f32() };
        }

        if old.map_or(true, |o| o.emitter_color != new.emitter_color) {
            self.emitter_color = Color::parse_or_white(&new.emitter_color);
        }

        if old.map_or(true, |o| {
            o.position != new.position || o.radial_position != new.radial_position
        }) {
            self.offset = encode_kinematic(&new.position, &new.radial_position);
            changes.bounds = true;
        }

        if old.map_or(true, |o| {
            o.velocity != new.velocity || o.radial_velocity != new.radial_velocity
        }) {
            self.velocity = encode_kinematic(&new.velocity, &new.radial_velocity);
            changes.bounds = true;
        }

        if old.map_or(true, |o| {
            o.acceleration != new.acceleration || o.radial_acceleration != new.radial_acceleration
        }) {
            self.acceleration = encode_kinematic(&new.acceleration, &new.radial_acceleration);
            changes.bounds = true;
        }

        if changes.curves || old.map_or(true, |o| o.rotation != new.rotation || o.scale != new.scale) {
            self.curves.encode_rotation_scale(&new.rotation, &new.scale);
            changes.bounds = true;
        }

        if changes.curves || old.map_or(true, |o| o.color != new.color || o.opacity != new.opacity) {
            self.curves.encode_color(&new.color, &new.opacity);
        }

        let life_changed = old.map_or(true, |o| o.life_time != new.life_time);
        if life_changed {
            self.life_time = ScalarRange::from_flat(&parse_range(&new.life_time, &[1.0]));
            changes.bounds = true;
        }

        if life_changed || old.map_or(true, |o| o.trail_life_time != new.trail_life_time) {
            let trail = parse_range(&new.trail_life_time, &[0.0]);
            let life = [self.life_time.min, self.life_time.max];
            let pick = |i: usize| if trail[i] > 0.0 { trail[i] } else { life[i] };
            self.trail_life_time = ScalarRange::new(pick(0), pick(1));
        }

        if old.map_or(true, |o| o.angular_velocity != new.angular_velocity) {
            self.angular_velocity = encode_angular(&new.angular_velocity);
        }

        if old.map_or(true, |o| o.angular_acceleration != new.angular_acceleration) {
            self.angular_acceleration = encode_angular(&new.angular_acceleration);
        }

        if old.map_or(true, |o| o.orbital_velocity != new.orbital_velocity) {
            self.orbital_velocity = encode_degrees(&new.orbital_velocity);
        }

        if old.map_or(true, |o| o.orbital_acceleration != new.orbital_acceleration) {
            self.orbital_acceleration = encode_degrees(&new.orbital_acceleration);
        }

        if old.map_or(true, |o| o.duration.to_bits() != new.duration.to_bits()) {
            self.params.duration = new.duration;
            changes.clock_reset = old.is_some();
        }

        if old.map_or(true, |o| {
            o.spawn_type != new.spawn_type
                || o.spawn_rate.to_bits() != new.spawn_rate.to_bits()
                || o.life_time != new.life_time
                || o.trail_life_time != new.trail_life_time
                || o.trail_interval.to_bits() != new.trail_interval.to_bits()
        }) {
            let params = &mut self.params;
            params.spawn_type = new.spawn_type;
            params.spawn_rate = new.spawn_rate;
            params.trail_interval = new.trail_interval;
            let layout = SlotLayout::compute(
                self.life_time.max,
                self.trail_life_time.max,
                new.spawn_rate,
                new.trail_interval,
            );
            if layout != params.layout || old.is_none() {
                debug!(
                    "Slot layout {} particles x {} trails = {} slots",
                    layout.particle_count,
                    layout.trail_count,
                    layout.count()
                );
                changes.capacity = true;
            }
            params.layout = layout;
            changes.bounds = true;
        }

        changes
    }

    /// Whether trail segments are emitted.
    #[must_use]
    pub fn has_trails(&self) -> bool {
        self.params.trail_interval > 0.0
    }

    /// Longest time a slot stays occupied (particle plus trail life).
    #[must_use]
    pub fn max_age(&self) -> f32 {
        if self.has_trails() {
            self.life_time.max + self.trail_life_time.max
        } else {
            self.life_time.max
        }
    }

    /// Time for the emission cycle to revisit the same slot.
    #[must_use]
    pub fn loop_time(&self) -> f32 {
        self.params.layout.particle_count as f32 / self.params.spawn_rate
    }
}

fn encode_kinematic(linear: &str, radial: &str) -> KinematicBlock {
    KinematicBlock {
        linear: VecRange::from_flat(&parse_range(linear, &[0.0, 0.0, 0.0])),
        radial: ScalarRange::from_flat(&parse_range(radial, &[0.0])),
    }
}

fn encode_angular(text: &str) -> VecRange {
    VecRange::from_flat(&parse_range(text, &[0.0, 0.0, 0.0])).to_radians()
}

fn encode_degrees(text: &str) -> ScalarRange {
    let range = parse_range(text, &[0.0]);
    ScalarRange::new(range[0].to_radians(), range[1].to_radians())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(config: &EmitterConfig) -> ParamBlocks {
        ParamBlocks::new(config, &mut fastrand::Rng::with_seed(7))
    }

    #[test]
    fn test_slot_layout() {
        let layout = SlotLayout::compute(2.0, 0.0, 10.0, 0.0);
        assert_eq!(layout.particle_count, 20);
        assert_eq!(layout.trail_count, 1);
        assert_eq!(layout.count(), 20);

        let trails = SlotLayout::compute(1.0, 0.5, 4.0, 0.25);
        assert_eq!(trails.particle_count, 6);
        assert_eq!(trails.trail_count, 3);
        assert_eq!(trails.count(), 18);

        let tiny = SlotLayout::compute(0.01, 0.0, 1.0, 0.0);
        assert_eq!(tiny.particle_count, 1);
    }

    #[test]
    fn test_kinematic_encoding() {
        let config = EmitterConfig {
            position: "1 2 3..4 5 6".to_string(),
            radial_velocity: "2..3".to_string(),
            ..Default::default()
        };
        let blocks = build(&config);
        assert_eq!(blocks.offset.linear.min, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(blocks.offset.linear.max, Vec3::new(4.0, 5.0, 6.0));
        assert_eq!(blocks.velocity.radial, ScalarRange::new(2.0, 3.0));
        assert!(blocks.acceleration.linear.is_zero());
    }

    #[test]
    fn test_angular_degrees_to_radians() {
        let config = EmitterConfig {
            angular_velocity: "180 0 90".to_string(),
            orbital_velocity: "360".to_string(),
            ..Default::default()
        };
        let blocks = build(&config);
        assert!((blocks.angular_velocity.min.x - std::f32::consts::PI).abs() < 1e-6);
        assert!((blocks.angular_velocity.max.z - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        assert!((blocks.orbital_velocity.max - std::f32::consts::TAU).abs() < 1e-5);
    }

    #[test]
    fn test_trail_life_time_falls_back_to_life_time() {
        let config = EmitterConfig {
            life_time: "2..3".to_string(),
            trail_life_time: "0..0.5".to_string(),
            trail_interval: 0.1,
            ..Default::default()
        };
        let blocks = build(&config);
        assert_eq!(blocks.trail_life_time, ScalarRange::new(2.0, 0.5));
        assert!((blocks.max_age() - 3.5).abs() < 1e-6);
    }

    #[test]
    fn test_color_curve_metadata() {
        let config = EmitterConfig {
            color: "red,blue..green".to_string(),
            opacity: "1,0.5,0".to_string(),
            ..Default::default()
        };
        let blocks = build(&config);
        let curves = &blocks.curves;
        assert_eq!(curves.color_keys(), 2);
        assert_eq!(curves.opacity_keys(), 3);
        assert_eq!(curves.color_over_time()[1], [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(curves.color_over_time()[4][..3], [0.0, 128.0 / 255.0, 0.0]);
        assert!((curves.color_over_time()[5][3]).abs() < f32::EPSILON);
        assert_eq!(curves.color_over_time().len(), CurveBlocks::array_len(5));
    }

    #[test]
    fn test_curve_truncation() {
        let config = EmitterConfig {
            over_time_slots: 2,
            scale: "1,2,3,4".to_string(),
            rotation: "90".to_string(),
            ..Default::default()
        };
        let blocks = build(&config);
        assert_eq!(blocks.curves.scale_keys(), 2);
        assert_eq!(blocks.curves.rotation_keys(), 1);
        assert!((blocks.curves.max_scale() - 2.0).abs() < f32::EPSILON);
        assert!((blocks.curves.rotation_scale_over_time()[1][0] - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        assert_eq!(blocks.curves.rotation_scale_over_time().len(), 5);
    }

    #[test]
    fn test_apply_reports_changes() {
        let mut rng = fastrand::Rng::with_seed(1);
        let old = EmitterConfig::default();
        let mut blocks = ParamBlocks::new(&old, &mut rng);

        let new = EmitterConfig {
            color: "red".to_string(),
            ..old.clone()
        };
        let changes = blocks.apply(Some(&old), &new, &mut rng);
        assert!(!changes.bounds);
        assert!(!changes.capacity);

        let faster = EmitterConfig {
            spawn_rate: 100.0,
            ..new.clone()
        };
        let changes = blocks.apply(Some(&new), &faster, &mut rng);
        assert!(changes.capacity);
        assert_eq!(blocks.params.layout.particle_count, 100);

        let timed = EmitterConfig {
            duration: 5.0,
            ..faster.clone()
        };
        let changes = blocks.apply(Some(&faster), &timed, &mut rng);
        assert!(changes.clock_reset);
    }

    #[test]
    fn test_seed_selection() {
        let fixed = EmitterConfig {
            seed: 0.25,
            ..Default::default()
        };
        assert!((build(&fixed).params.seed - 0.25).abs() < f32::EPSILON);

        let random = build(&EmitterConfig::default()).params.seed;
        assert!((0.0..1.0).contains(&random));
    }
}
