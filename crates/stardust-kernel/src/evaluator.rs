//! Stateless per-slot particle evaluation.
//!
//! Given the parameter blocks (including the emitter clock) and the
//! spawn-time attributes of one slot, the evaluator reconstructs which
//! particle occupies the slot, how old it is and where it is, without any
//! per-particle simulation state. The same inputs always produce the same
//! sprite.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec2, Vec3};
use rayon::prelude::*;

use crate::blocks::{ParamBlocks, VecRange};
use crate::config::{Direction, RadialType, SpawnType};
use crate::features::Features;
use crate::random::{draw, particle_seed, virtual_id, ParticleRng};
use crate::slots::{SlotAttributes, SlotBuffer};

/// Look-ahead used to estimate screen-space velocity.
const VELOCITY_SCALE_DELTA: f32 = 0.1;

/// Orbital motion needs a spawn offset at least this long.
const MIN_ORBIT_RADIUS: f32 = 1e-4;

/// Evaluated sprite, laid out for upload as an instance buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SpriteInstance {
    /// Position in emitter (or world, for world relative emitters) space
    pub position: [f32; 3],
    /// Point size in pixels
    pub size: f32,
    /// RGBA, emitter color applied
    pub color: [f32; 4],
    /// Cosine and sine of the sprite rotation
    pub cos_sin: [f32; 2],
    /// Normalized age, negative when hidden
    pub ratio: f32,
    /// Texture atlas frame
    pub frame: f32,
}

impl SpriteInstance {
    /// A slot with nothing to draw.
    pub const HIDDEN: Self = Self {
        position: [0.0; 3],
        size: 0.0,
        color: [0.0; 4],
        cos_sin: [1.0, 0.0],
        ratio: -1.0,
        frame: 0.0,
    };

    /// Whether the sprite is drawn.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        (0.0..1.0).contains(&self.ratio)
    }
}

impl Default for SpriteInstance {
    fn default() -> Self {
        Self::HIDDEN
    }
}

/// Camera matrices for view-dependent outputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewContext {
    /// Emitter space to view space
    pub model_view: Mat4,
    /// View space to clip space
    pub projection: Mat4,
}

/// Which particle occupies a slot and how far through its life it is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotTiming {
    /// Random stream of the occupying particle
    pub rng: ParticleRng,
    /// Life time of the particle
    pub life_time: f32,
    /// Age used for motion
    pub motion_age: f32,
    /// Normalized age used for curves
    pub ratio: f32,
}

/// Values that can be blended between curve keys.
trait CurveValue: Copy {
    fn mix(self, other: Self, t: f32) -> Self;
}

impl CurveValue for f32 {
    fn mix(self, other: Self, t: f32) -> Self {
        self + (other - self) * t
    }
}

impl CurveValue for Vec3 {
    fn mix(self, other: Self, t: f32) -> Self {
        self.lerp(other, t)
    }
}

/// Samples a curve of `keys` keys at `ratio`; `key(k)` draws key `k` within
/// its range.
fn sample_curve<T: CurveValue>(keys: usize, ratio: f32, key: impl Fn(usize) -> T) -> Option<T> {
    match keys {
        0 => None,
        1 => Some(key(0)),
        n => {
            let k = ratio * (n - 1) as f32;
            let i = (k.floor().max(0.0) as usize).min(n - 2);
            Some(key(i).mix(key(i + 1), k - i as f32))
        }
    }
}

fn radial_to_vec3(r: f32, theta: Vec2) -> Vec3 {
    let rc = r * theta.x.cos();
    Vec3::new(rc * theta.y.cos(), r * theta.x.sin(), rc * theta.y.sin())
}

/// Rotation for Euler angles applied in Y, X, Z order.
fn euler_yxz(angles: Vec3) -> Quat {
    Quat::from_rotation_y(angles.y) * Quat::from_rotation_x(angles.x) * Quat::from_rotation_z(angles.z)
}

fn draw_range(range: &VecRange, rng: &ParticleRng, index: u32) -> Vec3 {
    range.lerp(rng.draw3(index))
}

/// Evaluates slots of one emitter at the clock stored in its blocks.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'a> {
    blocks: &'a ParamBlocks,
    features: Features,
    view: Option<ViewContext>,
}

impl<'a> Evaluator<'a> {
    /// Creates an evaluator for the enabled `features`.
    #[must_use]
    pub fn new(blocks: &'a ParamBlocks, features: Features) -> Self {
        Self {
            blocks,
            features,
            view: None,
        }
    }

    /// Enables velocity stretching and perspective point sizes.
    #[must_use]
    pub fn with_view(mut self, view: ViewContext) -> Self {
        self.view = Some(view);
        self
    }

    /// Resolves the particle occupying `slot`, or `None` when the slot is
    /// empty, disabled or its particle is outside its lifetime.
    #[must_use]
    pub fn timing(&self, slot: u32, vertex_id: f32) -> Option<SlotTiming> {
        if vertex_id < 0.0 {
            return None;
        }

        let blocks = self.blocks;
        let params = &blocks.params;
        let layout = params.layout;
        let time = params.time;
        let continuous = params.spawn_type == SpawnType::Continuous;

        let particle_id = (slot / layout.trail_count) as f32;
        let loop_time = blocks.loop_time();
        let period = if continuous { loop_time } else { blocks.max_age() };

        let cycles = (time / period).floor();
        let id0 = if params.managed_particle_id >= 0.0 {
            params.managed_particle_id
        } else {
            ((time - cycles * period) * params.spawn_rate).floor()
        };
        let behind = continuous && particle_id > id0;
        let loop_index = cycles - if behind { 1.0 } else { 0.0 };
        let start = loop_index * period
            + if continuous {
                particle_id / params.spawn_rate
            } else {
                0.0
            };
        if start < 0.0 {
            return None;
        }

        let seed = particle_seed(
            virtual_id(particle_id, loop_index, layout.particle_count as f32),
            params.seed,
        );
        let rng = ParticleRng::new(seed);
        let life_time = blocks.life_time.lerp(rng.draw(draw::LIFE_TIME));

        let mut age = time - start;
        if params.direction == Direction::Backward {
            age = period - age;
        }
        if params.duration > 0.0 && time - age >= params.duration {
            return None;
        }
        if age <= 0.0 {
            return None;
        }

        let (motion_age, ratio) = if self.features.contains(Features::TRAILS) {
            let interval = params.trail_interval;
            let trail_id = (slot % layout.trail_count) as f32;
            let trail_loop_time = layout.trail_count as f32 * interval;
            let trail_id0 = (age.rem_euclid(trail_loop_time) / interval).floor();
            let trail_loop =
                (age / trail_loop_time - if trail_id > trail_id0 { 1.0 } else { 0.0 }).floor();
            let trail_start = trail_loop * trail_loop_time + trail_id * interval + interval;

            if trail_start < 0.0 || trail_start >= life_time + interval {
                return None;
            }
            let trail_life_time = blocks.trail_life_time.lerp(rng.draw(draw::TRAIL_LIFE_TIME));
            if age < trail_start {
                (age, 0.0)
            } else if age < trail_start + trail_life_time {
                (trail_start, (age - trail_start) / trail_life_time)
            } else {
                return None;
            }
        } else {
            (age, age / life_time)
        };

        if !(0.0..1.0).contains(&ratio) {
            return None;
        }

        let motion_age = if self.features.contains(Features::DRAG) {
            let drag = params.drag;
            (0.5 * drag * ratio).mix(1.0 - 0.5 * drag, ratio) * life_time
        } else {
            motion_age
        };

        Some(SlotTiming {
            rng,
            life_time,
            motion_age,
            ratio,
        })
    }

    /// Evaluates one slot.
    #[must_use]
    pub fn evaluate(&self, slot: u32, attributes: &SlotAttributes) -> SpriteInstance {
        let Some(timing) = self.timing(slot, attributes.vertex_id) else {
            return SpriteInstance::HIDDEN;
        };

        let blocks = self.blocks;
        let params = &blocks.params;
        let features = self.features;
        let rng = &timing.rng;
        let t = timing.motion_age;
        let ratio = timing.ratio;

        let mut p = Vec3::ZERO;
        let mut v = Vec3::ZERO;
        if features.contains(Features::OFFSET) {
            p = draw_range(&blocks.offset.linear, rng, draw::OFFSET);
        }
        if features.contains(Features::VELOCITY) {
            v = draw_range(&blocks.velocity.linear, rng, draw::VELOCITY);
        }
        if features.contains(Features::ACCELERATION) {
            v += draw_range(&blocks.acceleration.linear, rng, draw::ACCELERATION) * t * 0.5;
        }

        if features.intersects(Features::RADIAL) {
            let sphere = if params.radial_type == RadialType::Sphere { 1.0 } else { 0.0 };
            let theta = rng.draw2(draw::THETA) * Vec2::new(std::f32::consts::TAU, std::f32::consts::TAU * sphere);
            if features.contains(Features::RADIAL_OFFSET) {
                p += radial_to_vec3(blocks.offset.radial.lerp(rng.draw(draw::RADIAL_OFFSET)), theta);
            }
            if features.contains(Features::RADIAL_VELOCITY) {
                v += radial_to_vec3(blocks.velocity.radial.lerp(rng.draw(draw::RADIAL_VELOCITY)), theta);
            }
            if features.contains(Features::RADIAL_ACCELERATION) {
                let ar = blocks.acceleration.radial.lerp(rng.draw(draw::RADIAL_ACCELERATION));
                v += radial_to_vec3(ar, theta) * t * 0.5;
            }
        }

        let mut av = Vec3::ZERO;
        if features.contains(Features::ANGULAR_VELOCITY) {
            av = draw_range(&blocks.angular_velocity, rng, draw::ANGULAR_VELOCITY);
        }
        if features.contains(Features::ANGULAR_ACCELERATION) {
            av += draw_range(&blocks.angular_acceleration, rng, draw::ANGULAR_ACCELERATION) * 0.5 * t;
        }
        let angular = features.intersects(Features::ANGULAR_VELOCITY | Features::ANGULAR_ACCELERATION);

        let mut transformed = p + v * t;
        if angular {
            transformed = euler_yxz(av * t) * transformed;
        }

        let mut orbit = None;
        if features.contains(Features::ORBITAL) && p.length() > MIN_ORBIT_RADIUS {
            let ov = blocks.orbital_velocity.lerp(rng.draw(draw::ORBITAL_VELOCITY))
                + blocks.orbital_acceleration.lerp(rng.draw(draw::ORBITAL_ACCELERATION)) * 0.5 * t;
            let reference = rng.draw3(draw::ORBIT_AXIS);
            let axis = p
                .normalize()
                .cross(reference.normalize_or_zero())
                .try_normalize()
                .unwrap_or(Vec3::X);
            transformed = Quat::from_axis_angle(axis, ov * t) * transformed;
            orbit = Some((axis, ov));
        }

        let curves = &blocks.curves;
        let rotation_scale = curves.rotation_scale_over_time();
        let color_opacity = curves.color_over_time();

        let mut rotation = 0.0;
        if features.contains(Features::ROTATION) {
            rotation = sample_curve(curves.rotation_keys(), ratio, |k| {
                rotation_scale[2 * k + 1][0].mix(rotation_scale[2 * k + 2][0], rng.draw(draw::ROTATION_KEYS + k as u32))
            })
            .unwrap_or(0.0);
        }
        let mut scale = 1.0;
        if features.contains(Features::SCALE) {
            scale = sample_curve(curves.scale_keys(), ratio, |k| {
                rotation_scale[2 * k + 1][1].mix(rotation_scale[2 * k + 2][1], rng.draw(draw::SCALE_KEYS + k as u32))
            })
            .unwrap_or(1.0);
        }
        let mut color = Vec3::ONE;
        if features.contains(Features::COLOR) {
            color = sample_curve(curves.color_keys(), ratio, |k| {
                let min = Vec3::from_slice(&color_opacity[2 * k + 1][..3]);
                let max = Vec3::from_slice(&color_opacity[2 * k + 2][..3]);
                min + (max - min) * rng.draw3(draw::COLOR_KEYS + 3 * k as u32)
            })
            .unwrap_or(Vec3::ONE);
        }
        let mut opacity = 1.0;
        if features.contains(Features::OPACITY) {
            opacity = sample_curve(curves.opacity_keys(), ratio, |k| {
                color_opacity[2 * k + 1][3].mix(color_opacity[2 * k + 2][3], rng.draw(draw::OPACITY_KEYS + k as u32))
            })
            .unwrap_or(1.0);
        }

        let (mut c, mut s) = (rotation.cos(), rotation.sin());

        if let Some(view) = self.view.filter(|_| features.contains(Features::VELOCITY_SCALE)) {
            let future_t = if features.contains(Features::DRAG) {
                VELOCITY_SCALE_DELTA * 1.0_f32.mix(1.0 - params.drag, ratio)
            } else {
                VELOCITY_SCALE_DELTA
            };
            let clip = view.projection * view.model_view;

            let mut future = transformed + v * future_t;
            if angular {
                future = euler_yxz(av * future_t) * future;
            }
            if let Some((axis, ov)) = orbit {
                future = Quat::from_axis_angle(axis, ov * future_t) * future;
            }

            let now_2d = clip * transformed.extend(1.0);
            let future_2d = clip * future.extend(1.0);
            let screen = (future_2d.truncate().truncate() / future_2d.z
                - now_2d.truncate().truncate() / now_2d.z)
                / VELOCITY_SCALE_DELTA;
            let len = screen.length();
            let dir = screen / len.max(0.001);
            // rotate so that 0 degrees points along the motion
            let (c2, s2) = (c * dir.y + s * dir.x, s * dir.y - c * dir.x);
            c = c2;
            s = s2;

            let stretch = &blocks.velocity_scale;
            let screen_scale = (len * now_2d.z * stretch.scale).clamp(stretch.min, stretch.max.max(stretch.min));
            scale *= screen_scale;
        }

        if features.contains(Features::WORLD_RELATIVE) {
            transformed = attributes.orientation * transformed;
        }
        transformed += attributes.position;

        let size = match self.view {
            Some(view) if params.use_perspective => {
                let view_z = (view.model_view * transformed.extend(1.0)).z;
                params.particle_size * scale / -view_z
            }
            _ => params.particle_size * scale,
        };

        let frames = &blocks.texture_frames;
        let frame = if features.contains(Features::FRAMES) {
            (ratio * frames.count * frames.loops).rem_euclid(frames.count).floor()
        } else {
            0.0
        };

        let emitter_color = Vec3::from_array(blocks.emitter_color.to_array());
        SpriteInstance {
            position: transformed.to_array(),
            size,
            color: (color * emitter_color).extend(opacity).to_array(),
            cos_sin: [c, s],
            ratio,
            frame,
        }
    }

    /// Evaluates every slot in parallel into `out`, resizing it to the slot
    /// count.
    pub fn evaluate_all(&self, slots: &SlotBuffer, out: &mut Vec<SpriteInstance>) {
        out.resize(slots.len() as usize, SpriteInstance::HIDDEN);
        out.par_iter_mut().enumerate().for_each(|(slot, sprite)| {
            let slot = slot as u32;
            *sprite = self.evaluate(slot, &slots.attributes(slot));
        });
    }

    /// Sequential counterpart of [`Evaluator::evaluate_all`].
    pub fn evaluate_all_sequential(&self, slots: &SlotBuffer, out: &mut Vec<SpriteInstance>) {
        out.clear();
        out.extend((0..slots.len()).map(|slot| self.evaluate(slot, &slots.attributes(slot))));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds;
    use crate::config::EmitterConfig;
    use proptest::prelude::*;

    fn blocks_for(config: &EmitterConfig) -> ParamBlocks {
        ParamBlocks::new(&config.clone().validated(), &mut fastrand::Rng::with_seed(21))
    }

    fn at(blocks: &ParamBlocks, time: f32) -> ParamBlocks {
        let mut blocks = blocks.clone();
        blocks.params.time = time;
        blocks
    }

    fn evaluate(blocks: &ParamBlocks, slot: u32) -> SpriteInstance {
        let features = Features::from_blocks(blocks);
        let slots = SlotBuffer::new(blocks.params.layout.count(), blocks.world_relative);
        Evaluator::new(blocks, features).evaluate(slot, &slots.attributes(slot))
    }

    fn busy_config() -> EmitterConfig {
        EmitterConfig {
            seed: 0.5,
            spawn_rate: 20.0,
            life_time: "0.5..1.5".to_string(),
            position: "-1 0 -1..1 0 1".to_string(),
            velocity: "0 1 0..0 3 0".to_string(),
            acceleration: "0 -2 0".to_string(),
            radial_velocity: "0.5..1".to_string(),
            color: "red..yellow,blue".to_string(),
            opacity: "1,0".to_string(),
            scale: "0.5..1,2".to_string(),
            rotation: "0..90".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_curve_sampling() {
        assert_eq!(sample_curve(0, 0.5, |_| 1.0_f32), None);
        assert_eq!(sample_curve(1, 0.9, |_| 3.0_f32), Some(3.0));
        let keys = [0.0_f32, 10.0, 20.0];
        let value = sample_curve(3, 0.75, |k| keys[k]).unwrap_or_default();
        assert!((value - 15.0).abs() < 1e-5);
    }

    #[test]
    fn test_euler_order_matches_yxz() {
        let euler = Vec3::new(0.3, 0.5, 0.7);
        let (s, c) = ((euler * 0.5).to_array().map(f32::sin), (euler * 0.5).to_array().map(f32::cos));
        let expected = Quat::from_xyzw(
            s[0] * c[1] * c[2] + c[0] * s[1] * s[2],
            c[0] * s[1] * c[2] - s[0] * c[1] * s[2],
            c[0] * c[1] * s[2] - s[0] * s[1] * c[2],
            c[0] * c[1] * c[2] + s[0] * s[1] * s[2],
        );
        assert!(euler_yxz(euler).abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn test_first_particle_moves_linearly() {
        let config = EmitterConfig {
            velocity: "0 2 0".to_string(),
            life_time: "1".to_string(),
            spawn_rate: 1.0,
            seed: 0.25,
            ..Default::default()
        };
        let blocks = at(&blocks_for(&config), 0.5);
        let sprite = evaluate(&blocks, 0);
        assert!(sprite.is_visible());
        assert!((sprite.ratio - 0.5).abs() < 1e-6);
        assert!(Vec3::from_array(sprite.position).abs_diff_eq(Vec3::new(0.0, 1.0, 0.0), 1e-5));
        assert_eq!(sprite.color, [1.0, 1.0, 1.0, 1.0]);
        assert!((sprite.size - 100.0).abs() < 1e-4);
    }

    #[test]
    fn test_disabled_slot_is_hidden() {
        let blocks = at(&blocks_for(&busy_config()), 0.3);
        let attributes = SlotAttributes {
            vertex_id: -1.0,
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
        };
        let sprite = Evaluator::new(&blocks, Features::from_blocks(&blocks)).evaluate(0, &attributes);
        assert_eq!(sprite, SpriteInstance::HIDDEN);
        assert!(!sprite.is_visible());
    }

    #[test]
    fn test_unspawned_slot_is_hidden() {
        let blocks = at(&blocks_for(&busy_config()), 0.01);
        // particle 10 starts at 0.5s on the first loop
        assert!(!evaluate(&blocks, 10).is_visible());
    }

    #[test]
    fn test_duration_hides_late_particles() {
        let config = EmitterConfig {
            duration: 1.0,
            spawn_rate: 10.0,
            life_time: "5".to_string(),
            ..Default::default()
        };
        let blocks = at(&blocks_for(&config), 2.0);
        // particle 5 started at 0.5s, particle 15 at 1.5s
        assert!(evaluate(&blocks, 5).is_visible());
        assert!(!evaluate(&blocks, 15).is_visible());
    }

    #[test]
    fn test_burst_particles_share_start() {
        let config = EmitterConfig {
            spawn_type: SpawnType::Burst,
            spawn_rate: 10.0,
            life_time: "2".to_string(),
            ..Default::default()
        };
        let blocks = at(&blocks_for(&config), 1.0);
        let count = blocks.params.layout.count();
        for slot in 0..count {
            let sprite = evaluate(&blocks, slot);
            assert!((sprite.ratio - 0.5).abs() < 1e-5);
        }
    }

    #[test]
    fn test_backward_playback_reverses_age() {
        let config = EmitterConfig {
            spawn_type: SpawnType::Burst,
            spawn_rate: 4.0,
            life_time: "1".to_string(),
            direction: Direction::Backward,
            ..Default::default()
        };
        let blocks = at(&blocks_for(&config), 0.25);
        assert!((evaluate(&blocks, 0).ratio - 0.75).abs() < 1e-5);
    }

    #[test]
    fn test_texture_frames() {
        let config = EmitterConfig {
            texture_frame: [2.0, 2.0],
            texture_loop: 2.0,
            spawn_rate: 1.0,
            life_time: "1".to_string(),
            ..Default::default()
        };
        let blocks = at(&blocks_for(&config), 0.3);
        // 0.3 * 4 frames * 2 loops = 2.4
        assert!((evaluate(&blocks, 0).frame - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_emitter_color_multiplies() {
        let config = EmitterConfig {
            emitter_color: "#808080".to_string(),
            color: "red".to_string(),
            spawn_rate: 1.0,
            ..Default::default()
        };
        let blocks = at(&blocks_for(&config), 0.5);
        let color = evaluate(&blocks, 0).color;
        assert!((color[0] - 128.0 / 255.0).abs() < 1e-5);
        assert!(color[1].abs() < 1e-6);
    }

    #[test]
    fn test_world_relative_uses_spawn_transform() {
        let config = EmitterConfig {
            relative: crate::config::Relative::World,
            velocity: "1 0 0".to_string(),
            spawn_rate: 1.0,
            ..Default::default()
        };
        let blocks = at(&blocks_for(&config), 0.5);
        let attributes = SlotAttributes {
            vertex_id: 0.0,
            position: Vec3::new(10.0, 0.0, 0.0),
            orientation: Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
        };
        let sprite = Evaluator::new(&blocks, Features::from_blocks(&blocks)).evaluate(0, &attributes);
        assert!(Vec3::from_array(sprite.position).abs_diff_eq(Vec3::new(10.0, 0.5, 0.0), 1e-5));
    }

    #[test]
    fn test_trail_segments() {
        let config = EmitterConfig {
            spawn_rate: 1.0,
            life_time: "1".to_string(),
            trail_interval: 0.25,
            trail_life_time: "0.5".to_string(),
            velocity: "1 0 0".to_string(),
            ..Default::default()
        };
        let blocks = at(&blocks_for(&config), 0.6);
        assert_eq!(blocks.params.layout.trail_count, 3);

        // trail 0 was left at 0.25s, trail 1 at 0.5s, trail 2 still rides along
        let first = evaluate(&blocks, 0);
        assert!((first.ratio - 0.7).abs() < 1e-4);
        assert!((first.position[0] - 0.25).abs() < 1e-5);
        let second = evaluate(&blocks, 1);
        assert!((second.ratio - 0.2).abs() < 1e-4);
        assert!((second.position[0] - 0.5).abs() < 1e-5);
        let riding = evaluate(&blocks, 2);
        assert!(riding.ratio.abs() < f32::EPSILON);
        assert!((riding.position[0] - 0.6).abs() < 1e-5);
    }

    #[test]
    fn test_view_dependent_outputs() {
        let config = EmitterConfig {
            velocity: "1 0 0".to_string(),
            velocity_scale: 1.0,
            spawn_rate: 1.0,
            ..Default::default()
        };
        let blocks = at(&blocks_for(&config), 0.5);
        let view = ViewContext {
            model_view: Mat4::from_translation(Vec3::new(0.0, 0.0, -10.0)),
            projection: Mat4::perspective_rh(1.0, 1.0, 0.1, 100.0),
        };
        let slots = SlotBuffer::new(blocks.params.layout.count(), false);
        let sprite = Evaluator::new(&blocks, Features::from_blocks(&blocks))
            .with_view(view)
            .evaluate(0, &slots.attributes(0));
        assert!(sprite.is_visible());
        // moving along +x rotates the sprite to face the motion
        assert!(sprite.cos_sin[0].abs() < 1e-3);
        assert!(sprite.size > 0.0 && sprite.size.is_finite());
        assert!(sprite.size <= 100.0 * 3.0 / 10.0 + 1e-3);
    }

    #[test]
    fn test_non_finite_stretch_limits_are_replaced() {
        let config = EmitterConfig {
            velocity: "1 0 0".to_string(),
            velocity_scale: 1.0,
            velocity_scale_min_max: [f32::NAN, f32::NAN],
            spawn_rate: 1.0,
            ..Default::default()
        };
        let blocks = at(&blocks_for(&config), 0.5);
        let view = ViewContext {
            model_view: Mat4::from_translation(Vec3::new(0.0, 0.0, -10.0)),
            projection: Mat4::perspective_rh(1.0, 1.0, 0.1, 100.0),
        };
        let slots = SlotBuffer::new(blocks.params.layout.count(), false);
        let sprite = Evaluator::new(&blocks, Features::from_blocks(&blocks))
            .with_view(view)
            .evaluate(0, &slots.attributes(0));
        assert!(sprite.is_visible());
        assert!(sprite.size.is_finite());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let blocks = at(&blocks_for(&busy_config()), 2.37);
        let features = Features::from_blocks(&blocks);
        let slots = SlotBuffer::new(blocks.params.layout.count(), false);
        let evaluator = Evaluator::new(&blocks, features);

        let mut parallel = Vec::new();
        let mut sequential = Vec::new();
        evaluator.evaluate_all(&slots, &mut parallel);
        evaluator.evaluate_all_sequential(&slots, &mut sequential);
        assert_eq!(parallel.len(), slots.len() as usize);
        assert!(bytemuck::cast_slice::<_, u8>(&parallel) == bytemuck::cast_slice::<_, u8>(&sequential));
        assert!(parallel.iter().any(SpriteInstance::is_visible));
    }

    #[test]
    fn test_instance_layout() {
        assert_eq!(std::mem::size_of::<SpriteInstance>(), 48);
    }

    proptest! {
        #[test]
        fn prop_evaluation_is_deterministic(time in 0.0f32..100.0, slot in 0u32..30) {
            let blocks = at(&blocks_for(&busy_config()), time);
            let a = evaluate(&blocks, slot);
            let b = evaluate(&blocks.clone(), slot);
            prop_assert_eq!(bytemuck::bytes_of(&a), bytemuck::bytes_of(&b));
        }

        #[test]
        fn prop_visibility_is_contiguous(slot in 0u32..30, start in 0.0f32..10.0, backward in any::<bool>()) {
            let config = EmitterConfig {
                direction: if backward { Direction::Backward } else { Direction::Forward },
                ..busy_config()
            };
            let base = blocks_for(&config);
            let period = base.loop_time();
            let steps = 600;
            // a sample step advances the ratio by at most dt / min life
            let step_ratio = 2.0 * period / steps as f32 / base.life_time.lower() + 1e-3;

            let mut lives = 0;
            let mut was_visible = false;
            let mut last_progress = 0.0_f32;
            for i in 0..steps {
                let time = start + period * 2.0 * i as f32 / steps as f32;
                let sprite = evaluate(&at(&base, time), slot);
                let visible = sprite.is_visible();
                if visible {
                    let progress = if backward { 1.0 - sprite.ratio } else { sprite.ratio };
                    if !was_visible {
                        lives += 1;
                        if i > 0 {
                            prop_assert!(progress <= step_ratio, "life began at progress {progress}");
                        }
                    } else if progress < last_progress {
                        // only a new life may follow without a hidden gap
                        lives += 1;
                        prop_assert!(last_progress >= 1.0 - step_ratio, "life cut at {last_progress}");
                        prop_assert!(progress <= step_ratio, "life resumed at {progress}");
                    }
                    last_progress = progress;
                }
                was_visible = visible;
            }
            // two loop periods hold at most three lives
            prop_assert!(lives <= 3);
        }

        #[test]
        fn prop_bounds_contain_particles(time in 0.0f32..20.0, seed in 0.0f32..1.0) {
            let config = EmitterConfig { seed, ..busy_config() };
            let blocks = at(&blocks_for(&config), time);
            let features = Features::from_blocks(&blocks);
            let volume = bounds::estimate(&blocks, features, None);
            let slots = SlotBuffer::new(blocks.params.layout.count(), false);
            let mut sprites = Vec::new();
            Evaluator::new(&blocks, features).evaluate_all(&slots, &mut sprites);
            for sprite in sprites.iter().filter(|s| s.is_visible()) {
                let p = Vec3::from_array(sprite.position);
                prop_assert!(volume.aabb.contains(p), "{p} outside {:?}", volume.aabb);
                prop_assert!(volume.sphere.contains(p));
            }
        }

        #[test]
        fn prop_bounds_contain_trails_drag_and_backward(
            time in 0.0f32..20.0,
            seed in 0.0f32..1.0,
            drag in 0.0f32..1.0,
            backward in any::<bool>(),
            rotating in any::<bool>(),
        ) {
            let config = EmitterConfig {
                seed,
                drag,
                trail_interval: 0.1,
                trail_life_time: "0.2..0.4".to_string(),
                direction: if backward { Direction::Backward } else { Direction::Forward },
                angular_velocity: if rotating { "0 0 45..0 0 90" } else { "0 0 0" }.to_string(),
                ..busy_config()
            };
            let blocks = at(&blocks_for(&config), time);
            let features = Features::from_blocks(&blocks);
            prop_assert!(features.contains(Features::TRAILS));
            let volume = bounds::estimate(&blocks, features, None);
            let slots = SlotBuffer::new(blocks.params.layout.count(), false);
            let mut sprites = Vec::new();
            Evaluator::new(&blocks, features).evaluate_all(&slots, &mut sprites);
            for sprite in sprites.iter().filter(|s| s.is_visible()) {
                let p = Vec3::from_array(sprite.position);
                prop_assert!(volume.aabb.contains(p), "{p} outside {:?}", volume.aabb);
                prop_assert!(volume.sphere.contains(p));
            }
        }
    }
}
