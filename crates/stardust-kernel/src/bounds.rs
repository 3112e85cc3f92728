//! Conservative bounding volume of everything an emitter can draw.
//!
//! Each axis is bounded independently from the min/max kinematic ranges over
//! the longest possible motion time. When the quadratic motion has a turning
//! point inside that window the turning point is evaluated as well; the
//! turning time is always clamped to the window so tiny accelerations never
//! produce huge extents.

use glam::Vec3;
use stardust_common::{Aabb, BoundingSphere};

use crate::blocks::{ParamBlocks, ScalarRange, VecRange};
use crate::config::RadialType;
use crate::features::Features;

/// Pixel size to world size factor used for sprite padding.
const SPRITE_PADDING_FACTOR: f32 = 0.000_45;

/// Box and sphere enclosing every particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingVolume {
    /// Axis aligned box in emitter space
    pub aabb: Aabb,
    /// Enclosing sphere
    pub sphere: BoundingSphere,
}

impl BoundingVolume {
    /// Moves the sphere center, e.g. to the current emitter position.
    #[must_use]
    pub fn centered_at(mut self, center: Vec3) -> Self {
        self.sphere.center = center;
        self
    }
}

/// Extreme of `p + v t + a t^2 / 2` for `t` in `0..=t_max` using the bound
/// picked by `pick`.
fn extreme(p: f32, v: f32, a: f32, t_max: f32, pick: fn(f32, f32) -> f32) -> f32 {
    let at = |t: f32| p + v * t + 0.5 * a * t * t;
    let mut result = pick(at(0.0), at(t_max));
    if a != 0.0 && a.is_finite() {
        let turning = (-v / a).clamp(0.0, t_max);
        if turning.is_finite() {
            result = pick(result, at(turning));
        }
    }
    result
}

fn axis_bounds(p: ScalarRange, v: ScalarRange, a: ScalarRange, t_max: f32) -> (f32, f32) {
    (
        extreme(p.lower(), v.lower(), a.lower(), t_max, f32::min),
        extreme(p.upper(), v.upper(), a.upper(), t_max, f32::max),
    )
}

fn component(range: &VecRange, axis: usize) -> ScalarRange {
    ScalarRange::new(range.min[axis], range.max[axis])
}

/// Longest time any slot is in motion.
#[must_use]
pub fn max_motion_time(blocks: &ParamBlocks) -> f32 {
    let life = blocks.life_time.upper().max(0.0);
    if blocks.has_trails() {
        life + blocks.params.trail_interval
    } else {
        life
    }
}

/// Estimates the bounding volume of an emitter.
///
/// `surface` is the bounds of the spawn surface in emitter space, if any.
#[must_use]
pub fn estimate(blocks: &ParamBlocks, features: Features, surface: Option<Aabb>) -> BoundingVolume {
    let t_max = max_motion_time(blocks);

    let mut min = Vec3::ZERO;
    let mut max = Vec3::ZERO;
    for axis in 0..3 {
        let (lo, hi) = axis_bounds(
            component(&blocks.offset.linear, axis),
            component(&blocks.velocity.linear, axis),
            component(&blocks.acceleration.linear, axis),
            t_max,
        );
        min[axis] = lo;
        max[axis] = hi;
    }

    let (radial_lo, radial_hi) = axis_bounds(
        blocks.offset.radial,
        blocks.velocity.radial,
        blocks.acceleration.radial,
        t_max,
    );
    let radial = radial_lo.abs().max(radial_hi.abs());
    let radial_padding = Vec3::new(
        radial,
        radial,
        if blocks.params.radial_type == RadialType::Sphere { radial } else { 0.0 },
    );
    min -= radial_padding;
    max += radial_padding;

    if features.intersects(Features::ROTATING) {
        // Rotation about the emitter origin preserves distance to it.
        let reach = min.abs().max(max.abs()).length();
        min = Vec3::splat(-reach);
        max = Vec3::splat(reach);
    }

    if let Some(surface) = surface {
        min += surface.min;
        max += surface.max;
    }

    let sprite = blocks.params.particle_size * SPRITE_PADDING_FACTOR * blocks.curves.max_scale();
    let sprite_padding = Vec3::new(
        sprite,
        sprite,
        if blocks.params.radial_type == RadialType::Sphere || features.intersects(Features::ROTATING) {
            sprite
        } else {
            0.0
        },
    );
    min -= sprite_padding;
    max += sprite_padding;

    let aabb = Aabb::new(min, max);
    BoundingVolume {
        aabb,
        sphere: BoundingSphere::new(Vec3::ZERO, aabb.corner_distance()),
    }
}
