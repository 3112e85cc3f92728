//! Kinematic and curve terms enabled for an emitter.
//!
//! The feature set is derived from the parameter blocks when the emitter is
//! built. It is part of the emitter's shape: while the emitter is playing new
//! terms cannot be switched on, matching a renderer that compiled its
//! evaluation program for a fixed set of terms.

use bitflags::bitflags;

use crate::blocks::ParamBlocks;

bitflags! {
    /// Terms evaluated per particle.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Features: u32 {
        /// Linear spawn offset
        const OFFSET = 1 << 0;
        /// Linear velocity
        const VELOCITY = 1 << 1;
        /// Linear acceleration
        const ACCELERATION = 1 << 2;
        /// Radial spawn offset
        const RADIAL_OFFSET = 1 << 3;
        /// Radial velocity
        const RADIAL_VELOCITY = 1 << 4;
        /// Radial acceleration
        const RADIAL_ACCELERATION = 1 << 5;
        /// Euler angular velocity
        const ANGULAR_VELOCITY = 1 << 6;
        /// Euler angular acceleration
        const ANGULAR_ACCELERATION = 1 << 7;
        /// Orbital velocity or acceleration
        const ORBITAL = 1 << 8;
        /// Color curve
        const COLOR = 1 << 9;
        /// Opacity curve
        const OPACITY = 1 << 10;
        /// Rotation curve
        const ROTATION = 1 << 11;
        /// Scale curve
        const SCALE = 1 << 12;
        /// Texture atlas animation
        const FRAMES = 1 << 13;
        /// Drag
        const DRAG = 1 << 14;
        /// Velocity stretch
        const VELOCITY_SCALE = 1 << 15;
        /// Trail segments
        const TRAILS = 1 << 16;
        /// Spawn-time emitter transform
        const WORLD_RELATIVE = 1 << 17;

        /// Any radial term
        const RADIAL = Self::RADIAL_OFFSET.bits()
            | Self::RADIAL_VELOCITY.bits()
            | Self::RADIAL_ACCELERATION.bits();
        /// Any rotating term
        const ROTATING = Self::ANGULAR_VELOCITY.bits()
            | Self::ANGULAR_ACCELERATION.bits()
            | Self::ORBITAL.bits();
    }
}

impl Features {
    /// Derives the terms that contribute anything for the given blocks.
    #[must_use]
    pub fn from_blocks(blocks: &ParamBlocks) -> Self {
        let mut features = Self::empty();
        let curves = &blocks.curves;

        features.set(Self::OFFSET, !blocks.offset.linear.is_zero());
        features.set(Self::VELOCITY, !blocks.velocity.linear.is_zero());
        features.set(Self::ACCELERATION, !blocks.acceleration.linear.is_zero());
        features.set(Self::RADIAL_OFFSET, !blocks.offset.radial.is_zero());
        features.set(Self::RADIAL_VELOCITY, !blocks.velocity.radial.is_zero());
        features.set(Self::RADIAL_ACCELERATION, !blocks.acceleration.radial.is_zero());
        features.set(Self::ANGULAR_VELOCITY, !blocks.angular_velocity.is_zero());
        features.set(Self::ANGULAR_ACCELERATION, !blocks.angular_acceleration.is_zero());
        features.set(
            Self::ORBITAL,
            !blocks.orbital_velocity.is_zero() || !blocks.orbital_acceleration.is_zero(),
        );

        let color = curves.color_over_time();
        let all_keys = |from: usize, keys: usize, f: &dyn Fn(usize) -> bool| {
            (from..from + keys * 2).all(f)
        };
        features.set(
            Self::COLOR,
            !all_keys(1, curves.color_keys(), &|i: usize| color[i][..3] == [1.0, 1.0, 1.0]),
        );
        features.set(
            Self::OPACITY,
            !all_keys(1, curves.opacity_keys(), &|i: usize| color[i][3] == 1.0),
        );

        let rotation_scale = curves.rotation_scale_over_time();
        features.set(
            Self::ROTATION,
            !all_keys(1, curves.rotation_keys(), &|i: usize| rotation_scale[i][0] == 0.0),
        );
        features.set(
            Self::SCALE,
            !all_keys(1, curves.scale_keys(), &|i: usize| rotation_scale[i][1] == 1.0),
        );

        features.set(Self::FRAMES, blocks.texture_frames.count > 1.0);
        features.set(Self::DRAG, blocks.params.drag > 0.0);
        features.set(Self::VELOCITY_SCALE, blocks.velocity_scale.scale > 0.0);
        features.set(Self::TRAILS, blocks.has_trails());
        features.set(Self::WORLD_RELATIVE, blocks.world_relative);

        features
    }

    /// Comma separated names of the set flags.
    #[must_use]
    pub fn names(self) -> String {
        self.iter_names()
            .map(|(name, _)| name.to_ascii_lowercase())
            .collect::<Vec<_>>()
            .join(",")
    }
}
