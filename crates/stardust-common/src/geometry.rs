//! Bounding volume types.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::ZERO)
    }
}

impl Aabb {
    /// An inverted box that becomes valid after the first `extend`.
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Creates a box from its corners.
    #[must_use]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Builds the tightest box around a set of points.
    ///
    /// Returns `None` for an empty iterator.
    #[must_use]
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Option<Self> {
        let mut aabb = Self::EMPTY;
        let mut any = false;
        for point in points {
            aabb.extend(point);
            any = true;
        }
        any.then_some(aabb)
    }

    /// Grows the box to include `point`.
    pub fn extend(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Whether `point` lies inside the box (inclusive).
    #[must_use]
    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Distance from the origin to the farthest point of the box.
    #[must_use]
    pub fn corner_distance(&self) -> f32 {
        self.min.abs().max(self.max.abs()).length()
    }
}

/// Bounding sphere.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingSphere {
    /// Sphere center
    pub center: Vec3,
    /// Sphere radius
    pub radius: f32,
}

impl BoundingSphere {
    /// Creates a sphere.
    #[must_use]
    pub const fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Whether `point` lies inside the sphere (inclusive).
    #[must_use]
    pub fn contains(&self, point: Vec3) -> bool {
        point.distance(self.center) <= self.radius
    }
}

/// Half-open range of slots that must be re-uploaded to the render buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable, Serialize, Deserialize)]
#[repr(C)]
pub struct DirtyRange {
    /// First dirty slot
    pub offset: u32,
    /// Number of dirty slots
    pub count: u32,
}

impl DirtyRange {
    /// Creates a dirty range.
    #[must_use]
    pub const fn new(offset: u32, count: u32) -> Self {
        Self { offset, count }
    }

    /// Whether nothing is dirty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// One past the last dirty slot.
    #[must_use]
    pub const fn end(&self) -> u32 {
        self.offset + self.count
    }

    /// Smallest range covering both `self` and `other`.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        let offset = self.offset.min(other.offset);
        let end = self.end().max(other.end());
        Self::new(offset, end - offset)
    }
}
