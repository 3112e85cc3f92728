//! # Stardust Common
//!
//! Common types, utilities, and shared abstractions for Stardust.
//!
//! This crate provides foundational types used across all Stardust subsystems:
//! - Colors and the named/hex color table
//! - Bounding volumes (axis-aligned boxes and spheres)
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod color;
pub mod error;
pub mod geometry;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::color::*;
    pub use crate::error::*;
    pub use crate::geometry::*;
}

pub use prelude::*;
