//! # Stardust Engine
//!
//! Headless host for Stardust emitters: configuration file, tick pacing,
//! the simulation loop and performance stats.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod app;
pub mod config;
pub mod perf;
pub mod timing;
