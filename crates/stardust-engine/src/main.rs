//! # Stardust
//!
//! Runs the emitters described by a config file (default `stardust.toml`)
//! for a fixed simulated duration and logs particle stats.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

use anyhow::Result;
use stardust_engine::{app, config::CONFIG_FILE};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Main entry point.
fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("stardust=info".parse()?))
        .init();

    info!("Stardust starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from);

    app::run(&config_path)?;

    info!("Stardust shutdown complete");
    Ok(())
}
