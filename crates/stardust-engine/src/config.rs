//! Host configuration.
//!
//! Tick rate, run length, emitter motion and the emitters themselves.
//! Configuration can be loaded from and saved to a TOML file.

use serde::{Deserialize, Serialize};
use stardust_common::{StardustError, StardustResult};
use stardust_kernel::EmitterConfig;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Configuration file name.
pub const CONFIG_FILE: &str = "stardust.toml";

/// Host configuration parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === Timing ===
    /// Emitter ticks per second
    pub tick_rate: u32,
    /// Simulated seconds to run before exiting
    pub run_seconds: f32,
    /// Pace ticks against the wall clock
    pub realtime: bool,
    /// Seconds between stats log lines
    pub log_interval: f32,

    // === Emitters ===
    /// Base seed for emitter generators (None = entropy)
    pub seed: Option<u64>,
    /// Radius of the circle the emitters travel on
    pub orbit_radius: f32,
    /// Angular speed along that circle in radians per second
    pub orbit_speed: f32,
    /// Evaluate slots on the rayon pool
    pub parallel: bool,

    // === Camera ===
    /// Camera position, looking at the origin
    pub camera_position: [f32; 3],
    /// Vertical field of view in degrees
    pub fov_y: f32,

    // === Emitter list ===
    /// Emitters to drive
    pub emitters: Vec<EmitterConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            run_seconds: 5.0,
            realtime: false,
            log_interval: 1.0,
            seed: None,
            orbit_radius: 0.0,
            orbit_speed: 1.0,
            parallel: true,
            camera_position: [0.0, 2.0, 10.0],
            fov_y: 60.0,
            emitters: vec![EmitterConfig::default()],
        }
    }
}

impl EngineConfig {
    /// Loads from `path`, falling back to defaults on any failure.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read config file: {e}");
                return Self::default();
            },
        };

        match toml::from_str(&contents) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to parse config file: {e}");
                Self::default()
            },
        }
    }

    /// Saves to `path`, creating parent directories.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> StardustResult<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| StardustError::Serialization(e.to_string()))?;
        fs::write(path, contents)?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Clamps values into usable ranges and validates every emitter.
    pub fn validate(&mut self) {
        self.tick_rate = self.tick_rate.clamp(1, 1000);
        if !self.run_seconds.is_finite() {
            self.run_seconds = 0.0;
        }
        self.run_seconds = self.run_seconds.clamp(0.0, 3600.0);
        if !self.log_interval.is_finite() || self.log_interval <= 0.0 {
            self.log_interval = 1.0;
        }
        if !self.orbit_radius.is_finite() {
            self.orbit_radius = 0.0;
        }
        if !self.orbit_speed.is_finite() {
            self.orbit_speed = 0.0;
        }
        if !self.fov_y.is_finite() {
            self.fov_y = 60.0;
        }
        self.fov_y = self.fov_y.clamp(1.0, 179.0);
        if self.camera_position.iter().any(|c| !c.is_finite()) {
            self.camera_position = [0.0, 2.0, 10.0];
        }

        for emitter in &mut self.emitters {
            emitter.validate();
        }
    }

    /// Fixed tick length in seconds.
    #[must_use]
    pub fn tick_dt(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }

    /// Number of fixed ticks in the run.
    #[must_use]
    pub fn total_ticks(&self) -> u64 {
        (f64::from(self.run_seconds) * f64::from(self.tick_rate)).ceil() as u64
    }
}
