//! Headless host loop.
//!
//! Moves each emitter along a circle, ticks it, evaluates every slot against
//! a fixed camera and reports stats at a fixed interval.

use anyhow::Result;
use glam::{Mat4, Quat, Vec3};
use stardust_kernel::{Relative, SpriteEmitter, SpriteInstance, ViewContext};
use std::f32::consts::TAU;
use std::path::Path;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::perf::{PerfMetrics, ScopedTimer};
use crate::timing::TickTiming;

/// Counts from one simulation step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepStats {
    /// Slots claimed this step
    pub spawned: u64,
    /// Visible sprites after evaluation
    pub visible: u64,
    /// Slots across all emitters
    pub slots: u64,
}

/// Emitters plus the state needed to drive them.
#[derive(Debug)]
pub struct Simulation {
    config: EngineConfig,
    emitters: Vec<SpriteEmitter>,
    sprites: Vec<SpriteInstance>,
    time: f32,
    metrics: PerfMetrics,
}

impl Simulation {
    /// Builds and starts every configured emitter.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let emitters = config
            .emitters
            .iter()
            .enumerate()
            .map(|(i, emitter_config)| {
                let mut emitter = match config.seed {
                    Some(seed) => SpriteEmitter::with_seed(emitter_config.clone(), seed.wrapping_add(i as u64)),
                    None => SpriteEmitter::new(emitter_config.clone()),
                };
                emitter.play();
                emitter
            })
            .collect();

        Self {
            config,
            emitters,
            sprites: Vec::new(),
            time: 0.0,
            metrics: PerfMetrics::default(),
        }
    }

    /// World transform of emitter `index` at the current time.
    #[must_use]
    pub fn world_transform(&self, index: usize) -> Mat4 {
        let count = self.emitters.len().max(1) as f32;
        let angle = self.time * self.config.orbit_speed + index as f32 * TAU / count;
        let radius = self.config.orbit_radius;
        Mat4::from_rotation_translation(
            Quat::from_rotation_y(angle),
            Vec3::new(radius * angle.cos(), 0.0, radius * angle.sin()),
        )
    }

    fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(Vec3::from_array(self.config.camera_position), Vec3::ZERO, Vec3::Y)
    }

    fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.config.fov_y.to_radians(), 16.0 / 9.0, 0.1, 1000.0)
    }

    /// Advances every emitter by `dt` and evaluates all slots.
    pub fn step(&mut self, dt: f32) -> StepStats {
        self.time += dt;
        let mut stats = StepStats::default();

        let timer = ScopedTimer::start();
        let transforms: Vec<Mat4> = (0..self.emitters.len()).map(|i| self.world_transform(i)).collect();
        for (emitter, world) in self.emitters.iter_mut().zip(&transforms) {
            if let Some(batch) = emitter.tick(dt, world) {
                stats.spawned += u64::from(batch.claimed);
            }
            // Nothing uploads the slots here; drain them so ranges stay bounded.
            let _ = emitter.take_dirty();
        }
        let tick_time = timer.stop();

        let timer = ScopedTimer::start();
        let view = self.view_matrix();
        let projection = self.projection();
        for (emitter, world) in self.emitters.iter().zip(&transforms) {
            let model_view = if emitter.config().relative == Relative::World {
                view
            } else {
                view * *world
            };
            let evaluator = emitter.evaluator().with_view(ViewContext {
                model_view,
                projection,
            });
            if self.config.parallel {
                evaluator.evaluate_all(emitter.slots(), &mut self.sprites);
            } else {
                evaluator.evaluate_all_sequential(emitter.slots(), &mut self.sprites);
            }
            stats.slots += self.sprites.len() as u64;
            stats.visible += self.sprites.iter().filter(|s| s.is_visible()).count() as u64;
        }
        let eval_time = timer.stop();

        self.metrics.record_step(tick_time, eval_time);
        self.metrics.add_spawned(stats.spawned);
        self.metrics
            .set_particle_stats(self.emitters.len() as u32, stats.slots, stats.visible);
        stats
    }

    /// Simulated seconds since start.
    #[must_use]
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Driven emitters.
    #[must_use]
    pub fn emitters(&self) -> &[SpriteEmitter] {
        &self.emitters
    }

    /// Collected metrics.
    #[must_use]
    pub fn metrics(&self) -> &PerfMetrics {
        &self.metrics
    }

    /// Sprites from the last emitter evaluated.
    #[must_use]
    pub fn last_sprites(&self) -> &[SpriteInstance] {
        &self.sprites
    }

    fn log_stats(&mut self) {
        info!("[{:.1}s] {}", self.time, self.metrics.summary().format_line());
        self.metrics.clear();
    }
}

/// Runs the host with the configuration at `config_path`.
pub fn run(config_path: &Path) -> Result<()> {
    let mut config = EngineConfig::load_from(config_path);
    config.validate();

    info!("Configuration loaded:");
    info!("  Tick rate: {} Hz", config.tick_rate);
    info!("  Run length: {:.1}s", config.run_seconds);
    info!("  Emitters: {}", config.emitters.len());

    let dt = config.tick_dt();
    let total_ticks = config.total_ticks();
    let realtime = config.realtime;
    let log_interval = config.log_interval;

    let mut timing = TickTiming::new(config.tick_rate);
    let mut simulation = Simulation::new(config);
    let mut next_log = log_interval;
    let mut ticks = 0;

    timing.reset();
    while ticks < total_ticks {
        let due = if realtime {
            let wall = timing.delta_time();
            u64::from(timing.accumulate(wall))
        } else {
            1
        };

        for _ in 0..due.min(total_ticks - ticks) {
            let stats = simulation.step(dt);
            ticks += 1;
            debug!("tick {ticks}: {} spawned, {} visible", stats.spawned, stats.visible);

            if simulation.time() >= next_log {
                simulation.log_stats();
                next_log += log_interval;
            }
        }

        if realtime {
            timing.sleep_remainder();
        }
    }

    info!("Finished {ticks} ticks ({:.1}s simulated)", simulation.time());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stardust_kernel::EmitterConfig;
    use tempfile::TempDir;

    fn config() -> EngineConfig {
        EngineConfig {
            seed: Some(7),
            emitters: vec![
                EmitterConfig {
                    velocity: "0 1 0..0 2 0".to_string(),
                    ..Default::default()
                },
                EmitterConfig {
                    relative: Relative::World,
                    radial_velocity: "1".to_string(),
                    ..Default::default()
                },
            ],
            orbit_radius: 3.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_simulation_spawns_and_draws() {
        let mut simulation = Simulation::new(config());
        let mut spawned = 0;
        let mut stats = StepStats::default();
        for _ in 0..60 {
            stats = simulation.step(1.0 / 60.0);
            spawned += stats.spawned;
        }
        assert!(spawned >= 9);
        assert!(stats.visible > 0);
        assert_eq!(stats.slots, simulation.emitters().iter().map(|e| e.slots().len() as u64).sum::<u64>());
        assert!((simulation.time() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut parallel = Simulation::new(config());
        let mut sequential = Simulation::new(EngineConfig {
            parallel: false,
            ..config()
        });
        for _ in 0..30 {
            assert_eq!(parallel.step(1.0 / 30.0), sequential.step(1.0 / 30.0));
        }
        assert_eq!(parallel.last_sprites(), sequential.last_sprites());
    }

    #[test]
    fn test_emitters_spread_on_orbit() {
        let simulation = Simulation::new(config());
        let a = simulation.world_transform(0).w_axis.truncate();
        let b = simulation.world_transform(1).w_axis.truncate();
        assert!((a.length() - 3.0).abs() < 1e-5);
        assert!((a + b).length() < 1e-4);
    }

    #[test]
    fn test_metrics_track_steps() {
        let mut simulation = Simulation::new(config());
        for _ in 0..5 {
            let _ = simulation.step(0.1);
        }
        let summary = simulation.metrics().summary();
        assert_eq!(summary.emitters, 2);
        assert!(summary.slots > 0);
    }

    #[test]
    fn test_run_headless() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("stardust.toml");
        let mut config = config();
        config.run_seconds = 0.5;
        config.save_to(&path).expect("Failed to save config");

        run(&path).expect("Run failed");
    }
}
