//! Tick pacing.
//!
//! Emitters are ticked at a fixed rate. In realtime mode the wall clock feeds
//! an accumulator that decides how many fixed ticks to run; otherwise ticks
//! run back to back.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Most fixed ticks run for a single wall clock step.
const MAX_CATCH_UP: u32 = 8;

/// Fixed rate tick pacing.
#[derive(Debug)]
pub struct TickTiming {
    /// Fixed tick length in seconds
    fixed_dt: f32,
    /// Wall clock budget per tick
    tick_budget: Duration,
    /// Start of the last wall clock step
    last_step: Instant,
    /// Unconsumed wall clock time
    accumulator: f32,
    /// Longest wall clock step accepted
    max_dt: f32,
    /// Recent wall clock step lengths
    step_times: VecDeque<f32>,
    /// Maximum samples kept
    max_samples: usize,
}

impl Default for TickTiming {
    fn default() -> Self {
        Self::new(60)
    }
}

impl TickTiming {
    /// Creates pacing for `tick_rate` ticks per second.
    #[must_use]
    pub fn new(tick_rate: u32) -> Self {
        let tick_rate = tick_rate.max(1);
        Self {
            fixed_dt: 1.0 / tick_rate as f32,
            tick_budget: Duration::from_secs_f64(1.0 / f64::from(tick_rate)),
            last_step: Instant::now(),
            accumulator: 0.0,
            max_dt: 0.25,
            step_times: VecDeque::with_capacity(120),
            max_samples: 120,
        }
    }

    /// Fixed tick length in seconds.
    #[must_use]
    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    /// Wall clock time since the previous call, clamped to `max_dt`.
    pub fn delta_time(&mut self) -> f32 {
        let now = Instant::now();
        let dt = (now - self.last_step).as_secs_f32().min(self.max_dt);
        self.last_step = now;

        self.step_times.push_back(dt);
        if self.step_times.len() > self.max_samples {
            self.step_times.pop_front();
        }
        dt
    }

    /// Adds `dt` to the accumulator and returns how many fixed ticks are due.
    pub fn accumulate(&mut self, dt: f32) -> u32 {
        self.accumulator += dt;
        let mut count = 0;
        while self.accumulator >= self.fixed_dt && count < MAX_CATCH_UP {
            self.accumulator -= self.fixed_dt;
            count += 1;
        }

        // Too far behind: drop the backlog
        if self.accumulator > self.fixed_dt * 2.0 {
            self.accumulator = 0.0;
        }
        count
    }

    /// Sleeps for what is left of one tick budget since the last step.
    pub fn sleep_remainder(&self) {
        let elapsed = self.last_step.elapsed();
        if elapsed < self.tick_budget {
            std::thread::sleep(self.tick_budget - elapsed);
        }
    }

    /// Average wall clock step in milliseconds.
    #[must_use]
    pub fn average_step_ms(&self) -> f32 {
        if self.step_times.is_empty() {
            return 0.0;
        }
        self.step_times.iter().sum::<f32>() / self.step_times.len() as f32 * 1000.0
    }

    /// Restarts the wall clock, e.g. after loading.
    pub fn reset(&mut self) {
        self.last_step = Instant::now();
        self.accumulator = 0.0;
        self.step_times.clear();
    }
}
