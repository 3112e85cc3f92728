//! Performance metrics.
//!
//! Collects tick and evaluation timings plus particle counts for the
//! periodic stats line.

use std::collections::VecDeque;
use std::time::Instant;

/// Performance metrics collector.
#[derive(Debug)]
pub struct PerfMetrics {
    /// Scheduler and sync times
    tick_times: VecDeque<f32>,
    /// Evaluation times
    eval_times: VecDeque<f32>,
    /// History size for averaging
    history_size: usize,
    /// Number of emitters
    emitter_count: u32,
    /// Slots across all emitters
    slot_count: u64,
    /// Visible sprites at the last evaluation
    visible_count: u64,
    /// Slots claimed since the last clear
    spawned: u64,
}

impl Default for PerfMetrics {
    fn default() -> Self {
        Self::new(120)
    }
}

impl PerfMetrics {
    /// Creates a collector keeping `history_size` samples.
    #[must_use]
    pub fn new(history_size: usize) -> Self {
        let history_size = history_size.max(1);
        Self {
            tick_times: VecDeque::with_capacity(history_size),
            eval_times: VecDeque::with_capacity(history_size),
            history_size,
            emitter_count: 0,
            slot_count: 0,
            visible_count: 0,
            spawned: 0,
        }
    }

    /// Records one step's timings in seconds.
    pub fn record_step(&mut self, tick: f32, eval: f32) {
        push_sample(&mut self.tick_times, tick, self.history_size);
        push_sample(&mut self.eval_times, eval, self.history_size);
    }

    /// Updates particle counts.
    pub fn set_particle_stats(&mut self, emitters: u32, slots: u64, visible: u64) {
        self.emitter_count = emitters;
        self.slot_count = slots;
        self.visible_count = visible;
    }

    /// Adds claimed slots.
    pub fn add_spawned(&mut self, count: u64) {
        self.spawned += count;
    }

    /// Average tick time in seconds.
    #[must_use]
    pub fn avg_tick_time(&self) -> f32 {
        average(&self.tick_times)
    }

    /// Average evaluation time in seconds.
    #[must_use]
    pub fn avg_eval_time(&self) -> f32 {
        average(&self.eval_times)
    }

    /// Worst evaluation time in the history, in seconds.
    #[must_use]
    pub fn peak_eval_time(&self) -> f32 {
        self.eval_times.iter().copied().fold(0.0, f32::max)
    }

    /// Snapshot of all metrics.
    #[must_use]
    pub fn summary(&self) -> PerfSummary {
        PerfSummary {
            tick_time_ms: self.avg_tick_time() * 1000.0,
            eval_time_ms: self.avg_eval_time() * 1000.0,
            peak_eval_time_ms: self.peak_eval_time() * 1000.0,
            emitters: self.emitter_count,
            slots: self.slot_count,
            visible: self.visible_count,
            spawned: self.spawned,
        }
    }

    /// Clears timing history and the spawn counter.
    pub fn clear(&mut self) {
        self.tick_times.clear();
        self.eval_times.clear();
        self.spawned = 0;
    }
}

fn push_sample(samples: &mut VecDeque<f32>, value: f32, limit: usize) {
    samples.push_back(value);
    while samples.len() > limit {
        samples.pop_front();
    }
}

fn average(samples: &VecDeque<f32>) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f32>() / samples.len() as f32
}

/// Performance snapshot for logging.
#[derive(Debug, Clone, Default)]
pub struct PerfSummary {
    /// Average tick time in milliseconds
    pub tick_time_ms: f32,
    /// Average evaluation time in milliseconds
    pub eval_time_ms: f32,
    /// Worst evaluation time in milliseconds
    pub peak_eval_time_ms: f32,
    /// Number of emitters
    pub emitters: u32,
    /// Total slots
    pub slots: u64,
    /// Visible sprites
    pub visible: u64,
    /// Slots claimed since the last clear
    pub spawned: u64,
}

impl PerfSummary {
    /// Formats as a single log line.
    #[must_use]
    pub fn format_line(&self) -> String {
        format!(
            "{} emitters, {}/{} visible, {} spawned | tick {:.3}ms, eval {:.3}ms (peak {:.3}ms)",
            self.emitters,
            format_number(self.visible),
            format_number(self.slots),
            format_number(self.spawned),
            self.tick_time_ms,
            self.eval_time_ms,
            self.peak_eval_time_ms,
        )
    }
}

/// Formats a large number with commas.
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Timer for one code section.
#[derive(Debug)]
pub struct ScopedTimer {
    start: Instant,
}

impl ScopedTimer {
    /// Starts the timer.
    #[must_use]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Stops and returns elapsed seconds.
    #[must_use]
    pub fn stop(self) -> f32 {
        self.start.elapsed().as_secs_f32()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perf_metrics_creation() {
        let metrics = PerfMetrics::new(60);
        assert_eq!(metrics.avg_tick_time(), 0.0);
        assert_eq!(metrics.peak_eval_time(), 0.0);
        assert_eq!(metrics.summary().emitters, 0);
    }

    #[test]
    fn test_history_limit() {
        let mut metrics = PerfMetrics::new(2);
        metrics.record_step(1.0, 4.0);
        metrics.record_step(2.0, 1.0);
        metrics.record_step(3.0, 2.0);
        assert!((metrics.avg_tick_time() - 2.5).abs() < 1e-6);
        assert!((metrics.peak_eval_time() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_summary_and_clear() {
        let mut metrics = PerfMetrics::default();
        metrics.record_step(0.001, 0.002);
        metrics.set_particle_stats(2, 1500, 1234);
        metrics.add_spawned(7);
        metrics.add_spawned(3);

        let summary = metrics.summary();
        assert_eq!(summary.spawned, 10);
        let line = summary.format_line();
        assert!(line.contains("1,234/1,500 visible"));
        assert!(line.contains("tick 1.000ms"));

        metrics.clear();
        assert_eq!(metrics.summary().spawned, 0);
        assert_eq!(metrics.summary().visible, 1234);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1_000_000), "1,000,000");
    }

    #[test]
    fn test_scoped_timer() {
        let timer = ScopedTimer::start();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(timer.stop() >= 0.004);
    }
}
