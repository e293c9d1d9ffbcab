use std::time::Duration;

use serde::{Deserialize, Serialize};

use quarry_core::config as env;

/// Number of feedback levels.
pub const LEVEL_COUNT: usize = 5;

/// Cumulative scheduled-time thresholds (seconds): a split belongs to the
/// deepest level whose threshold it has crossed.
pub const LEVEL_THRESHOLD_SECONDS: [i64; LEVEL_COUNT] = [0, 1, 10, 60, 300];

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Ceiling on how much of a single quantum is charged to a level's scheduled
/// time. A split stuck in a hung read for minutes must not poison the
/// fairness accounting of the level it happens to sit in.
pub const LEVEL_CONTRIBUTION_CAP: i64 = 30 * NANOS_PER_SECOND;

/// Scheduling priority of a split: the feedback level plus the intra-level
/// ordering scalar (nanoseconds; smaller runs sooner).
///
/// The derived ordering is lexicographic (level first) for the benefit of
/// tooling; inside the queue splits live in per-level sub-queues and only the
/// `level_priority` scalar orders them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Priority {
    level: usize,
    level_priority: i64,
}

impl Priority {
    pub fn new(level: usize, level_priority: i64) -> Self {
        Self {
            level,
            level_priority,
        }
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn level_priority(&self) -> i64 {
        self.level_priority
    }
}

/// Level for a split with the given cumulative scheduled nanoseconds:
/// the largest `i` with `LEVEL_THRESHOLD_SECONDS[i] <= seconds`.
pub fn compute_level(scheduled_nanos: i64) -> usize {
    let seconds = scheduled_nanos / NANOS_PER_SECOND;
    for level in 0..LEVEL_COUNT - 1 {
        if seconds < LEVEL_THRESHOLD_SECONDS[level + 1] {
            return level;
        }
    }
    LEVEL_COUNT - 1
}

/// Width of a level in nanoseconds. Only meaningful for levels below the
/// last (the last level is unbounded).
pub(crate) fn level_width_nanos(level: usize) -> i64 {
    (LEVEL_THRESHOLD_SECONDS[level + 1] - LEVEL_THRESHOLD_SECONDS[level]) * NANOS_PER_SECOND
}

/// Executor configuration, typically parsed from TOML or built from env vars.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Number of worker threads. 0 = available parallelism.
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
    /// Drain levels strictly in order instead of balancing scheduled time.
    #[serde(default)]
    pub level_absolute_priority: bool,
    /// Target ratio of scheduled time between adjacent levels. Values <= 1.0
    /// degenerate the selection and are treated as misconfiguration.
    #[serde(default = "default_level_time_multiplier")]
    pub level_time_multiplier: f64,
    /// Length of one execution quantum in milliseconds.
    #[serde(default = "default_split_quantum_ms")]
    pub split_quantum_ms: u64,
}

fn default_worker_threads() -> usize { 0 }
fn default_level_time_multiplier() -> f64 { 2.0 }
fn default_split_quantum_ms() -> u64 { 1000 }

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            worker_threads: default_worker_threads(),
            level_absolute_priority: false,
            level_time_multiplier: default_level_time_multiplier(),
            split_quantum_ms: default_split_quantum_ms(),
        }
    }
}

impl ExecutorConfig {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self {
            worker_threads: env::env_usize("EXECUTOR_WORKER_THREADS", 0),
            level_absolute_priority: env::env_bool("EXECUTOR_LEVEL_ABSOLUTE_PRIORITY", false),
            level_time_multiplier: env::env_f64("EXECUTOR_LEVEL_TIME_MULTIPLIER", 2.0),
            split_quantum_ms: env::env_u64("EXECUTOR_SPLIT_QUANTUM_MS", 1000),
        }
    }

    /// Resolve worker thread count (0 means use available parallelism).
    pub fn resolved_worker_threads(&self) -> usize {
        if self.worker_threads == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            self.worker_threads
        }
    }

    /// One execution quantum as a `Duration`.
    pub fn split_quantum(&self) -> Duration {
        Duration::from_millis(self.split_quantum_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECOND: i64 = NANOS_PER_SECOND;

    #[test]
    fn priority_ordering_is_lexicographic() {
        assert!(Priority::new(0, 100) < Priority::new(1, 0));
        assert!(Priority::new(2, 5) < Priority::new(2, 6));
        assert_eq!(Priority::new(3, 7), Priority::new(3, 7));
    }

    #[test]
    fn compute_level_boundaries() {
        assert_eq!(compute_level(0), 0);
        assert_eq!(compute_level(SECOND - 1), 0);
        assert_eq!(compute_level(SECOND), 1);
        assert_eq!(compute_level(10 * SECOND), 2);
        assert_eq!(compute_level(60 * SECOND), 3);
        assert_eq!(compute_level(300 * SECOND), 4);
        assert_eq!(compute_level(3000 * SECOND), 4);
    }

    #[test]
    fn compute_level_is_monotone() {
        let mut last = 0;
        for seconds in 0..400 {
            let level = compute_level(seconds * SECOND);
            assert!(level >= last, "level regressed at {seconds}s");
            last = level;
        }
    }

    #[test]
    fn level_widths() {
        assert_eq!(level_width_nanos(0), SECOND);
        assert_eq!(level_width_nanos(1), 9 * SECOND);
        assert_eq!(level_width_nanos(2), 50 * SECOND);
        assert_eq!(level_width_nanos(3), 240 * SECOND);
    }

    #[test]
    fn config_defaults() {
        let config = ExecutorConfig::default();
        assert_eq!(config.worker_threads, 0);
        assert!(!config.level_absolute_priority);
        assert_eq!(config.level_time_multiplier, 2.0);
        assert_eq!(config.split_quantum(), Duration::from_secs(1));
    }

    #[test]
    fn resolved_worker_threads() {
        let mut config = ExecutorConfig::default();
        // 0 means auto-detect
        assert!(config.resolved_worker_threads() > 0);

        config.worker_threads = 8;
        assert_eq!(config.resolved_worker_threads(), 8);
    }
}
