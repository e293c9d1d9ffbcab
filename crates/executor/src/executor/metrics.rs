use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::types::LEVEL_COUNT;

/// Increment-only thread-safe counter, exposed read-only to metrics
/// collectors.
#[derive(Debug, Default)]
pub struct CounterStat {
    count: AtomicU64,
}

impl CounterStat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add to the counter. Relaxed ordering: this is a metric, not
    /// synchronization.
    pub fn update(&self, delta: u64) {
        self.count.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn total_count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

/// Executor operational metrics exposed to the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutorMetrics {
    /// Splits that ran to completion.
    pub splits_completed: u64,
    /// Splits retired because a quantum returned an error.
    pub splits_failed: u64,
    /// Splits withdrawn before completion.
    pub splits_cancelled: u64,
    /// Total quanta executed across all workers.
    pub quanta_executed: u64,
    /// Total wall time spent inside split quanta.
    pub total_scheduled: Duration,
    /// Last time any worker finished a quantum.
    pub last_activity: Option<DateTime<Utc>>,
}

impl Default for ExecutorMetrics {
    fn default() -> Self {
        Self {
            splits_completed: 0,
            splits_failed: 0,
            splits_cancelled: 0,
            quanta_executed: 0,
            total_scheduled: Duration::ZERO,
            last_activity: None,
        }
    }
}

impl ExecutorMetrics {
    /// Record one executed quantum.
    pub fn record_quantum(&mut self, elapsed: Duration) {
        self.quanta_executed += 1;
        self.total_scheduled += elapsed;
        self.last_activity = Some(Utc::now());
    }

    pub fn record_completion(&mut self) {
        self.splits_completed += 1;
    }

    pub fn record_failure(&mut self) {
        self.splits_failed += 1;
    }

    pub fn record_cancellation(&mut self) {
        self.splits_cancelled += 1;
    }
}

/// Point-in-time status snapshot merging executor metrics with queue state.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutorStatus {
    /// Splits waiting in the queue, all levels.
    pub queued_splits: usize,
    /// Splits currently inside a quantum.
    pub running_splits: usize,
    /// Waiting splits per level.
    pub level_queued: [usize; LEVEL_COUNT],
    /// Dispatches per level since startup.
    pub level_selected: [u64; LEVEL_COUNT],
    /// Scheduled time charged per level, in seconds.
    pub level_scheduled_seconds: [f64; LEVEL_COUNT],
    pub metrics: ExecutorMetrics,
}
