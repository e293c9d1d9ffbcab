use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::executor::metrics::ExecutorMetrics;
use crate::executor::prioritized::PrioritizedSplit;
use crate::executor::queue::MultilevelSplitQueue;

use super::core::TaskExecutor;

/// Shared handles a worker thread needs to drain the queue.
struct WorkerContext {
    queue: Arc<MultilevelSplitQueue<PrioritizedSplit>>,
    metrics: Arc<RwLock<ExecutorMetrics>>,
    running_splits: Arc<AtomicUsize>,
    quantum: Duration,
}

impl TaskExecutor {
    /// Spawn the worker threads. Call once, after construction.
    pub fn start(&self) {
        let worker_count = self.config.resolved_worker_threads();
        info!(
            workers = worker_count,
            absolute = self.config.level_absolute_priority,
            multiplier = self.config.level_time_multiplier,
            "executor starting"
        );

        let mut workers = self.workers.lock().expect("worker handle lock poisoned");
        for worker_id in 0..worker_count {
            let context = WorkerContext {
                queue: Arc::clone(&self.queue),
                metrics: Arc::clone(&self.metrics),
                running_splits: Arc::clone(&self.running_splits),
                quantum: self.config.split_quantum(),
            };
            let handle = thread::Builder::new()
                .name(format!("split-worker-{worker_id}"))
                .spawn(move || worker_loop(worker_id, &context))
                .expect("failed to spawn split worker thread");
            workers.push(handle);
        }
    }
}

/// Pull splits until the queue is interrupted.
fn worker_loop(worker_id: usize, context: &WorkerContext) {
    loop {
        match context.queue.take() {
            Ok(split) => run_split(worker_id, context, split),
            Err(_) => {
                debug!(worker = worker_id, "worker interrupted, exiting");
                break;
            }
        }
    }
}

/// Run one quantum of a split, charge the consumed time, and either
/// re-offer or retire it.
fn run_split(worker_id: usize, context: &WorkerContext, split: Arc<PrioritizedSplit>) {
    if split.is_finished() {
        // Cancelled between selection and execution.
        return;
    }

    context.running_splits.fetch_add(1, Ordering::Relaxed);
    let started = Instant::now();
    let result = split.process(context.quantum);
    let elapsed = started.elapsed();
    context.running_splits.fetch_sub(1, Ordering::Relaxed);

    let priority = split.record_quantum(elapsed.as_nanos() as i64);
    if let Ok(mut metrics) = context.metrics.write() {
        metrics.record_quantum(elapsed);
    }

    match result {
        Ok(true) => {
            split.mark_finished();
            if let Ok(mut metrics) = context.metrics.write() {
                metrics.record_completion();
            }
            debug!(
                worker = worker_id,
                split = %split.split_id(),
                scheduled_ms = split.scheduled_nanos() / 1_000_000,
                "split finished"
            );
        }
        Ok(false) => {
            if split.is_finished() {
                // Cancelled mid-quantum; do not re-offer.
                return;
            }
            debug!(
                worker = worker_id,
                split = %split.split_id(),
                level = priority.level(),
                "split re-queued"
            );
            context.queue.offer(split);
        }
        Err(e) => {
            split.mark_finished();
            if let Ok(mut metrics) = context.metrics.write() {
                metrics.record_failure();
            }
            warn!(
                worker = worker_id,
                split = %split.split_id(),
                name = split.name(),
                error = %e,
                "split failed"
            );
        }
    }
}
