use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::JoinHandle;

use tracing::info;

use quarry_core::TaskId;

use crate::executor::metrics::{ExecutorMetrics, ExecutorStatus};
use crate::executor::prioritized::PrioritizedSplit;
use crate::executor::queue::MultilevelSplitQueue;
use crate::executor::split::SplitRunner;
use crate::executor::types::{ExecutorConfig, LEVEL_COUNT};

/// The split executor. Owns the multilevel feedback queue and the worker
/// pool that drains it, one quantum at a time.
pub struct TaskExecutor {
    pub(super) config: ExecutorConfig,
    pub(super) queue: Arc<MultilevelSplitQueue<PrioritizedSplit>>,
    /// Executor metrics.
    pub(super) metrics: Arc<RwLock<ExecutorMetrics>>,
    /// Shutdown signal.
    pub(super) shutdown: Arc<AtomicBool>,
    /// Splits currently inside a quantum (for utilization tracking).
    pub(super) running_splits: Arc<AtomicUsize>,
    /// Worker thread handles, joined on shutdown.
    pub(super) workers: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskExecutor {
    /// Create a new executor with the given config. Workers are not spawned
    /// until [`start`](Self::start).
    pub fn new(config: ExecutorConfig) -> Self {
        let queue = Arc::new(MultilevelSplitQueue::new(
            config.level_absolute_priority,
            config.level_time_multiplier,
        ));
        Self {
            config,
            queue,
            metrics: Arc::new(RwLock::new(ExecutorMetrics::default())),
            shutdown: Arc::new(AtomicBool::new(false)),
            running_splits: Arc::new(AtomicUsize::new(0)),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Submit a split body for execution. The split enters level 0 and
    /// becomes eligible immediately.
    pub fn submit(&self, task_id: TaskId, runner: Box<dyn SplitRunner>) -> Arc<PrioritizedSplit> {
        let split = PrioritizedSplit::new(task_id, runner, &self.queue);
        info!(
            task = %split.task_id(),
            split = %split.split_id(),
            name = split.name(),
            "split submitted"
        );
        self.queue.offer(Arc::clone(&split));
        split
    }

    /// Withdraw a split (cancellation path). A quantum already running
    /// finishes on its own; the split is not re-offered afterwards.
    pub fn cancel(&self, split: &Arc<PrioritizedSplit>) {
        split.mark_finished();
        self.queue.remove(split);
        if let Ok(mut metrics) = self.metrics.write() {
            metrics.record_cancellation();
        }
        info!(split = %split.split_id(), "split cancelled");
    }

    /// Stop the workers: interrupt every blocked `take` and join the
    /// threads. Idempotent.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("executor shutdown requested");
        self.queue.interrupt();

        let handles: Vec<JoinHandle<()>> = {
            let mut workers = self.workers.lock().expect("worker handle lock poisoned");
            workers.drain(..).collect()
        };
        for handle in handles {
            let _ = handle.join();
        }
        info!("executor stopped");
    }

    /// Get a handle to the shared dispatch queue.
    pub fn queue(&self) -> Arc<MultilevelSplitQueue<PrioritizedSplit>> {
        Arc::clone(&self.queue)
    }

    /// Get a snapshot of the current executor metrics.
    pub fn metrics(&self) -> ExecutorMetrics {
        self.metrics
            .read()
            .map(|metrics| metrics.clone())
            .unwrap_or_default()
    }

    /// Assemble a full status snapshot: executor metrics plus queue state.
    pub fn status(&self) -> ExecutorStatus {
        let counters = self.queue.selected_level_counters();
        let level_selected: [u64; LEVEL_COUNT] =
            std::array::from_fn(|level| counters[level].total_count());
        let scheduled = self.queue.level_scheduled_time();
        let level_scheduled_seconds: [f64; LEVEL_COUNT] =
            std::array::from_fn(|level| scheduled[level] as f64 / 1e9);

        ExecutorStatus {
            queued_splits: self.queue.size(),
            running_splits: self.running_splits.load(Ordering::Relaxed),
            level_queued: self.queue.level_sizes(),
            level_selected,
            level_scheduled_seconds,
            metrics: self.metrics(),
        }
    }
}

impl Drop for TaskExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
