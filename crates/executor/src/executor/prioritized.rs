use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use uuid::Uuid;

use quarry_core::{QuarryError, SplitId, TaskId};

use super::queue::MultilevelSplitQueue;
use super::split::{QueuedSplit, SplitRunner};
use super::types::Priority;

/// A split body wrapped with the scheduling state the queue and workers need:
/// current priority, cumulative scheduled time, and lifecycle flags.
///
/// The handle holds only a weak reference to its queue; the queue borrows
/// handles while they wait and never owns their lifetime.
pub struct PrioritizedSplit {
    task_id: TaskId,
    split_id: SplitId,
    name: String,
    runner: Mutex<Box<dyn SplitRunner>>,
    priority: Mutex<Priority>,
    scheduled_nanos: AtomicI64,
    ready: AtomicBool,
    finished: AtomicBool,
    queue: Weak<MultilevelSplitQueue<PrioritizedSplit>>,
}

impl PrioritizedSplit {
    pub fn new(
        task_id: TaskId,
        runner: Box<dyn SplitRunner>,
        queue: &Arc<MultilevelSplitQueue<PrioritizedSplit>>,
    ) -> Arc<Self> {
        let name = runner.name().to_string();
        Arc::new(Self {
            task_id,
            split_id: Uuid::new_v4(),
            name,
            runner: Mutex::new(runner),
            priority: Mutex::new(Priority::new(0, 0)),
            scheduled_nanos: AtomicI64::new(0),
            ready: AtomicBool::new(false),
            finished: AtomicBool::new(false),
            queue: Arc::downgrade(queue),
        })
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub fn split_id(&self) -> SplitId {
        self.split_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cumulative CPU time charged to this split.
    pub fn scheduled_nanos(&self) -> i64 {
        self.scheduled_nanos.load(Ordering::Acquire)
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Retire the split; a retired split is never re-offered.
    pub fn mark_finished(&self) {
        self.finished.store(true, Ordering::Release);
    }

    /// Run one quantum of the underlying split body. Returns whether the
    /// body reports itself finished afterwards.
    pub fn process(&self, quantum: Duration) -> Result<bool, QuarryError> {
        let mut runner = self.runner.lock().expect("split runner lock poisoned");
        runner.process(quantum)?;
        Ok(runner.is_finished())
    }

    /// Charge one executed quantum: accumulate the split's scheduled time,
    /// let the queue distribute the charge across levels, and install the
    /// resulting priority.
    pub fn record_quantum(&self, quanta_nanos: i64) -> Priority {
        let scheduled_nanos =
            self.scheduled_nanos.fetch_add(quanta_nanos, Ordering::AcqRel) + quanta_nanos;

        let Some(queue) = self.queue.upgrade() else {
            return self.priority();
        };
        let new_priority = queue.update_priority(self.priority(), quanta_nanos, scheduled_nanos);
        self.set_priority(new_priority);
        new_priority
    }

    pub(crate) fn set_priority(&self, priority: Priority) {
        *self.priority.lock().expect("split priority lock poisoned") = priority;
    }
}

impl QueuedSplit for PrioritizedSplit {
    fn priority(&self) -> Priority {
        *self.priority.lock().expect("split priority lock poisoned")
    }

    fn update_level_priority(&self) -> bool {
        let Some(queue) = self.queue.upgrade() else {
            return false;
        };
        let old_priority = self.priority();
        let new_priority =
            queue.update_level_priority(old_priority, self.scheduled_nanos());
        if new_priority != old_priority {
            self.set_priority(new_priority);
            return true;
        }
        false
    }

    fn set_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::types::compute_level;

    const SECOND: i64 = 1_000_000_000;

    struct NoopRunner;

    impl SplitRunner for NoopRunner {
        fn name(&self) -> &str {
            "noop"
        }

        fn is_finished(&self) -> bool {
            true
        }

        fn process(&mut self, _quantum: Duration) -> Result<(), QuarryError> {
            Ok(())
        }
    }

    fn split_on(queue: &Arc<MultilevelSplitQueue<PrioritizedSplit>>) -> Arc<PrioritizedSplit> {
        PrioritizedSplit::new(Uuid::new_v4(), Box::new(NoopRunner), queue)
    }

    #[test]
    fn new_split_starts_at_level_zero() {
        let queue = Arc::new(MultilevelSplitQueue::new(false, 2.0));
        let split = split_on(&queue);

        assert_eq!(split.priority(), Priority::new(0, 0));
        assert_eq!(split.scheduled_nanos(), 0);
        assert!(!split.is_ready());
        assert!(!split.is_finished());
    }

    #[test]
    fn record_quantum_accumulates_and_installs_priority() {
        let queue = Arc::new(MultilevelSplitQueue::new(false, 2.0));
        let split = split_on(&queue);

        let priority = split.record_quantum(SECOND / 2);
        assert_eq!(split.scheduled_nanos(), SECOND / 2);
        assert_eq!(priority, Priority::new(0, SECOND / 2));
        assert_eq!(split.priority(), priority);

        // A second quantum crosses the 1s threshold into level 1.
        let priority = split.record_quantum(SECOND);
        assert_eq!(split.scheduled_nanos(), SECOND + SECOND / 2);
        assert_eq!(priority.level(), compute_level(split.scheduled_nanos()));
        assert_eq!(priority.level(), 1);
    }

    #[test]
    fn update_level_priority_reconciles_stale_level() {
        let queue = Arc::new(MultilevelSplitQueue::new(false, 2.0));
        let split = split_on(&queue);

        // Charge the split past the level-0 threshold, then force the stored
        // priority back to level 0 the way a stale waiter would look.
        split.record_quantum(2 * SECOND);
        split.set_priority(Priority::new(0, 0));

        assert!(split.update_level_priority());
        assert_eq!(split.priority().level(), 1);

        // Already consistent: nothing to reconcile.
        assert!(!split.update_level_priority());
    }

    #[test]
    fn dropped_queue_leaves_priority_untouched() {
        let queue = Arc::new(MultilevelSplitQueue::new(false, 2.0));
        let split = split_on(&queue);
        drop(queue);

        assert_eq!(split.record_quantum(SECOND), Priority::new(0, 0));
        assert!(!split.update_level_priority());
    }
}
