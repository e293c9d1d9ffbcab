use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use crate::executor::metrics::CounterStat;
use crate::executor::split::{ExecutorError, QueuedSplit};
use crate::executor::types::LEVEL_COUNT;

/// Entry in a level heap: the priority scalar snapshotted at offer time plus
/// an insertion sequence number as a deterministic tie-break. The snapshot
/// keeps heap order stable even if the split's own priority moves while it
/// waits; `take` reconciles stale entries by re-offering.
struct Entry<S> {
    level_priority: i64,
    seq: u64,
    split: Arc<S>,
}

impl<S> Ord for Entry<S> {
    /// Reversed so `BinaryHeap` pops the smallest `level_priority` first.
    fn cmp(&self, other: &Self) -> CmpOrdering {
        (other.level_priority, other.seq).cmp(&(self.level_priority, self.seq))
    }
}

impl<S> PartialOrd for Entry<S> {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl<S> PartialEq for Entry<S> {
    fn eq(&self, other: &Self) -> bool {
        self.level_priority == other.level_priority && self.seq == other.seq
    }
}

impl<S> Eq for Entry<S> {}

/// One level's waiting splits, ordered by snapshotted level priority.
pub(super) struct LevelQueue<S> {
    heap: BinaryHeap<Entry<S>>,
}

impl<S> LevelQueue<S> {
    fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
        }
    }

    fn offer(&mut self, split: Arc<S>, level_priority: i64, seq: u64) {
        self.heap.push(Entry {
            level_priority,
            seq,
            split,
        });
    }

    pub(super) fn poll(&mut self) -> Option<Arc<S>> {
        self.heap.pop().map(|entry| entry.split)
    }

    pub(super) fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub(super) fn len(&self) -> usize {
        self.heap.len()
    }

    /// Linear identity scan; removals are rare (cancellation paths).
    fn remove(&mut self, split: &Arc<S>) {
        self.heap.retain(|entry| !Arc::ptr_eq(&entry.split, split));
    }
}

/// State guarded by the queue lock: the level queues and the per-level
/// scheduled-time ledger the selection algorithm balances against.
pub(super) struct QueueState<S> {
    pub(super) level_waiting_splits: [LevelQueue<S>; LEVEL_COUNT],
    pub(super) level_scheduled_time: [i64; LEVEL_COUNT],
    next_seq: u64,
}

/// Blocking multilevel feedback queue.
///
/// Splits wait in one of [`LEVEL_COUNT`] levels keyed by cumulative scheduled
/// time. `offer` makes a split eligible and wakes one waiting taker; `take`
/// blocks until the selection algorithm (see the `selection` module) picks a
/// split. After each quantum the worker charges consumed CPU time back
/// through [`update_priority`](MultilevelSplitQueue::update_priority), which
/// may move the split to a deeper level.
///
/// Under the lock: the level queues and scheduled-time ledger. Outside the
/// lock: the per-level minimum-priority floors and dispatch counters, both
/// independently thread-safe.
pub struct MultilevelSplitQueue<S: QueuedSplit> {
    state: Mutex<QueueState<S>>,
    not_empty: Condvar,
    interrupted: AtomicBool,

    /// `level_priority` of the most recently dispatched split per level, used
    /// as the floor for splits promoted into the level. -1 = uninitialized.
    pub(super) level_min_priority: [AtomicI64; LEVEL_COUNT],
    selected_level_counters: [CounterStat; LEVEL_COUNT],

    pub(super) level_absolute_priority: bool,
    pub(super) level_time_multiplier: f64,
}

impl<S: QueuedSplit> MultilevelSplitQueue<S> {
    pub fn new(level_absolute_priority: bool, level_time_multiplier: f64) -> Self {
        Self {
            state: Mutex::new(QueueState {
                level_waiting_splits: std::array::from_fn(|_| LevelQueue::new()),
                level_scheduled_time: [0; LEVEL_COUNT],
                next_seq: 0,
            }),
            not_empty: Condvar::new(),
            interrupted: AtomicBool::new(false),
            level_min_priority: std::array::from_fn(|_| AtomicI64::new(-1)),
            selected_level_counters: std::array::from_fn(|_| CounterStat::new()),
            level_absolute_priority,
            level_time_multiplier,
        }
    }

    pub(super) fn lock_state(&self) -> MutexGuard<'_, QueueState<S>> {
        self.state.lock().expect("split queue state lock poisoned")
    }

    /// Make a ready split eligible for dispatch and wake one waiting taker.
    ///
    /// The split lands in the level queue named by its current priority; a
    /// level mismatch discovered later at `take` is fixed by re-enqueueing.
    pub fn offer(&self, split: Arc<S>) {
        split.set_ready();
        let priority = split.priority();

        let mut state = self.lock_state();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.level_waiting_splits[priority.level()].offer(split, priority.level_priority(), seq);
        self.not_empty.notify_one();
    }

    /// Block until the scheduler selects a split to run.
    ///
    /// The returned split's level counter has been incremented and its
    /// level's minimum-priority floor updated. Returns
    /// [`ExecutorError::Interrupted`] if [`interrupt`](Self::interrupt) was
    /// called; retrying afterwards is safe.
    pub fn take(&self) -> Result<Arc<S>, ExecutorError> {
        loop {
            let mut state = self.lock_state();
            let result = loop {
                if self.interrupted.load(Ordering::Acquire) {
                    return Err(ExecutorError::Interrupted);
                }
                match self.poll_split(&mut state) {
                    Some(split) => break split,
                    None => {
                        state = self
                            .not_empty
                            .wait(state)
                            .expect("split queue state lock poisoned");
                    }
                }
            };

            // The split may have aged into a new level while it waited; put
            // it back where it now belongs and pick again.
            if result.update_level_priority() {
                drop(state);
                self.offer(result);
                continue;
            }

            let selected = result.priority();
            self.level_min_priority[selected.level()]
                .store(selected.level_priority(), Ordering::Release);
            self.selected_level_counters[selected.level()].update(1);
            return Ok(result);
        }
    }

    /// Abort all current and future `take` calls (shutdown path). Sticky;
    /// queue contents are left untouched.
    pub fn interrupt(&self) {
        let _state = self.lock_state();
        self.interrupted.store(true, Ordering::Release);
        self.not_empty.notify_all();
    }

    /// Withdraw a split wherever it waits. Callers may not know the current
    /// level, so every level is scanned; absent splits are a silent no-op.
    pub fn remove(&self, split: &Arc<S>) {
        let mut state = self.lock_state();
        for level in state.level_waiting_splits.iter_mut() {
            level.remove(split);
        }
    }

    /// Batch form of [`remove`](Self::remove).
    pub fn remove_all(&self, splits: &[Arc<S>]) {
        let mut state = self.lock_state();
        for split in splits {
            for level in state.level_waiting_splits.iter_mut() {
                level.remove(split);
            }
        }
    }

    pub(super) fn add_level_time(&self, level: usize, nanos: i64) {
        self.lock_state().level_scheduled_time[level] += nanos;
    }

    /// Total waiting splits across all levels.
    pub fn size(&self) -> usize {
        let state = self.lock_state();
        state.level_waiting_splits.iter().map(LevelQueue::len).sum()
    }

    /// Waiting splits per level.
    pub fn level_sizes(&self) -> [usize; LEVEL_COUNT] {
        let state = self.lock_state();
        std::array::from_fn(|level| state.level_waiting_splits[level].len())
    }

    /// Per-level dispatch counters. Monotone; the queue never resets them.
    pub fn selected_level_counters(&self) -> &[CounterStat; LEVEL_COUNT] {
        &self.selected_level_counters
    }

    /// Scheduled-time ledger readout, exposed for tests and metrics.
    pub fn level_scheduled_time(&self) -> [i64; LEVEL_COUNT] {
        self.lock_state().level_scheduled_time
    }
}
