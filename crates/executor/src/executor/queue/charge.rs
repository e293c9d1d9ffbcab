use std::sync::atomic::Ordering;

use crate::executor::split::QueuedSplit;
use crate::executor::types::{
    compute_level, level_width_nanos, Priority, LEVEL_CONTRIBUTION_CAP,
};

use super::core::MultilevelSplitQueue;

impl<S: QueuedSplit> MultilevelSplitQueue<S> {
    /// Charge one executed quantum to the level ledger and compute the
    /// split's next priority.
    ///
    /// The quantum is charged to the split *and* to the level it ran in, so
    /// the inter-level time targets and intra-level fairness both stay
    /// honest. The level charge is capped at [`LEVEL_CONTRIBUTION_CAP`]: a
    /// split that sat in a hung read for minutes should not starve everything
    /// else in its level. The intra-level priority still advances by the full
    /// uncapped quantum.
    pub fn update_priority(
        &self,
        old_priority: Priority,
        quanta_nanos: i64,
        scheduled_nanos: i64,
    ) -> Priority {
        let old_level = old_priority.level();
        let new_level = compute_level(scheduled_nanos);

        let level_contribution = quanta_nanos.min(LEVEL_CONTRIBUTION_CAP);

        if old_level == new_level {
            self.add_level_time(old_level, level_contribution);
            return Priority::new(old_level, old_priority.level_priority() + quanta_nanos);
        }

        let mut remaining_level_contribution = level_contribution;
        let mut remaining_task_time = quanta_nanos;

        // A split normally accrues time in a level and then moves to the
        // next; after a particularly long quantum, charge each intermediate
        // level as if the split had run there up to the level's width.
        for current_level in old_level..new_level {
            let time_accrued_to_level =
                level_width_nanos(current_level).min(remaining_level_contribution);
            self.add_level_time(current_level, time_accrued_to_level);
            remaining_level_contribution -= time_accrued_to_level;
            remaining_task_time -= time_accrued_to_level;
        }

        self.add_level_time(new_level, remaining_level_contribution);

        // Rebase onto the new level's floor: the old level's scalar is
        // inflated relative to residents of the new level.
        let new_level_min_priority = self.level_min_priority(new_level, scheduled_nanos);
        Priority::new(new_level, new_level_min_priority + remaining_task_time)
    }

    /// Recompute a waiting split's priority from its cumulative scheduled
    /// time. If the level is unchanged the old priority comes back untouched;
    /// otherwise the split enters the new level at its current floor.
    pub fn update_level_priority(&self, old_priority: Priority, scheduled_nanos: i64) -> Priority {
        let new_level = compute_level(scheduled_nanos);
        if new_level == old_priority.level() {
            return old_priority;
        }
        Priority::new(new_level, self.level_min_priority(new_level, scheduled_nanos))
    }

    /// Floor priority for arrivals at a level, seeded from the caller's
    /// cumulative scheduled time on first read.
    pub fn level_min_priority(&self, level: usize, scheduled_nanos: i64) -> i64 {
        let slot = &self.level_min_priority[level];
        let _ = slot.compare_exchange(-1, scheduled_nanos, Ordering::AcqRel, Ordering::Acquire);
        slot.load(Ordering::Acquire)
    }
}
