use std::sync::Arc;

use crate::executor::split::QueuedSplit;
use crate::executor::types::LEVEL_COUNT;

use super::core::{MultilevelSplitQueue, QueueState};

impl<S: QueuedSplit> MultilevelSplitQueue<S> {
    /// Choose the next split to dispatch, or `None` if every level is empty.
    ///
    /// Each level is given a target share of scheduled time, a geometric
    /// series shaped by `level_time_multiplier`. This picks the non-empty
    /// level with the worst ratio of target to actual scheduled time (the
    /// level furthest behind its target) and pops that level's
    /// minimum-priority split.
    pub(super) fn poll_split(&self, state: &mut QueueState<S>) -> Option<Arc<S>> {
        if self.level_absolute_priority {
            return Self::poll_first_split(state);
        }

        // The anchor doubles as level 0's own target; each iteration divides
        // it down for the next level, including after level 0.
        let mut target_scheduled_time = Self::update_level_times(state, self.level_time_multiplier);
        let mut worst_ratio = 1.0_f64;
        let mut selected_level: Option<usize> = None;

        for level in 0..LEVEL_COUNT {
            if !state.level_waiting_splits[level].is_empty() {
                let scheduled = state.level_scheduled_time[level];
                // A level that never ran keeps ratio 0; the snap in
                // update_level_times is what protects it from starvation.
                let ratio = if scheduled == 0 {
                    0.0
                } else {
                    target_scheduled_time as f64 / scheduled as f64
                };
                if selected_level.is_none() || ratio > worst_ratio {
                    worst_ratio = ratio;
                    selected_level = Some(level);
                }
            }

            target_scheduled_time =
                (target_scheduled_time as f64 / self.level_time_multiplier) as i64;
        }

        let selected_level = selected_level?;
        let split = state.level_waiting_splits[selected_level]
            .poll()
            .expect("selected level observed non-empty under the lock");
        Some(split)
    }

    /// Strict priority: drain the lowest-numbered non-empty level.
    fn poll_first_split(state: &mut QueueState<S>) -> Option<Arc<S>> {
        for level in state.level_waiting_splits.iter_mut() {
            if let Some(split) = level.poll() {
                return Some(split);
            }
        }
        None
    }

    /// Starvation avoidance: a level with no waiting splits accumulates no
    /// scheduled time and falls behind, so the first split to arrive there
    /// would capture the CPU for an unbounded burst. Raise every empty
    /// level's scheduled time to the value expected from the level-0 anchor,
    /// raising the anchor whenever a non-empty level is already past its own
    /// expected share.
    ///
    /// Returns the anchor -- the target scheduled time for level 0.
    pub(super) fn update_level_times(state: &mut QueueState<S>, multiplier: f64) -> i64 {
        let mut level0_expected_time = state.level_scheduled_time[0];
        loop {
            let mut current_multiplier = multiplier;
            let mut updated = false;

            for level in 0..LEVEL_COUNT {
                current_multiplier /= multiplier;
                let level_expected_time =
                    (level0_expected_time as f64 * current_multiplier) as i64;

                if state.level_waiting_splits[level].is_empty() {
                    state.level_scheduled_time[level] = level_expected_time;
                    continue;
                }

                if state.level_scheduled_time[level] > level_expected_time {
                    level0_expected_time =
                        (state.level_scheduled_time[level] as f64 / current_multiplier) as i64;
                    updated = true;
                    break;
                }
            }

            if !updated || level0_expected_time == 0 {
                break;
            }
        }

        level0_expected_time
    }
}
