//! Split-level task executor built around a multilevel feedback queue.
//!
//! Worker threads pull splits from the shared [`MultilevelSplitQueue`], run
//! each one for a single quantum, charge the consumed CPU time back to the
//! level the split ran in, and re-offer unfinished splits. Newly admitted
//! splits start at level 0; splits sink to deeper levels as their cumulative
//! scheduled time crosses the level thresholds, so interactive work keeps
//! jumping ahead of long-running scans while the deeper levels still receive
//! a bounded share of the total scheduled time.

pub mod metrics;
pub mod prioritized;
pub mod queue;
pub mod runner;
pub mod split;
pub mod types;

pub use metrics::{CounterStat, ExecutorMetrics, ExecutorStatus};
pub use prioritized::PrioritizedSplit;
pub use queue::MultilevelSplitQueue;
pub use runner::TaskExecutor;
pub use split::{ExecutorError, QueuedSplit, SplitRunner};
pub use types::{
    compute_level, ExecutorConfig, Priority, LEVEL_CONTRIBUTION_CAP, LEVEL_COUNT,
    LEVEL_THRESHOLD_SECONDS,
};
