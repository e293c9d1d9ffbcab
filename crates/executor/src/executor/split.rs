use std::time::Duration;

use quarry_core::QuarryError;

use super::types::Priority;

/// Error type for executor and queue operations.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// A blocked `take` was told to abort (executor shutdown). Distinct from
    /// a real failure; retrying is safe.
    #[error("take interrupted: executor is shutting down")]
    Interrupted,
    #[error("split execution failed: {0}")]
    Split(#[from] QuarryError),
}

/// A unit of query work driven by the executor, one quantum at a time.
///
/// Implementations wrap operator pipelines over a data range. The executor
/// calls [`process`](Self::process) repeatedly, interleaved with other
/// splits, until [`is_finished`](Self::is_finished) reports true.
pub trait SplitRunner: Send + Sync {
    /// Human-readable name for logging and metrics.
    fn name(&self) -> &str;

    /// Whether the split has no more work to do.
    fn is_finished(&self) -> bool;

    /// Run for up to `quantum`, returning when the quantum expires, the
    /// split blocks, or the split finishes.
    fn process(&mut self, quantum: Duration) -> Result<(), QuarryError>;
}

/// Capabilities the multilevel queue needs from a waiting split handle.
pub trait QueuedSplit: Send + Sync + 'static {
    /// Current scheduling priority.
    fn priority(&self) -> Priority;

    /// Recompute the priority from the split's own runtime accounting and
    /// install it. Returns true iff the priority actually changed -- i.e. it
    /// went stale while the split waited.
    fn update_level_priority(&self) -> bool;

    /// Mark the split eligible to run; called on every enqueue.
    fn set_ready(&self);
}
