pub mod executor;

pub use executor::{
    compute_level, ExecutorConfig, ExecutorError, MultilevelSplitQueue, PrioritizedSplit,
    Priority, QueuedSplit, SplitRunner, TaskExecutor,
};
