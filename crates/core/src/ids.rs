use uuid::Uuid;

/// Identifier of a task -- the per-worker execution of one query stage.
pub type TaskId = Uuid;

/// Identifier of a split -- one schedulable unit of work within a task.
pub type SplitId = Uuid;
