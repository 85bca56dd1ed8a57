//! Task state machine.

use serde::{Deserialize, Serialize};

/// Internal status of a task record.
///
/// State transitions:
/// - Queued -> Executing (claimed by the dispatch worker)
/// - Executing -> Success (per-task success report)
/// - Executing -> Failed (per-task failure report, or forced at batch end)
///
/// Success and Failed are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Submitted, not yet claimed by the worker.
    Queued,

    /// Claimed and handed to the execution engine.
    Executing,

    Failed,

    Success,
}

impl TaskStatus {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Failed | TaskStatus::Success)
    }

    /// Is `next` a legal forward move from `self`?
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Queued, TaskStatus::Executing)
                | (TaskStatus::Executing, TaskStatus::Success)
                | (TaskStatus::Executing, TaskStatus::Failed)
        )
    }

    /// Collapse into the view exposed to other builds.
    pub fn view(self) -> TaskState {
        match self {
            TaskStatus::Queued | TaskStatus::Executing => TaskState::Waiting,
            TaskStatus::Success => TaskState::Success,
            TaskStatus::Failed => TaskState::Failed,
        }
    }
}

/// Externally visible state of a task: callers only care whether it is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Waiting,
    Success,
    Failed,
}

impl TaskState {
    pub fn is_done(self) -> bool {
        self != TaskState::Waiting
    }
}
