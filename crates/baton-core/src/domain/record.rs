//! Task record: one per task path ever queued on a controller.

use chrono::{DateTime, Utc};

use super::{TaskPath, TaskStatus};

/// Registry entry for a single task.
///
/// Records are never removed; the registry keeps the full history for the
/// lifetime of one build invocation.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub path: TaskPath,
    pub status: TaskStatus,

    pub queued_at: DateTime<Utc>,

    /// Set when the record reaches Success or Failed.
    pub finished_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    pub fn new(path: TaskPath) -> Self {
        Self {
            path,
            status: TaskStatus::Queued,
            queued_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Queued -> Executing. Returns false (and leaves the record alone) otherwise.
    pub fn start_executing(&mut self) -> bool {
        self.advance(TaskStatus::Executing)
    }

    /// Executing -> Success.
    pub fn mark_succeeded(&mut self) -> bool {
        self.advance(TaskStatus::Success)
    }

    /// Executing -> Failed.
    pub fn mark_failed(&mut self) -> bool {
        self.advance(TaskStatus::Failed)
    }

    fn advance(&mut self, next: TaskStatus) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        if next.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
        true
    }
}
