use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{TaskPath, TaskRecord, TaskStatus};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskCounts {
    pub queued: usize,
    pub executing: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Point-in-time copy of one registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskSnapshot {
    pub path: TaskPath,
    pub status: TaskStatus,
    pub queued_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl From<&TaskRecord> for TaskSnapshot {
    fn from(record: &TaskRecord) -> Self {
        Self {
            path: record.path.clone(),
            status: record.status,
            queued_at: record.queued_at,
            finished_at: record.finished_at,
        }
    }
}
