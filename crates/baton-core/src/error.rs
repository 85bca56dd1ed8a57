use thiserror::Error;

use crate::domain::TaskPath;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The task was never queued on this controller. Always a caller bug.
    #[error("task '{task}' of build '{build}' was never scheduled for execution")]
    UnknownTask { task: TaskPath, build: String },

    /// The engine finalized its graph without a task the controller asked for.
    #[error("Task '{task}' not found in build '{build}'.")]
    TaskNotInGraph { task: TaskPath, build: String },

    #[error("failed to spawn dispatch worker for build '{build}'")]
    WorkerSpawn {
        build: String,
        #[source]
        source: std::io::Error,
    },

    #[error("blocking wait aborted: {0}")]
    WaitAborted(String),
}
