//! Failure causes reported by the execution engine.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::TaskPath;

/// One underlying failure cause.
///
/// `task` is set when the engine can attribute the failure to a task; causes
/// that concern the whole round (graph integrity, engine faults) have none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFailure {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<TaskPath>,
    pub message: String,
}

impl TaskFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            task: None,
            message: message.into(),
        }
    }

    pub fn for_task(task: TaskPath, message: impl Into<String>) -> Self {
        Self {
            task: Some(task),
            message: message.into(),
        }
    }

    /// Wrap any error as an unattributed cause.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        Self::new(err.to_string())
    }
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.task {
            Some(task) => write!(f, "{task}: {}", self.message),
            None => self.message.fmt(f),
        }
    }
}

impl std::error::Error for TaskFailure {}

/// Overall failure of one engine round: a single cause or an ordered aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildFailure {
    Single(TaskFailure),
    Multiple(Vec<TaskFailure>),
}

impl BuildFailure {
    /// Flatten into individual causes, preserving order.
    pub fn into_causes(self) -> Vec<TaskFailure> {
        match self {
            BuildFailure::Single(cause) => vec![cause],
            BuildFailure::Multiple(causes) => causes,
        }
    }
}

impl fmt::Display for BuildFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildFailure::Single(cause) => cause.fmt(f),
            BuildFailure::Multiple(causes) => {
                write!(f, "{} build failures", causes.len())
            }
        }
    }
}

impl std::error::Error for BuildFailure {}

/// Result of one engine round as delivered to `BuildListener::build_finished`.
pub type BuildResult = Result<(), BuildFailure>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_unwraps_in_order() {
        let failure = BuildFailure::Multiple(vec![TaskFailure::new("E1"), TaskFailure::new("E2")]);
        let causes = failure.into_causes();
        assert_eq!(causes, vec![TaskFailure::new("E1"), TaskFailure::new("E2")]);
    }

    #[test]
    fn display_names_the_task() {
        let cause = TaskFailure::for_task(TaskPath::new(":a:test"), "3 tests failed");
        assert_eq!(cause.to_string(), ":a:test: 3 tests failed");
    }
}
