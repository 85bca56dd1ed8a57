//! ExecutionEngine port - the build unit's own task runner.
//!
//! The controller only decides *what* to hand over; ordering, dependencies and
//! actual execution belong to the engine.

use thiserror::Error;

use crate::domain::{BuildResult, TaskFailure, TaskPath};
use crate::error::DispatchError;

/// Read-only view of the work graph the engine finalized for a round.
pub trait TaskGraph {
    fn has_task(&self, path: &TaskPath) -> bool;
}

/// Callbacks the engine drives while executing one batch.
///
/// Passed by reference into [`ExecutionEngine::execute`]; the engine must not
/// keep it past the call.
pub trait BuildListener: Send + Sync {
    /// The engine decided which tasks run this round.
    ///
    /// An error here is fatal for the round: the engine must not run the graph
    /// and should report the error through `build_finished`.
    fn graph_populated(&self, graph: &dyn TaskGraph) -> Result<(), DispatchError>;

    /// One task reached a terminal state. `failure` is `None` on success.
    fn task_finished(&self, path: &TaskPath, failure: Option<TaskFailure>);

    /// The round is over. Called exactly once per `execute`.
    fn build_finished(&self, result: BuildResult);
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// The round failed and every failure was already delivered to the
    /// listener. Carries no information of its own.
    #[error("build failed; failures already reported")]
    Reported,

    #[error("execution engine fault: {0}")]
    Internal(String),
}

/// The build unit's execution engine, shared between the dispatch worker and
/// whoever populates the task graph.
pub trait ExecutionEngine: Send + Sync {
    /// Add tasks to the unit's pending work graph.
    fn add_tasks_to_graph(&self, paths: &[TaskPath]);

    /// Run `batch` (never empty) to completion, reporting through `listener`.
    fn execute(&self, batch: &[TaskPath], listener: &dyn BuildListener) -> Result<(), EngineError>;
}
