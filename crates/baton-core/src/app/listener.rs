//! BatchListener - engine callback を registry に反映する
//!
//! One listener per dispatched batch; it only reacts to tasks of that batch.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use super::controller::Shared;
use crate::domain::{BuildResult, TaskFailure, TaskPath};
use crate::error::DispatchError;
use crate::ports::{BuildListener, TaskGraph};

pub(crate) struct BatchListener<'a> {
    shared: &'a Shared,
    batch: &'a [TaskPath],
    members: HashSet<&'a TaskPath>,
    finished: AtomicBool,
}

impl<'a> BatchListener<'a> {
    pub(crate) fn new(shared: &'a Shared, batch: &'a [TaskPath]) -> Self {
        Self {
            shared,
            batch,
            members: batch.iter().collect(),
            finished: AtomicBool::new(false),
        }
    }

    /// Did the engine deliver `build_finished` for this batch?
    pub(crate) fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}

impl BuildListener for BatchListener<'_> {
    fn graph_populated(&self, graph: &dyn TaskGraph) -> Result<(), DispatchError> {
        for task in self.batch {
            if !graph.has_task(task) {
                return Err(DispatchError::TaskNotInGraph {
                    task: task.clone(),
                    build: self.shared.build_name.clone(),
                });
            }
        }
        debug!(build = %self.shared.build_name, tasks = self.batch.len(), "task graph populated");
        Ok(())
    }

    fn task_finished(&self, path: &TaskPath, failure: Option<TaskFailure>) {
        // the engine also reports tasks it pulled in as dependencies
        if self.members.contains(path) {
            self.shared.task_completed(path, failure.as_ref());
        }
    }

    fn build_finished(&self, result: BuildResult) {
        self.finished.store(true, Ordering::SeqCst);
        self.shared.tasks_done(self.batch, result);
    }
}
