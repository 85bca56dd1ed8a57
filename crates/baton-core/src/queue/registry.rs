//! Task registry: records + dispatched set + failure list.
//!
//! Not synchronized on its own. The controller keeps the whole struct behind
//! one mutex so every transition is atomic with respect to signalling.

use std::collections::{HashMap, HashSet};

use crate::domain::{BuildFailure, BuildResult, TaskFailure, TaskPath, TaskRecord, TaskStatus};
use crate::observability::{TaskCounts, TaskSnapshot};

#[derive(Debug, Default)]
pub struct TaskRegistry {
    /// All task records (single source of truth for status).
    records: HashMap<TaskPath, TaskRecord>,

    /// Insertion order of `records`.
    order: Vec<TaskPath>,

    /// Paths already handed to the engine's graph.
    dispatched: HashSet<TaskPath>,

    /// Failure causes accumulated over every round, flattened.
    failures: Vec<TaskFailure>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new Queued record. Returns false if the path was already known.
    pub fn insert(&mut self, path: TaskPath) -> bool {
        if self.records.contains_key(&path) {
            return false;
        }
        self.order.push(path.clone());
        self.records.insert(path.clone(), TaskRecord::new(path));
        true
    }

    pub fn status(&self, path: &TaskPath) -> Option<TaskStatus> {
        self.records.get(path).map(|record| record.status)
    }

    /// Iterate records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &TaskRecord> {
        self.order.iter().filter_map(|path| self.records.get(path))
    }

    /// Move every Queued record to Executing and return their paths.
    pub fn claim_queued(&mut self) -> Vec<TaskPath> {
        let mut claimed = Vec::new();
        for path in &self.order {
            if let Some(record) = self.records.get_mut(path)
                && record.start_executing()
            {
                claimed.push(path.clone());
            }
        }
        claimed
    }

    /// Queued paths not yet added to the engine's graph; marks them dispatched.
    pub fn take_undispatched(&mut self) -> Vec<TaskPath> {
        let mut fresh = Vec::new();
        for path in &self.order {
            let queued = self
                .records
                .get(path)
                .is_some_and(|record| record.status == TaskStatus::Queued);
            if queued && self.dispatched.insert(path.clone()) {
                fresh.push(path.clone());
            }
        }
        fresh
    }

    /// Apply a per-task report. Only an Executing record moves; returns whether it did.
    pub fn record_completion(&mut self, path: &TaskPath, failed: bool) -> bool {
        let Some(record) = self.records.get_mut(path) else {
            return false;
        };
        if failed {
            record.mark_failed()
        } else {
            record.mark_succeeded()
        }
    }

    /// Fail every path of `batch` that is still Executing; returns the ones forced.
    pub fn force_fail_executing(&mut self, batch: &[TaskPath]) -> Vec<TaskPath> {
        let mut forced = Vec::new();
        for path in batch {
            if let Some(record) = self.records.get_mut(path)
                && record.status == TaskStatus::Executing
                && record.mark_failed()
            {
                forced.push(path.clone());
            }
        }
        forced
    }

    /// Append the causes of a round's overall result, unwrapping aggregates.
    pub fn record_build_result(&mut self, result: BuildResult) {
        if let Err(failure) = result {
            self.record_failure(failure);
        }
    }

    pub fn record_failure(&mut self, failure: BuildFailure) {
        self.failures.extend(failure.into_causes());
    }

    pub fn failures(&self) -> &[TaskFailure] {
        &self.failures
    }

    pub fn counts(&self) -> TaskCounts {
        let mut counts = TaskCounts::default();
        for record in self.records.values() {
            match record.status {
                TaskStatus::Queued => counts.queued += 1,
                TaskStatus::Executing => counts.executing += 1,
                TaskStatus::Success => counts.succeeded += 1,
                TaskStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }

    pub fn snapshot(&self) -> Vec<TaskSnapshot> {
        self.iter().map(TaskSnapshot::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(names: &[&str]) -> Vec<TaskPath> {
        names.iter().map(|name| TaskPath::new(*name)).collect()
    }

    fn registry_with(names: &[&str]) -> TaskRegistry {
        let mut registry = TaskRegistry::new();
        for path in paths(names) {
            registry.insert(path);
        }
        registry
    }

    #[test]
    fn insert_is_idempotent() {
        let mut registry = TaskRegistry::new();
        assert!(registry.insert(TaskPath::new("a")));
        assert!(!registry.insert(TaskPath::new("a")));
        assert_eq!(registry.iter().count(), 1);
        assert_eq!(registry.status(&TaskPath::new("a")), Some(TaskStatus::Queued));
    }

    #[test]
    fn iteration_follows_insertion_order() {
        let registry = registry_with(&["z", "a", "m"]);
        let order: Vec<_> = registry.iter().map(|r| r.path.as_str().to_string()).collect();
        assert_eq!(order, vec!["z", "a", "m"]);
    }

    #[test]
    fn claim_queued_takes_everything_once() {
        let mut registry = registry_with(&["a", "b"]);
        assert_eq!(registry.claim_queued(), paths(&["a", "b"]));
        assert!(registry.claim_queued().is_empty());
        assert_eq!(registry.counts().executing, 2);

        registry.insert(TaskPath::new("c"));
        assert_eq!(registry.claim_queued(), paths(&["c"]));
    }

    #[test]
    fn take_undispatched_skips_already_dispatched() {
        let mut registry = registry_with(&["a", "b"]);
        assert_eq!(registry.take_undispatched(), paths(&["a", "b"]));
        assert!(registry.take_undispatched().is_empty());

        registry.insert(TaskPath::new("c"));
        assert_eq!(registry.take_undispatched(), paths(&["c"]));
    }

    #[test]
    fn take_undispatched_ignores_claimed_tasks() {
        let mut registry = registry_with(&["a"]);
        registry.claim_queued();
        assert!(registry.take_undispatched().is_empty());
    }

    #[test]
    fn completion_requires_executing() {
        let mut registry = registry_with(&["a", "b"]);
        assert!(!registry.record_completion(&TaskPath::new("a"), false));
        registry.claim_queued();
        assert!(registry.record_completion(&TaskPath::new("a"), false));
        assert!(registry.record_completion(&TaskPath::new("b"), true));
        // terminal states never move again
        assert!(!registry.record_completion(&TaskPath::new("a"), true));
        assert_eq!(registry.status(&TaskPath::new("a")), Some(TaskStatus::Success));
        assert_eq!(registry.status(&TaskPath::new("b")), Some(TaskStatus::Failed));
        assert!(!registry.record_completion(&TaskPath::new("missing"), false));
    }

    #[test]
    fn force_fail_only_touches_executing() {
        let mut registry = registry_with(&["a", "b"]);
        let batch = registry.claim_queued();
        registry.insert(TaskPath::new("c"));
        registry.record_completion(&TaskPath::new("a"), false);

        let forced = registry.force_fail_executing(&batch);
        assert_eq!(forced, paths(&["b"]));
        assert_eq!(registry.status(&TaskPath::new("a")), Some(TaskStatus::Success));
        assert_eq!(registry.status(&TaskPath::new("b")), Some(TaskStatus::Failed));
        assert_eq!(registry.status(&TaskPath::new("c")), Some(TaskStatus::Queued));
    }

    #[test]
    fn build_result_is_flattened() {
        let mut registry = TaskRegistry::new();
        registry.record_build_result(Ok(()));
        registry.record_build_result(Err(BuildFailure::Single(TaskFailure::new("E1"))));
        registry.record_build_result(Err(BuildFailure::Multiple(vec![
            TaskFailure::new("E2"),
            TaskFailure::new("E3"),
        ])));
        let messages: Vec<_> = registry.failures().iter().map(|f| f.message.as_str()).collect();
        assert_eq!(messages, vec!["E1", "E2", "E3"]);
    }

    #[test]
    fn snapshot_reflects_status() {
        let mut registry = registry_with(&["a", "b"]);
        registry.claim_queued();
        registry.record_completion(&TaskPath::new("a"), false);
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].status, TaskStatus::Success);
        assert!(snapshot[0].finished_at.is_some());
        assert_eq!(snapshot[1].status, TaskStatus::Executing);
        assert!(snapshot[1].finished_at.is_none());
    }
}
