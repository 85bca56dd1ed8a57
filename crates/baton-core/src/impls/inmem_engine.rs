//! InMemoryEngine - 開発用・テスト用の execution engine
//!
//! 実際に task を動かす代わりに、登録時に決めた結果を listener に報告する。
//!
//! # 動作
//! 1. graph = (add_tasks_to_graph で追加された pending ∪ batch) + 依存、定義済みのものだけ
//! 2. `graph_populated` が失敗したら単一の failure で `build_finished`
//! 3. 依存を先に、graph 順に結果を報告
//! 4. 失敗があれば aggregate failure で `build_finished`、`EngineError::Reported` を返す

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::app::lock;
use crate::domain::{BuildFailure, TaskFailure, TaskPath};
use crate::ports::{BuildListener, EngineError, ExecutionEngine, TaskGraph};

/// What the engine reports for a defined task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedOutcome {
    Success,
    Failure(String),
    /// Runs but never gets a per-task report.
    Silent,
}

#[derive(Debug, Clone)]
struct TaskDefinition {
    outcome: ScriptedOutcome,
    dependencies: Vec<TaskPath>,
}

#[derive(Debug, Default)]
struct EngineState {
    pending: Vec<TaskPath>,
    graph_additions: Vec<Vec<TaskPath>>,
    executed: Vec<Vec<TaskPath>>,
}

/// Scripted [`ExecutionEngine`].
///
/// # 使用例
/// ```ignore
/// let engine = InMemoryEngine::new()
///     .with_success(":lib:compile")
///     .with_failure(":lib:test", "2 tests failed")
///     .with_dependency(":lib:test", ":lib:compile");
/// ```
#[derive(Debug, Default)]
pub struct InMemoryEngine {
    tasks: HashMap<TaskPath, TaskDefinition>,
    fault: Option<String>,
    state: Mutex<EngineState>,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_task(mut self, path: impl Into<TaskPath>, outcome: ScriptedOutcome) -> Self {
        self.tasks.insert(
            path.into(),
            TaskDefinition {
                outcome,
                dependencies: Vec::new(),
            },
        );
        self
    }

    pub fn with_success(self, path: impl Into<TaskPath>) -> Self {
        self.with_task(path, ScriptedOutcome::Success)
    }

    pub fn with_failure(self, path: impl Into<TaskPath>, message: impl Into<String>) -> Self {
        self.with_task(path, ScriptedOutcome::Failure(message.into()))
    }

    pub fn with_silent(self, path: impl Into<TaskPath>) -> Self {
        self.with_task(path, ScriptedOutcome::Silent)
    }

    /// `task` pulls `dependency` into every graph it is part of.
    ///
    /// Only has an effect once `task` is defined.
    pub fn with_dependency(mut self, task: impl Into<TaskPath>, dependency: impl Into<TaskPath>) -> Self {
        let task: TaskPath = task.into();
        if let Some(definition) = self.tasks.get_mut(&task) {
            definition.dependencies.push(dependency.into());
        }
        self
    }

    /// Every `execute` fails with [`EngineError::Internal`] before touching the listener.
    pub fn with_fault(mut self, message: impl Into<String>) -> Self {
        self.fault = Some(message.into());
        self
    }

    /// Batches passed to `execute`, in call order.
    pub fn executed_batches(&self) -> Vec<Vec<TaskPath>> {
        lock(&self.state, "engine").executed.clone()
    }

    /// Arguments of each `add_tasks_to_graph` call, in call order.
    pub fn graph_additions(&self) -> Vec<Vec<TaskPath>> {
        lock(&self.state, "engine").graph_additions.clone()
    }

    /// Expand `requested` with dependencies (dependencies first), keeping
    /// only defined tasks.
    fn resolve(&self, requested: &[TaskPath]) -> Vec<TaskPath> {
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        for path in requested {
            self.visit(path, &mut visited, &mut order);
        }
        order
    }

    fn visit(&self, path: &TaskPath, visited: &mut HashSet<TaskPath>, order: &mut Vec<TaskPath>) {
        if !visited.insert(path.clone()) {
            return;
        }
        let Some(definition) = self.tasks.get(path) else {
            return;
        };
        for dependency in &definition.dependencies {
            self.visit(dependency, visited, order);
        }
        order.push(path.clone());
    }
}

struct GraphView<'a>(HashSet<&'a TaskPath>);

impl TaskGraph for GraphView<'_> {
    fn has_task(&self, path: &TaskPath) -> bool {
        self.0.contains(path)
    }
}

impl ExecutionEngine for InMemoryEngine {
    fn add_tasks_to_graph(&self, paths: &[TaskPath]) {
        let mut state = lock(&self.state, "engine");
        state.graph_additions.push(paths.to_vec());
        for path in paths {
            if !state.pending.contains(path) {
                state.pending.push(path.clone());
            }
        }
    }

    fn execute(&self, batch: &[TaskPath], listener: &dyn BuildListener) -> Result<(), EngineError> {
        let requested = {
            let mut state = lock(&self.state, "engine");
            state.executed.push(batch.to_vec());
            let mut requested = std::mem::take(&mut state.pending);
            for path in batch {
                if !requested.contains(path) {
                    requested.push(path.clone());
                }
            }
            requested
        };

        if let Some(message) = &self.fault {
            return Err(EngineError::Internal(message.clone()));
        }

        let graph = self.resolve(&requested);
        if let Err(err) = listener.graph_populated(&GraphView(graph.iter().collect())) {
            listener.build_finished(Err(BuildFailure::Single(TaskFailure::from_error(&err))));
            return Err(EngineError::Reported);
        }

        let mut failures = Vec::new();
        for path in &graph {
            let Some(definition) = self.tasks.get(path) else {
                continue;
            };
            match &definition.outcome {
                ScriptedOutcome::Success => listener.task_finished(path, None),
                ScriptedOutcome::Failure(message) => {
                    let failure = TaskFailure::for_task(path.clone(), message.clone());
                    failures.push(failure.clone());
                    listener.task_finished(path, Some(failure));
                }
                ScriptedOutcome::Silent => {}
            }
        }

        if failures.is_empty() {
            listener.build_finished(Ok(()));
            Ok(())
        } else {
            listener.build_finished(Err(BuildFailure::Multiple(failures)));
            Err(EngineError::Reported)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BuildResult;
    use crate::error::DispatchError;

    /// Records every callback instead of touching a registry.
    #[derive(Default)]
    struct RecordingListener {
        reject: Option<TaskPath>,
        finished: Mutex<Vec<(TaskPath, bool)>>,
        results: Mutex<Vec<BuildResult>>,
    }

    impl BuildListener for RecordingListener {
        fn graph_populated(&self, graph: &dyn TaskGraph) -> Result<(), DispatchError> {
            match &self.reject {
                Some(task) if !graph.has_task(task) => Err(DispatchError::TaskNotInGraph {
                    task: task.clone(),
                    build: "test".to_string(),
                }),
                _ => Ok(()),
            }
        }

        fn task_finished(&self, path: &TaskPath, failure: Option<TaskFailure>) {
            self.finished.lock().unwrap().push((path.clone(), failure.is_some()));
        }

        fn build_finished(&self, result: BuildResult) {
            self.results.lock().unwrap().push(result);
        }
    }

    fn batch(names: &[&str]) -> Vec<TaskPath> {
        names.iter().map(|name| TaskPath::new(*name)).collect()
    }

    #[test]
    fn reports_every_task_and_aggregates_failures() {
        let engine = InMemoryEngine::new()
            .with_success("compile")
            .with_failure("test", "E1");
        let listener = RecordingListener::default();

        let result = engine.execute(&batch(&["compile", "test"]), &listener);

        assert!(matches!(result, Err(EngineError::Reported)));
        assert_eq!(
            *listener.finished.lock().unwrap(),
            vec![(TaskPath::new("compile"), false), (TaskPath::new("test"), true)]
        );
        let results = listener.results.lock().unwrap();
        assert_eq!(results.len(), 1);
        assert!(matches!(
            &results[0],
            Err(BuildFailure::Multiple(causes)) if causes.len() == 1 && causes[0].message == "E1"
        ));
    }

    #[test]
    fn dependencies_run_first() {
        let engine = InMemoryEngine::new()
            .with_success("compile")
            .with_success("test")
            .with_dependency("test", "compile");
        let listener = RecordingListener::default();

        engine.execute(&batch(&["test"]), &listener).unwrap();

        let finished: Vec<_> = listener.finished.lock().unwrap().iter().map(|(p, _)| p.clone()).collect();
        assert_eq!(finished, batch(&["compile", "test"]));
        assert!(matches!(listener.results.lock().unwrap()[0], Ok(())));
    }

    #[test]
    fn rejected_graph_is_reported_as_single_failure() {
        let engine = InMemoryEngine::new().with_success("compile");
        let listener = RecordingListener {
            reject: Some(TaskPath::new("nope")),
            ..Default::default()
        };

        let result = engine.execute(&batch(&["compile", "nope"]), &listener);

        assert!(matches!(result, Err(EngineError::Reported)));
        assert!(listener.finished.lock().unwrap().is_empty());
        assert!(matches!(
            &listener.results.lock().unwrap()[0],
            Err(BuildFailure::Single(cause)) if cause.message.contains("nope")
        ));
    }

    #[test]
    fn pending_graph_additions_join_the_next_round() {
        let engine = InMemoryEngine::new().with_success("a").with_success("b");
        engine.add_tasks_to_graph(&batch(&["a"]));
        let listener = RecordingListener::default();

        engine.execute(&batch(&["b"]), &listener).unwrap();

        assert_eq!(listener.finished.lock().unwrap().len(), 2);
        assert_eq!(engine.graph_additions(), vec![batch(&["a"])]);
        assert_eq!(engine.executed_batches(), vec![batch(&["b"])]);
    }

    #[test]
    fn fault_skips_the_listener() {
        let engine = InMemoryEngine::new().with_success("a").with_fault("disk full");
        let listener = RecordingListener::default();

        let result = engine.execute(&batch(&["a"]), &listener);

        assert!(matches!(result, Err(EngineError::Internal(msg)) if msg == "disk full"));
        assert!(listener.results.lock().unwrap().is_empty());
    }
}
