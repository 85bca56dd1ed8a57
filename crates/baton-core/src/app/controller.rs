//! BuildController - build unit ごとの task dispatch
//!
//! # フロー
//! 1. 他の build が `queue_for_execution` で task を登録（Queued）
//! 2. worker thread が Queued を全部 claim（Executing）して engine に渡す
//! 3. engine の callback で Success / Failed に遷移、待機中の thread を起こす
//! 4. `stop_task_execution` で worker を止め、失敗一覧を回収

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info, warn};

use super::gate::{FireOnDrop, Gate};
use super::listener::BatchListener;
use super::{lock, wait};
use crate::config::ControllerConfig;
use crate::domain::{BuildFailure, BuildResult, TaskFailure, TaskPath, TaskState};
use crate::error::DispatchError;
use crate::observability::{TaskCounts, TaskSnapshot};
use crate::ports::{EngineError, ExecutionEngine};
use crate::queue::TaskRegistry;

/// State shared between the public handle and the dispatch worker.
pub(crate) struct Shared {
    pub(crate) build_name: String,
    engine: Arc<dyn ExecutionEngine>,

    registry: Mutex<TaskRegistry>,
    task_queued: Condvar,
    task_completed: Condvar,

    started: Gate,
    stop_requested: AtomicBool,
    stopped: Gate,
}

/// Dispatches tasks requested by other builds into one build unit.
///
/// Owns a dedicated worker thread for its whole lifetime. Every method may be
/// called from any thread.
///
/// # 使用例
/// ```ignore
/// let controller = BuildController::spawn(ControllerConfig::new("lib"), engine)?;
/// controller.queue_for_execution(":lib:jar");
/// controller.populate_task_graph();
/// controller.start_task_execution();
/// controller.await_completion(&TaskPath::new(":lib:jar"))?;
///
/// let mut failures = Vec::new();
/// controller.stop_task_execution(&mut failures);
/// ```
pub struct BuildController {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl BuildController {
    /// Create the controller and its (not yet started) worker thread.
    pub fn spawn(
        config: ControllerConfig,
        engine: Arc<dyn ExecutionEngine>,
    ) -> Result<Self, DispatchError> {
        let shared = Arc::new(Shared {
            build_name: config.build_name.clone(),
            engine,
            registry: Mutex::new(TaskRegistry::new()),
            task_queued: Condvar::new(),
            task_completed: Condvar::new(),
            started: Gate::new(),
            stop_requested: AtomicBool::new(false),
            stopped: Gate::new(),
        });

        let worker = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name(config.thread_name())
                .spawn(move || shared.run())
                .map_err(|source| DispatchError::WorkerSpawn {
                    build: config.build_name.clone(),
                    source,
                })?
        };

        Ok(Self {
            shared,
            worker: Mutex::new(Some(worker)),
        })
    }

    pub fn build_name(&self) -> &str {
        &self.shared.build_name
    }

    /// Register a task for execution. Re-queueing a known path is a no-op.
    pub fn queue_for_execution(&self, path: impl Into<TaskPath>) {
        let path = path.into();
        let mut registry = self.shared.lock_registry();
        if registry.insert(path.clone()) {
            debug!(build = %self.shared.build_name, task = %path, "task queued");
            self.shared.task_queued.notify_all();
        }
    }

    /// Current state of a queued task.
    ///
    /// Asking about a path that was never queued is a caller bug and yields
    /// [`DispatchError::UnknownTask`].
    pub fn task_state(&self, path: &TaskPath) -> Result<TaskState, DispatchError> {
        let registry = self.shared.lock_registry();
        self.shared.state_of(&registry, path)
    }

    /// Block until the task is Success or Failed, and return that state.
    pub fn await_completion(&self, path: &TaskPath) -> Result<TaskState, DispatchError> {
        let mut registry = self.shared.lock_registry();
        loop {
            let state = self.shared.state_of(&registry, path)?;
            if state.is_done() {
                return Ok(state);
            }
            registry = wait(&self.shared.task_completed, registry, "registry");
        }
    }

    /// Add queued tasks not yet known to the engine to its work graph.
    ///
    /// Returns true if anything was added by this call.
    pub fn populate_task_graph(&self) -> bool {
        let fresh = self.shared.lock_registry().take_undispatched();
        if fresh.is_empty() {
            return false;
        }
        debug!(build = %self.shared.build_name, tasks = ?fresh, "adding tasks to graph");
        self.shared.engine.add_tasks_to_graph(&fresh);
        true
    }

    /// Release the worker. Later calls do nothing.
    pub fn start_task_execution(&self) {
        if self.shared.started.fire() {
            info!(build = %self.shared.build_name, "task execution started");
        }
    }

    /// Stop the worker, wait for it to exit and append every recorded failure
    /// to `failures`.
    ///
    /// A batch already handed to the engine runs to completion first. Tasks
    /// still Queued are left as they are. Meant to be called once: a second
    /// call appends the same failures again.
    pub fn stop_task_execution<C>(&self, failures: &mut C)
    where
        C: Extend<TaskFailure>,
    {
        self.shared.request_stop();
        self.shared.stopped.wait();

        let worker = lock(&self.worker, "worker handle").take();
        if let Some(worker) = worker
            && let Err(payload) = worker.join()
        {
            let message = panic_message(payload.as_ref());
            error!(build = %self.shared.build_name, %message, "dispatch worker panicked");
            self.shared
                .lock_registry()
                .record_failure(BuildFailure::Single(TaskFailure::new(format!(
                    "dispatch worker for build '{}' panicked: {message}",
                    self.shared.build_name
                ))));
        }

        let registry = self.shared.lock_registry();
        info!(
            build = %self.shared.build_name,
            failures = registry.failures().len(),
            "task execution stopped"
        );
        failures.extend(registry.failures().iter().cloned());
    }

    pub fn counts(&self) -> TaskCounts {
        self.shared.lock_registry().counts()
    }

    /// Every task ever queued, in queue order.
    pub fn snapshot(&self) -> Vec<TaskSnapshot> {
        self.shared.lock_registry().snapshot()
    }

    /// [`await_completion`](Self::await_completion) for async callers.
    pub async fn await_completion_async(
        self: &Arc<Self>,
        path: TaskPath,
    ) -> Result<TaskState, DispatchError> {
        let controller = Arc::clone(self);
        tokio::task::spawn_blocking(move || controller.await_completion(&path))
            .await
            .map_err(|e| DispatchError::WaitAborted(e.to_string()))?
    }

    /// [`stop_task_execution`](Self::stop_task_execution) for async callers;
    /// returns the drained failures.
    pub async fn stop_task_execution_async(
        self: &Arc<Self>,
    ) -> Result<Vec<TaskFailure>, DispatchError> {
        let controller = Arc::clone(self);
        tokio::task::spawn_blocking(move || {
            let mut failures = Vec::new();
            controller.stop_task_execution(&mut failures);
            failures
        })
        .await
        .map_err(|e| DispatchError::WaitAborted(e.to_string()))
    }
}

impl Drop for BuildController {
    fn drop(&mut self) {
        // stop が呼ばれずに drop された場合でも worker を待機から解放する
        self.shared.request_stop();
    }
}

impl Shared {
    fn lock_registry(&self) -> std::sync::MutexGuard<'_, TaskRegistry> {
        lock(&self.registry, "registry")
    }

    fn state_of(&self, registry: &TaskRegistry, path: &TaskPath) -> Result<TaskState, DispatchError> {
        registry
            .status(path)
            .map(|status| status.view())
            .ok_or_else(|| DispatchError::UnknownTask {
                task: path.clone(),
                build: self.build_name.clone(),
            })
    }

    fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
        self.started.fire();

        // 待機中の worker は lock 下で stop_requested を見直す。
        // Drop からも呼ばれるので poison でも panic しない。
        let _registry = self.registry.lock();
        self.task_queued.notify_all();
    }

    /// Dispatch loop, run on the worker thread.
    fn run(self: Arc<Self>) {
        let _stopped = FireOnDrop(&self.stopped);

        self.started.wait();
        while !self.stop_requested.load(Ordering::SeqCst) {
            let batch = self.claim_queued_tasks();
            self.execute_batch(&batch);
        }
        debug!(build = %self.build_name, "dispatch worker exiting");
    }

    /// Wait for queued tasks and claim all of them. Empty only when stopping.
    fn claim_queued_tasks(&self) -> Vec<TaskPath> {
        let mut registry = self.lock_registry();
        while !self.stop_requested.load(Ordering::SeqCst) {
            let batch = registry.claim_queued();
            if !batch.is_empty() {
                debug!(build = %self.build_name, tasks = batch.len(), "claimed batch");
                return batch;
            }
            registry = wait(&self.task_queued, registry, "registry");
        }
        Vec::new()
    }

    fn execute_batch(&self, batch: &[TaskPath]) {
        if batch.is_empty() {
            return;
        }
        info!("Executing {} tasks {:?}", self.build_name, batch);

        let _abandon = FailOnUnwind { shared: self, batch };
        let listener = BatchListener::new(self, batch);
        let fault = match self.engine.execute(batch, &listener) {
            Ok(()) => None,
            Err(EngineError::Reported) => {
                // failures were recorded through build_finished
                debug!(build = %self.build_name, "batch failed; already recorded");
                None
            }
            Err(err @ EngineError::Internal(_)) => {
                error!(build = %self.build_name, error = %err, "execution engine fault");
                Some(TaskFailure::from_error(&err))
            }
        };

        if !listener.is_finished() {
            warn!(build = %self.build_name, "engine returned without finishing the build");
        }
        if !listener.is_finished() || fault.is_some() {
            self.tasks_done(batch, fault.map_or(Ok(()), |f| Err(BuildFailure::Single(f))));
        }
    }

    pub(crate) fn task_completed(&self, path: &TaskPath, failure: Option<&TaskFailure>) {
        let mut registry = self.lock_registry();
        if registry.record_completion(path, failure.is_some()) {
            debug!(build = %self.build_name, task = %path, failed = failure.is_some(), "task finished");
        }
        self.task_completed.notify_all();
    }

    pub(crate) fn tasks_done(&self, batch: &[TaskPath], result: BuildResult) {
        let mut registry = self.lock_registry();
        let forced = registry.force_fail_executing(batch);
        if !forced.is_empty() {
            warn!(
                build = %self.build_name,
                tasks = ?forced,
                "no completion reported; marking tasks failed"
            );
        }
        registry.record_build_result(result);
        self.task_completed.notify_all();
    }

    /// Fail whatever is still Executing after the engine panicked mid-batch.
    ///
    /// Runs during unwinding, so a poisoned lock is taken as is instead of
    /// panicking again. The panic itself is recorded by `stop_task_execution`.
    fn abandon_batch(&self, batch: &[TaskPath]) {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        let forced = registry.force_fail_executing(batch);
        error!(build = %self.build_name, tasks = ?forced, "engine panicked; marking tasks failed");
        self.task_completed.notify_all();
    }
}

/// Releases waiters on a batch whose engine call unwinds.
struct FailOnUnwind<'a> {
    shared: &'a Shared,
    batch: &'a [TaskPath],
}

impl Drop for FailOnUnwind<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.shared.abandon_batch(self.batch);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
