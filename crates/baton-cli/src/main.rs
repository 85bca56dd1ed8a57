use std::process::ExitCode;
use std::sync::Arc;

use baton_core::impls::InMemoryEngine;
use baton_core::{BuildController, ControllerConfig, ExecutionEngine, TaskFailure, TaskPath};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Dispatch tasks into a simulated build unit and report their outcome.
#[derive(Debug, Parser)]
#[command(name = "baton", version)]
struct Args {
    /// Name of the build unit
    #[arg(long, default_value = "included")]
    build: String,

    /// Task that fails when executed (repeatable)
    #[arg(long = "fail", value_name = "TASK")]
    failing: Vec<String>,

    /// Task queued but absent from the unit's graph (repeatable)
    #[arg(long = "missing", value_name = "TASK")]
    missing: Vec<String>,

    /// Print the final registry snapshot as JSON
    #[arg(long)]
    json: bool,

    /// Task paths to queue
    #[arg(required = true)]
    tasks: Vec<String>,
}

impl Args {
    fn engine(&self) -> InMemoryEngine {
        self.tasks
            .iter()
            .filter(|task| !self.missing.contains(task))
            .fold(InMemoryEngine::new(), |engine, task| {
                if self.failing.contains(task) {
                    engine.with_failure(task.as_str(), format!("task {task} failed"))
                } else {
                    engine.with_success(task.as_str())
                }
            })
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(failures) if failures.is_empty() => ExitCode::SUCCESS,
        Ok(failures) => {
            eprintln!("{} failure(s) in build '{}':", failures.len(), args.build);
            for failure in &failures {
                eprintln!("  - {failure}");
            }
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<Vec<TaskFailure>, Box<dyn std::error::Error>> {
    let engine: Arc<dyn ExecutionEngine> = Arc::new(args.engine());
    let controller = BuildController::spawn(ControllerConfig::new(args.build.clone()), engine)?;

    for task in &args.tasks {
        controller.queue_for_execution(task.as_str());
    }
    controller.populate_task_graph();
    controller.start_task_execution();

    for task in &args.tasks {
        let state = controller.await_completion(&TaskPath::new(task.as_str()))?;
        info!(task = %task, ?state, "task finished");
    }

    let mut failures = Vec::new();
    controller.stop_task_execution(&mut failures);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&controller.snapshot())?);
    } else {
        for snapshot in controller.snapshot() {
            println!("{:<40} {:?}", snapshot.path.as_str(), snapshot.status);
        }
    }
    Ok(failures)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_skips_missing_tasks() {
        let args = Args::parse_from(["baton", "--missing", "b", "--fail", "c", "a", "b", "c"]);
        let engine: Arc<dyn ExecutionEngine> = Arc::new(args.engine());
        let controller = BuildController::spawn(ControllerConfig::new("t"), engine).unwrap();
        for task in &args.tasks {
            controller.queue_for_execution(task.as_str());
        }
        controller.start_task_execution();
        controller.await_completion(&TaskPath::new("c")).unwrap();

        let mut failures = Vec::new();
        controller.stop_task_execution(&mut failures);
        // the missing task fails the whole round before anything runs
        assert_eq!(failures.len(), 1);
        assert!(failures[0].message.contains("'b' not found"));
    }

    #[test]
    fn requires_at_least_one_task() {
        assert!(Args::try_parse_from(["baton"]).is_err());
    }
}
