//! baton-core
//!
//! Per-build-unit task dispatch for multi-build orchestration.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（TaskPath, TaskStatus / TaskState, TaskRecord, failures）
//! - **queue**: TaskRegistry（records + dispatched set + failure list）
//! - **ports**: ExecutionEngine / BuildListener / TaskGraph
//! - **app**: BuildController（dispatch worker）と Gate
//! - **impls**: InMemoryEngine（開発用・テスト用）
//! - **config / error / observability**

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod queue;

pub use app::BuildController;
pub use config::ControllerConfig;
pub use domain::{BuildFailure, BuildResult, TaskFailure, TaskPath, TaskState, TaskStatus};
pub use error::DispatchError;
pub use observability::{TaskCounts, TaskSnapshot};
pub use ports::{BuildListener, EngineError, ExecutionEngine, TaskGraph};
