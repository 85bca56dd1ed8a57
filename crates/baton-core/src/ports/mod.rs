//! Ports - seams to the systems the controller depends on.
//!
//! The only external collaborator is the build unit's execution engine.

pub mod engine;

pub use self::engine::{BuildListener, EngineError, ExecutionEngine, TaskGraph};
