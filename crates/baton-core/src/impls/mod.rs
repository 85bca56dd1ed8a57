//! Impls - ports の実装（開発用・テスト用）
//!
//! # 含まれる実装
//! - **InMemoryEngine**: 結果を事前に決めておける ExecutionEngine

pub mod inmem_engine;

pub use self::inmem_engine::{InMemoryEngine, ScriptedOutcome};
