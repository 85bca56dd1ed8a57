//! App - controller と dispatch worker
//!
//! # 主要コンポーネント
//! - **BuildController**: 公開 API（queue / await / populate / start / stop）
//! - **Gate**: start / stop 用の one-shot シグナル
//! - **BatchListener**: engine からの callback を registry に反映

pub mod controller;
pub mod gate;
mod listener;

pub use self::controller::BuildController;
pub use self::gate::Gate;

use std::sync::{Condvar, Mutex, MutexGuard};

// A poisoned lock means a thread panicked mid-transition; the guarded state
// can no longer be trusted, so the panic is propagated.
pub(crate) fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(_) => panic!("{what} lock poisoned"),
    }
}

pub(crate) fn wait<'a, T>(condvar: &Condvar, guard: MutexGuard<'a, T>, what: &str) -> MutexGuard<'a, T> {
    match condvar.wait(guard) {
        Ok(guard) => guard,
        Err(_) => panic!("{what} lock poisoned while waiting"),
    }
}
