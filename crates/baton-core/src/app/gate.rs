//! Gate - one-shot シグナル
//!
//! Mutex<bool> + Condvar による latch。一度 fire したら戻らない。

use std::sync::{Condvar, Mutex};

use super::{lock, wait};

/// One-shot broadcast signal.
///
/// `wait` blocks until the gate fires; firing twice is a no-op; every waiter,
/// present or future, observes the fired state.
#[derive(Debug, Default)]
pub struct Gate {
    fired: Mutex<bool>,
    condvar: Condvar,
}

impl Gate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the gate. Returns true only for the call that actually fired it.
    pub fn fire(&self) -> bool {
        let mut fired = lock(&self.fired, "gate");
        if *fired {
            return false;
        }
        *fired = true;
        self.condvar.notify_all();
        true
    }

    pub fn is_fired(&self) -> bool {
        *lock(&self.fired, "gate")
    }

    /// Block until the gate has fired.
    pub fn wait(&self) {
        let mut fired = lock(&self.fired, "gate");
        while !*fired {
            fired = wait(&self.condvar, fired, "gate");
        }
    }
}

/// Fires the wrapped gate when dropped, including during unwinding.
pub(crate) struct FireOnDrop<'a>(pub(crate) &'a Gate);

impl Drop for FireOnDrop<'_> {
    fn drop(&mut self) {
        self.0.fire();
    }
}
