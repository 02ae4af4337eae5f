// src/testing/counting_lock.rs

use crate::platform::lock::ToolkitLock;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct LockState {
    held: bool,
    locks: usize,
    unlocks: usize,
}

/// A real mutual-exclusion lock that also counts how often it was taken and
/// released.
#[derive(Debug, Default)]
pub struct CountingLock {
    state: Mutex<LockState>,
    released: Condvar,
}

impl CountingLock {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, LockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_held(&self) -> bool {
        self.state().held
    }

    pub fn locks(&self) -> usize {
        self.state().locks
    }

    pub fn unlocks(&self) -> usize {
        self.state().unlocks
    }
}

impl ToolkitLock for CountingLock {
    fn lock(&self) {
        let mut state = self.state();
        while state.held {
            state = self
                .released
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.held = true;
        state.locks += 1;
    }

    fn unlock(&self) {
        let mut state = self.state();
        state.held = false;
        state.unlocks += 1;
        drop(state);
        self.released.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::lock::ToolkitGuard;

    #[test]
    fn counts_each_acquire_and_release() {
        let lock = CountingLock::new();
        for _ in 0..3 {
            let _guard = ToolkitGuard::acquire(&lock);
            assert!(lock.is_held());
        }
        assert_eq!(lock.locks(), 3);
        assert_eq!(lock.unlocks(), 3);
        assert!(!lock.is_held());
    }
}
