// src/platform/lock.rs
//
// The toolkit lock: one global, non-reentrant lock serializing every native
// windowing call this crate makes with the calls another toolkit makes on the
// same X display connection.

use log::{trace, warn};
use once_cell::sync::Lazy;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use x11::xlib;

/// A lock with separate acquire and release entry points, matching native
/// lock APIs such as `XLockDisplay`/`XUnlockDisplay`.
///
/// Callers never use these methods directly; they go through
/// [`ToolkitGuard::acquire`], which pairs them.
pub trait ToolkitLock: Send + Sync {
    /// Blocks until the lock is held by the caller.
    fn lock(&self);
    /// Releases a lock previously taken with [`ToolkitLock::lock`].
    fn unlock(&self);
}

/// Holds a [`ToolkitLock`] for the lifetime of the guard.
///
/// `unlock` runs exactly once, when the guard is dropped: on normal return,
/// on `?` early return and during unwinding.
#[must_use = "the toolkit lock is released as soon as the guard is dropped"]
pub struct ToolkitGuard<'a> {
    lock: &'a dyn ToolkitLock,
}

impl<'a> ToolkitGuard<'a> {
    pub fn acquire(lock: &'a dyn ToolkitLock) -> Self {
        lock.lock();
        Self { lock }
    }
}

impl Drop for ToolkitGuard<'_> {
    fn drop(&mut self) {
        self.lock.unlock();
    }
}

static GLOBAL_PROCESS_LOCK: Lazy<Arc<ProcessLock>> = Lazy::new(|| Arc::new(ProcessLock::new()));

/// Process-wide lock built from a flag and a condition variable.
///
/// Not reentrant: a thread that calls `lock` twice without `unlock` blocks
/// forever.
#[derive(Debug, Default)]
pub struct ProcessLock {
    held: Mutex<bool>,
    released: Condvar,
}

impl ProcessLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// The instance shared by every backend in the process.
    pub fn global() -> Arc<ProcessLock> {
        Arc::clone(&GLOBAL_PROCESS_LOCK)
    }

    pub fn is_held(&self) -> bool {
        *self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ToolkitLock for ProcessLock {
    fn lock(&self) {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        while *held {
            held = self
                .released
                .wait(held)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *held = true;
    }

    fn unlock(&self) {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        if !*held {
            warn!("ProcessLock::unlock called while not held.");
        }
        *held = false;
        drop(held);
        self.released.notify_one();
    }
}

/// Serializes with another toolkit through Xlib's own display lock.
///
/// The other toolkit owns the display connection; it must have called
/// `XInitThreads` before opening it. The process lock is taken first so
/// backends in this process also serialize among themselves.
pub struct XDisplayLock {
    display: *mut xlib::Display,
    process: Arc<ProcessLock>,
}

// SAFETY: XLockDisplay/XUnlockDisplay are thread-safe once XInitThreads has
// been called, which is a documented precondition of `XDisplayLock::new`.
unsafe impl Send for XDisplayLock {}
unsafe impl Sync for XDisplayLock {}

impl XDisplayLock {
    /// # Safety
    ///
    /// `display` must be a live connection opened after `XInitThreads`, and it
    /// must outlive the returned lock.
    pub unsafe fn new(display: *mut xlib::Display) -> Self {
        Self {
            display,
            process: ProcessLock::global(),
        }
    }
}

impl ToolkitLock for XDisplayLock {
    fn lock(&self) {
        self.process.lock();
        trace!("XLockDisplay({:p})", self.display);
        // SAFETY: see `XDisplayLock::new`.
        unsafe { xlib::XLockDisplay(self.display) };
    }

    fn unlock(&self) {
        // SAFETY: see `XDisplayLock::new`.
        unsafe { xlib::XUnlockDisplay(self.display) };
        trace!("XUnlockDisplay({:p})", self.display);
        self.process.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn guard_releases_on_drop() {
        let lock = ProcessLock::new();
        {
            let _guard = ToolkitGuard::acquire(&lock);
            assert!(lock.is_held());
        }
        assert!(!lock.is_held());
    }

    #[test]
    fn guard_releases_during_unwind() {
        let lock = ProcessLock::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = ToolkitGuard::acquire(&lock);
            panic!("native call blew up");
        }));
        assert!(result.is_err());
        assert!(!lock.is_held());
    }

    #[test]
    fn process_lock_excludes_other_threads() {
        let lock = Arc::new(ProcessLock::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let lock = Arc::clone(&lock);
                let inside = Arc::clone(&inside);
                let max_inside = Arc::clone(&max_inside);
                thread::spawn(move || {
                    for _ in 0..25 {
                        let _guard = ToolkitGuard::acquire(lock.as_ref());
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_inside.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_micros(50));
                        inside.fetch_sub(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert!(!lock.is_held());
    }

    #[test]
    fn global_lock_is_shared() {
        assert!(Arc::ptr_eq(&ProcessLock::global(), &ProcessLock::global()));
    }
}
