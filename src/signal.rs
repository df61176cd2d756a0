//! A counting barrier shared by independently running tasks.
//!
//! [`CompletionSignal`] lets one thread wait for N dispatched tasks:
//!
//! 1. the dispatcher calls [`add`](CompletionSignal::add) before handing work out,
//! 2. each task calls [`done`](CompletionSignal::done) (or drops a [`DoneGuard`]),
//! 3. the dispatcher blocks in [`wait`](CompletionSignal::wait) with a timeout.
//!
//! The counter is atomic; reaching zero takes the wake lock and broadcasts on a
//! condition variable, so a waiter that observed a non-zero count under the lock
//! cannot miss the wakeup. Timing out does not cancel anything. Tasks that are
//! still running simply finish later, unobserved.
//!
//! ```
//! use s3access::CompletionSignal;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let signal = Arc::new(CompletionSignal::new());
//! signal.add(2);
//! for _ in 0..2 {
//!     let s = Arc::clone(&signal);
//!     std::thread::spawn(move || s.done().expect("registered"));
//! }
//! signal.wait(Duration::from_secs(5))?;
//! assert_eq!(signal.outstanding(), 0);
//! # Ok::<(), s3access::SignalError>(())
//! ```

use crate::error::SignalError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub struct CompletionSignal {
    outstanding: AtomicUsize,
    completions: AtomicUsize,
    lock: Mutex<()>,
    zero: Condvar,
}

impl CompletionSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `n` more outstanding tasks.
    pub fn add(&self, n: usize) {
        self.outstanding.fetch_add(n, Ordering::AcqRel);
    }

    /// Mark one task finished. The call that brings the count to zero wakes every
    /// waiter.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::Underflow`] if nothing is outstanding.
    pub fn done(&self) -> Result<(), SignalError> {
        let previous = self
            .outstanding
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .map_err(|_| SignalError::Underflow)?;
        if previous == 1 {
            let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.completions.fetch_add(1, Ordering::AcqRel);
            self.zero.notify_all();
        }
        Ok(())
    }

    /// Block until the count reaches zero or `timeout` elapses.
    ///
    /// Returns immediately when nothing is outstanding.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::Timeout`] with the count still outstanding.
    pub fn wait(&self, timeout: Duration) -> Result<(), SignalError> {
        let deadline = Instant::now() + timeout;
        let mut guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            let outstanding = self.outstanding.load(Ordering::Acquire);
            if outstanding == 0 {
                return Ok(());
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(SignalError::Timeout {
                    timeout,
                    outstanding,
                });
            }
            guard = self
                .zero
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Tasks registered but not yet done.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// How many times the count has dropped to zero.
    #[must_use]
    pub fn completions(&self) -> usize {
        self.completions.load(Ordering::Acquire)
    }
}

/// Calls [`CompletionSignal::done`] when dropped, including during a panic unwind.
#[must_use = "dropping the guard immediately marks the task done"]
pub struct DoneGuard {
    signal: Arc<CompletionSignal>,
}

impl DoneGuard {
    /// Wrap a slot that was already registered with [`CompletionSignal::add`].
    pub const fn new(signal: Arc<CompletionSignal>) -> Self {
        Self { signal }
    }
}

impl Drop for DoneGuard {
    fn drop(&mut self) {
        // Underflow means the slot was never registered; nothing to release.
        let _ = self.signal.done();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_on_zero_returns_immediately() {
        let s = CompletionSignal::new();
        assert!(s.wait(Duration::ZERO).is_ok());
        assert_eq!(s.completions(), 0);
    }

    #[test]
    fn underflow_is_rejected() {
        let s = CompletionSignal::new();
        assert_eq!(s.done(), Err(SignalError::Underflow));
        s.add(1);
        assert!(s.done().is_ok());
        assert_eq!(s.done(), Err(SignalError::Underflow));
        assert_eq!(s.outstanding(), 0);
    }

    #[test]
    fn timeout_reports_outstanding() {
        let s = CompletionSignal::new();
        s.add(3);
        s.done().unwrap();
        let err = s.wait(Duration::from_millis(20)).unwrap_err();
        assert!(matches!(err, SignalError::Timeout { outstanding: 2, .. }));
    }

    #[test]
    fn guard_releases_on_drop() {
        let s = Arc::new(CompletionSignal::new());
        s.add(1);
        drop(DoneGuard::new(Arc::clone(&s)));
        assert_eq!(s.outstanding(), 0);
        assert_eq!(s.completions(), 1);
    }
}
