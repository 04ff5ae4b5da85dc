//! Synchronization primitives the buffers are built from.
//!
//! - [`CondVar`] / [`CondVarMutex`]: the standard library's condition variable
//!   and mutex, re-exported under the names used across the workspace.
//! - [`Semaphore`]: a counting semaphore with blocking, non-blocking and
//!   deadline-bounded acquisition.
//!
//! # Examples
//!
//! ```
//! use foundation_buffers::primitives::{lock_or_recover, CondVar, CondVarMutex};
//!
//! let mutex = CondVarMutex::new(true);
//! let condvar = CondVar::new();
//!
//! let mut ready = lock_or_recover(&mutex);
//! while !*ready {
//!     ready = condvar.wait(ready).unwrap_or_else(|e| e.into_inner());
//! }
//! ```

pub mod semaphore;

pub use semaphore::Semaphore;

pub use std::sync::{
    Condvar as CondVar, Mutex as CondVarMutex, MutexGuard as CondVarMutexGuard, WaitTimeoutResult,
};

use std::sync::PoisonError;
use std::time::{Duration, Instant};

/// Acquires `mutex`, recovering the guard if a previous holder panicked.
///
/// Every critical section guarded by the buffers either completes its
/// mutation or performs none, so a poisoned lock still protects consistent
/// state.
#[inline]
pub fn lock_or_recover<T>(mutex: &CondVarMutex<T>) -> CondVarMutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        tracing::warn!("recovering poisoned buffer lock");
        poisoned.into_inner()
    })
}

/// Parks on `condvar` until notified, recovering from poisoning.
#[inline]
pub fn wait_or_recover<'a, T>(
    condvar: &CondVar,
    guard: CondVarMutexGuard<'a, T>,
) -> CondVarMutexGuard<'a, T> {
    condvar.wait(guard).unwrap_or_else(PoisonError::into_inner)
}

/// Parks on `condvar` for at most `timeout`, recovering from poisoning.
#[inline]
pub fn wait_timeout_or_recover<'a, T>(
    condvar: &CondVar,
    guard: CondVarMutexGuard<'a, T>,
    timeout: Duration,
) -> (CondVarMutexGuard<'a, T>, WaitTimeoutResult) {
    condvar
        .wait_timeout(guard, timeout)
        .unwrap_or_else(PoisonError::into_inner)
}

/// Time left until `deadline`, or `None` once it has been reached.
#[inline]
#[must_use]
pub fn remaining_until(deadline: Instant) -> Option<Duration> {
    let remaining = deadline.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        None
    } else {
        Some(remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    /// WHY: Validates deadline arithmetic used by every timed operation
    /// WHAT: A past deadline has no remaining time, a future one does
    #[test]
    fn test_remaining_until() {
        assert!(remaining_until(Instant::now()).is_none());

        let remaining = remaining_until(Instant::now() + Duration::from_secs(5));
        assert!(remaining.is_some_and(|d| d > Duration::from_secs(4)));
    }

    /// WHY: A panicked holder must not wedge the buffer
    /// WHAT: `lock_or_recover` returns the guard of a poisoned mutex
    #[test]
    fn test_lock_or_recover_poisoned() {
        let mutex = Arc::new(CondVarMutex::new(5));

        let mutex_clone = Arc::clone(&mutex);
        let _ = thread::spawn(move || {
            let _guard = mutex_clone.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert!(mutex.is_poisoned());
        assert_eq!(*lock_or_recover(&mutex), 5);
    }

    /// WHY: Timed waits must give up when nobody notifies
    /// WHAT: `wait_timeout_or_recover` reports a timeout
    #[test]
    fn test_wait_timeout_or_recover_times_out() {
        let mutex = CondVarMutex::new(());
        let condvar = CondVar::new();

        let guard = lock_or_recover(&mutex);
        let (_guard, result) =
            wait_timeout_or_recover(&condvar, guard, Duration::from_millis(10));
        assert!(result.timed_out());
    }
}
