//! Counting semaphore.
//!
//! A [`Semaphore`] holds a non-negative number of permits. Acquiring takes
//! one permit, waiting while none is available; releasing returns one and
//! wakes a single waiter. It is built from a [`CondVarMutex`] guarding the
//! permit count and one [`CondVar`] on which acquirers park.
//!
//! Three acquisition flavours are offered:
//!
//! - [`Semaphore::acquire`]: blocks until a permit is available.
//! - [`Semaphore::try_acquire`]: never blocks.
//! - [`Semaphore::acquire_until`]: blocks, but not past a deadline.
//!
//! Parked acquirers can be released without a permit through
//! [`Semaphore::interrupt`]; they return [`Interrupted`].
//!
//! # Examples
//!
//! ```
//! use foundation_buffers::primitives::Semaphore;
//! use std::time::{Duration, Instant};
//!
//! let sema = Semaphore::new(1);
//! assert!(sema.try_acquire());
//! assert!(!sema.try_acquire());
//!
//! let deadline = Instant::now() + Duration::from_millis(5);
//! assert_eq!(sema.acquire_until(deadline), Ok(false));
//!
//! sema.release();
//! assert_eq!(sema.available(), 1);
//! ```

use core::fmt;
use std::time::Instant;

use super::{
    lock_or_recover, remaining_until, wait_or_recover, wait_timeout_or_recover, CondVar,
    CondVarMutex,
};
use crate::errors::Interrupted;

struct Permits {
    available: usize,
    // bumped by `interrupt`; parked acquirers compare against their snapshot
    interrupts: u64,
}

pub struct Semaphore {
    permits: CondVarMutex<Permits>,
    condvar: CondVar,
}

impl Semaphore {
    /// Creates a semaphore holding `permits` permits.
    #[must_use]
    pub const fn new(permits: usize) -> Self {
        Self {
            permits: CondVarMutex::new(Permits {
                available: permits,
                interrupts: 0,
            }),
            condvar: CondVar::new(),
        }
    }

    /// Number of permits that could be acquired right now.
    #[must_use]
    pub fn available(&self) -> usize {
        lock_or_recover(&self.permits).available
    }

    /// Takes one permit, parking the calling thread until one is released.
    ///
    /// # Errors
    ///
    /// Returns [`Interrupted`] if [`Semaphore::interrupt`] is called while the
    /// thread is parked. No permit is taken in that case.
    pub fn acquire(&self) -> Result<(), Interrupted> {
        let mut permits = lock_or_recover(&self.permits);
        let epoch = permits.interrupts;

        while permits.available == 0 {
            permits = wait_or_recover(&self.condvar, permits);
            if permits.interrupts != epoch {
                return Err(Interrupted);
            }
        }

        permits.available -= 1;
        Ok(())
    }

    /// Takes one permit if one is available, without blocking.
    pub fn try_acquire(&self) -> bool {
        let mut permits = lock_or_recover(&self.permits);
        if permits.available == 0 {
            return false;
        }
        permits.available -= 1;
        true
    }

    /// Takes one permit, parking the calling thread no later than `deadline`.
    ///
    /// Returns `Ok(true)` once a permit was taken and `Ok(false)` if the
    /// deadline passed first. A deadline already in the past only succeeds
    /// when a permit is immediately available.
    ///
    /// # Errors
    ///
    /// Returns [`Interrupted`] if [`Semaphore::interrupt`] is called while the
    /// thread is parked.
    pub fn acquire_until(&self, deadline: Instant) -> Result<bool, Interrupted> {
        let mut permits = lock_or_recover(&self.permits);
        let epoch = permits.interrupts;

        loop {
            if permits.interrupts != epoch {
                return Err(Interrupted);
            }

            // permits first: one released while we timed out must still be taken
            if permits.available > 0 {
                permits.available -= 1;
                return Ok(true);
            }

            let Some(remaining) = remaining_until(deadline) else {
                return Ok(false);
            };
            permits = wait_timeout_or_recover(&self.condvar, permits, remaining).0;
        }
    }

    /// Returns one permit and wakes one parked acquirer, if any.
    pub fn release(&self) {
        let mut permits = lock_or_recover(&self.permits);
        permits.available += 1;
        drop(permits);

        self.condvar.notify_one();
    }

    /// Releases every thread currently parked in [`Semaphore::acquire`] or
    /// [`Semaphore::acquire_until`] with [`Interrupted`].
    ///
    /// The permit count is left unchanged and later acquisitions are not
    /// affected.
    pub fn interrupt(&self) {
        let mut permits = lock_or_recover(&self.permits);
        permits.interrupts = permits.interrupts.wrapping_add(1);
        drop(permits);

        tracing::debug!("semaphore interrupted");
        self.condvar.notify_all();
    }
}

impl fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Semaphore")
            .field("available", &self.available())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    /// WHY: Validates basic permit accounting
    /// WHAT: try_acquire succeeds exactly `permits` times
    #[test]
    fn test_try_acquire_exhausts_permits() {
        let sema = Semaphore::new(2);
        assert!(sema.try_acquire());
        assert!(sema.try_acquire());
        assert!(!sema.try_acquire());
        assert_eq!(sema.available(), 0);

        sema.release();
        assert_eq!(sema.available(), 1);
    }

    /// WHY: A zero-permit semaphore is used as the initial "full slots" count
    /// WHAT: acquire blocks until another thread releases
    #[test]
    #[ntest::timeout(5000)]
    fn test_acquire_blocks_until_release() {
        let sema = Arc::new(Semaphore::new(0));
        let acquired = Arc::new(AtomicBool::new(false));

        let sema_clone = Arc::clone(&sema);
        let acquired_clone = Arc::clone(&acquired);
        let waiter = thread::spawn(move || {
            sema_clone.acquire().unwrap();
            acquired_clone.store(true, Ordering::Release);
        });

        thread::sleep(Duration::from_millis(50));
        assert!(!acquired.load(Ordering::Acquire));

        sema.release();
        waiter.join().unwrap();

        assert!(acquired.load(Ordering::Acquire));
        assert_eq!(sema.available(), 0);
    }

    /// WHY: Timed acquisition must honour its deadline
    /// WHAT: acquire_until on an empty semaphore returns false after the deadline
    #[test]
    fn test_acquire_until_times_out() {
        let sema = Semaphore::new(0);
        let start = Instant::now();
        let deadline = start + Duration::from_millis(50);

        assert_eq!(sema.acquire_until(deadline), Ok(false));
        assert!(Instant::now() >= deadline);
        assert_eq!(sema.available(), 0);
    }

    /// WHY: A deadline in the past is an immediate answer, not a wait
    /// WHAT: acquire_until with an elapsed deadline still takes a free permit
    #[test]
    fn test_acquire_until_past_deadline() {
        let sema = Semaphore::new(1);
        let past = Instant::now();

        assert_eq!(sema.acquire_until(past), Ok(true));
        assert_eq!(sema.acquire_until(past), Ok(false));
    }

    /// WHY: A release during a timed wait must hand over the permit
    /// WHAT: acquire_until returns true when released before the deadline
    #[test]
    #[ntest::timeout(5000)]
    fn test_acquire_until_released_in_time() {
        let sema = Arc::new(Semaphore::new(0));

        let sema_clone = Arc::clone(&sema);
        let waiter = thread::spawn(move || {
            sema_clone.acquire_until(Instant::now() + Duration::from_secs(3))
        });

        thread::sleep(Duration::from_millis(20));
        sema.release();

        assert_eq!(waiter.join().unwrap(), Ok(true));
        assert_eq!(sema.available(), 0);
    }

    /// WHY: Interruption must release parked threads without taking permits
    /// WHAT: Both blocking and timed acquirers return Interrupted
    #[test]
    #[ntest::timeout(5000)]
    fn test_interrupt_releases_waiters() {
        let sema = Arc::new(Semaphore::new(0));

        let blocking = {
            let sema = Arc::clone(&sema);
            thread::spawn(move || sema.acquire())
        };
        let timed = {
            let sema = Arc::clone(&sema);
            thread::spawn(move || sema.acquire_until(Instant::now() + Duration::from_secs(30)))
        };

        thread::sleep(Duration::from_millis(50));
        sema.interrupt();

        assert_eq!(blocking.join().unwrap(), Err(Interrupted));
        assert_eq!(timed.join().unwrap(), Err(Interrupted));
        assert_eq!(sema.available(), 0);

        // later acquisitions are unaffected
        sema.release();
        assert_eq!(sema.acquire(), Ok(()));
    }

    /// WHY: Validates Debug implementation
    /// WHAT: Debug formatting reports the permit count
    #[test]
    fn test_debug() {
        let sema = Semaphore::new(3);
        let debug = format!("{sema:?}");
        assert!(debug.contains("Semaphore"));
        assert!(debug.contains("available: 3"));
    }
}
