//! Binary thread notification.
//!
//! One thread blocks in [`Notification::acquire`] (or a timed variant);
//! any thread may call [`Notification::release`].  Releases do not
//! accumulate: several releases before an acquire wake it once.
//!
//! `release` is an atomic store plus an unpark and never blocks, so it
//! is usable from the producer side of the worker and from callbacks.

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, Thread};
use std::time::{Duration, Instant};

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

pub struct Notification {
    ready: AtomicBool,
    waiter: Mutex<CriticalSectionRawMutex, RefCell<Option<Thread>>>,
}

impl Notification {
    pub const fn new() -> Self {
        Self {
            ready: AtomicBool::new(false),
            waiter: Mutex::new(RefCell::new(None)),
        }
    }

    /// Wake the waiter, or let the next acquire return immediately.
    pub fn release(&self) {
        self.ready.store(true, Ordering::Release);
        let waiter = self.waiter.lock(|w| w.borrow().clone());
        if let Some(thread) = waiter {
            thread.unpark();
        }
    }

    /// Block until released.
    pub fn acquire(&self) {
        self.register_waiter();
        while !self.try_acquire() {
            thread::park();
        }
    }

    /// Consume a pending release without blocking.
    pub fn try_acquire(&self) -> bool {
        self.ready.swap(false, Ordering::AcqRel)
    }

    /// Block until released or until `timeout` elapses.
    /// Returns `false` on timeout.
    pub fn try_acquire_for(&self, timeout: Duration) -> bool {
        self.register_waiter();
        let deadline = Instant::now() + timeout;
        loop {
            if self.try_acquire() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            thread::park_timeout(deadline - now);
        }
    }

    // The waiter must be visible before the flag is checked, otherwise a
    // release landing in between would unpark nobody.
    fn register_waiter(&self) {
        let current = thread::current();
        self.waiter.lock(|w| *w.borrow_mut() = Some(current));
    }
}

impl Default for Notification {
    fn default() -> Self {
        Self::new()
    }
}
