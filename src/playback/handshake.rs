use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Counting permit shared between the driver thread and the step handler
///
/// The driver takes one permit per tick and the step handler gives one back
/// once every consumer has seen the tick, so a new tick can never start while
/// the previous one is still being consumed.
#[derive(Debug, Default)]
pub struct Handshake {
    permits: Mutex<usize>,
    available: Condvar,
}

impl Handshake {
    /// Create a handshake with no permits
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `n` permits. Never blocks.
    pub fn release(&self, n: usize) {
        if n == 0 {
            return;
        }
        let mut permits = self.lock();
        *permits += n;
        self.available.notify_all();
    }

    /// Block until `n` permits are available, then take them.
    pub fn acquire(&self, n: usize) {
        let mut permits = self.lock();
        while *permits < n {
            permits = self
                .available
                .wait(permits)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *permits -= n;
    }

    /// Take `n` permits if they are available right now
    pub fn try_acquire(&self, n: usize) -> bool {
        let mut permits = self.lock();
        if *permits >= n {
            *permits -= n;
            true
        } else {
            false
        }
    }

    /// Number of permits currently held
    pub fn available(&self) -> usize {
        *self.lock()
    }

    // The counter is always left consistent, so a poisoned lock is still usable
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.permits.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
