//! Synchronization primitives for repocheck.

use std::sync::{Arc, Condvar, Mutex, PoisonError};

/// A counting semaphore bounding how many git processes run at once.
///
/// Repositories are reconciled on Rayon's pool and every reconciliation spawns
/// several git commands, so without a bound a large tree of repositories can
/// exhaust file descriptors. Permits are released by [`Permit`] on drop.
#[derive(Clone)]
pub struct Semaphore {
    state: Arc<(Mutex<usize>, Condvar)>,
}

/// RAII permit returned by [`Semaphore::acquire`].
pub struct Permit {
    state: Arc<(Mutex<usize>, Condvar)>,
}

impl Semaphore {
    pub fn new(permits: usize) -> Self {
        Self {
            state: Arc::new((Mutex::new(permits.max(1)), Condvar::new())),
        }
    }

    /// Block until a permit is available and take it.
    pub fn acquire(&self) -> Permit {
        let (lock, cvar) = &*self.state;
        // The counter stays consistent even if a holder panicked.
        let mut available = lock.lock().unwrap_or_else(PoisonError::into_inner);
        while *available == 0 {
            available = cvar
                .wait(available)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *available -= 1;

        Permit {
            state: Arc::clone(&self.state),
        }
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        let (lock, cvar) = &*self.state;
        let mut available = lock.lock().unwrap_or_else(PoisonError::into_inner);
        *available += 1;
        cvar.notify_one();
    }
}
