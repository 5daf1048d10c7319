use std::sync::{Mutex, PoisonError};

use omni_events::RunId;

use crate::error::EngineError;

/// One active turn per engine.
///
/// The watchdog may [`force_release`](Self::force_release) a lock held by a
/// zombie turn; that turn's own later [`release`](Self::release) is then a
/// no-op.
#[derive(Debug, Default)]
pub struct TurnLock {
    holder: Mutex<Option<RunId>>,
}

impl TurnLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// `EngineError::Busy` carrying the current holder.
    pub fn acquire(&self, run_id: RunId) -> Result<(), EngineError> {
        let mut holder = self.holder.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = *holder {
            return Err(EngineError::Busy(current));
        }
        *holder = Some(run_id);
        Ok(())
    }

    /// Release only if `run_id` still owns the lock.
    pub fn release(&self, run_id: RunId) -> bool {
        let mut holder = self.holder.lock().unwrap_or_else(PoisonError::into_inner);
        if *holder == Some(run_id) {
            *holder = None;
            true
        } else {
            false
        }
    }

    /// Free the lock whoever holds it. Returns the evicted holder.
    pub fn force_release(&self) -> Option<RunId> {
        self.holder
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub fn holder(&self) -> Option<RunId> {
        *self.holder.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_is_busy() {
        let lock = TurnLock::new();
        lock.acquire(1).unwrap();
        assert!(matches!(lock.acquire(2), Err(EngineError::Busy(1))));
        assert!(lock.release(1));
        lock.acquire(2).unwrap();
    }

    #[test]
    fn zombie_release_after_force_is_a_no_op() {
        let lock = TurnLock::new();
        lock.acquire(1).unwrap();
        assert_eq!(lock.force_release(), Some(1));
        lock.acquire(2).unwrap();
        assert!(!lock.release(1));
        assert_eq!(lock.holder(), Some(2));
    }
}
