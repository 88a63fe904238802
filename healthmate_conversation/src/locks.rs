use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use healthmate_core::SessionId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = HashMap<SessionId, Arc<AsyncMutex<()>>>;

/// Per-session turn locks.
///
/// Holding a [`TurnGuard`] excludes other turns on the same session for the
/// whole read → infer → append sequence. Entries are removed once nobody
/// holds or waits on them.
#[derive(Debug, Default)]
pub struct SessionLocks {
    locks: Mutex<LockMap>,
}

impl SessionLocks {
    pub async fn acquire(&self, id: &SessionId) -> TurnGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(id.clone()).or_default())
        };

        let guard = lock.lock_owned().await;
        TurnGuard {
            locks: self,
            id: id.clone(),
            guard: Some(guard),
        }
    }

    /// Number of sessions with a live lock entry.
    #[must_use]
    pub fn active(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

pub struct TurnGuard<'a> {
    locks: &'a SessionLocks,
    id: SessionId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut locks = self
            .locks
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let unused = locks
            .get(&self.id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);
        if unused {
            locks.remove(&self.id);
        }
    }
}
