use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One write lock per game session, created on demand and dropped once no
/// operation holds or waits for it. Sessions never contend with each other.
#[derive(Clone, Default)]
pub struct SessionLocks {
    locks: Arc<Mutex<HashMap<String, Weak<AsyncMutex<()>>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to the session. Access lasts until the
    /// returned guard is dropped.
    pub async fn acquire(&self, game_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());

            locks.retain(|_, lock| lock.strong_count() > 0);

            match locks.get(game_id).and_then(Weak::upgrade) {
                Some(lock) => lock,
                None => {
                    let lock = Arc::new(AsyncMutex::new(()));
                    locks.insert(game_id.to_string(), Arc::downgrade(&lock));
                    lock
                }
            }
        };

        lock.lock_owned().await
    }

    /// Sessions with a live lock.
    pub fn active(&self) -> usize {
        self.locks
            .lock()
            .map(|locks| locks.values().filter(|lock| lock.strong_count() > 0).count())
            .unwrap_or(0)
    }
}
