//! Per-key in-flight registry used to coalesce concurrent `memoize` misses.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub(crate) struct InFlight {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl InFlight {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Waits until no other caller holds `key`, then holds it until the guard drops.
    pub(crate) async fn acquire(&self, key: &str) -> InFlightGuard<'_> {
        let lock = {
            let mut locks = self.locks();
            Arc::clone(locks.entry(key.to_string()).or_default())
        };
        let permit = Arc::clone(&lock).lock_owned().await;

        InFlightGuard {
            registry: self,
            key: key.to_string(),
            lock,
            _permit: permit,
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks().len()
    }

    fn locks(&self) -> MutexGuard<'_, HashMap<String, Arc<AsyncMutex<()>>>> {
        self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub(crate) struct InFlightGuard<'a> {
    registry: &'a InFlight,
    key: String,
    lock: Arc<AsyncMutex<()>>,
    _permit: OwnedMutexGuard<()>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut locks = self.registry.locks();
        let owned = locks
            .get(&self.key)
            .is_some_and(|current| Arc::ptr_eq(current, &self.lock));
        // References: the map, `self.lock`, and the permit. Anything more is a waiter.
        if owned && Arc::strong_count(&self.lock) <= 3 {
            locks.remove(&self.key);
        }
    }
}
