//! Per-account mutation locks

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::types::AccountKey;

/// Serializes mutations of the same `(name, type)` while letting different
/// keys proceed concurrently.
#[derive(Default)]
pub(crate) struct KeyLocks {
    locks: Mutex<HashMap<AccountKey, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    pub(crate) async fn lock(&self, key: &AccountKey) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // Entries only referenced by the map are idle.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(key.clone()).or_default())
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }
}
