//! One async mutex per public key.
//!
//! The key-value store has no compare-and-swap, so every read-modify-write
//! of an index entry runs under that key's lock. A task never holds two key
//! locks at once.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use archivist_types::PublicKey;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Default)]
pub struct KeyLocks {
    locks: Mutex<HashMap<PublicKey, Arc<AsyncMutex<()>>>>,
}

/// Holds one key's lock; releases it on drop.
pub struct KeyGuard<'a> {
    owner: &'a KeyLocks,
    key: PublicKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: &PublicKey) -> KeyGuard<'_> {
        let mutex = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(key.clone()).or_default().clone()
        };
        KeyGuard {
            owner: self,
            key: key.clone(),
            guard: Some(mutex.lock_owned().await),
        }
    }

    /// Number of keys with a live lock slot.
    pub fn tracked(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = self.owner.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map still references the slot: nobody holds or awaits it.
        if locks
            .get(&self.key)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            locks.remove(&self.key);
        }
    }
}
