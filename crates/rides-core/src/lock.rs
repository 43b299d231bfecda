//! Per-ride exclusive locks.
//!
//! One async mutex per ride id, created on first use. The table only keeps
//! weak references, so a ride's entry disappears once nobody holds or waits
//! on its lock.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, PoisonError, Weak},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

/// Held for the duration of a ride mutation; dropping it releases the lock.
pub type RideGuard = OwnedMutexGuard<()>;

#[derive(Debug, Default)]
pub struct RideLocks {
  table: Mutex<HashMap<Uuid, Weak<AsyncMutex<()>>>>,
}

impl RideLocks {
  pub fn new() -> Self { Self::default() }

  /// Wait for exclusive access to ride `id`.
  pub async fn acquire(&self, id: Uuid) -> RideGuard {
    let lock = {
      let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
      table.retain(|_, weak| weak.strong_count() > 0);
      match table.get(&id).and_then(Weak::upgrade) {
        Some(lock) => lock,
        None => {
          let lock = Arc::new(AsyncMutex::new(()));
          table.insert(id, Arc::downgrade(&lock));
          lock
        }
      }
    };
    lock.lock_owned().await
  }

  /// Number of rides with a live lock entry.
  pub fn len(&self) -> usize {
    let table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
    table.values().filter(|weak| weak.strong_count() > 0).count()
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}
