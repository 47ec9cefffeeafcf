use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

/// Per-room write locks for check-then-commit paths. Guards are always
/// acquired in sorted room-id order, so multi-room commits cannot
/// deadlock against each other, and unrelated rooms proceed concurrently.
pub struct RoomLockTable {
    locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

/// Held room locks; dropping releases every room at once
pub struct RoomGuards {
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl RoomLockTable {
    pub fn new() -> Self {
        Self { locks: Mutex::new(HashMap::new()) }
    }

    fn handle(&self, room_id: Uuid) -> Arc<AsyncMutex<()>> {
        let mut locks = match self.locks.lock() {
            Ok(locks) => locks,
            Err(p) => p.into_inner(),
        };
        locks.entry(room_id).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }

    /// Lock a set of rooms for the duration of an availability check plus
    /// the write that depends on it
    pub async fn lock_rooms(&self, room_ids: &[Uuid]) -> RoomGuards {
        let mut sorted: Vec<Uuid> = room_ids.to_vec();
        sorted.sort();
        sorted.dedup();

        let mut guards = Vec::with_capacity(sorted.len());
        for room_id in sorted {
            let handle = self.handle(room_id);
            guards.push(handle.lock_owned().await);
        }
        RoomGuards { _guards: guards }
    }
}

impl Default for RoomLockTable {
    fn default() -> Self {
        Self::new()
    }
}
