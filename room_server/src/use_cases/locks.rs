use crate::domain::RoomId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = Arc<Mutex<HashMap<RoomId, Arc<AsyncMutex<()>>>>>;

/// Per-room mutual exclusion around read-guard-write sequences.
///
/// Different rooms never contend; the outer map lock is held only long
/// enough to look up the room's own lock, never across an await. An entry
/// lives only while someone holds or waits for it.
#[derive(Clone, Default)]
pub struct RoomLocks {
    rooms: LockMap,
}

impl RoomLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, room_id: RoomId) -> RoomGuard {
        let lock = {
            let mut rooms = self.rooms.lock().unwrap_or_else(PoisonError::into_inner);
            rooms.entry(room_id).or_default().clone()
        };
        let guard = lock.clone().lock_owned().await;
        RoomGuard {
            room_id,
            lock,
            guard: Some(guard),
            rooms: self.rooms.clone(),
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Held for the duration of one room mutation.
pub struct RoomGuard {
    room_id: RoomId,
    lock: Arc<AsyncMutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
    rooms: LockMap,
}

impl Drop for RoomGuard {
    fn drop(&mut self) {
        self.guard.take();
        // Clones are only taken under the map lock, so a count of two means
        // just the map and this guard remain.
        let mut rooms = self.rooms.lock().unwrap_or_else(PoisonError::into_inner);
        let idle = rooms
            .get(&self.room_id)
            .is_some_and(|entry| Arc::ptr_eq(entry, &self.lock) && Arc::strong_count(entry) == 2);
        if idle {
            rooms.remove(&self.room_id);
        }
    }
}
