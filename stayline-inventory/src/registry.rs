use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use stayline_core::StoreError;
use stayline_domain::{Room, RoomType};
use stayline_store::MemoryStore;

#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Room number already registered: {0}")]
    DuplicateRoomNumber(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Read-mostly room inventory input for the rest of the engine
#[derive(Clone)]
pub struct RoomRegistry {
    store: Arc<MemoryStore>,
}

impl RoomRegistry {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    pub fn register(
        &self,
        number: String,
        room_type: RoomType,
        floor: i32,
        capacity: i32,
        base_rate: i64,
    ) -> Result<Room, InventoryError> {
        if number.trim().is_empty() {
            return Err(InventoryError::Validation("room number is required".to_string()));
        }
        if capacity <= 0 {
            return Err(InventoryError::Validation("capacity must be positive".to_string()));
        }
        if base_rate < 0 {
            return Err(InventoryError::Validation("base rate cannot be negative".to_string()));
        }
        if self.store.rooms()?.iter().any(|r| r.number == number) {
            return Err(InventoryError::DuplicateRoomNumber(number));
        }

        let room = Room::new(number, room_type, floor, capacity, base_rate);
        self.store.insert_room(room.clone())?;
        info!(room_id = %room.id, number = %room.number, "room registered");
        Ok(room)
    }

    pub fn get(&self, id: Uuid) -> Result<Room, InventoryError> {
        Ok(self.store.room(id)?)
    }

    pub fn list(&self) -> Result<Vec<Room>, InventoryError> {
        let mut rooms = self.store.rooms()?;
        rooms.sort_by(|a, b| (a.floor, &a.number).cmp(&(b.floor, &b.number)));
        Ok(rooms)
    }

    /// Rooms are never deleted while referenced; taking one out of
    /// service flips the status flag instead
    pub fn set_active(&self, id: Uuid, is_active: bool) -> Result<Room, InventoryError> {
        Ok(self.store.set_room_active(id, is_active)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_duplicate() {
        let registry = RoomRegistry::new(Arc::new(MemoryStore::new()));

        registry
            .register("201".to_string(), RoomType::Deluxe, 2, 2, 18000)
            .unwrap();
        let err = registry
            .register("201".to_string(), RoomType::Standard, 2, 2, 12000)
            .unwrap_err();
        assert!(matches!(err, InventoryError::DuplicateRoomNumber(_)));
    }

    #[test]
    fn test_validation() {
        let registry = RoomRegistry::new(Arc::new(MemoryStore::new()));

        assert!(registry.register("".to_string(), RoomType::Standard, 1, 2, 100).is_err());
        assert!(registry.register("102".to_string(), RoomType::Standard, 1, 0, 100).is_err());
    }
}
