use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Physical room category, used by the assignment heuristic
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomType {
    Standard,
    Deluxe,
    Suite,
    Family,
}

/// A bookable room. Immutable for availability purposes except `is_active`;
/// never deleted while referenced by a reservation or hold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: Uuid,
    pub number: String,
    pub room_type: RoomType,
    pub floor: i32,
    pub capacity: i32,
    /// Nightly base rate in minor currency units
    pub base_rate: i64,
    pub is_active: bool,
}

impl Room {
    pub fn new(number: String, room_type: RoomType, floor: i32, capacity: i32, base_rate: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            number,
            room_type,
            floor,
            capacity,
            base_rate,
            is_active: true,
        }
    }
}
