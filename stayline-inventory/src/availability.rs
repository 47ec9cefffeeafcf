use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use stayline_core::time::ranges_overlap;
use stayline_core::StoreError;
use stayline_domain::Room;
use stayline_store::{BlockSource, MemoryStore};

/// Answers "is this room free for this stay". A block from the store's
/// range scan is only a hint; each hit is re-validated against the live
/// reservation status or hold timestamp, so an expired-but-unswept hold
/// never blocks a booking and a stale index entry never blocks anything.
#[derive(Clone)]
pub struct AvailabilityIndex {
    store: Arc<MemoryStore>,
}

impl AvailabilityIndex {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    /// True iff no blocking reservation or active unexpired hold for the
    /// room intersects `[start, end)`. `exclude_reservation` lets an
    /// update keep its own rooms; `exclude_hold` lets a hold conversion
    /// not collide with itself.
    pub fn is_available(
        &self,
        room_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        now: DateTime<Utc>,
        exclude_reservation: Option<Uuid>,
        exclude_hold: Option<Uuid>,
    ) -> Result<bool, StoreError> {
        let room = self.store.room(room_id)?;
        if !room.is_active {
            return Ok(false);
        }

        for block in self.store.blocks_overlapping(room_id, start, end)? {
            match block.source {
                BlockSource::Reservation(id) => {
                    if exclude_reservation == Some(id) {
                        continue;
                    }
                    match self.store.reservation(id) {
                        Ok(r) => {
                            if r.status.is_blocking()
                                && ranges_overlap(r.check_in, r.check_out, start, end)
                            {
                                return Ok(false);
                            }
                        }
                        Err(StoreError::ReservationNotFound(_)) => {}
                        Err(e) => return Err(e),
                    }
                }
                BlockSource::Hold(id) => {
                    if exclude_hold == Some(id) {
                        continue;
                    }
                    match self.store.hold(id) {
                        Ok(h) => {
                            if h.is_blocking(now)
                                && ranges_overlap(h.check_in, h.check_out, start, end)
                            {
                                return Ok(false);
                            }
                        }
                        Err(StoreError::HoldNotFound(_)) => {}
                        Err(e) => return Err(e),
                    }
                }
            }
        }
        Ok(true)
    }

    /// All active rooms free for the stay, in a deterministic order
    /// (floor, then room number)
    pub fn available_rooms(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Vec<Room>, StoreError> {
        let mut rooms = Vec::new();
        for room in self.store.active_rooms()? {
            if self.is_available(room.id, start, end, now, None, None)? {
                rooms.push(room);
            }
        }
        rooms.sort_by(|a, b| (a.floor, &a.number).cmp(&(b.floor, &b.number)));
        Ok(rooms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stayline_domain::{
        GuestRef, Reservation, ReservationHold, ReservationSource, ReservationStatus, Room,
        RoomType,
    };

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn setup() -> (Arc<MemoryStore>, AvailabilityIndex, Room) {
        let store = Arc::new(MemoryStore::new());
        let index = AvailabilityIndex::new(store.clone());
        let room = Room::new("101".to_string(), RoomType::Standard, 1, 2, 12000);
        store.insert_room(room.clone()).unwrap();
        (store, index, room)
    }

    fn guest() -> GuestRef {
        GuestRef { id: Uuid::new_v4(), email: "guest@example.com".to_string() }
    }

    #[test]
    fn test_blocking_reservation_overlap() {
        let (store, index, room) = setup();
        let now = Utc::now();
        let res = Reservation::new(
            guest(),
            d(2024, 6, 1),
            d(2024, 6, 3),
            vec![room.id],
            2,
            ReservationSource::Direct,
            ReservationStatus::Confirmed,
            now,
        );
        let res_id = res.id;
        store.insert_reservation(res).unwrap();

        assert!(!index.is_available(room.id, d(2024, 6, 2), d(2024, 6, 4), now, None, None).unwrap());
        // Half-open: the check-out day is free
        assert!(index.is_available(room.id, d(2024, 6, 3), d(2024, 6, 5), now, None, None).unwrap());
        // The reservation may keep its own room across an edit
        assert!(index
            .is_available(room.id, d(2024, 6, 2), d(2024, 6, 4), now, Some(res_id), None)
            .unwrap());
    }

    #[test]
    fn test_expired_hold_does_not_block() {
        let (store, index, room) = setup();
        let now = Utc::now();
        let hold = ReservationHold::new(
            "STAY-EXP".to_string(),
            None,
            None,
            None,
            vec![room.id],
            None,
            1,
            d(2024, 6, 1),
            d(2024, 6, 3),
            15,
            now,
        );
        store.insert_hold(hold).unwrap();

        // Blocking while the TTL is live
        assert!(!index.is_available(room.id, d(2024, 6, 2), d(2024, 6, 4), now, None, None).unwrap());

        // Past expiry the stored status still reads Active, but the
        // timestamp is authoritative
        let later = now + chrono::Duration::minutes(16);
        assert!(index.is_available(room.id, d(2024, 6, 2), d(2024, 6, 4), later, None, None).unwrap());
    }

    #[test]
    fn test_inactive_room_unavailable() {
        let (store, index, room) = setup();
        let now = Utc::now();

        store.set_room_active(room.id, false).unwrap();
        assert!(!index.is_available(room.id, d(2024, 6, 1), d(2024, 6, 2), now, None, None).unwrap());
    }
}
