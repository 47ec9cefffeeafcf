use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::info;
use uuid::Uuid;

use stayline_core::StoreError;
use stayline_domain::{AuditRecord, EntityType, ReservationStatus, Room, TriggerSource};
use stayline_inventory::AvailabilityIndex;
use stayline_store::{MemoryStore, RoomGuards, RoomLockTable};

#[derive(Debug, thiserror::Error)]
pub enum AssignmentError {
    #[error("Reservation not found: {0}")]
    NotFound(Uuid),

    #[error("Insufficient inventory: requested {requested}, available {available}")]
    InsufficientInventory { requested: usize, available: usize },

    #[error("Room taken during assignment: {0}")]
    RoomTaken(Uuid),

    #[error("Reservation {id} is {status}, rooms cannot be assigned")]
    NotAssignable { id: Uuid, status: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Picks concrete rooms for a reservation's stay. Guests sharing a
/// booking are packed two to a room; the heuristic prefers keeping the
/// party on one floor, then on one room type, before falling back to
/// whatever is free. All-or-nothing: a short selection assigns nothing.
#[derive(Clone)]
pub struct RoomAssignmentOptimizer {
    store: Arc<MemoryStore>,
    availability: AvailabilityIndex,
    locks: Arc<RoomLockTable>,
}

/// Rooms needed for a party: one room per two guests, minimum one
pub fn rooms_needed(total_guests: i32) -> usize {
    let guests = total_guests.max(1) as usize;
    guests.div_ceil(2)
}

impl RoomAssignmentOptimizer {
    pub fn new(
        store: Arc<MemoryStore>,
        availability: AvailabilityIndex,
        locks: Arc<RoomLockTable>,
    ) -> Self {
        Self { store, availability, locks }
    }

    /// Select `need` rooms for the stay without committing anything.
    /// Candidates are oversampled (3x the need) so the affinity tiers
    /// have choices to work with.
    pub fn select_rooms(
        &self,
        need: usize,
        check_in: NaiveDate,
        check_out: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Vec<Uuid>, AssignmentError> {
        let mut candidates = self.availability.available_rooms(check_in, check_out, now)?;
        candidates.truncate(need * 3);

        if candidates.len() < need {
            return Err(AssignmentError::InsufficientInventory {
                requested: need,
                available: candidates.len(),
            });
        }

        // Tier 1: a single floor that can take the whole party
        if let Some(rooms) = pick_group(&candidates, need, |r| r.floor) {
            return Ok(rooms);
        }
        // Tier 2: a single room type
        if let Some(rooms) = pick_group(&candidates, need, |r| r.room_type) {
            return Ok(rooms);
        }
        // Tier 3: anything free
        Ok(candidates.iter().take(need).map(|r| r.id).collect())
    }

    /// Select rooms, lock them, and re-verify availability under the
    /// locks. The returned guards must be held until the caller's write
    /// has landed.
    pub async fn reserve_selection(
        &self,
        need: usize,
        check_in: NaiveDate,
        check_out: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<(RoomGuards, Vec<Uuid>), AssignmentError> {
        let selection = self.select_rooms(need, check_in, check_out, now)?;
        let guards = self.locks.lock_rooms(&selection).await;

        // The selection ran unlocked; a concurrent commit may have taken
        // one of these rooms in the meantime
        for room_id in &selection {
            if !self
                .availability
                .is_available(*room_id, check_in, check_out, now, None, None)?
            {
                return Err(AssignmentError::RoomTaken(*room_id));
            }
        }
        Ok((guards, selection))
    }

    /// Assign rooms to a reservation that has none yet. Returns the
    /// assigned set; already-assigned reservations are left untouched.
    pub async fn auto_assign(
        &self,
        reservation_id: Uuid,
        now: DateTime<Utc>,
        triggered_by: TriggerSource,
    ) -> Result<Vec<Uuid>, AssignmentError> {
        let reservation = self
            .store
            .reservation(reservation_id)
            .map_err(|_| AssignmentError::NotFound(reservation_id))?;

        if !matches!(
            reservation.status,
            ReservationStatus::Pending | ReservationStatus::Confirmed
        ) {
            return Err(AssignmentError::NotAssignable {
                id: reservation_id,
                status: format!("{:?}", reservation.status),
            });
        }
        if !reservation.rooms.is_empty() {
            return Ok(reservation.rooms);
        }

        let need = rooms_needed(reservation.total_guests);
        let (guards, selection) = self
            .reserve_selection(need, reservation.check_in, reservation.check_out, now)
            .await?;

        let assigned = selection.clone();
        self.store
            .apply_reservation::<AssignmentError, _>(reservation_id, move |r| {
                if r.rooms.is_empty() {
                    r.rooms = selection;
                    r.updated_at = now;
                }
                Ok(())
            })?;
        drop(guards);

        self.store.record_audit(AuditRecord::new(
            EntityType::Reservation,
            reservation_id,
            "reservation.rooms_assigned",
            triggered_by,
            format!("assigned {} room(s) for {} guest(s)", assigned.len(), reservation.total_guests),
            now,
        ))?;
        info!(reservation_id = %reservation_id, rooms = assigned.len(), "rooms auto-assigned");

        Ok(assigned)
    }
}

/// First group (in candidate order) with at least `need` members, largest
/// group winning ties toward guest comfort
fn pick_group<K, F>(candidates: &[Room], need: usize, key: F) -> Option<Vec<Uuid>>
where
    K: std::hash::Hash + Eq + Copy,
    F: Fn(&Room) -> K,
{
    let mut order: Vec<K> = Vec::new();
    let mut groups: HashMap<K, Vec<Uuid>> = HashMap::new();
    for room in candidates {
        let k = key(room);
        let entry = groups.entry(k).or_default();
        if entry.is_empty() {
            order.push(k);
        }
        entry.push(room.id);
    }

    let mut best: Option<(K, usize)> = None;
    for k in &order {
        let len = groups[k].len();
        if len >= need && best.map(|(_, b)| len > b).unwrap_or(true) {
            best = Some((*k, len));
        }
    }
    best.map(|(k, _)| groups[&k].iter().take(need).copied().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stayline_domain::{
        GuestRef, Reservation, ReservationSource, ReservationStatus, Room, RoomType,
    };

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn setup() -> (Arc<MemoryStore>, RoomAssignmentOptimizer) {
        let store = Arc::new(MemoryStore::new());
        let optimizer = RoomAssignmentOptimizer::new(
            store.clone(),
            AvailabilityIndex::new(store.clone()),
            Arc::new(RoomLockTable::new()),
        );
        (store, optimizer)
    }

    fn add_room(store: &MemoryStore, number: &str, room_type: RoomType, floor: i32) -> Room {
        let room = Room::new(number.to_string(), room_type, floor, 2, 12000);
        store.insert_room(room.clone()).unwrap();
        room
    }

    #[test]
    fn test_rooms_needed() {
        assert_eq!(rooms_needed(1), 1);
        assert_eq!(rooms_needed(2), 1);
        assert_eq!(rooms_needed(3), 2);
        assert_eq!(rooms_needed(4), 2);
        assert_eq!(rooms_needed(0), 1);
    }

    #[test]
    fn test_floor_affinity_wins() {
        let (store, optimizer) = setup();
        let now = Utc::now();

        // Three rooms on floor 2, one on floor 3
        add_room(&store, "201", RoomType::Standard, 2);
        add_room(&store, "202", RoomType::Deluxe, 2);
        add_room(&store, "203", RoomType::Standard, 2);
        add_room(&store, "301", RoomType::Standard, 3);

        let picked = optimizer.select_rooms(2, d(2024, 6, 1), d(2024, 6, 3), now).unwrap();
        assert_eq!(picked.len(), 2);
        for id in &picked {
            assert_eq!(store.room(*id).unwrap().floor, 2);
        }
    }

    #[test]
    fn test_type_affinity_fallback() {
        let (store, optimizer) = setup();
        let now = Utc::now();

        // No floor holds two rooms, but the Deluxe type does
        add_room(&store, "101", RoomType::Deluxe, 1);
        add_room(&store, "201", RoomType::Deluxe, 2);
        add_room(&store, "301", RoomType::Standard, 3);

        let picked = optimizer.select_rooms(2, d(2024, 6, 1), d(2024, 6, 3), now).unwrap();
        assert_eq!(picked.len(), 2);
        for id in &picked {
            assert_eq!(store.room(*id).unwrap().room_type, RoomType::Deluxe);
        }
    }

    #[test]
    fn test_insufficient_inventory() {
        let (store, optimizer) = setup();
        let now = Utc::now();

        add_room(&store, "101", RoomType::Standard, 1);

        let err = optimizer.select_rooms(2, d(2024, 6, 1), d(2024, 6, 3), now).unwrap_err();
        assert!(matches!(
            err,
            AssignmentError::InsufficientInventory { requested: 2, available: 1 }
        ));
    }

    #[tokio::test]
    async fn test_auto_assign_is_all_or_nothing() {
        let (store, optimizer) = setup();
        let now = Utc::now();

        add_room(&store, "101", RoomType::Standard, 1);
        let reservation = Reservation::new(
            GuestRef { id: Uuid::new_v4(), email: "guest@example.com".to_string() },
            d(2024, 6, 1),
            d(2024, 6, 3),
            vec![],
            5, // needs 3 rooms
            ReservationSource::Direct,
            ReservationStatus::Pending,
            now,
        );
        let id = reservation.id;
        store.insert_reservation(reservation).unwrap();

        let err = optimizer.auto_assign(id, now, TriggerSource::Staff).await.unwrap_err();
        assert!(matches!(err, AssignmentError::InsufficientInventory { .. }));
        assert!(store.reservation(id).unwrap().rooms.is_empty());
    }
}
