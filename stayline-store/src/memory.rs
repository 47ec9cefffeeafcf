use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use stayline_core::StoreError;
use stayline_domain::{
    AuditRecord, HoldStatus, Reservation, ReservationHold, ReservationStatus, Room,
};

/// What a block in the room index points back to. The block is a hint for
/// range scans; the pointed-at row's live status stays authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockSource {
    Reservation(Uuid),
    Hold(Uuid),
}

/// One date interval occupying a room
#[derive(Debug, Clone)]
pub struct RoomBlock {
    pub source: BlockSource,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Per-room interval index keyed by block start date, so an availability
/// check is a range scan over one room's blocks instead of a scan of
/// every reservation and hold in the system.
type BlockIndex = HashMap<Uuid, BTreeMap<NaiveDate, Vec<RoomBlock>>>;

/// Deployment-local booking store. Rows are never physically deleted;
/// cancelled reservations and finished holds stay for audit. All
/// blocking-state writes for a room happen while the caller holds that
/// room's lock in the `RoomLockTable`, which makes check-then-commit a
/// serializable unit per room set.
pub struct MemoryStore {
    rooms: RwLock<HashMap<Uuid, Room>>,
    reservations: RwLock<HashMap<Uuid, Reservation>>,
    holds: RwLock<HashMap<Uuid, ReservationHold>>,
    hold_tokens: RwLock<HashMap<String, Uuid>>,
    blocks: RwLock<BlockIndex>,
    audit: RwLock<Vec<AuditRecord>>,
}

fn poisoned(what: &str) -> StoreError {
    StoreError::Internal(format!("{} lock poisoned", what))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            reservations: RwLock::new(HashMap::new()),
            holds: RwLock::new(HashMap::new()),
            hold_tokens: RwLock::new(HashMap::new()),
            blocks: RwLock::new(BlockIndex::new()),
            audit: RwLock::new(Vec::new()),
        }
    }

    // ---- rooms ----

    pub fn insert_room(&self, room: Room) -> Result<(), StoreError> {
        let mut rooms = self.rooms.write().map_err(|_| poisoned("rooms"))?;
        rooms.insert(room.id, room);
        Ok(())
    }

    pub fn room(&self, id: Uuid) -> Result<Room, StoreError> {
        let rooms = self.rooms.read().map_err(|_| poisoned("rooms"))?;
        rooms.get(&id).cloned().ok_or(StoreError::RoomNotFound(id))
    }

    pub fn rooms(&self) -> Result<Vec<Room>, StoreError> {
        let rooms = self.rooms.read().map_err(|_| poisoned("rooms"))?;
        Ok(rooms.values().cloned().collect())
    }

    pub fn active_rooms(&self) -> Result<Vec<Room>, StoreError> {
        let rooms = self.rooms.read().map_err(|_| poisoned("rooms"))?;
        Ok(rooms.values().filter(|r| r.is_active).cloned().collect())
    }

    pub fn set_room_active(&self, id: Uuid, is_active: bool) -> Result<Room, StoreError> {
        let mut rooms = self.rooms.write().map_err(|_| poisoned("rooms"))?;
        let room = rooms.get_mut(&id).ok_or(StoreError::RoomNotFound(id))?;
        room.is_active = is_active;
        Ok(room.clone())
    }

    // ---- reservations ----

    pub fn insert_reservation(&self, reservation: Reservation) -> Result<(), StoreError> {
        let snapshot = reservation.clone();
        {
            let mut map = self.reservations.write().map_err(|_| poisoned("reservations"))?;
            map.insert(reservation.id, reservation);
        }
        self.reindex_reservation(&[], &snapshot)
    }

    pub fn reservation(&self, id: Uuid) -> Result<Reservation, StoreError> {
        let map = self.reservations.read().map_err(|_| poisoned("reservations"))?;
        map.get(&id).cloned().ok_or(StoreError::ReservationNotFound(id))
    }

    pub fn reservations_with_status(
        &self,
        status: ReservationStatus,
    ) -> Result<Vec<Reservation>, StoreError> {
        let map = self.reservations.read().map_err(|_| poisoned("reservations"))?;
        Ok(map.values().filter(|r| r.status == status).cloned().collect())
    }

    /// Mutate one reservation atomically under the store's write lock,
    /// then refresh the room block index for the rooms it touched.
    pub fn apply_reservation<E, F>(&self, id: Uuid, f: F) -> Result<Reservation, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut Reservation) -> Result<(), E>,
    {
        let (prior_rooms, snapshot) = {
            let mut map = self
                .reservations
                .write()
                .map_err(|_| E::from(poisoned("reservations")))?;
            let reservation = map
                .get_mut(&id)
                .ok_or_else(|| E::from(StoreError::ReservationNotFound(id)))?;
            let prior_rooms = reservation.rooms.clone();
            f(reservation)?;
            (prior_rooms, reservation.clone())
        };
        self.reindex_reservation(&prior_rooms, &snapshot)?;
        Ok(snapshot)
    }

    // ---- holds ----

    pub fn insert_hold(&self, hold: ReservationHold) -> Result<(), StoreError> {
        {
            let mut tokens = self.hold_tokens.write().map_err(|_| poisoned("hold tokens"))?;
            if tokens.contains_key(&hold.hold_token) {
                return Err(StoreError::DuplicateHoldToken(hold.hold_token.clone()));
            }
            tokens.insert(hold.hold_token.clone(), hold.id);
        }
        let snapshot = hold.clone();
        {
            let mut map = self.holds.write().map_err(|_| poisoned("holds"))?;
            map.insert(hold.id, hold);
        }
        self.reindex_hold(&[], &snapshot)
    }

    pub fn hold(&self, id: Uuid) -> Result<ReservationHold, StoreError> {
        let map = self.holds.read().map_err(|_| poisoned("holds"))?;
        map.get(&id)
            .cloned()
            .ok_or_else(|| StoreError::HoldNotFound(id.to_string()))
    }

    pub fn hold_by_token(&self, token: &str) -> Result<ReservationHold, StoreError> {
        let id = {
            let tokens = self.hold_tokens.read().map_err(|_| poisoned("hold tokens"))?;
            tokens
                .get(token)
                .copied()
                .ok_or_else(|| StoreError::HoldNotFound(token.to_string()))?
        };
        self.hold(id)
    }

    /// Mutate one hold atomically, then refresh its room blocks
    pub fn apply_hold<E, F>(&self, token: &str, f: F) -> Result<ReservationHold, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut ReservationHold) -> Result<(), E>,
    {
        let id = {
            let tokens = self
                .hold_tokens
                .read()
                .map_err(|_| E::from(poisoned("hold tokens")))?;
            tokens
                .get(token)
                .copied()
                .ok_or_else(|| E::from(StoreError::HoldNotFound(token.to_string())))?
        };
        let (prior_rooms, snapshot) = {
            let mut map = self.holds.write().map_err(|_| E::from(poisoned("holds")))?;
            let hold = map
                .get_mut(&id)
                .ok_or_else(|| E::from(StoreError::HoldNotFound(token.to_string())))?;
            let prior_rooms = hold.rooms.clone();
            f(hold)?;
            (prior_rooms, hold.clone())
        };
        self.reindex_hold(&prior_rooms, &snapshot)?;
        Ok(snapshot)
    }

    /// Holds whose status is still Active but whose expiry has passed.
    /// Input set for the expired-hold sweep, the sole writer of Expired.
    pub fn expired_active_holds(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<ReservationHold>, StoreError> {
        let map = self.holds.read().map_err(|_| poisoned("holds"))?;
        Ok(map
            .values()
            .filter(|h| h.status == HoldStatus::Active && h.is_expired(now))
            .cloned()
            .collect())
    }

    pub fn holds_with_status(&self, status: HoldStatus) -> Result<Vec<ReservationHold>, StoreError> {
        let map = self.holds.read().map_err(|_| poisoned("holds"))?;
        Ok(map.values().filter(|h| h.status == status).cloned().collect())
    }

    // ---- block index ----

    /// Blocks for one room whose interval intersects `[start, end)`.
    /// Callers re-validate each block against the live source row.
    pub fn blocks_overlapping(
        &self,
        room_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RoomBlock>, StoreError> {
        let blocks = self.blocks.read().map_err(|_| poisoned("blocks"))?;
        let Some(tree) = blocks.get(&room_id) else {
            return Ok(Vec::new());
        };
        // Half-open intervals: any block starting before `end` can overlap
        Ok(tree
            .range(..end)
            .flat_map(|(_, list)| list.iter())
            .filter(|b| b.end > start)
            .cloned()
            .collect())
    }

    fn reindex_reservation(
        &self,
        prior_rooms: &[Uuid],
        reservation: &Reservation,
    ) -> Result<(), StoreError> {
        let source = BlockSource::Reservation(reservation.id);
        let rooms_to_add = if reservation.status.is_blocking() {
            reservation.rooms.as_slice()
        } else {
            &[]
        };
        self.reindex(
            source,
            prior_rooms,
            rooms_to_add,
            reservation.check_in,
            reservation.check_out,
        )
    }

    fn reindex_hold(&self, prior_rooms: &[Uuid], hold: &ReservationHold) -> Result<(), StoreError> {
        let source = BlockSource::Hold(hold.id);
        // Expiry is evaluated at query time against the timestamp; the
        // index keeps blocks for every Active hold until it is swept
        let rooms_to_add = if hold.status == HoldStatus::Active {
            hold.rooms.as_slice()
        } else {
            &[]
        };
        self.reindex(source, prior_rooms, rooms_to_add, hold.check_in, hold.check_out)
    }

    fn reindex(
        &self,
        source: BlockSource,
        prior_rooms: &[Uuid],
        rooms_to_add: &[Uuid],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(), StoreError> {
        let mut blocks = self.blocks.write().map_err(|_| poisoned("blocks"))?;
        for room_id in prior_rooms.iter().chain(rooms_to_add.iter()) {
            if let Some(tree) = blocks.get_mut(room_id) {
                for list in tree.values_mut() {
                    list.retain(|b| b.source != source);
                }
                tree.retain(|_, list| !list.is_empty());
            }
        }
        for room_id in rooms_to_add {
            blocks
                .entry(*room_id)
                .or_default()
                .entry(start)
                .or_default()
                .push(RoomBlock { source, start, end });
        }
        Ok(())
    }

    // ---- audit ----

    pub fn record_audit(&self, record: AuditRecord) -> Result<(), StoreError> {
        let mut audit = self.audit.write().map_err(|_| poisoned("audit"))?;
        audit.push(record);
        Ok(())
    }

    pub fn audit_for_entity(&self, entity_id: Uuid) -> Result<Vec<AuditRecord>, StoreError> {
        let audit = self.audit.read().map_err(|_| poisoned("audit"))?;
        Ok(audit.iter().filter(|a| a.entity_id == entity_id).cloned().collect())
    }

    pub fn audit_records(&self) -> Result<Vec<AuditRecord>, StoreError> {
        let audit = self.audit.read().map_err(|_| poisoned("audit"))?;
        Ok(audit.clone())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stayline_domain::{GuestRef, ReservationSource};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn reservation(room: Uuid) -> Reservation {
        Reservation::new(
            GuestRef { id: Uuid::new_v4(), email: "guest@example.com".to_string() },
            d(2024, 6, 1),
            d(2024, 6, 3),
            vec![room],
            2,
            ReservationSource::Direct,
            ReservationStatus::Confirmed,
            Utc::now(),
        )
    }

    #[test]
    fn test_block_index_tracks_reservation() {
        let store = MemoryStore::new();
        let room = Uuid::new_v4();
        let res = reservation(room);
        let res_id = res.id;

        store.insert_reservation(res).unwrap();

        // Overlapping scan finds the block
        let hits = store.blocks_overlapping(room, d(2024, 6, 2), d(2024, 6, 4)).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].source, BlockSource::Reservation(res_id));

        // Back-to-back stay does not
        let hits = store.blocks_overlapping(room, d(2024, 6, 3), d(2024, 6, 5)).unwrap();
        assert!(hits.is_empty());

        // Cancelling prunes the block
        store
            .apply_reservation::<StoreError, _>(res_id, |r| {
                r.update_status(ReservationStatus::Cancelled, Utc::now());
                Ok(())
            })
            .unwrap();
        let hits = store.blocks_overlapping(room, d(2024, 6, 2), d(2024, 6, 4)).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_duplicate_hold_token_rejected() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let hold = ReservationHold::new(
            "STAY-1".to_string(),
            None,
            None,
            None,
            vec![],
            None,
            1,
            d(2024, 6, 1),
            d(2024, 6, 2),
            15,
            now,
        );
        let dup = ReservationHold::new(
            "STAY-1".to_string(),
            None,
            None,
            None,
            vec![],
            None,
            1,
            d(2024, 6, 1),
            d(2024, 6, 2),
            15,
            now,
        );

        store.insert_hold(hold).unwrap();
        let err = store.insert_hold(dup).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateHoldToken(_)));
    }
}
