use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::room::RoomType;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HoldStatus {
    Active,
    Converted,
    Cancelled,
    Expired,
}

/// A time-boxed soft lock on one or more rooms. Blocks availability while
/// Active and unexpired; the `expires_at` timestamp is authoritative even
/// when the stored status has not been swept yet. Never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationHold {
    pub id: Uuid,
    /// Server-generated idempotency token, unique across all holds
    pub hold_token: String,
    pub guest_id: Option<Uuid>,
    pub guest_email: Option<String>,
    pub session_id: Option<String>,
    /// Concrete rooms under hold; empty for a room-type hold
    pub rooms: Vec<Uuid>,
    pub room_type: Option<RoomType>,
    pub number_of_rooms: i32,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub status: HoldStatus,
    pub expires_at: DateTime<Utc>,
    /// Set once the hold has been converted
    pub reservation_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl ReservationHold {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        hold_token: String,
        guest_id: Option<Uuid>,
        guest_email: Option<String>,
        session_id: Option<String>,
        rooms: Vec<Uuid>,
        room_type: Option<RoomType>,
        number_of_rooms: i32,
        check_in: NaiveDate,
        check_out: NaiveDate,
        ttl_minutes: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            hold_token,
            guest_id,
            guest_email,
            session_id,
            rooms,
            room_type,
            number_of_rooms,
            check_in,
            check_out,
            status: HoldStatus::Active,
            expires_at: now + Duration::minutes(ttl_minutes),
            reservation_id: None,
            created_at: now,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Counts against availability iff Active and unexpired
    pub fn is_blocking(&self, now: DateTime<Utc>) -> bool {
        self.status == HoldStatus::Active && !self.is_expired(now)
    }

    /// Extend from the current expiry, not from `now`, so repeated late
    /// extensions cannot drift the deadline forward unboundedly
    pub fn extend(&mut self, additional_minutes: i64) {
        self.expires_at += Duration::minutes(additional_minutes);
    }

    pub fn mark_converted(&mut self, reservation_id: Uuid) {
        self.status = HoldStatus::Converted;
        self.reservation_id = Some(reservation_id);
    }

    pub fn mark_cancelled(&mut self) {
        self.status = HoldStatus::Cancelled;
    }

    pub fn mark_expired(&mut self) {
        self.status = HoldStatus::Expired;
    }
}
