use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reservation status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    CheckedIn,
    Occupied,
    CheckedOut,
    Cancelled,
}

impl ReservationStatus {
    /// A reservation in this status counts against room availability
    pub fn is_blocking(&self) -> bool {
        !matches!(self, ReservationStatus::Cancelled | ReservationStatus::CheckedOut)
    }
}

/// Where the booking came from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationSource {
    Direct,
    Channel(String),
    HoldConversion,
}

/// Guest identity consumed from the identity collaborator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuestRef {
    pub id: Uuid,
    pub email: String,
}

/// The canonical booking record. Stay range is half-open: the check-out
/// date is exclusive. Never physically deleted; cancelled reservations
/// persist for audit and analytics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    pub guest: GuestRef,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub status: ReservationStatus,
    pub rooms: Vec<Uuid>,
    pub total_guests: i32,
    pub source: ReservationSource,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    pub fn new(
        guest: GuestRef,
        check_in: NaiveDate,
        check_out: NaiveDate,
        rooms: Vec<Uuid>,
        total_guests: i32,
        source: ReservationSource,
        status: ReservationStatus,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            guest,
            check_in,
            check_out,
            status,
            rooms,
            total_guests,
            source,
            created_at: now,
            updated_at: now,
        }
    }

    /// Update status, stamping the modification time
    pub fn update_status(&mut self, new_status: ReservationStatus, now: DateTime<Utc>) {
        self.status = new_status;
        self.updated_at = now;
    }

    /// Drop all room associations (cancellation of an unconfirmed booking)
    pub fn release_rooms(&mut self, now: DateTime<Utc>) {
        self.rooms.clear();
        self.updated_at = now;
    }

    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }
}
