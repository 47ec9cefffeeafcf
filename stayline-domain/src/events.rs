use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::reservation::ReservationStatus;

/// Which reconciliation rule drove an automated transition
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SweepKind {
    UnconfirmedDeadline,
    StalePending,
    Arrival,
    NoShow,
    OverdueCheckout,
    ExpiredHolds,
}

impl SweepKind {
    pub const ALL: [SweepKind; 6] = [
        SweepKind::UnconfirmedDeadline,
        SweepKind::StalePending,
        SweepKind::Arrival,
        SweepKind::NoShow,
        SweepKind::OverdueCheckout,
        SweepKind::ExpiredHolds,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SweepKind::UnconfirmedDeadline => "unconfirmed-deadline",
            SweepKind::StalePending => "stale-pending",
            SweepKind::Arrival => "arrival",
            SweepKind::NoShow => "no-show",
            SweepKind::OverdueCheckout => "overdue-checkout",
            SweepKind::ExpiredHolds => "expired-holds",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerSource {
    Guest,
    Staff,
    Payment,
    Sweep(SweepKind),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleEventType {
    Created,
    Confirmed,
    CheckedIn,
    Occupied,
    CheckedOut,
    Cancelled,
}

/// Emitted on every applied lifecycle transition; consumed by the folio,
/// housekeeping and notification collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub reservation_id: Uuid,
    pub previous_status: Option<ReservationStatus>,
    pub new_status: ReservationStatus,
    pub event_type: LifecycleEventType,
    pub triggered_by: TriggerSource,
    pub event_time: DateTime<Utc>,
}
