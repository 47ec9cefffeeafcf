use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome reported by the payment collaborator
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentEventType {
    Success,
    Failed,
}

/// Status signal consumed from the payment processor. The engine does not
/// capture payments; a Success signal is only a trigger for the
/// Pending -> Confirmed transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentStatusEvent {
    pub reservation_id: Uuid,
    pub event_type: PaymentEventType,
    /// Amount in minor currency units
    pub amount: i64,
}
