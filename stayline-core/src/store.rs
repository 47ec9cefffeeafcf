use uuid::Uuid;

/// Storage-level failures surfaced by the booking store. Domain conflicts
/// (wrong source state, unavailable room) are modeled by the engine
/// modules; these cover lookups and the store's own integrity.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Room not found: {0}")]
    RoomNotFound(Uuid),

    #[error("Reservation not found: {0}")]
    ReservationNotFound(Uuid),

    #[error("Hold not found: {0}")]
    HoldNotFound(String),

    #[error("Hold token already registered: {0}")]
    DuplicateHoldToken(String),

    #[error("Storage failure: {0}")]
    Internal(String),
}
