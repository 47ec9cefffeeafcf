use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use stayline_booking::{AssignmentError, LifecycleError};
use stayline_core::StoreError;
use stayline_holds::HoldError;
use stayline_inventory::InventoryError;

/// Engine errors folded into the HTTP taxonomy: validation is a caller
/// bug, not-found is a bad identifier, conflict invites a retry with
/// different parameters, insufficient inventory needs a human or other
/// dates, internal is ours.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    NotFound(String),
    Conflict(String),
    InsufficientInventory(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation", msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            AppError::InsufficientInventory(msg) => {
                (StatusCode::CONFLICT, "insufficient_inventory", msg)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
            "kind": kind,
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RoomNotFound(_)
            | StoreError::ReservationNotFound(_)
            | StoreError::HoldNotFound(_) => AppError::NotFound(err.to_string()),
            StoreError::DuplicateHoldToken(_) => AppError::Conflict(err.to_string()),
            StoreError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::Validation(msg) => AppError::Validation(msg),
            LifecycleError::NotFound(_) => AppError::NotFound(err.to_string()),
            LifecycleError::InvalidTransition { .. }
            | LifecycleError::RoomUnavailable(_)
            | LifecycleError::ArrivalNotOpen { .. }
            | LifecycleError::NoRoomsAssigned(_)
            | LifecycleError::PaymentWindowElapsed(_) => AppError::Conflict(err.to_string()),
            LifecycleError::Assignment(e) => e.into(),
            LifecycleError::Store(e) => e.into(),
        }
    }
}

impl From<AssignmentError> for AppError {
    fn from(err: AssignmentError) -> Self {
        match err {
            AssignmentError::NotFound(_) => AppError::NotFound(err.to_string()),
            AssignmentError::InsufficientInventory { .. } => {
                AppError::InsufficientInventory(err.to_string())
            }
            AssignmentError::RoomTaken(_) | AssignmentError::NotAssignable { .. } => {
                AppError::Conflict(err.to_string())
            }
            AssignmentError::Store(e) => e.into(),
        }
    }
}

impl From<HoldError> for AppError {
    fn from(err: HoldError) -> Self {
        match err {
            HoldError::Validation(msg) => AppError::Validation(msg),
            HoldError::NotFound(_) => AppError::NotFound(err.to_string()),
            HoldError::NotActive { .. }
            | HoldError::Expired(_)
            | HoldError::RoomUnavailable(_) => AppError::Conflict(err.to_string()),
            HoldError::Lifecycle(e) => e.into(),
            HoldError::Assignment(e) => e.into(),
            HoldError::Store(e) => e.into(),
        }
    }
}

impl From<InventoryError> for AppError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::Validation(msg) => AppError::Validation(msg),
            InventoryError::DuplicateRoomNumber(_) => AppError::Conflict(err.to_string()),
            InventoryError::Store(e) => e.into(),
        }
    }
}
