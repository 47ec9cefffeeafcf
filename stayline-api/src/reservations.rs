use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use stayline_booking::NewReservation;
use stayline_domain::{
    AuditRecord, GuestRef, Reservation, ReservationSource, TriggerSource,
};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct CreateReservationBody {
    guest_id: Uuid,
    guest_email: String,
    check_in: NaiveDate,
    check_out: NaiveDate,
    #[serde(default)]
    room_ids: Vec<Uuid>,
    total_guests: i32,
    /// OTA channel name; absent means a direct booking
    channel: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/reservations", post(create_reservation))
        .route("/v1/reservations/{id}", get(get_reservation))
        .route("/v1/reservations/{id}/confirm", post(confirm))
        .route("/v1/reservations/{id}/check-in", post(check_in))
        .route("/v1/reservations/{id}/occupy", post(occupy))
        .route("/v1/reservations/{id}/check-out", post(check_out))
        .route("/v1/reservations/{id}/cancel", post(cancel))
        .route("/v1/reservations/{id}/assign", post(assign_rooms))
        .route("/v1/reservations/{id}/audit", get(audit_trail))
}

async fn create_reservation(
    State(state): State<AppState>,
    Json(body): Json<CreateReservationBody>,
) -> Result<Json<Reservation>, AppError> {
    let source = match body.channel {
        Some(channel) => ReservationSource::Channel(channel),
        None => ReservationSource::Direct,
    };

    let reservation = state
        .lifecycle
        .create_reservation(
            NewReservation {
                guest: GuestRef { id: body.guest_id, email: body.guest_email },
                check_in: body.check_in,
                check_out: body.check_out,
                rooms: body.room_ids,
                total_guests: body.total_guests,
                source,
                converted_from: None,
            },
            TriggerSource::Guest,
        )
        .await?;
    Ok(Json(reservation))
}

async fn get_reservation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Reservation>, AppError> {
    Ok(Json(state.lifecycle.get(id)?))
}

async fn confirm(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Reservation>, AppError> {
    Ok(Json(state.lifecycle.confirm(id, TriggerSource::Staff).await?))
}

async fn check_in(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Reservation>, AppError> {
    Ok(Json(state.lifecycle.check_in(id, TriggerSource::Staff).await?))
}

async fn occupy(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Reservation>, AppError> {
    Ok(Json(state.lifecycle.mark_occupied(id, TriggerSource::Staff).await?))
}

async fn check_out(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Reservation>, AppError> {
    Ok(Json(state.lifecycle.check_out(id, TriggerSource::Staff).await?))
}

async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Reservation>, AppError> {
    Ok(Json(state.lifecycle.cancel(id, TriggerSource::Guest).await?))
}

async fn assign_rooms(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Uuid>>, AppError> {
    let now = state.clock.now();
    let rooms = state.assignment.auto_assign(id, now, TriggerSource::Staff).await?;
    Ok(Json(rooms))
}

async fn audit_trail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<AuditRecord>>, AppError> {
    Ok(Json(state.store.audit_for_entity(id)?))
}
