use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stayline_domain::{ReservationHold, RoomType};
use stayline_holds::CreateHoldRequest;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct CreateHoldBody {
    guest_id: Option<Uuid>,
    guest_email: Option<String>,
    session_id: Option<String>,
    #[serde(default)]
    room_ids: Vec<Uuid>,
    room_type: Option<RoomType>,
    number_of_rooms: Option<i32>,
    check_in: NaiveDate,
    check_out: NaiveDate,
    ttl_minutes: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ExtendHoldBody {
    additional_minutes: i64,
}

#[derive(Debug, Serialize)]
struct ConvertResponse {
    reservation_id: Uuid,
    status: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/holds", post(create_hold))
        .route("/v1/holds/{token}", get(get_hold).delete(cancel_hold))
        .route("/v1/holds/{token}/extend", post(extend_hold))
        .route("/v1/holds/{token}/convert", post(convert_hold))
}

async fn create_hold(
    State(state): State<AppState>,
    Json(body): Json<CreateHoldBody>,
) -> Result<Json<ReservationHold>, AppError> {
    let hold = state
        .holds
        .create_hold(CreateHoldRequest {
            guest_id: body.guest_id,
            guest_email: body.guest_email,
            session_id: body.session_id,
            rooms: body.room_ids,
            room_type: body.room_type,
            number_of_rooms: body.number_of_rooms,
            check_in: body.check_in,
            check_out: body.check_out,
            ttl_minutes: body.ttl_minutes,
        })
        .await?;
    Ok(Json(hold))
}

async fn get_hold(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<ReservationHold>, AppError> {
    Ok(Json(state.holds.get_hold(&token)?))
}

async fn extend_hold(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(body): Json<ExtendHoldBody>,
) -> Result<Json<ReservationHold>, AppError> {
    Ok(Json(state.holds.extend_hold(&token, body.additional_minutes)?))
}

async fn cancel_hold(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<ReservationHold>, AppError> {
    Ok(Json(state.holds.cancel_hold(&token)?))
}

async fn convert_hold(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<ConvertResponse>, AppError> {
    let reservation = state.holds.convert_to_reservation(&token).await?;
    Ok(Json(ConvertResponse {
        reservation_id: reservation.id,
        status: format!("{:?}", reservation.status),
    }))
}
