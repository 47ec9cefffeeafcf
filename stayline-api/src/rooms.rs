use axum::{
    extract::{Path, Query, State},
    routing::{get, patch},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stayline_domain::{Room, RoomType};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct CreateRoomBody {
    number: String,
    room_type: RoomType,
    floor: i32,
    capacity: i32,
    base_rate: i64,
}

#[derive(Debug, Deserialize)]
struct UpdateRoomBody {
    is_active: bool,
}

#[derive(Debug, Deserialize)]
struct AvailabilityQuery {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Debug, Serialize)]
struct AvailabilityResponse {
    room_id: Uuid,
    start: NaiveDate,
    end: NaiveDate,
    available: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/rooms", get(list_rooms).post(create_room))
        .route("/v1/rooms/{id}", patch(update_room))
        .route("/v1/rooms/{id}/availability", get(availability))
}

async fn create_room(
    State(state): State<AppState>,
    Json(body): Json<CreateRoomBody>,
) -> Result<Json<Room>, AppError> {
    let room = state.registry.register(
        body.number,
        body.room_type,
        body.floor,
        body.capacity,
        body.base_rate,
    )?;
    Ok(Json(room))
}

async fn list_rooms(State(state): State<AppState>) -> Result<Json<Vec<Room>>, AppError> {
    Ok(Json(state.registry.list()?))
}

async fn update_room(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateRoomBody>,
) -> Result<Json<Room>, AppError> {
    Ok(Json(state.registry.set_active(id, body.is_active)?))
}

async fn availability(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    if query.end <= query.start {
        return Err(AppError::Validation("end date must be after start date".to_string()));
    }
    let now = state.clock.now();
    let available = state.availability.is_available(id, query.start, query.end, now, None, None)?;
    Ok(Json(AvailabilityResponse { room_id: id, start: query.start, end: query.end, available }))
}
