use std::sync::Arc;

use axum::body::Body;
use axum::http::{self, Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use serde_json::{json, Value};
use tower::ServiceExt;

use stayline_api::{app, AppState};
use stayline_core::FixedClock;
use stayline_store::Config;

fn test_app() -> Router {
    let clock = Arc::new(FixedClock::new(
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
            .and_utc(),
    ));
    let (state, _sweeps) = AppState::build(Config::default(), clock);
    app(state)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_hold_to_reservation_flow() {
    let app = test_app();

    // Register a room
    let response = app
        .clone()
        .oneshot(post_json(
            "/v1/rooms",
            json!({
                "number": "101",
                "room_type": "STANDARD",
                "floor": 1,
                "capacity": 2,
                "base_rate": 12000
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let room = body_json(response).await;
    let room_id = room["id"].as_str().unwrap().to_string();

    // The room is free for the stay
    let response = app
        .clone()
        .oneshot(get(&format!(
            "/v1/rooms/{}/availability?start=2024-06-02&end=2024-06-04",
            room_id
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["available"], json!(true));

    // Hold it
    let response = app
        .clone()
        .oneshot(post_json(
            "/v1/holds",
            json!({
                "guest_id": "7f8a9b1c-0d2e-4f3a-8b5c-6d7e8f9a0b1c",
                "guest_email": "guest@example.com",
                "room_ids": [room_id],
                "check_in": "2024-06-02",
                "check_out": "2024-06-04"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let hold = body_json(response).await;
    let token = hold["hold_token"].as_str().unwrap().to_string();
    assert_eq!(hold["status"], json!("ACTIVE"));

    // The hold blocks the overlapping stay
    let response = app
        .clone()
        .oneshot(get(&format!(
            "/v1/rooms/{}/availability?start=2024-06-03&end=2024-06-05",
            room_id
        )))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["available"], json!(false));

    // Convert the hold to a reservation
    let response = app
        .clone()
        .oneshot(post_json(&format!("/v1/holds/{}/convert", token), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let converted = body_json(response).await;
    let reservation_id = converted["reservation_id"].as_str().unwrap().to_string();
    assert_eq!(converted["status"], json!("Pending"));

    // Payment success confirms it
    let response = app
        .clone()
        .oneshot(post_json(
            "/v1/payments/webhook",
            json!({
                "reservation_id": reservation_id,
                "event_type": "SUCCESS",
                "amount": 24000
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["processed"], json!(true));

    let response = app
        .clone()
        .oneshot(get(&format!("/v1/reservations/{}", reservation_id)))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["status"], json!("CONFIRMED"));
}

#[tokio::test]
async fn test_double_booking_returns_conflict() {
    let app = test_app();

    let response = app
        .clone()
        .oneshot(post_json(
            "/v1/rooms",
            json!({
                "number": "201",
                "room_type": "DELUXE",
                "floor": 2,
                "capacity": 2,
                "base_rate": 18000
            }),
        ))
        .await
        .unwrap();
    let room = body_json(response).await;
    let room_id = room["id"].as_str().unwrap().to_string();

    let booking = |check_in: &str, check_out: &str| {
        json!({
            "guest_id": "7f8a9b1c-0d2e-4f3a-8b5c-6d7e8f9a0b1c",
            "guest_email": "guest@example.com",
            "check_in": check_in,
            "check_out": check_out,
            "room_ids": [room_id],
            "total_guests": 2
        })
    };

    let response = app
        .clone()
        .oneshot(post_json("/v1/reservations", booking("2024-06-02", "2024-06-04")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The same room for an overlapping stay is a conflict
    let response = app
        .clone()
        .oneshot(post_json("/v1/reservations", booking("2024-06-03", "2024-06-05")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["kind"], json!("conflict"));

    // A back-to-back stay is not
    let response = app
        .clone()
        .oneshot(post_json("/v1/reservations", booking("2024-06-04", "2024-06-06")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_validation_and_not_found() {
    let app = test_app();

    // Inverted date range
    let response = app
        .clone()
        .oneshot(post_json(
            "/v1/reservations",
            json!({
                "guest_id": "7f8a9b1c-0d2e-4f3a-8b5c-6d7e8f9a0b1c",
                "guest_email": "guest@example.com",
                "check_in": "2024-06-04",
                "check_out": "2024-06-02",
                "total_guests": 2
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Unknown hold token
    let response = app.clone().oneshot(get("/v1/holds/STAY-MISSING")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
