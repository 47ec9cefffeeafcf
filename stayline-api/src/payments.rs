use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;

use stayline_core::PaymentStatusEvent;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct WebhookResponse {
    processed: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/payments/webhook", post(payment_webhook))
}

/// Status signal from the payment collaborator. A Success drives the
/// Pending -> Confirmed transition; the engine never touches the money.
async fn payment_webhook(
    State(state): State<AppState>,
    Json(event): Json<PaymentStatusEvent>,
) -> Result<Json<WebhookResponse>, AppError> {
    let confirmed = state.lifecycle.handle_payment(event).await?;
    Ok(Json(WebhookResponse { processed: confirmed.is_some() }))
}
