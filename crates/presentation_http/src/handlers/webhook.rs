//! Messenger webhook handlers
//!
//! Answers the subscription handshake and hands event batches to the
//! dispatcher.

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use integration_messenger::{VerificationError, VerifyQuery, decode_request};
use tracing::{debug, info, instrument, warn};

use crate::state::AppState;

/// Webhook verification (GET)
///
/// The platform sends a GET request to verify webhook ownership during
/// setup. On success the body is exactly `hub.challenge`; every failure
/// answers with an empty body.
#[instrument(skip(state, query))]
pub async fn verify_webhook(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> Response {
    match state.messenger.verify_subscription(&query) {
        Ok(challenge) => {
            info!("Messenger webhook verified successfully");
            (StatusCode::OK, challenge).into_response()
        },
        Err(VerificationError::TokenMismatch) => StatusCode::FORBIDDEN.into_response(),
        Err(VerificationError::NotConfigured) => {
            warn!("Webhook verification attempted but verify_token not configured");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        },
        Err(e) => {
            debug!(error = %e, "Rejected webhook verification");
            StatusCode::BAD_REQUEST.into_response()
        },
    }
}

/// Webhook event handler (POST)
///
/// Responds as soon as the handler tasks are spawned; it does not wait for
/// them to finish.
#[instrument(skip(state, body), fields(body_len = body.len()))]
pub async fn handle_webhook(State(state): State<AppState>, body: Bytes) -> Response {
    let request = match decode_request(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Failed to decode Messenger webhook payload");
            return StatusCode::BAD_REQUEST.into_response();
        },
    };

    let dispatched = state.dispatcher.dispatch(&state.messenger, request).await;
    let count = dispatched.len();
    dispatched.detach();

    debug!(dispatched = count, "Webhook batch handed off");
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "dispatched": count
        })),
    )
        .into_response()
}
