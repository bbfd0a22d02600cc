//! Messenger webhook handling
//!
//! Decodes event batches and answers the subscription handshake.

use serde::Deserialize;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::{
    error::{MessengerError, VerificationError},
    types::InboundRequest,
};

/// Query parameters of the subscription handshake
///
/// `hub.mode=subscribe&hub.challenge=1085525140&hub.verify_token=my_token`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub hub_mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub hub_verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub hub_challenge: Option<String>,
}

/// Check a handshake against `verify_token` and return the challenge to echo
pub fn verify_subscription(
    query: &VerifyQuery,
    verify_token: &str,
) -> Result<String, VerificationError> {
    let Some(mode) = query.hub_mode.as_deref() else {
        return Err(VerificationError::MissingParameter("hub.mode"));
    };
    if mode != "subscribe" {
        debug!(mode = %mode, "Invalid hub.mode");
        return Err(VerificationError::InvalidMode(mode.to_string()));
    }

    let Some(token) = query.hub_verify_token.as_deref() else {
        return Err(VerificationError::MissingParameter("hub.verify_token"));
    };
    if !bool::from(token.as_bytes().ct_eq(verify_token.as_bytes())) {
        warn!("Webhook verification failed: token mismatch");
        return Err(VerificationError::TokenMismatch);
    }

    query
        .hub_challenge
        .clone()
        .ok_or(VerificationError::MissingParameter("hub.challenge"))
}

/// Decode a webhook body into an event batch
pub fn decode_request(body: &[u8]) -> Result<InboundRequest, MessengerError> {
    let request: InboundRequest = serde_json::from_slice(body)?;
    debug!(
        object = %request.object,
        entries = request.entry.len(),
        events = request.events().count(),
        "Decoded webhook payload"
    );
    Ok(request)
}
