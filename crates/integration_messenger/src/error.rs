//! Error types for the Messenger integration

use thiserror::Error;

use crate::types::PlatformError;

/// Errors returned by the outbound client and the webhook decoder
#[derive(Debug, Error)]
pub enum MessengerError {
    /// HTTP request failed before a response body could be read
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Body was not valid JSON or did not match the expected schema
    #[error("Failed to decode payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// Platform answered with an error object
    #[error("Platform error (code {}): {}", .0.code, .0.message)]
    Platform(PlatformError),

    /// Platform answered with neither an error nor a message id
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Missing or invalid configuration
    #[error("Missing configuration: {0}")]
    Configuration(String),
}

impl MessengerError {
    /// Create a configuration error
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an unexpected response error
    #[must_use]
    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::UnexpectedResponse(msg.into())
    }

    /// The platform error payload, if the platform rejected the request
    #[must_use]
    pub const fn platform_error(&self) -> Option<&PlatformError> {
        match self {
            Self::Platform(err) => Some(err),
            _ => None,
        }
    }

    /// Whether the failure happened at the network level
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Request(_))
    }
}

/// Reasons a webhook subscription handshake is refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// No verify token is configured for this adapter
    #[error("Verify token not configured")]
    NotConfigured,

    /// A required `hub.*` query parameter is absent
    #[error("Missing query parameter: {0}")]
    MissingParameter(&'static str),

    /// `hub.mode` is something other than `subscribe`
    #[error("Invalid hub.mode: {0}")]
    InvalidMode(String),

    /// `hub.verify_token` does not match the configured secret
    #[error("Verify token mismatch")]
    TokenMismatch,
}
