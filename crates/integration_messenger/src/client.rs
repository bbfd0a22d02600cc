//! Messenger client for sending messages
//!
//! Uses the Graph API send endpoint (`me/messages`).

use std::sync::Arc;

use reqwest::{Client, Url, header::CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument, warn};

use crate::{
    error::{MessengerError, VerificationError},
    types::{AttachmentKind, OutboundMessage, RawSendResponse, SendResponse},
    webhook::{self, VerifyQuery},
};

/// Graph API root used when no override is configured
pub const DEFAULT_API_BASE_URL: &str = "https://graph.facebook.com/v2.6/";

/// Messenger client configuration
#[derive(Debug, Clone)]
pub struct MessengerConfig {
    /// Page access token
    pub access_token: SecretString,
    /// Shared secret for the webhook subscription handshake
    pub verify_token: Option<String>,
    /// Page the adapter acts for
    pub page_id: String,
    /// Graph API root, overridden in tests to point at a mock server
    pub api_base_url: String,
}

impl MessengerConfig {
    /// Create a config with the required access token
    #[must_use]
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            verify_token: None,
            page_id: String::new(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }

    /// Set the webhook verify token
    #[must_use]
    pub fn with_verify_token(mut self, token: impl Into<String>) -> Self {
        self.verify_token = Some(token.into());
        self
    }

    /// Set the page id
    #[must_use]
    pub fn with_page_id(mut self, page_id: impl Into<String>) -> Self {
        self.page_id = page_id.into();
        self
    }

    /// Set the Graph API root
    #[must_use]
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

/// Messenger Platform adapter
///
/// Cheap to clone; clones share the HTTP connection pool and config.
#[derive(Debug, Clone)]
pub struct Messenger {
    client: Client,
    config: Arc<MessengerConfig>,
    send_url: Url,
}

impl Messenger {
    /// Create a new adapter with a default HTTP client
    pub fn new(config: MessengerConfig) -> Result<Self, MessengerError> {
        Self::with_client(config, Client::new())
    }

    /// Create a new adapter using the given HTTP client
    pub fn with_client(config: MessengerConfig, client: Client) -> Result<Self, MessengerError> {
        if config.access_token.expose_secret().is_empty() {
            return Err(MessengerError::config("access_token is required"));
        }

        let base = config.api_base_url.trim();
        if base.is_empty() {
            return Err(MessengerError::config("api_base_url is required"));
        }
        let separator = if base.ends_with('/') { "" } else { "/" };
        let send_url = Url::parse(&format!("{base}{separator}me/messages"))
            .map_err(|e| MessengerError::config(format!("invalid api_base_url {base}: {e}")))?;

        Ok(Self {
            client,
            config: Arc::new(config),
            send_url,
        })
    }

    /// Send a message and wait for the platform's answer
    ///
    /// The response body is decoded whatever the HTTP status; an `error`
    /// object in it becomes [`MessengerError::Platform`].
    #[instrument(skip(self, message), fields(recipient = message.recipient.id))]
    pub async fn send_message(
        &self,
        message: &OutboundMessage,
    ) -> Result<SendResponse, MessengerError> {
        let body = serde_json::to_vec(message)?;

        debug!(body_len = body.len(), "Sending Messenger message");

        let response = self
            .client
            .post(self.send_url.clone())
            .query(&[("access_token", self.config.access_token.expose_secret())])
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;

        let result = decode_response(&bytes);
        match &result {
            Ok(sent) => debug!(message_id = %sent.message_id, "Message accepted"),
            Err(MessengerError::Platform(err)) => {
                warn!(status = %status, code = err.code, error = %err.message, "Send rejected by platform");
            },
            Err(err) => warn!(status = %status, error = %err, "Failed to decode send response"),
        }
        result
    }

    /// Send a plain text message
    pub async fn send_text_message(
        &self,
        recipient_id: i64,
        text: &str,
    ) -> Result<SendResponse, MessengerError> {
        self.send_message(&OutboundMessage::text(recipient_id, text))
            .await
    }

    /// Send an attachment hosted at `url`
    pub async fn send_attachment(
        &self,
        recipient_id: i64,
        kind: AttachmentKind,
        url: &str,
    ) -> Result<SendResponse, MessengerError> {
        self.send_message(&OutboundMessage::attachment(recipient_id, kind, url))
            .await
    }

    /// Answer a webhook subscription handshake (wrapper around
    /// [`webhook::verify_subscription`])
    pub fn verify_subscription(&self, query: &VerifyQuery) -> Result<String, VerificationError> {
        let Some(verify_token) = self.config.verify_token.as_deref() else {
            return Err(VerificationError::NotConfigured);
        };
        webhook::verify_subscription(query, verify_token)
    }

    /// Page the adapter acts for
    #[must_use]
    pub fn page_id(&self) -> &str {
        &self.config.page_id
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &MessengerConfig {
        &self.config
    }

    /// Send endpoint without the access token
    #[must_use]
    pub const fn send_url(&self) -> &Url {
        &self.send_url
    }
}

/// Decode a send API body into the ids or the platform error
fn decode_response(body: &[u8]) -> Result<SendResponse, MessengerError> {
    let raw: RawSendResponse = serde_json::from_slice(body)?;

    if let Some(error) = raw.error {
        return Err(MessengerError::Platform(error));
    }

    match (raw.message_id, raw.recipient_id) {
        (Some(message_id), Some(recipient_id)) => Ok(SendResponse {
            message_id,
            recipient_id: recipient_id.0,
        }),
        (None, _) => Err(MessengerError::unexpected("response has no message_id")),
        (Some(_), None) => Err(MessengerError::unexpected("response has no recipient_id")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> MessengerConfig {
        MessengerConfig::new("test_token")
            .with_verify_token("verify_test")
            .with_page_id("682498171943165")
    }

    #[test]
    fn client_creation_requires_access_token() {
        let result = Messenger::new(MessengerConfig::new(""));
        assert!(matches!(result, Err(MessengerError::Configuration(_))));
    }

    #[test]
    fn client_creation_rejects_invalid_base_url() {
        let result = Messenger::new(test_config().with_api_base_url("not a url"));
        assert!(matches!(result, Err(MessengerError::Configuration(_))));

        let result = Messenger::new(test_config().with_api_base_url("  "));
        assert!(matches!(result, Err(MessengerError::Configuration(_))));
    }

    #[test]
    fn default_send_url() {
        let messenger = Messenger::new(test_config()).unwrap();
        assert_eq!(
            messenger.send_url().as_str(),
            "https://graph.facebook.com/v2.6/me/messages"
        );
    }

    #[test]
    fn send_url_adds_missing_slash() {
        let messenger =
            Messenger::new(test_config().with_api_base_url("http://127.0.0.1:9000/v2.6")).unwrap();
        assert_eq!(
            messenger.send_url().as_str(),
            "http://127.0.0.1:9000/v2.6/me/messages"
        );
    }

    #[test]
    fn page_id_getter() {
        let messenger = Messenger::new(test_config()).unwrap();
        assert_eq!(messenger.page_id(), "682498171943165");
    }

    #[test]
    fn config_getter() {
        let messenger = Messenger::new(test_config()).unwrap();
        let config = messenger.config();
        assert_eq!(config.verify_token.as_deref(), Some("verify_test"));
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn debug_does_not_leak_token() {
        let messenger = Messenger::new(test_config()).unwrap();
        let debug = format!("{messenger:?}");
        assert!(!debug.contains("test_token"));
    }

    #[test]
    fn verify_requires_configured_token() {
        let messenger = Messenger::new(MessengerConfig::new("token")).unwrap();
        let query = VerifyQuery {
            hub_mode: Some("subscribe".to_string()),
            hub_verify_token: Some(String::new()),
            hub_challenge: Some("1".to_string()),
        };
        assert_eq!(
            messenger.verify_subscription(&query),
            Err(VerificationError::NotConfigured)
        );
    }

    #[test]
    fn verify_uses_configured_token() {
        let messenger = Messenger::new(test_config()).unwrap();
        let query = VerifyQuery {
            hub_mode: Some("subscribe".to_string()),
            hub_verify_token: Some("verify_test".to_string()),
            hub_challenge: Some("1085525140".to_string()),
        };
        assert_eq!(
            messenger.verify_subscription(&query).as_deref(),
            Ok("1085525140")
        );
    }

    #[test]
    fn decode_success_response() {
        let body = br#"{"recipient_id":"1008372609250235","message_id":"mid.1456970487936"}"#;
        let response = decode_response(body).unwrap();
        assert_eq!(response.recipient_id, 1_008_372_609_250_235);
        assert_eq!(response.message_id, "mid.1456970487936");
    }

    #[test]
    fn decode_error_response() {
        let body = br#"{"error":{"message":"(#100) No matching user found","type":"OAuthException","code":100,"error_subcode":2018001}}"#;
        let err = decode_response(body).unwrap_err();
        let platform = err.platform_error().unwrap();
        assert_eq!(platform.code, 100);
        assert_eq!(platform.error_subcode, Some(2_018_001));
    }

    #[test]
    fn decode_error_wins_over_ids() {
        let body = br#"{"message_id":"m","recipient_id":1,"error":{"message":"boom","code":2}}"#;
        assert!(matches!(
            decode_response(body),
            Err(MessengerError::Platform(_))
        ));
    }

    #[test]
    fn decode_error_without_message() {
        let body = br#"{"error":{"code":100,"type":"OAuthException"}}"#;
        let err = decode_response(body).unwrap_err();
        let platform = err.platform_error().unwrap();
        assert_eq!(platform.code, 100);
        assert_eq!(platform.kind.as_deref(), Some("OAuthException"));
        assert!(platform.message.is_empty());
    }

    #[test]
    fn decode_malformed_response() {
        assert!(matches!(
            decode_response(b"<html>bad gateway</html>"),
            Err(MessengerError::Decode(_))
        ));
    }

    #[test]
    fn decode_empty_object_is_unexpected() {
        assert!(matches!(
            decode_response(b"{}"),
            Err(MessengerError::UnexpectedResponse(_))
        ));
    }
}
