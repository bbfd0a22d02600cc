//! Messenger Platform wire types
//!
//! Outbound send envelopes, the inbound webhook schema and the send API
//! response.

use serde::{Deserialize, Deserializer, Serialize, de};

// ============================================================================
// Outbound
// ============================================================================

/// A message addressed to a single recipient
///
/// Serializes to `{"recipient":{"id":R},"message":{...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    /// Who receives the message
    pub recipient: Recipient,
    /// Message body
    pub message: MessageContent,
}

impl OutboundMessage {
    /// Create a plain text message
    #[must_use]
    pub fn text(recipient_id: i64, text: impl Into<String>) -> Self {
        Self {
            recipient: Recipient { id: recipient_id },
            message: MessageContent::Text { text: text.into() },
        }
    }

    /// Create a message carrying a single attachment fetched from `url`
    #[must_use]
    pub fn attachment(recipient_id: i64, kind: AttachmentKind, url: impl Into<String>) -> Self {
        Self {
            recipient: Recipient { id: recipient_id },
            message: MessageContent::Attachment {
                attachment: Attachment {
                    kind,
                    payload: AttachmentPayload {
                        url: url.into(),
                        is_reusable: None,
                    },
                },
            },
        }
    }
}

/// Message recipient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Recipient {
    /// Page-scoped user id
    pub id: i64,
}

/// Body of an outbound message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text
    Text {
        /// Text to deliver
        text: String,
    },
    /// Media or file attachment
    Attachment {
        /// Attachment description
        attachment: Attachment,
    },
}

/// Outbound attachment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    /// Attachment type
    #[serde(rename = "type")]
    pub kind: AttachmentKind,
    /// Where the platform fetches the attachment from
    pub payload: AttachmentPayload,
}

/// Supported outbound attachment types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    Audio,
    Video,
    File,
}

/// Attachment payload referencing a remote URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentPayload {
    /// Publicly reachable URL of the asset
    pub url: String,
    /// Ask the platform to keep the asset for reuse
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_reusable: Option<bool>,
}

// ============================================================================
// Inbound webhook
// ============================================================================

/// Batch of events delivered in one webhook call
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InboundRequest {
    /// Subscription object, `"page"` for Messenger
    #[serde(default)]
    pub object: String,
    /// Entries in delivery order
    #[serde(default)]
    pub entry: Vec<Entry>,
}

impl InboundRequest {
    /// Iterate all messaging events across entries in array order
    pub fn events(&self) -> impl Iterator<Item = &MessagingEvent> {
        self.entry.iter().flat_map(|entry| entry.messaging.iter())
    }
}

/// One page entry of a webhook batch
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Entry {
    /// Page id
    #[serde(default)]
    pub id: String,
    /// Batch time in milliseconds since the epoch
    #[serde(default)]
    pub time: i64,
    /// Messaging events in delivery order
    #[serde(default)]
    pub messaging: Vec<MessagingEvent>,
}

/// A single inbound notification
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawMessagingEvent")]
pub struct MessagingEvent {
    /// Page-scoped id of the user who triggered the event
    pub sender: i64,
    /// Page id the event was addressed to
    pub recipient: i64,
    /// Event time in milliseconds since the epoch
    pub timestamp: i64,
    /// What happened
    pub payload: EventPayload,
}

/// The populated variant of a messaging event
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Message(ReceivedMessage),
    Delivery(Delivery),
    Postback(Postback),
    Optin(Optin),
    Read(Read),
    /// None of the known variants was present (echo-only fields, reactions, ...)
    Unsupported,
}

impl EventPayload {
    /// Short name used in logs
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Message(_) => "message",
            Self::Delivery(_) => "delivery",
            Self::Postback(_) => "postback",
            Self::Optin(_) => "optin",
            Self::Read(_) => "read",
            Self::Unsupported => "unsupported",
        }
    }
}

/// Webhook shape with one optional field per variant
#[derive(Deserialize)]
struct RawMessagingEvent {
    #[serde(default)]
    sender: Participant,
    #[serde(default)]
    recipient: Participant,
    #[serde(default)]
    timestamp: i64,
    message: Option<ReceivedMessage>,
    delivery: Option<Delivery>,
    postback: Option<Postback>,
    optin: Option<Optin>,
    read: Option<Read>,
}

impl From<RawMessagingEvent> for MessagingEvent {
    fn from(raw: RawMessagingEvent) -> Self {
        // First populated field wins: message, delivery, postback, optin, read
        let payload = if let Some(message) = raw.message {
            EventPayload::Message(message)
        } else if let Some(delivery) = raw.delivery {
            EventPayload::Delivery(delivery)
        } else if let Some(postback) = raw.postback {
            EventPayload::Postback(postback)
        } else if let Some(optin) = raw.optin {
            EventPayload::Optin(optin)
        } else if let Some(read) = raw.read {
            EventPayload::Read(read)
        } else {
            EventPayload::Unsupported
        };

        Self {
            sender: raw.sender.id.0,
            recipient: raw.recipient.id.0,
            timestamp: raw.timestamp,
            payload,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct Participant {
    #[serde(default)]
    id: ParticipantId,
}

/// Numeric id the platform sends either as a number or as a string
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ParticipantId(pub(crate) i64);

impl<'de> Deserialize<'de> for ParticipantId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(id) => Ok(Self(id)),
            Raw::Text(text) => text
                .trim()
                .parse()
                .map(Self)
                .map_err(|_| de::Error::custom(format!("invalid participant id: {text}"))),
        }
    }
}

/// A message sent by a user to the page
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReceivedMessage {
    /// Message id
    #[serde(default)]
    pub mid: String,
    #[serde(default)]
    pub seq: Option<i64>,
    /// Text, absent for attachment-only messages
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub attachments: Vec<ReceivedAttachment>,
    /// Set when the user tapped a quick reply button
    #[serde(default)]
    pub quick_reply: Option<QuickReply>,
    /// Set when the page itself sent the message
    #[serde(default)]
    pub is_echo: bool,
}

/// Attachment on an inbound message
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReceivedAttachment {
    /// `image`, `audio`, `video`, `file`, `location` or `fallback`
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Option<ReceivedAttachmentPayload>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReceivedAttachmentPayload {
    #[serde(default)]
    pub url: Option<String>,
    /// Present on `location` attachments
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub long: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QuickReply {
    pub payload: String,
}

/// Delivery receipt for messages the page sent
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Delivery {
    /// Ids of the delivered messages, may be empty
    #[serde(default)]
    pub mids: Vec<String>,
    /// All messages sent before this time were delivered
    #[serde(default)]
    pub watermark: i64,
    #[serde(default)]
    pub seq: Option<i64>,
}

/// Button press
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Postback {
    /// Developer-defined payload attached to the button
    #[serde(default)]
    pub payload: String,
    /// Button title as shown to the user
    #[serde(default)]
    pub title: Option<String>,
}

/// Plugin opt-in
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Optin {
    /// The `data-ref` value passed through the plugin
    #[serde(rename = "ref", default)]
    pub reference: String,
}

/// Read receipt
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Read {
    /// All messages sent before this time were read
    #[serde(default)]
    pub watermark: i64,
    #[serde(default)]
    pub seq: Option<i64>,
}

// ============================================================================
// Send API response
// ============================================================================

/// Successful send result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendResponse {
    pub message_id: String,
    pub recipient_id: i64,
}

/// Error object returned by the Graph API
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlatformError {
    #[serde(default)]
    pub message: String,
    /// Error class, e.g. `OAuthException`
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub error_subcode: Option<i32>,
    #[serde(default)]
    pub fbtrace_id: Option<String>,
}

/// Send API body, carrying either the ids or an error
#[derive(Debug, Deserialize)]
pub(crate) struct RawSendResponse {
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub recipient_id: Option<ParticipantId>,
    #[serde(default)]
    pub error: Option<PlatformError>,
}
