//! Messenger Platform integration
//!
//! Sends chat messages through the Graph API send endpoint and turns
//! webhook callbacks into typed events for registered handlers.
//!
//! # Example
//!
//! ```no_run
//! use integration_messenger::{
//!     Dispatcher, EventHandlers, Messenger, MessengerConfig, decode_request,
//! };
//!
//! # async fn example(body: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
//! let messenger = Messenger::new(
//!     MessengerConfig::new("PAGE_ACCESS_TOKEN").with_verify_token("my_verify_token"),
//! )?;
//!
//! let dispatcher = Dispatcher::new(EventHandlers::new().on_message(
//!     |messenger, sender, message| async move {
//!         if let Some(text) = message.text {
//!             let _ = messenger.send_text_message(sender, &text).await;
//!         }
//!     },
//! ));
//!
//! let request = decode_request(body)?;
//! dispatcher.dispatch(&messenger, request).await.detach();
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod dispatch;
pub mod error;
pub mod types;
pub mod webhook;

pub use client::{DEFAULT_API_BASE_URL, Messenger, MessengerConfig};
pub use dispatch::{Dispatched, Dispatcher, EventHandlers};
pub use error::{MessengerError, VerificationError};
pub use types::{
    Attachment, AttachmentKind, AttachmentPayload, Delivery, Entry, EventPayload,
    InboundRequest, MessageContent, MessagingEvent, Optin, OutboundMessage, PlatformError,
    Postback, QuickReply, Read, ReceivedAttachment, ReceivedMessage, Recipient, SendResponse,
};
pub use webhook::{VerifyQuery, decode_request, verify_subscription};
