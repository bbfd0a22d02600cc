//! Demo echo bot
//!
//! Replies to text with the same text, acknowledges attachments, postbacks
//! and opt-ins, and logs receipts.

use integration_messenger::{EventHandlers, Messenger, ReceivedMessage};
use tracing::{debug, warn};

/// Build the reply for an inbound message, `None` when nothing should be sent
pub fn echo_reply(message: &ReceivedMessage) -> Option<String> {
    if message.is_echo {
        return None;
    }
    if let Some(text) = message.text.as_deref().filter(|t| !t.is_empty()) {
        return Some(text.to_string());
    }
    message
        .attachments
        .first()
        .map(|attachment| format!("Received your {} attachment", attachment.kind))
}

async fn reply(messenger: &Messenger, recipient: i64, text: &str) {
    if let Err(e) = messenger.send_text_message(recipient, text).await {
        warn!(recipient, error = %e, "Failed to send reply");
    }
}

/// Handlers for the demo bot
pub fn echo_handlers() -> EventHandlers {
    EventHandlers::new()
        .on_message(|messenger, sender, message| async move {
            if let Some(text) = echo_reply(&message) {
                reply(&messenger, sender, &text).await;
            }
        })
        .on_postback(|messenger, sender, postback| async move {
            let text = format!("Postback received: {}", postback.payload);
            reply(&messenger, sender, &text).await;
        })
        .on_optin(|messenger, sender, optin| async move {
            debug!(sender, reference = %optin.reference, "Opt-in received");
            reply(&messenger, sender, "Thanks for subscribing!").await;
        })
        .on_delivery(|_, sender, delivery| async move {
            debug!(
                sender,
                messages = delivery.mids.len(),
                watermark = delivery.watermark,
                "Delivery confirmed"
            );
        })
        .on_read(|_, sender, read| async move {
            debug!(sender, watermark = read.watermark, "Messages read");
        })
}
