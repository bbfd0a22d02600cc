//! Application state shared across handlers

use integration_messenger::{Dispatcher, Messenger};

/// Shared application state
#[derive(Debug, Clone)]
pub struct AppState {
    /// Platform adapter used for verification and replies
    pub messenger: Messenger,
    /// Routes decoded webhook events to the registered handlers
    pub dispatcher: Dispatcher,
}
