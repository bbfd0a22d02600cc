//! Messenger webhook HTTP presentation layer
//!
//! Hosts the webhook endpoint for the Messenger integration.

pub mod bot;
pub mod config;
pub mod handlers;
pub mod routes;
pub mod shutdown;
pub mod state;
pub mod telemetry;

pub use self::config::{AppConfig, LogFormat, MessengerAppConfig, ServerConfig};
pub use routes::create_router;
pub use state::AppState;
pub use telemetry::init_logging;
