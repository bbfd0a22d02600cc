//! Messenger webhook server
//!
//! Main entry point running the demo echo bot.

use std::{future::IntoFuture, sync::Arc, time::Duration};

use integration_messenger::{Dispatcher, Messenger};
use presentation_http::{
    AppConfig,
    bot::echo_handlers,
    init_logging, routes,
    shutdown::{DEFAULT_SHUTDOWN_TIMEOUT, run_until_drained, shutdown_signal},
    state::AppState,
};
use tokio::{net::TcpListener, sync::Notify};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let (config, load_error) = match AppConfig::load() {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    init_logging(config.log_format)?;

    if let Some(e) = load_error {
        warn!("Failed to load config, using defaults: {}", e);
    }

    info!("Messenger webhook server v{} starting...", env!("CARGO_PKG_VERSION"));

    info!(
        host = %config.server.host,
        port = %config.server.port,
        page_id = %config.messenger.page_id,
        max_concurrent_handlers = config.messenger.max_concurrent_handlers,
        "Configuration loaded"
    );

    let messenger = Messenger::new(config.messenger.to_client_config()?)
        .map_err(|e| anyhow::anyhow!("Failed to initialize Messenger client: {e}"))?;

    let dispatcher = Dispatcher::with_max_concurrency(
        echo_handlers(),
        config.messenger.max_concurrent_handlers,
    );

    let state = AppState {
        messenger,
        dispatcher,
    };

    let app = routes::create_router(state).layer(TraceLayer::new_for_http());

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;

    info!("Server listening on http://{}", addr);
    info!("Webhook endpoint: http://{}/webhook", addr);

    let shutdown_timeout = config
        .server
        .shutdown_timeout_secs
        .map_or(DEFAULT_SHUTDOWN_TIMEOUT, Duration::from_secs);

    let draining = Arc::new(Notify::new());
    let signal = {
        let draining = Arc::clone(&draining);
        async move { shutdown_signal(&draining).await }
    };
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(signal)
        .into_future();

    match run_until_drained(server, &draining, shutdown_timeout).await {
        Some(result) => {
            result?;
            info!("Server shutdown complete");
        },
        None => warn!(
            "Connections still open after {:?}, forcing shutdown",
            shutdown_timeout
        ),
    }

    Ok(())
}
