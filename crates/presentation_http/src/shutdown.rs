//! Graceful shutdown

use std::{future::Future, time::Duration};

use tokio::{signal, sync::Notify};
use tracing::info;

/// Default time allowed for open connections to close
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Wait for SIGINT or SIGTERM, then mark the server as draining
pub async fn shutdown_signal(draining: &Notify) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }

    draining.notify_one();
}

/// Drive `server` to completion, giving up `timeout` after `draining` fires
///
/// Returns `None` when the deadline passed before the server finished.
pub async fn run_until_drained<F>(
    server: F,
    draining: &Notify,
    timeout: Duration,
) -> Option<F::Output>
where
    F: Future,
{
    let deadline = async {
        draining.notified().await;
        info!("Waiting up to {:?} for connections to close...", timeout);
        tokio::time::sleep(timeout).await;
    };

    tokio::select! {
        output = server => Some(output),
        () = deadline => None,
    }
}
