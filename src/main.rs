//! # DraftPress Workers
//!
//! Background job processor for a content-marketing service. Polls the
//! idea-generation and publishing queues, drives each job through the
//! retry protocol, and shuts down cleanly on SIGINT/SIGTERM.
//!
//! ## Usage
//!
//! ```bash
//! cargo run
//! ```

use color_eyre::Result;
use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

use draftpress::config::ServerConfig;
use draftpress::init::{initialize_app_state, initialize_queue, initialize_workers};
use draftpress::logging::setup_logging;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();
    setup_logging();

    let config = ServerConfig::from_env();
    let state = initialize_app_state(&config)?;
    let queue = initialize_queue(&config, &state).await;

    let token = CancellationToken::new();
    let workers_done = initialize_workers(&config, &state, queue, token.clone());

    shutdown_signal().await;
    info!("shutdown signal received, draining workers");
    token.cancel();

    // Workers finish their current message before stopping; a hung drain
    // must not block the exit forever. An undrained message stays leased
    // and is redelivered once its lease expires.
    match tokio::time::timeout(config.shutdown_timeout, workers_done).await {
        Ok(Ok(())) => info!("shutdown complete"),
        Ok(Err(_)) => error!("worker pool dropped its completion channel"),
        Err(_) => warn!(
            "workers did not drain within {:?}, forcing exit",
            config.shutdown_timeout
        ),
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
