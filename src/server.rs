// src/server.rs
use std::time::Duration;

use axum::Router;
use axum_server::Handle;

use crate::config::ServerConfig;

/// Serves `router` until Ctrl-C, then drains in-flight requests for the
/// configured grace period.
pub async fn serve(router: Router, config: &ServerConfig, name: &'static str) -> std::io::Result<()> {
    let handle = Handle::new();
    tokio::spawn(shutdown_on_signal(handle.clone(), config.shutdown_grace, name));

    tracing::info!(service = name, addr = %config.bind_addr, "listening");

    axum_server::bind(config.bind_addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await?;

    tracing::info!(service = name, "shutdown complete");
    Ok(())
}

async fn shutdown_on_signal(handle: Handle, grace: Duration, name: &'static str) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!(service = name, grace_secs = grace.as_secs(), "shutdown signal received");
            handle.graceful_shutdown(Some(grace));
        }
        Err(e) => tracing::error!(error = %e, "unable to listen for shutdown signal"),
    }
}
