//! Courier REST - JSON echo endpoint.
//!
//! Serves `POST /person`, which answers 201 with the posted JSON wrapped in
//! `{"status": "received", "data": ...}`.

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

use courier::util::{shutdown_signal, telemetry};
use courier::web::router;
use courier::Config;

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();

    info!("web_server_starting");

    let config = Config::from_env();
    let addr = config.http_addr();
    info!(address = %addr, "config_loaded");

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(address = %addr, "web_server_listening");

    axum::serve(listener, router())
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            info!("web_server_shutting_down");
        })
        .await
        .context("Server error")?;

    info!("web_server_shutdown_complete");

    Ok(())
}
