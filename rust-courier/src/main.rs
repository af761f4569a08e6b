//! Courier Listener - prints JSON records arriving on the queue.
//!
//! Subscribes to the configured destination and prints every record until
//! SIGINT or SIGTERM, then disconnects from the broker.

use anyhow::Result;
use tracing::info;

use courier::queue::listener;
use courier::util::{shutdown_signal, telemetry};
use courier::Config;

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();

    info!("listener_starting");

    // Load configuration from environment
    let config = Config::from_env();
    info!(
        broker = %config.broker_addr(),
        destination = %config.stomp_destination,
        subscription_id = %config.stomp_subscription_id,
        ack_mode = %config.stomp_ack_mode,
        buffer = config.listener_buffer,
        "config_loaded"
    );

    println!("Listening on {}. Press Ctrl+C to stop...", config.stomp_destination);

    let stats = listener::run(
        &config,
        |payload| println!("Received: {}", payload),
        shutdown_signal(),
    )
    .await?;

    info!(
        received = stats.received,
        processed = stats.processed,
        rejected = stats.rejected,
        "listener_stopped"
    );

    Ok(())
}
