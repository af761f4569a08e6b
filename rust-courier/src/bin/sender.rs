//! Courier Sender - publishes one synthetic customer record.
//!
//! Generates a random customer, publishes it as JSON to the configured
//! destination, waits for the broker's receipt, and exits. Any failure
//! ends the process with a non-zero status.

use anyhow::Result;
use tracing::info;

use courier::util::{random_customer, telemetry};
use courier::{Config, Publisher};

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();

    info!("sender_starting");

    let config = Config::from_env();
    info!(
        broker = %config.broker_addr(),
        destination = %config.stomp_destination,
        "config_loaded"
    );

    let publisher = Publisher::new(config);
    let customer = random_customer();

    publisher.publish_customer(&customer).await?;
    println!("Sent: {}", customer);

    publisher.close().await;

    info!(customer_id = customer.id, "sender_complete");

    Ok(())
}
