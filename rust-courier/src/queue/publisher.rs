//! STOMP publisher for customer records.
//!
//! The publisher connects lazily on first publish and keeps the session for
//! later publishes. A failed publish drops the session so the next call
//! reconnects; nothing is retried.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::types::{Customer, JSON_CONTENT_TYPE};
use crate::stomp::StompConnection;
use crate::Config;

/// Cloneable publisher sharing one broker session.
#[derive(Clone)]
pub struct Publisher {
    inner: Arc<PublisherInner>,
}

struct PublisherInner {
    config: Config,
    connection: Mutex<Option<StompConnection>>,
}

impl Publisher {
    /// Create a publisher for the configured broker. Does not connect.
    pub fn new(config: Config) -> Self {
        Self {
            inner: Arc::new(PublisherInner {
                config,
                connection: Mutex::new(None),
            }),
        }
    }

    /// Destination every message is published to.
    pub fn destination(&self) -> &str {
        &self.inner.config.stomp_destination
    }

    /// Publish a customer record and wait for the broker's receipt.
    pub async fn publish_customer(&self, customer: &Customer) -> Result<()> {
        let body = customer.to_json().context("Failed to serialize customer")?;
        let destination = self.destination();

        let mut slot = self.inner.connection.lock().await;
        let mut conn = match slot.take() {
            Some(conn) => conn,
            None => {
                info!("stomp_publisher_connecting");
                StompConnection::connect(&self.inner.config)
                    .await
                    .context("Failed to connect to broker")?
            }
        };

        conn.send(destination, JSON_CONTENT_TYPE, body.as_bytes())
            .await
            .with_context(|| format!("Failed to publish to {}", destination))?;

        *slot = Some(conn);

        info!(
            destination = %destination,
            customer_id = customer.id,
            body_length = body.len(),
            "customer_published"
        );

        Ok(())
    }

    /// Close the session gracefully.
    pub async fn close(&self) {
        let conn = self.inner.connection.lock().await.take();

        if let Some(conn) = conn {
            if let Err(e) = conn.disconnect().await {
                warn!(error = %e, "stomp_disconnect_error");
            }
        }

        info!("stomp_publisher_closed");
    }
}
