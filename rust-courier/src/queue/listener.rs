//! Customer queue listener.
//!
//! A receiver task reads MESSAGE frames off the broker connection and pushes
//! them into a bounded channel; a processing task decodes each body and hands
//! the record to the caller's handler. The listener runs until the shutdown
//! future completes or the broker ends the session.
//!
//! ```text
//! broker → receiver task → mpsc (bounded) → processing task → handler
//!                                                  └→ ACK/NACK (client ack modes)
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::types::Payload;
use crate::stomp::{
    AckMode, Delivery, FrameWriter, Inbound, StompConnection, StompError, DISCONNECT_RECEIPT,
};
use crate::Config;

/// Counters reported when the listener stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerStats {
    /// MESSAGE frames read from the broker
    pub received: u64,
    /// Messages decoded and passed to the handler
    pub processed: u64,
    /// Messages whose body was not JSON
    pub rejected: u64,
}

/// Subscribe to the configured destination and feed every decoded body to
/// `handler`.
///
/// Bodies that parse as a [`Customer`](super::Customer) arrive as
/// [`Payload::Customer`]; any other JSON document arrives as
/// [`Payload::Other`]. Bodies that are not JSON are logged and rejected.
///
/// When `shutdown` completes, the listener sends DISCONNECT, keeps draining
/// deliveries until the broker's receipt arrives, lets the handler finish the
/// buffered ones, and closes the socket.
///
/// In [`AckMode::Auto`] the broker drops a message once it is dispatched, so
/// anything lost between dispatch and the handler is gone. In the client
/// modes a message is ACKed only after the handler returned; deliveries left
/// unacknowledged at DISCONNECT are redelivered by the broker.
pub async fn run<H, S>(config: &Config, handler: H, shutdown: S) -> Result<ListenerStats>
where
    H: FnMut(Payload) + Send + 'static,
    S: Future<Output = ()>,
{
    let ack_mode = config.stomp_ack_mode;

    let mut conn = StompConnection::connect(config)
        .await
        .context("Failed to connect to broker")?;

    conn.subscribe(
        &config.stomp_destination,
        &config.stomp_subscription_id,
        ack_mode,
    )
    .await
    .context("Failed to subscribe")?;

    let writer = conn.writer();
    let (tx, rx) = mpsc::channel(config.listener_buffer.max(1));
    let received = Arc::new(AtomicU64::new(0));

    let mut receiver = tokio::spawn(receive(conn, tx, received.clone()));
    let processor = tokio::spawn(process(rx, writer.clone(), ack_mode, handler));

    info!(
        destination = %config.stomp_destination,
        ack_mode = %ack_mode,
        buffer = config.listener_buffer,
        "listener_ready"
    );

    tokio::pin!(shutdown);

    let joined = tokio::select! {
        _ = &mut shutdown => {
            info!("listener_stopping");
            if let Err(e) = writer.disconnect().await {
                warn!(error = %e, "stomp_disconnect_send_failed");
                receiver.abort();
            }
            receiver.await
        }
        joined = &mut receiver => joined,
    };

    // The receiver dropped its sender, so the processor drains and exits.
    let (processed, rejected) = processor.await.context("Processing task failed")?;

    if let Err(e) = writer.shutdown().await {
        warn!(error = %e, "stomp_shutdown_failed");
    }

    match joined {
        Ok(result) => result.context("Broker session failed")?,
        Err(e) if e.is_cancelled() => {}
        Err(e) => return Err(e).context("Receiver task failed"),
    }

    let stats = ListenerStats {
        received: received.load(Ordering::Relaxed),
        processed,
        rejected,
    };

    info!(
        received = stats.received,
        processed = stats.processed,
        rejected = stats.rejected,
        "listener_shutdown_complete"
    );

    Ok(stats)
}

/// Forward deliveries until the DISCONNECT receipt, end of stream, or error.
///
/// `received` is bumped before each delivery is queued, so the count holds
/// even when the task is aborted.
async fn receive(
    mut conn: StompConnection,
    tx: mpsc::Sender<Delivery>,
    received: Arc<AtomicU64>,
) -> Result<(), StompError> {
    loop {
        match conn.recv().await? {
            Some(Inbound::Message(delivery)) => {
                received.fetch_add(1, Ordering::Relaxed);
                info!(
                    message_id = %delivery.message_id,
                    subscription = %delivery.subscription,
                    destination = %delivery.destination,
                    body_length = delivery.body.len(),
                    "stomp_message_received"
                );
                if tx.send(delivery).await.is_err() {
                    warn!("listener_processor_gone");
                    break;
                }
            }
            Some(Inbound::Receipt(id)) if id == DISCONNECT_RECEIPT => {
                info!("stomp_disconnect_receipt");
                break;
            }
            Some(Inbound::Receipt(id)) => {
                warn!(receipt = %id, "stomp_unexpected_receipt");
            }
            None => {
                warn!("stomp_connection_closed");
                break;
            }
        }
    }

    Ok(())
}

/// Decode deliveries and run the handler. Returns `(processed, rejected)`.
async fn process<H>(
    mut rx: mpsc::Receiver<Delivery>,
    writer: FrameWriter,
    ack_mode: AckMode,
    mut handler: H,
) -> (u64, u64)
where
    H: FnMut(Payload),
{
    let mut processed = 0u64;
    let mut rejected = 0u64;

    while let Some(delivery) = rx.recv().await {
        let accepted = match Payload::from_slice(&delivery.body) {
            Ok(payload) => {
                match &payload {
                    Payload::Customer(customer) => {
                        if let Err(e) = customer.validate() {
                            warn!(
                                message_id = %delivery.message_id,
                                customer_id = customer.id,
                                error = %e,
                                "customer_invalid"
                            );
                        }
                    }
                    Payload::Other(_) => {
                        warn!(message_id = %delivery.message_id, "payload_not_a_customer");
                    }
                }
                handler(payload);
                processed += 1;
                true
            }
            Err(e) => {
                error!(
                    message_id = %delivery.message_id,
                    error = %e,
                    "payload_parse_failed"
                );
                rejected += 1;
                false
            }
        };

        if !ack_mode.requires_ack() {
            continue;
        }

        let Some(ack_id) = delivery.ack.as_deref() else {
            warn!(message_id = %delivery.message_id, "stomp_ack_header_missing");
            continue;
        };

        let result = if accepted {
            writer.ack(ack_id).await
        } else {
            writer.nack(ack_id).await
        };

        if let Err(e) = result {
            warn!(
                message_id = %delivery.message_id,
                accepted = accepted,
                error = %e,
                "stomp_ack_failed"
            );
        }
    }

    (processed, rejected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::Customer;
    use crate::stomp::testing::{self, MockBroker};
    use crate::stomp::{Command, Frame};
    use tokio::sync::oneshot;

    const ADA_JSON: &[u8] =
        br#"{"id":1234,"name":"Ada Lovelace","country":"UK","website":"http://example.com"}"#;

    fn ada() -> Customer {
        Customer {
            id: 1234,
            name: "Ada Lovelace".to_string(),
            country: "UK".to_string(),
            website: "http://example.com".to_string(),
        }
    }

    fn customer_with_id(id: u32) -> Customer {
        Customer { id, ..ada() }
    }

    /// Handler forwarding payloads to a channel the test can await.
    fn collecting_handler() -> (
        impl FnMut(Payload) + Send + 'static,
        mpsc::UnboundedReceiver<Payload>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handler = move |payload| {
            let _ = tx.send(payload);
        };
        (handler, rx)
    }

    #[tokio::test]
    async fn test_listener_auto_ack_delivers_record() {
        let broker = MockBroker::bind().await;
        let config = broker.config();

        let server = tokio::spawn(async move {
            let (mut reader, mut writer) = broker.accept().await;
            testing::expect(&mut reader, Command::Connect).await;
            testing::send(&mut writer, &testing::connected()).await;
            let subscribe = testing::expect(&mut reader, Command::Subscribe).await;
            testing::send(
                &mut writer,
                &testing::message("/queue/test", "1", "m-1", None, ADA_JSON),
            )
            .await;
            let rest = testing::drain(&mut reader, &mut writer).await;
            (subscribe, rest)
        });

        let (handler, mut seen) = collecting_handler();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let listener = tokio::spawn(async move {
            run(&config, handler, async {
                let _ = stop_rx.await;
            })
            .await
        });

        assert_eq!(seen.recv().await.unwrap(), Payload::Customer(ada()));
        stop_tx.send(()).unwrap();

        let stats = listener.await.unwrap().unwrap();
        assert_eq!(
            stats,
            ListenerStats {
                received: 1,
                processed: 1,
                rejected: 0
            }
        );

        let (subscribe, rest) = server.await.unwrap();
        assert_eq!(subscribe.header("destination"), Some("/queue/test"));
        assert_eq!(subscribe.header("id"), Some("1"));
        assert_eq!(subscribe.header("ack"), Some("auto"));

        let commands: Vec<Command> = rest.iter().map(|f| f.command).collect();
        assert_eq!(commands, vec![Command::Disconnect]);
    }

    #[tokio::test]
    async fn test_listener_client_individual_acks_and_nacks() {
        let broker = MockBroker::bind().await;
        let mut config = broker.config();
        config.stomp_ack_mode = AckMode::ClientIndividual;

        let server = tokio::spawn(async move {
            let (mut reader, mut writer) = broker.accept().await;
            testing::expect(&mut reader, Command::Connect).await;
            testing::send(&mut writer, &testing::connected()).await;
            let subscribe = testing::expect(&mut reader, Command::Subscribe).await;
            testing::send(
                &mut writer,
                &testing::message("/queue/test", "1", "m-1", Some("a-1"), b"not json"),
            )
            .await;
            testing::send(
                &mut writer,
                &testing::message("/queue/test", "1", "m-2", Some("a-2"), ADA_JSON),
            )
            .await;
            let rest = testing::drain(&mut reader, &mut writer).await;
            (subscribe, rest)
        });

        let (handler, mut seen) = collecting_handler();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let listener = tokio::spawn(async move {
            run(&config, handler, async {
                let _ = stop_rx.await;
            })
            .await
        });

        assert_eq!(seen.recv().await.unwrap(), Payload::Customer(ada()));
        stop_tx.send(()).unwrap();

        let stats = listener.await.unwrap().unwrap();
        assert_eq!(stats.received, 2);
        assert_eq!(stats.processed, 1);
        assert_eq!(stats.rejected, 1);

        let (subscribe, rest) = server.await.unwrap();
        assert_eq!(subscribe.header("ack"), Some("client-individual"));

        let nack = rest.iter().find(|f| f.command == Command::Nack).unwrap();
        assert_eq!(nack.header("id"), Some("a-1"));
        let ack = rest.iter().find(|f| f.command == Command::Ack).unwrap();
        assert_eq!(ack.header("id"), Some("a-2"));
        assert!(rest.iter().any(|f| f.command == Command::Disconnect));
    }

    #[tokio::test]
    async fn test_listener_passes_through_off_schema_json() {
        let broker = MockBroker::bind().await;
        let mut config = broker.config();
        config.stomp_ack_mode = AckMode::ClientIndividual;

        let server = tokio::spawn(async move {
            let (mut reader, mut writer) = broker.accept().await;
            testing::expect(&mut reader, Command::Connect).await;
            testing::send(&mut writer, &testing::connected()).await;
            testing::expect(&mut reader, Command::Subscribe).await;
            testing::send(
                &mut writer,
                &testing::message("/queue/test", "1", "m-1", Some("a-1"), br#"{"id":"abc"}"#),
            )
            .await;
            testing::drain(&mut reader, &mut writer).await
        });

        let (handler, mut seen) = collecting_handler();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let listener = tokio::spawn(async move {
            run(&config, handler, async {
                let _ = stop_rx.await;
            })
            .await
        });

        let payload = seen.recv().await.unwrap();
        assert_eq!(payload, Payload::Other(serde_json::json!({"id": "abc"})));
        assert_eq!(payload.to_string(), r#"{"id":"abc"}"#);
        stop_tx.send(()).unwrap();

        let stats = listener.await.unwrap().unwrap();
        assert_eq!(stats.received, 1);
        assert_eq!(stats.processed, 1);
        assert_eq!(stats.rejected, 0);

        let rest = server.await.unwrap();
        let ack = rest.iter().find(|f| f.command == Command::Ack).unwrap();
        assert_eq!(ack.header("id"), Some("a-1"));
        assert!(!rest.iter().any(|f| f.command == Command::Nack));
    }

    #[tokio::test]
    async fn test_listener_drains_buffered_deliveries_on_shutdown() {
        let broker = MockBroker::bind().await;
        let mut config = broker.config();
        config.listener_buffer = 1;

        let server = tokio::spawn(async move {
            let (mut reader, mut writer) = broker.accept().await;
            testing::expect(&mut reader, Command::Connect).await;
            testing::send(&mut writer, &testing::connected()).await;
            testing::expect(&mut reader, Command::Subscribe).await;

            for id in 1001..=1003u32 {
                let body = serde_json::to_vec(&customer_with_id(id)).unwrap();
                let message_id = format!("m-{}", id);
                let message = testing::message("/queue/test", "1", &message_id, None, &body);
                testing::send(&mut writer, &message).await;
            }

            // Still dispatching when the client asks to leave.
            let disconnect = testing::expect(&mut reader, Command::Disconnect).await;
            let body = serde_json::to_vec(&customer_with_id(1004)).unwrap();
            let late = testing::message("/queue/test", "1", "m-1004", None, &body);
            testing::send(&mut writer, &late).await;

            let receipt = disconnect.header("receipt").unwrap().to_string();
            testing::send(&mut writer, &testing::receipt(&receipt)).await;
            testing::drain(&mut reader, &mut writer).await
        });

        let (handler, mut seen) = collecting_handler();
        let stats = run(&config, handler, std::future::ready(()))
            .await
            .unwrap();
        let rest = server.await.unwrap();

        let mut ids = Vec::new();
        while let Ok(payload) = seen.try_recv() {
            match payload {
                Payload::Customer(customer) => ids.push(customer.id),
                other => panic!("unexpected payload {:?}", other),
            }
        }
        assert_eq!(ids, vec![1001, 1002, 1003, 1004]);

        assert_eq!(stats.received, 4);
        assert_eq!(stats.processed, stats.received);
        assert_eq!(stats.rejected, 0);
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_receive_counts_deliveries_before_abort() {
        let broker = MockBroker::bind().await;
        let config = broker.config();

        let server = tokio::spawn(async move {
            let (mut reader, mut writer) = broker.accept().await;
            testing::expect(&mut reader, Command::Connect).await;
            testing::send(&mut writer, &testing::connected()).await;
            for id in ["m-1", "m-2"] {
                testing::send(
                    &mut writer,
                    &testing::message("/queue/test", "1", id, None, ADA_JSON),
                )
                .await;
            }
            // Hold the session open until the client side goes away.
            testing::drain(&mut reader, &mut writer).await
        });

        let conn = StompConnection::connect(&config).await.unwrap();
        let (tx, mut rx) = mpsc::channel(4);
        let received = Arc::new(AtomicU64::new(0));
        let task = tokio::spawn(receive(conn, tx, received.clone()));

        assert_eq!(rx.recv().await.unwrap().message_id, "m-1");
        assert_eq!(rx.recv().await.unwrap().message_id, "m-2");

        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
        assert_eq!(received.load(Ordering::Relaxed), 2);

        assert!(server.await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_listener_stops_when_broker_closes() {
        let broker = MockBroker::bind().await;
        let config = broker.config();

        let server = tokio::spawn(async move {
            let (mut reader, mut writer) = broker.accept().await;
            testing::expect(&mut reader, Command::Connect).await;
            testing::send(&mut writer, &testing::connected()).await;
            testing::expect(&mut reader, Command::Subscribe).await;
            testing::send(
                &mut writer,
                &testing::message("/queue/test", "1", "m-1", None, ADA_JSON),
            )
            .await;
        });

        let (handler, mut seen) = collecting_handler();
        let stats = run(&config, handler, std::future::pending::<()>())
            .await
            .unwrap();
        server.await.unwrap();

        assert_eq!(stats.received, 1);
        assert_eq!(stats.processed, 1);
        assert_eq!(seen.recv().await.unwrap(), Payload::Customer(ada()));
    }

    #[tokio::test]
    async fn test_listener_fails_on_error_frame() {
        let broker = MockBroker::bind().await;
        let config = broker.config();

        let server = tokio::spawn(async move {
            let (mut reader, mut writer) = broker.accept().await;
            testing::expect(&mut reader, Command::Connect).await;
            testing::send(&mut writer, &testing::connected()).await;
            testing::expect(&mut reader, Command::Subscribe).await;
            let error =
                Frame::new(Command::Error).with_header("message", "destination does not exist");
            testing::send(&mut writer, &error).await;
        });

        let (handler, _seen) = collecting_handler();
        let err = run(&config, handler, std::future::pending::<()>())
            .await
            .unwrap_err();
        server.await.unwrap();

        let chain = format!("{:#}", err);
        assert!(chain.contains("destination does not exist"), "{}", chain);
    }

    #[tokio::test]
    async fn test_listener_connect_failure() {
        let broker = MockBroker::bind().await;
        let config = broker.config();
        drop(broker);

        let (handler, _seen) = collecting_handler();
        let err = run(&config, handler, std::future::pending::<()>())
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to connect to broker"));
    }
}
