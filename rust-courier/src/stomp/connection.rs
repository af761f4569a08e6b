//! STOMP connection over TCP.
//!
//! The read half is owned by [`StompConnection`]; the write half sits behind
//! a [`FrameWriter`] so acknowledgements can be sent from another task while
//! the connection keeps reading.

use std::sync::Arc;

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::ack::AckMode;
use super::error::StompError;
use super::frame::{read_frame, write_frame, Command, Frame};
use crate::Config;

/// Receipt id attached to the DISCONNECT frame.
pub const DISCONNECT_RECEIPT: &str = "disconnect";

/// A MESSAGE frame delivered on a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub message_id: String,
    pub subscription: String,
    pub destination: String,
    /// Value to echo in ACK/NACK frames. Only present in client ack modes.
    pub ack: Option<String>,
    pub body: Vec<u8>,
}

impl Delivery {
    fn from_frame(frame: Frame) -> Self {
        let field = |name: &str| frame.header(name).unwrap_or_default().to_string();
        Delivery {
            message_id: field("message-id"),
            subscription: field("subscription"),
            destination: field("destination"),
            ack: frame.header("ack").map(str::to_string),
            body: frame.body,
        }
    }
}

/// A frame the listener cares about.
#[derive(Debug)]
pub enum Inbound {
    Message(Delivery),
    Receipt(String),
}

/// Shared, cloneable handle to the write half of a connection.
#[derive(Clone)]
pub struct FrameWriter {
    inner: Arc<Mutex<OwnedWriteHalf>>,
}

impl FrameWriter {
    pub async fn send_frame(&self, frame: &Frame) -> Result<(), StompError> {
        let mut writer = self.inner.lock().await;
        write_frame(&mut *writer, frame).await
    }

    /// Acknowledge a delivery by its `ack` header.
    pub async fn ack(&self, ack_id: &str) -> Result<(), StompError> {
        self.send_frame(&Frame::new(Command::Ack).with_header("id", ack_id))
            .await
    }

    /// Reject a delivery by its `ack` header.
    pub async fn nack(&self, ack_id: &str) -> Result<(), StompError> {
        self.send_frame(&Frame::new(Command::Nack).with_header("id", ack_id))
            .await
    }

    /// Send DISCONNECT. The broker answers with a RECEIPT for
    /// [`DISCONNECT_RECEIPT`] on the read side.
    pub async fn disconnect(&self) -> Result<(), StompError> {
        self.send_frame(&Frame::new(Command::Disconnect).with_header("receipt", DISCONNECT_RECEIPT))
            .await
    }

    /// Close the write side of the socket.
    pub async fn shutdown(&self) -> Result<(), StompError> {
        let mut writer = self.inner.lock().await;
        writer.shutdown().await?;
        Ok(())
    }
}

/// An established STOMP session.
pub struct StompConnection {
    reader: BufReader<OwnedReadHalf>,
    writer: FrameWriter,
    next_receipt: u64,
    session: Option<String>,
}

impl StompConnection {
    /// Open a TCP connection and complete the CONNECT/CONNECTED handshake.
    pub async fn connect(config: &Config) -> Result<Self, StompError> {
        let addr = config.broker_addr();
        info!(addr = %addr, "stomp_connecting");

        let stream = TcpStream::connect(&addr).await?;
        let (read_half, write_half) = stream.into_split();

        let mut conn = StompConnection {
            reader: BufReader::new(read_half),
            writer: FrameWriter {
                inner: Arc::new(Mutex::new(write_half)),
            },
            next_receipt: 0,
            session: None,
        };

        let connect = Frame::new(Command::Connect)
            .with_header("accept-version", "1.2")
            .with_header("host", config.stomp_host.as_str())
            .with_header("login", config.stomp_login.as_str())
            .with_header("passcode", config.stomp_passcode.as_str())
            .with_header("heart-beat", "0,0");
        conn.writer.send_frame(&connect).await?;

        let reply = conn.read().await?.ok_or(StompError::ConnectionClosed)?;
        match reply.command {
            Command::Connected => {
                conn.session = reply.header("session").map(str::to_string);
                info!(
                    addr = %addr,
                    version = reply.header("version").unwrap_or("1.0"),
                    session = ?conn.session,
                    server = ?reply.header("server"),
                    "stomp_connected"
                );
                Ok(conn)
            }
            Command::Error => Err(broker_error(reply)),
            other => Err(StompError::UnexpectedFrame {
                expected: "CONNECTED",
                got: other,
            }),
        }
    }

    /// A handle for writing frames from other tasks.
    pub fn writer(&self) -> FrameWriter {
        self.writer.clone()
    }

    async fn read(&mut self) -> Result<Option<Frame>, StompError> {
        read_frame(&mut self.reader).await
    }

    fn receipt_id(&mut self, prefix: &str) -> String {
        self.next_receipt += 1;
        format!("{}-{}", prefix, self.next_receipt)
    }

    /// Publish `body` to `destination` and wait for the broker's receipt.
    pub async fn send(
        &mut self,
        destination: &str,
        content_type: &str,
        body: &[u8],
    ) -> Result<(), StompError> {
        let receipt = self.receipt_id("send");
        let frame = Frame::new(Command::Send)
            .with_header("destination", destination)
            .with_header("content-type", content_type)
            .with_header("receipt", receipt.as_str())
            .with_body(body);

        self.writer.send_frame(&frame).await?;
        self.await_receipt(&receipt).await
    }

    /// Subscribe to `destination` under subscription `id`.
    pub async fn subscribe(
        &mut self,
        destination: &str,
        id: &str,
        ack: AckMode,
    ) -> Result<(), StompError> {
        let frame = Frame::new(Command::Subscribe)
            .with_header("destination", destination)
            .with_header("id", id)
            .with_header("ack", ack.as_str());
        self.writer.send_frame(&frame).await?;

        info!(destination = %destination, id = %id, ack = %ack, "stomp_subscribed");
        Ok(())
    }

    /// Read until a MESSAGE or RECEIPT arrives.
    ///
    /// Returns `Ok(None)` when the broker closes the connection.
    pub async fn recv(&mut self) -> Result<Option<Inbound>, StompError> {
        loop {
            let frame = match self.read().await? {
                Some(frame) => frame,
                None => return Ok(None),
            };

            match frame.command {
                Command::Message => return Ok(Some(Inbound::Message(Delivery::from_frame(frame)))),
                Command::Receipt => {
                    let id = frame.header("receipt-id").unwrap_or_default().to_string();
                    return Ok(Some(Inbound::Receipt(id)));
                }
                Command::Error => return Err(broker_error(frame)),
                other => {
                    debug!(command = %other, "stomp_frame_ignored");
                }
            }
        }
    }

    async fn await_receipt(&mut self, receipt: &str) -> Result<(), StompError> {
        loop {
            match self.recv().await? {
                Some(Inbound::Receipt(id)) if id == receipt => return Ok(()),
                Some(Inbound::Receipt(id)) => {
                    warn!(expected = %receipt, got = %id, "stomp_unexpected_receipt");
                }
                Some(Inbound::Message(delivery)) => {
                    warn!(
                        message_id = %delivery.message_id,
                        "stomp_message_while_awaiting_receipt"
                    );
                }
                None => return Err(StompError::ConnectionClosed),
            }
        }
    }

    /// Send DISCONNECT, wait for its receipt, and close the socket.
    ///
    /// A broker that closes the connection instead of sending the receipt is
    /// treated as a clean disconnect.
    pub async fn disconnect(mut self) -> Result<(), StompError> {
        self.writer.disconnect().await?;

        match self.await_receipt(DISCONNECT_RECEIPT).await {
            Ok(()) | Err(StompError::ConnectionClosed) => {}
            Err(e) => return Err(e),
        }

        if let Err(e) = self.writer.shutdown().await {
            debug!(error = %e, "stomp_shutdown_failed");
        }

        info!(session = ?self.session, "stomp_disconnected");
        Ok(())
    }
}

/// Turn an ERROR frame into [`StompError::Broker`].
fn broker_error(frame: Frame) -> StompError {
    StompError::Broker {
        message: frame.header("message").unwrap_or("unknown error").to_string(),
        details: frame.body_text(),
    }
}
