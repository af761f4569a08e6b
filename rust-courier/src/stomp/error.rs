//! STOMP protocol errors.

use thiserror::Error;

use super::frame::Command;

/// Errors raised by the STOMP codec and connection.
#[derive(Debug, Error)]
pub enum StompError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed by broker")]
    ConnectionClosed,

    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// The broker answered with an ERROR frame.
    #[error("broker error: {message}")]
    Broker { message: String, details: String },

    #[error("unexpected {got} frame while waiting for {expected}")]
    UnexpectedFrame { expected: &'static str, got: Command },

    #[error("invalid ack mode {0:?} (expected auto, client or client-individual)")]
    InvalidAckMode(String),
}
