//! Minimal STOMP 1.2 client for talking to ActiveMQ.
//!
//! ## Session Flow
//!
//! ```text
//! CONNECT → CONNECTED → SEND (receipt) → RECEIPT → DISCONNECT (receipt) → RECEIPT
//!                     → SUBSCRIBE → MESSAGE* [→ ACK/NACK]
//! ```

pub mod ack;
pub mod connection;
pub mod error;
pub mod frame;

#[cfg(test)]
pub(crate) mod testing;

pub use ack::AckMode;
pub use connection::{Delivery, FrameWriter, Inbound, StompConnection, DISCONNECT_RECEIPT};
pub use error::StompError;
pub use frame::{Command, Frame};
