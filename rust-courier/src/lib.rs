//! Courier - customer records over STOMP, plus a JSON echo endpoint.
//!
//! This library provides shared modules for the three courier binaries:
//! - `courier-sender`: Publishes one synthetic customer record and exits
//! - `courier-listener`: Prints every customer record arriving on the queue
//! - `courier-rest`: Echoes JSON posted to `/person`
//!
//! ## Architecture
//!
//! ```text
//! courier-sender → ActiveMQ /queue/test → courier-listener
//!
//! HTTP client → POST /person → courier-rest   (independent)
//! ```

pub mod config;
pub mod queue;
pub mod stomp;
pub mod util;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use queue::{Customer, CustomerError, ListenerStats, Payload, Publisher};
pub use stomp::{AckMode, StompConnection, StompError};
