//! Queue module for broker operations.
//!
//! This module provides:
//! - The customer record exchanged over the queue
//! - A publisher used by the sender
//! - A listener used by the consumer
//!
//! ## Architecture
//!
//! ```text
//! Sender → Publisher → /queue/test → Listener → handler (prints the record)
//! ```

pub mod listener;
pub mod publisher;
pub mod types;

pub use listener::ListenerStats;
pub use publisher::Publisher;
pub use types::{
    Customer, CustomerError, Payload, CUSTOMER_ID_MAX, CUSTOMER_ID_MIN, JSON_CONTENT_TYPE,
};
