//! Shared helpers for the three binaries.

pub mod fake;
pub mod shutdown;
pub mod telemetry;

pub use fake::{generate_customer, random_customer};
pub use shutdown::shutdown_signal;
