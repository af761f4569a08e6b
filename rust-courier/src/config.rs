//! Configuration module for environment variable parsing.
//!
//! Every setting has a default matching the stock ActiveMQ setup, so all
//! three binaries run with no environment at all.

use std::env;
use std::str::FromStr;

use tracing::warn;

use crate::stomp::AckMode;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // Broker Configuration
    // =========================================================================
    /// Broker host name
    pub stomp_host: String,

    /// Broker STOMP port
    pub stomp_port: u16,

    /// Static broker login
    pub stomp_login: String,

    /// Static broker passcode
    pub stomp_passcode: String,

    /// Queue the sender publishes to and the listener subscribes to
    pub stomp_destination: String,

    /// Subscription id used by the listener
    pub stomp_subscription_id: String,

    /// Acknowledgement mode used by the listener
    pub stomp_ack_mode: AckMode,

    /// Capacity of the channel between the listener's receiver and processor
    pub listener_buffer: usize,

    // =========================================================================
    // Web Server Configuration
    // =========================================================================
    /// Address the REST receiver binds to
    pub http_host: String,

    /// Port for the REST receiver to listen on
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            stomp_host: "localhost".to_string(),
            stomp_port: 8161,
            stomp_login: "admin".to_string(),
            stomp_passcode: "admin".to_string(),
            stomp_destination: "/queue/test".to_string(),
            stomp_subscription_id: "1".to_string(),
            stomp_ack_mode: AckMode::Auto,
            listener_buffer: 64,
            http_host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Config {
            stomp_host: env::var("STOMP_HOST").unwrap_or(defaults.stomp_host),

            stomp_port: parse_var("STOMP_PORT", defaults.stomp_port),

            stomp_login: env::var("STOMP_LOGIN").unwrap_or(defaults.stomp_login),

            stomp_passcode: env::var("STOMP_PASSCODE").unwrap_or(defaults.stomp_passcode),

            stomp_destination: env::var("STOMP_DESTINATION")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.stomp_destination),

            stomp_subscription_id: env::var("STOMP_SUBSCRIPTION_ID")
                .unwrap_or(defaults.stomp_subscription_id),

            stomp_ack_mode: parse_var("STOMP_ACK_MODE", defaults.stomp_ack_mode),

            listener_buffer: parse_var("LISTENER_BUFFER", defaults.listener_buffer).max(1),

            http_host: env::var("HTTP_HOST").unwrap_or(defaults.http_host),

            port: parse_var("PORT", defaults.port),
        }
    }

    /// `host:port` of the broker.
    pub fn broker_addr(&self) -> String {
        format!("{}:{}", self.stomp_host, self.stomp_port)
    }

    /// `host:port` the REST receiver binds to.
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.port)
    }
}

/// Parse an environment variable, falling back to `default` when it is unset
/// or does not parse.
fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}
