//! Subscription acknowledgement modes.

use std::fmt;
use std::str::FromStr;

use super::error::StompError;

/// When the broker may consider a delivered message consumed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AckMode {
    /// Consumed on dispatch. A crash before the handler runs loses the message.
    #[default]
    Auto,
    /// Cumulative: an ACK covers every earlier message on the subscription.
    Client,
    /// Each message is acknowledged on its own.
    ClientIndividual,
}

impl AckMode {
    pub fn as_str(self) -> &'static str {
        match self {
            AckMode::Auto => "auto",
            AckMode::Client => "client",
            AckMode::ClientIndividual => "client-individual",
        }
    }

    /// Whether the consumer must send ACK/NACK frames.
    pub fn requires_ack(self) -> bool {
        !matches!(self, AckMode::Auto)
    }
}

impl fmt::Display for AckMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AckMode {
    type Err = StompError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(AckMode::Auto),
            "client" => Ok(AckMode::Client),
            "client-individual" | "client_individual" => Ok(AckMode::ClientIndividual),
            _ => Err(StompError::InvalidAckMode(raw.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ack_modes() {
        assert_eq!("auto".parse::<AckMode>().unwrap(), AckMode::Auto);
        assert_eq!(" Client ".parse::<AckMode>().unwrap(), AckMode::Client);
        assert_eq!(
            "client-individual".parse::<AckMode>().unwrap(),
            AckMode::ClientIndividual
        );
        assert!("manual".parse::<AckMode>().is_err());
    }

    #[test]
    fn test_requires_ack() {
        assert!(!AckMode::Auto.requires_ack());
        assert!(AckMode::Client.requires_ack());
        assert!(AckMode::ClientIndividual.requires_ack());
        assert_eq!(AckMode::ClientIndividual.to_string(), "client-individual");
    }
}
