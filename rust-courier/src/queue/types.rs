//! Queue message types.
//!
//! The sender and the listener exchange a single message shape, the
//! [`Customer`] record, encoded as a UTF-8 JSON object.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use url::Url;

/// Content type of every published message body.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Inclusive bounds for generated customer ids.
pub const CUSTOMER_ID_MIN: u32 = 1000;
pub const CUSTOMER_ID_MAX: u32 = 9999;

/// Synthetic customer record published by the sender.
///
/// Nothing enforces uniqueness of `id`; it is only a label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: u32,
    pub name: String,
    pub country: String,
    pub website: String,
}

/// A customer record that breaks one of the field constraints.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CustomerError {
    #[error("id {0} outside 1000..=9999")]
    IdOutOfRange(u32),
    #[error("name is empty")]
    EmptyName,
    #[error("country is empty")]
    EmptyCountry,
    #[error("website {website:?} is not a valid URL: {reason}")]
    InvalidWebsite { website: String, reason: String },
}

impl Customer {
    /// Check the record's field constraints, reporting the first violation.
    pub fn validate(&self) -> Result<(), CustomerError> {
        if !(CUSTOMER_ID_MIN..=CUSTOMER_ID_MAX).contains(&self.id) {
            return Err(CustomerError::IdOutOfRange(self.id));
        }
        if self.name.trim().is_empty() {
            return Err(CustomerError::EmptyName);
        }
        if self.country.trim().is_empty() {
            return Err(CustomerError::EmptyCountry);
        }
        Url::parse(&self.website).map_err(|e| CustomerError::InvalidWebsite {
            website: self.website.clone(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    /// JSON encoding used on the wire.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// A decoded message body as handed to the listener's handler.
///
/// Well-formed JSON that does not fit the customer shape is still delivered,
/// as the raw document.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Customer(Customer),
    Other(Value),
}

impl Payload {
    /// Decode a message body. Fails only when the body is not JSON at all.
    pub fn from_slice(body: &[u8]) -> serde_json::Result<Self> {
        let value: Value = serde_json::from_slice(body)?;
        Ok(match serde_json::from_value::<Customer>(value.clone()) {
            Ok(customer) => Payload::Customer(customer),
            Err(_) => Payload::Other(value),
        })
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Customer(customer) => fmt::Display::fmt(customer, f),
            Payload::Other(value) => fmt::Display::fmt(value, f),
        }
    }
}

impl fmt::Display for Customer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{id: {}, name: {:?}, country: {:?}, website: {:?}}}",
            self.id, self.name, self.country, self.website
        )
    }
}
