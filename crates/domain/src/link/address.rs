use crate::error::{DomainError, Result};
use serde::{Deserialize, Serialize};

/// Opaque transport-layer address of the remote device
///
/// Usually a Bluetooth hardware address rendered as `78:42:1C:18:E8:0A`,
/// but transports may accept other forms (e.g. a tty path).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TargetAddress(String);

impl TargetAddress {
    /// Create a new address; surrounding whitespace is trimmed
    pub fn new(address: impl Into<String>) -> Result<Self> {
        let address = address.into();
        let trimmed = address.trim();

        if trimmed.is_empty() {
            return Err(DomainError::InvalidAddress(
                "Address cannot be empty".to_string(),
            ));
        }

        if trimmed.chars().any(char::is_whitespace) {
            return Err(DomainError::InvalidAddress(format!(
                "Address {trimmed:?} must not contain whitespace"
            )));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The six address bytes, if this is a colon-separated hardware address
    pub fn hardware(&self) -> Option<[u8; 6]> {
        let mut bytes = [0u8; 6];
        let mut parts = self.0.split(':');

        for byte in bytes.iter_mut() {
            let part = parts.next()?;
            if part.len() != 2 {
                return None;
            }
            *byte = u8::from_str_radix(part, 16).ok()?;
        }

        if parts.next().is_some() {
            return None;
        }
        Some(bytes)
    }
}

impl std::fmt::Display for TargetAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TargetAddress {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for TargetAddress {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<TargetAddress> for String {
    fn from(value: TargetAddress) -> Self {
        value.0
    }
}
