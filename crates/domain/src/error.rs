use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    #[error("Address unresolvable: {0}")]
    AddressUnresolvable(String),

    #[error("Connect attempt timed out after {0} ms")]
    ConnectTimeout(u64),

    #[error("Connect failed: {0}")]
    ConnectFailed(String),

    #[error("Stream I/O error: {0}")]
    StreamIo(String),

    #[error("Not connected")]
    NotConnected,

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid time of day: {0}")]
    InvalidTime(String),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<std::io::Error> for DomainError {
    fn from(e: std::io::Error) -> Self {
        Self::StreamIo(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;
