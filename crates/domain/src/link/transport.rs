use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use super::address::TargetAddress;
use crate::error::DomainError;

/// Whether the transport can open channels at all
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportAvailability {
    /// No adapter / subsystem present on this host
    Absent,
    /// Present but switched off
    Disabled,
    Ready,
}

impl TransportAvailability {
    /// Pre-flight check used before any connect attempt
    pub fn check(self) -> Result<(), DomainError> {
        match self {
            Self::Ready => Ok(()),
            Self::Absent => Err(DomainError::TransportUnavailable(
                "no transport adapter present".to_string(),
            )),
            Self::Disabled => Err(DomainError::TransportUnavailable(
                "transport adapter is disabled".to_string(),
            )),
        }
    }
}

/// One opened duplex byte stream, split into its two directions
pub struct DuplexStream {
    pub reader: Box<dyn AsyncRead + Send + Unpin>,
    pub writer: Box<dyn AsyncWrite + Send + Unpin>,
}

impl DuplexStream {
    pub fn new(
        reader: impl AsyncRead + Send + Unpin + 'static,
        writer: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Self {
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
        }
    }

    /// Split a single read/write stream into a duplex pair
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        Self::new(reader, writer)
    }
}

impl std::fmt::Debug for DuplexStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuplexStream").finish_non_exhaustive()
    }
}

/// Port that infrastructure transports must provide
#[async_trait]
pub trait Transport: Send + Sync {
    /// Report whether the transport is present and enabled
    fn availability(&self) -> TransportAvailability;

    /// Open a duplex stream to `address`
    ///
    /// Fails with `AddressUnresolvable` when nothing answers at that
    /// address and `ConnectFailed` for any other setup error.
    async fn open(&self, address: &TargetAddress) -> Result<DuplexStream, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_availability_check() {
        assert!(TransportAvailability::Ready.check().is_ok());
        assert!(matches!(
            TransportAvailability::Absent.check(),
            Err(DomainError::TransportUnavailable(_))
        ));
        assert!(matches!(
            TransportAvailability::Disabled.check(),
            Err(DomainError::TransportUnavailable(_))
        ));
    }
}
