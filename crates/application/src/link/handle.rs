use std::sync::Arc;

use domain::link::DuplexStream;
use domain::{DomainError, TargetAddress};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

pub(crate) type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// One opened session with the device
///
/// Owns the write half; the read half is handed to the reader loop. The
/// `closed` token is shared by both so either side can end the session.
pub struct TransportHandle {
    address: TargetAddress,
    writer: Mutex<Option<BoxedWriter>>,
    closed: CancellationToken,
}

impl TransportHandle {
    pub(crate) fn new(address: TargetAddress, stream: DuplexStream) -> (Arc<Self>, BoxedReader) {
        let handle = Arc::new(Self {
            address,
            writer: Mutex::new(Some(stream.writer)),
            closed: CancellationToken::new(),
        });
        (handle, stream.reader)
    }

    pub fn address(&self) -> &TargetAddress {
        &self.address
    }

    pub fn is_open(&self) -> bool {
        !self.closed.is_cancelled()
    }

    pub(crate) fn closed(&self) -> &CancellationToken {
        &self.closed
    }

    /// Mark the session closed without waiting for the writer
    pub(crate) fn signal_close(&self) {
        self.closed.cancel();
    }

    /// Write all bytes and flush
    pub async fn write(&self, bytes: &[u8]) -> Result<(), DomainError> {
        if !self.is_open() {
            return Err(DomainError::NotConnected);
        }

        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(DomainError::NotConnected)?;

        let result = tokio::select! {
            _ = self.closed.cancelled() => return Err(DomainError::NotConnected),
            r = async {
                writer.write_all(bytes).await?;
                writer.flush().await
            } => r,
        };

        match result {
            Ok(()) => {
                trace!(address = %self.address, bytes = bytes.len(), "Wrote to link");
                Ok(())
            }
            Err(e) => Err(DomainError::StreamIo(e.to_string())),
        }
    }

    /// Close the session and release the write half
    pub(crate) async fn close(&self) {
        self.closed.cancel();
        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer {
            if let Err(e) = writer.shutdown().await {
                debug!(address = %self.address, error = %e, "Error shutting down writer");
            }
        }
    }
}

impl std::fmt::Debug for TransportHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportHandle")
            .field("address", &self.address)
            .field("open", &self.is_open())
            .finish()
    }
}
