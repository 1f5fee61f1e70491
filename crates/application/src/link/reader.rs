use domain::DomainError;
use tokio::io::AsyncReadExt;
use tracing::{debug, trace};

use super::dispatcher::EventSink;
use super::handle::{BoxedReader, TransportHandle};

/// Why the reader loop stopped
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ReadOutcome {
    /// The handle was closed locally
    Closed,
    /// The peer closed the stream
    Eof,
    Failed(DomainError),
}

/// Pump bytes from the stream into data events until it ends
///
/// Each successful read publishes exactly the bytes read. Nothing is
/// retried; the caller decides what termination means.
pub(crate) async fn run_reader(
    mut reader: BoxedReader,
    handle: &TransportHandle,
    sink: &EventSink,
    buffer_size: usize,
) -> ReadOutcome {
    let mut buf = vec![0u8; buffer_size.max(1)];

    loop {
        let read = tokio::select! {
            biased;
            _ = handle.closed().cancelled() => return ReadOutcome::Closed,
            r = reader.read(&mut buf) => r,
        };

        match read {
            Ok(0) => {
                debug!(address = %handle.address(), "Link closed by peer");
                return ReadOutcome::Eof;
            }
            Ok(n) => {
                trace!(address = %handle.address(), bytes = n, "Read from link");
                sink.data(buf[..n].to_vec());
            }
            Err(e) => {
                debug!(address = %handle.address(), error = %e, "Link read failed");
                return ReadOutcome::Failed(e.into());
            }
        }
    }
}
