use std::sync::Arc;

use domain::ConnectionState;
use tokio::sync::mpsc;

/// Subscriber to link events
///
/// Both methods are called on the manager's dispatch task, never on the
/// caller's task and never concurrently with each other. Implementations
/// should return quickly; long work belongs on a separate task.
pub trait LinkObserver: Send + Sync {
    fn on_state_changed(&self, _state: ConnectionState) {}

    fn on_data_received(&self, _data: &[u8]) {}

    /// Closed observers are dropped from the manager on the next event
    fn is_closed(&self) -> bool {
        false
    }
}

/// Owned copy of a delivered event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    StateChanged(ConnectionState),
    DataReceived(Vec<u8>),
}

/// Observer that forwards every event into an unbounded channel
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<LinkEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<LinkEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

impl LinkObserver for ChannelObserver {
    fn on_state_changed(&self, state: ConnectionState) {
        let _ = self.tx.send(LinkEvent::StateChanged(state));
    }

    fn on_data_received(&self, data: &[u8]) {
        let _ = self.tx.send(LinkEvent::DataReceived(data.to_vec()));
    }

    fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
