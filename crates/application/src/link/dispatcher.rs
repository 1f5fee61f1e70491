use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, RwLock};

use domain::ConnectionState;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace};

use super::observer::LinkObserver;

/// Completion callback handed to `ConnectionManager::connect_async`
pub type ConnectCallback = Box<dyn FnOnce(bool) + Send + 'static>;

pub(crate) enum Dispatch {
    State(ConnectionState),
    Data(Vec<u8>),
    ConnectResult {
        callback: ConnectCallback,
        connected: bool,
    },
}

/// Producer side of the dispatch queue
#[derive(Clone)]
pub(crate) struct EventSink {
    tx: mpsc::UnboundedSender<Dispatch>,
}

impl EventSink {
    pub(crate) fn state(&self, state: ConnectionState) {
        let _ = self.tx.send(Dispatch::State(state));
    }

    pub(crate) fn data(&self, data: Vec<u8>) {
        let _ = self.tx.send(Dispatch::Data(data));
    }

    pub(crate) fn connect_result(&self, callback: ConnectCallback, connected: bool) {
        let _ = self.tx.send(Dispatch::ConnectResult {
            callback,
            connected,
        });
    }
}

type Observers = Arc<RwLock<Vec<Arc<dyn LinkObserver>>>>;

/// Single delivery context for every observer of one manager
///
/// Events are queued by producers and delivered in order by one task, so
/// observers never race each other and never run on the reader task.
pub(crate) struct EventDispatcher {
    observers: Observers,
    task: JoinHandle<()>,
}

impl EventDispatcher {
    /// Must be called from within a Tokio runtime
    pub(crate) fn start() -> (Self, EventSink) {
        let (tx, rx) = mpsc::unbounded_channel();
        let observers: Observers = Arc::default();
        let task = tokio::spawn(Self::run(rx, observers.clone()));
        (Self { observers, task }, EventSink { tx })
    }

    pub(crate) fn subscribe(&self, observer: Arc<dyn LinkObserver>) {
        let mut observers = self.observers.write().unwrap_or_else(|e| e.into_inner());
        observers.retain(|o| !o.is_closed());
        observers.push(observer);
    }

    async fn run(mut rx: mpsc::UnboundedReceiver<Dispatch>, observers: Observers) {
        while let Some(event) = rx.recv().await {
            let snapshot: Vec<Arc<dyn LinkObserver>> = observers
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .clone();

            match event {
                Dispatch::State(state) => {
                    trace!(%state, observers = snapshot.len(), "Delivering state change");
                    for observer in &snapshot {
                        guarded("on_state_changed", || observer.on_state_changed(state));
                    }
                }
                Dispatch::Data(data) => {
                    trace!(bytes = data.len(), "Delivering data");
                    for observer in &snapshot {
                        guarded("on_data_received", || observer.on_data_received(&data));
                    }
                }
                Dispatch::ConnectResult {
                    callback,
                    connected,
                } => guarded("connect callback", || callback(connected)),
            }

            if snapshot.iter().any(|o| o.is_closed()) {
                let mut observers = observers.write().unwrap_or_else(|e| e.into_inner());
                observers.retain(|o| !o.is_closed());
                debug!(observers = observers.len(), "Dropped closed observers");
            }
        }
        trace!("Dispatch queue closed");
    }
}

impl Drop for EventDispatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// A panicking observer must not take the dispatch task down with it
fn guarded(what: &str, f: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(f)).is_err() {
        error!(callback = what, "Link observer panicked");
    }
}
