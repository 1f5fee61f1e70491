use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use domain::link::{DuplexStream, Transport};
use domain::{ConnectionState, DomainError, TargetAddress};
use futures::FutureExt;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::dispatcher::{ConnectCallback, EventDispatcher, EventSink};
use super::handle::TransportHandle;
use super::observer::LinkObserver;
use super::reader::{ReadOutcome, run_reader};

/// Tunables for one managed link
#[derive(Debug, Clone)]
pub struct LinkOptions {
    pub read_buffer_size: usize,
    /// Used by `connect_and_wait`
    pub connect_timeout: Duration,
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            read_buffer_size: 1024,
            connect_timeout: Duration::from_millis(3000),
        }
    }
}

/// Who is waiting for the outcome of one attempt
enum Waiter {
    Sync(oneshot::Sender<bool>),
    Callback(ConnectCallback),
}

#[derive(Default)]
struct Link {
    state: ConnectionState,
    address: Option<TargetAddress>,
    /// Bumped by every attempt and every teardown
    generation: u64,
    handle: Option<Arc<TransportHandle>>,
    reader: Option<JoinHandle<()>>,
    attempt: Option<JoinHandle<()>>,
    waiter: Option<Waiter>,
}

impl Link {
    fn is_live(&self) -> bool {
        self.state.is_connected() && self.handle.as_ref().is_some_and(|h| h.is_open())
    }
}

struct Inner {
    transport: Arc<dyn Transport>,
    options: LinkOptions,
    link: Mutex<Link>,
    /// Serialises connect and disconnect
    op_lock: tokio::sync::Mutex<()>,
    events: EventSink,
    dispatcher: EventDispatcher,
}

/// Owns the single link to the switch and its lifecycle
///
/// All observer notifications are delivered on one dispatch task in the
/// order the transitions happened. Dropping the manager closes any live
/// session without emitting further events.
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

impl ConnectionManager {
    /// Must be called from within a Tokio runtime
    pub fn new(transport: Arc<dyn Transport>, options: LinkOptions) -> Self {
        let (dispatcher, events) = EventDispatcher::start();
        Self {
            inner: Arc::new(Inner {
                transport,
                options,
                link: Mutex::new(Link::default()),
                op_lock: tokio::sync::Mutex::new(()),
                events,
                dispatcher,
            }),
        }
    }

    /// Register an observer for state changes and inbound data
    pub fn subscribe(&self, observer: Arc<dyn LinkObserver>) {
        self.inner.dispatcher.subscribe(observer);
    }

    /// Start a connect attempt to `address`
    ///
    /// Returns `true` once the attempt has been started, not once the link
    /// is up; watch for `Connected` or use `connect_sync`. Returns `false`
    /// only when the transport is absent or disabled, in which case the
    /// state becomes `Error` and no attempt runs. A live session is torn
    /// down first.
    pub async fn connect(&self, address: TargetAddress) -> bool {
        self.inner.start(address, None).await.is_some()
    }

    /// Connect and wait up to `timeout` for the outcome
    ///
    /// On timeout the attempt is torn down and the link is left
    /// `Disconnected`.
    pub async fn connect_sync(&self, address: TargetAddress, timeout: Duration) -> bool {
        let (tx, rx) = oneshot::channel();
        let Some(generation) = self.inner.start(address, Some(Waiter::Sync(tx))).await else {
            return false;
        };

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(connected)) => connected,
            Ok(Err(_)) => false,
            Err(_) => {
                let err = DomainError::ConnectTimeout(timeout.as_millis() as u64);
                warn!(generation, error = %err, "Abandoning connect attempt");
                self.inner.abandon(generation).await;
                false
            }
        }
    }

    /// `connect_sync` with the configured default timeout
    pub async fn connect_and_wait(&self, address: TargetAddress) -> bool {
        let timeout = self.inner.options.connect_timeout;
        self.connect_sync(address, timeout).await
    }

    /// Start an attempt and report its outcome to `callback`
    ///
    /// The callback runs on the dispatch task after the matching state
    /// notification. It receives `false` if the attempt fails or is
    /// superseded, and is not called at all when this returns `false`.
    pub async fn connect_async<F>(&self, address: TargetAddress, callback: F) -> bool
    where
        F: FnOnce(bool) + Send + 'static,
    {
        let waiter = Waiter::Callback(Box::new(callback));
        self.inner.start(address, Some(waiter)).await.is_some()
    }

    /// Tear the link down; safe to call in any state
    pub async fn disconnect(&self) {
        let _op = self.inner.op_lock.lock().await;
        debug!(state = %self.state(), "Disconnect requested");
        self.inner.teardown().await;
    }

    /// Send bytes to the device, `false` if not connected or the write fails
    pub async fn write(&self, bytes: &[u8]) -> bool {
        match self.try_write(bytes).await {
            Ok(()) => true,
            Err(DomainError::NotConnected) => {
                debug!(bytes = bytes.len(), "Write ignored, link not connected");
                false
            }
            Err(e) => {
                warn!(error = %e, "Write failed");
                false
            }
        }
    }

    /// Like `write` but reports why it failed
    pub async fn try_write(&self, bytes: &[u8]) -> Result<(), DomainError> {
        let handle = {
            let link = self.inner.lock();
            match (&link.state, &link.handle, &link.reader) {
                (ConnectionState::Connected, Some(handle), Some(_)) => Arc::clone(handle),
                _ => return Err(DomainError::NotConnected),
            }
        };
        handle.write(bytes).await
    }

    /// `Connected` and the session has not been closed underneath us
    pub fn is_connected(&self) -> bool {
        self.inner.lock().is_live()
    }

    /// Address of the live session, if any
    pub fn connected_address(&self) -> Option<TargetAddress> {
        let link = self.inner.lock();
        if link.is_live() {
            link.address.clone()
        } else {
            None
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.inner.shutdown_now();
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Link> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Change state and queue the notification while the lock is held
    fn set_state(&self, link: &mut Link, next: ConnectionState) {
        if link.state == next {
            return;
        }
        debug!(from = %link.state, to = %next, generation = link.generation, "Link state changed");
        link.state = next;
        self.events.state(next);
    }

    fn resolve(&self, waiter: Option<Waiter>, connected: bool) {
        match waiter {
            Some(Waiter::Sync(tx)) => {
                let _ = tx.send(connected);
            }
            Some(Waiter::Callback(callback)) => self.events.connect_result(callback, connected),
            None => {}
        }
    }

    /// Pre-flight, tear down, then spawn the attempt; returns its generation
    async fn start(
        self: &Arc<Self>,
        address: TargetAddress,
        waiter: Option<Waiter>,
    ) -> Option<u64> {
        let _op = self.op_lock.lock().await;

        let active = self.lock().state.is_active();

        if let Err(e) = self.transport.availability().check() {
            warn!(address = %address, error = %e, "Connect rejected");
            if active {
                self.teardown().await;
            }
            let mut link = self.lock();
            link.address = Some(address);
            let next = link.state.to_rejected();
            self.set_state(&mut link, next);
            return None;
        }

        if active {
            info!(address = %address, "Replacing existing link");
            self.teardown().await;
        }

        let generation = {
            let mut link = self.lock();
            let next = match link.state.to_connecting() {
                Ok(next) => next,
                Err(reason) => {
                    warn!(state = %link.state, reason, "Connect refused");
                    return None;
                }
            };
            link.generation += 1;
            link.address = Some(address.clone());
            link.waiter = waiter;
            self.set_state(&mut link, next);
            link.generation
        };

        info!(address = %address, generation, "Connect attempt started");
        let inner = Arc::clone(self);
        let task = tokio::spawn(async move {
            let opened = AssertUnwindSafe(inner.transport.open(&address))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    Err(DomainError::ConnectFailed(
                        "transport panicked while opening".to_string(),
                    ))
                });
            inner.complete_attempt(generation, address, opened);
        });

        let mut link = self.lock();
        if link.generation == generation {
            link.attempt = Some(task);
        }
        Some(generation)
    }

    fn complete_attempt(
        self: &Arc<Self>,
        generation: u64,
        address: TargetAddress,
        opened: Result<DuplexStream, DomainError>,
    ) {
        let mut link = self.lock();
        if link.generation != generation {
            debug!(address = %address, generation, "Discarding stale connect attempt");
            return;
        }
        link.attempt = None;
        let waiter = link.waiter.take();

        match opened {
            Ok(stream) => {
                let next = match link.state.to_connected() {
                    Ok(next) => next,
                    Err(reason) => {
                        warn!(state = %link.state, reason, "Connect completion ignored");
                        return;
                    }
                };
                let (handle, reader) = TransportHandle::new(address.clone(), stream);
                info!(address = %address, generation, "Link connected");
                self.set_state(&mut link, next);

                let inner = Arc::clone(self);
                let session = Arc::clone(&handle);
                link.handle = Some(handle);
                link.reader = Some(tokio::spawn(async move {
                    let outcome = run_reader(
                        reader,
                        &session,
                        &inner.events,
                        inner.options.read_buffer_size,
                    )
                    .await;
                    inner.on_reader_exit(generation, outcome).await;
                }));
                self.resolve(waiter, true);
            }
            Err(e) => {
                warn!(address = %address, generation, error = %e, "Connect attempt failed");
                match link.state.to_error() {
                    Ok(next) => self.set_state(&mut link, next),
                    Err(reason) => warn!(state = %link.state, reason, "Failure ignored"),
                }
                self.resolve(waiter, false);
            }
        }
    }

    /// Stream ended on its own: tear down once, unless already superseded
    async fn on_reader_exit(&self, generation: u64, outcome: ReadOutcome) {
        match &outcome {
            ReadOutcome::Closed => return,
            ReadOutcome::Eof => info!(generation, "Link closed by device"),
            ReadOutcome::Failed(e) => warn!(generation, error = %e, "Link lost"),
        }

        let handle = {
            let mut link = self.lock();
            if link.generation != generation || !link.state.is_connected() {
                return;
            }
            link.generation += 1;
            link.address = None;
            // Our own task; dropping the JoinHandle detaches it
            link.reader = None;
            let handle = link.handle.take();
            if let Some(handle) = &handle {
                handle.signal_close();
            }
            let next = link.state.to_disconnected();
            self.set_state(&mut link, next);
            handle
        };

        if let Some(handle) = handle {
            handle.close().await;
        }
    }

    /// Full teardown; caller holds `op_lock`
    async fn teardown(&self) {
        let (attempt, reader, handle, waiter) = {
            let mut link = self.lock();
            link.generation += 1;
            link.address = None;
            (
                link.attempt.take(),
                link.reader.take(),
                link.handle.take(),
                link.waiter.take(),
            )
        };

        if let Some(attempt) = attempt {
            attempt.abort();
        }
        if let Some(handle) = &handle {
            handle.signal_close();
        }
        if let Some(reader) = reader {
            if let Err(e) = reader.await {
                debug!(error = %e, "Reader task ended abnormally");
            }
        }
        if let Some(handle) = handle {
            handle.close().await;
            info!(address = %handle.address(), "Link closed");
        }

        let mut link = self.lock();
        let next = link.state.to_disconnected();
        self.set_state(&mut link, next);
        self.resolve(waiter, false);
    }

    /// Tear down only if `generation` is still the live attempt
    async fn abandon(&self, generation: u64) {
        let _op = self.op_lock.lock().await;
        if self.lock().generation != generation {
            debug!(generation, "Attempt already superseded");
            return;
        }
        self.teardown().await;
    }

    /// Best-effort synchronous release used on drop
    fn shutdown_now(&self) {
        let mut link = self.lock();
        link.generation += 1;
        link.waiter = None;
        if let Some(attempt) = link.attempt.take() {
            attempt.abort();
        }
        if let Some(handle) = link.handle.take() {
            handle.signal_close();
        }
        link.reader = None;
    }
}
