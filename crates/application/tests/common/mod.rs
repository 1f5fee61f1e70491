#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use application::{ChannelObserver, ConnectionManager, LinkEvent, LinkOptions};
use async_trait::async_trait;
use domain::link::{DuplexStream, Transport, TransportAvailability};
use domain::{ConnectionState, DomainError, TargetAddress};
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream as Pipe, ReadBuf};
use tokio::sync::mpsc;
use tokio::time::Sleep;

pub const WAIT: Duration = Duration::from_secs(2);

/// What the next `open` call does
#[derive(Debug, Clone)]
pub enum Plan {
    Accept,
    Fail,
    /// Never completes
    Hang,
    AcceptAfter(Duration),
    /// Connects, but the first read fails
    BrokenRead,
    /// Connects, but shutting the writer down takes this long
    SlowClose(Duration),
    Panic,
}

/// Transport whose sessions are in-memory pipes; the far ends are handed
/// to the test through a channel
pub struct FakeTransport {
    availability: Mutex<TransportAvailability>,
    plans: Mutex<VecDeque<Plan>>,
    devices: mpsc::UnboundedSender<(TargetAddress, Pipe)>,
}

impl FakeTransport {
    pub fn new(
        plans: impl IntoIterator<Item = Plan>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<(TargetAddress, Pipe)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                availability: Mutex::new(TransportAvailability::Ready),
                plans: Mutex::new(plans.into_iter().collect()),
                devices: tx,
            }),
            rx,
        )
    }

    pub fn set_availability(&self, availability: TransportAvailability) {
        *self.availability.lock().unwrap() = availability;
    }

    fn accept(&self, address: &TargetAddress) -> DuplexStream {
        let (client, device) = tokio::io::duplex(1024);
        let _ = self.devices.send((address.clone(), device));
        DuplexStream::from_stream(client)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    fn availability(&self) -> TransportAvailability {
        *self.availability.lock().unwrap()
    }

    async fn open(&self, address: &TargetAddress) -> Result<DuplexStream, DomainError> {
        let plan = self.plans.lock().unwrap().pop_front().unwrap_or(Plan::Accept);
        match plan {
            Plan::Accept => Ok(self.accept(address)),
            Plan::Fail => Err(DomainError::AddressUnresolvable(address.to_string())),
            Plan::Hang => std::future::pending().await,
            Plan::AcceptAfter(delay) => {
                tokio::time::sleep(delay).await;
                Ok(self.accept(address))
            }
            Plan::BrokenRead => {
                let (client, _device) = tokio::io::duplex(64);
                let (_, writer) = tokio::io::split(client);
                Ok(DuplexStream::new(BrokenReader, writer))
            }
            Plan::SlowClose(delay) => {
                let (client, device) = tokio::io::duplex(1024);
                let _ = self.devices.send((address.clone(), device));
                let (reader, writer) = tokio::io::split(client);
                let writer = SlowCloseWriter {
                    inner: writer,
                    delay,
                    sleep: None,
                };
                Ok(DuplexStream::new(reader, writer))
            }
            Plan::Panic => panic!("simulated driver bug"),
        }
    }
}

struct BrokenReader;

impl AsyncRead for BrokenReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::new(io::ErrorKind::ConnectionReset, "link dropped")))
    }
}

struct SlowCloseWriter<W> {
    inner: W,
    delay: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl<W: AsyncWrite + Unpin> AsyncWrite for SlowCloseWriter<W> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let delay = this.delay;
        let sleep = this
            .sleep
            .get_or_insert_with(|| Box::pin(tokio::time::sleep(delay)));
        ready!(sleep.as_mut().poll(cx));
        Pin::new(&mut this.inner).poll_shutdown(cx)
    }
}

pub fn addr(s: &str) -> TargetAddress {
    TargetAddress::new(s).unwrap()
}

pub fn manager_with(
    transport: Arc<dyn Transport>,
) -> (Arc<ConnectionManager>, mpsc::UnboundedReceiver<LinkEvent>) {
    let manager = Arc::new(ConnectionManager::new(transport, LinkOptions::default()));
    let (observer, events) = ChannelObserver::new();
    manager.subscribe(observer);
    (manager, events)
}

pub async fn next_event(events: &mut mpsc::UnboundedReceiver<LinkEvent>) -> LinkEvent {
    tokio::time::timeout(WAIT, events.recv())
        .await
        .expect("timed out waiting for link event")
        .expect("event channel closed")
}

pub async fn expect_states(
    events: &mut mpsc::UnboundedReceiver<LinkEvent>,
    expected: &[ConnectionState],
) {
    for state in expected {
        assert_eq!(next_event(events).await, LinkEvent::StateChanged(*state));
    }
}

pub async fn assert_quiet(events: &mut mpsc::UnboundedReceiver<LinkEvent>) {
    let quiet = Duration::from_millis(200);
    if let Ok(Some(event)) = tokio::time::timeout(quiet, events.recv()).await {
        panic!("unexpected link event {event:?}");
    }
}

pub async fn next_device(
    devices: &mut mpsc::UnboundedReceiver<(TargetAddress, Pipe)>,
) -> (TargetAddress, Pipe) {
    tokio::time::timeout(WAIT, devices.recv())
        .await
        .expect("timed out waiting for device side")
        .expect("transport dropped")
}
