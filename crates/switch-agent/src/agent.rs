use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use application::{
    ChannelObserver, ConnectionManager, DeviceController, LinkEvent, StatusPoller, StatusTracker,
};
use domain::{Command, ConnectionState, StatusSnapshot, TargetAddress};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Long-running session: keep the link up, poll status and log changes
pub struct Agent {
    link: Arc<ConnectionManager>,
    address: TargetAddress,
    tracker: Arc<StatusTracker>,
    poll_interval: Duration,
}

impl Agent {
    pub fn new(
        link: Arc<ConnectionManager>,
        address: TargetAddress,
        tracker: Arc<StatusTracker>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            link,
            address,
            tracker,
            poll_interval,
        }
    }

    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let (observer, mut events) = ChannelObserver::new();
        self.link.subscribe(observer);
        self.link.subscribe(self.tracker.clone());
        let mut status = self.tracker.subscribe();
        let controller = DeviceController::new(self.link.clone());

        let poller =
            StatusPoller::new(self.link.clone(), self.poll_interval).spawn(cancel.child_token());

        info!(address = %self.address, "🔌 Connecting to switch...");
        if !self.link.connect_and_wait(self.address.clone()).await {
            warn!(address = %self.address, "Initial connection failed, will retry");
        }

        let mut reconnect =
            tokio::time::interval_at(Instant::now() + self.poll_interval, self.poll_interval);
        reconnect.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // At most one bounded retry in flight
        let mut retry: Option<JoinHandle<bool>> = None;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Shutdown signal received");
                    break;
                }
                Some(event) = events.recv() => match event {
                    LinkEvent::StateChanged(ConnectionState::Connected) => {
                        info!(address = %self.address, "✅ Link up");
                        if let Err(e) = controller.handshake().await {
                            warn!(error = %e, "Handshake failed");
                        }
                    }
                    LinkEvent::StateChanged(state) => info!(%state, "Link state changed"),
                    LinkEvent::DataReceived(data) => {
                        let text = String::from_utf8_lossy(&data);
                        debug!(text = %text.trim_end(), "Device says");
                    }
                },
                Ok(()) = status.changed() => {
                    let s = status.borrow_and_update().clone();
                    let relay = if s.relay_on { "ON" } else { "OFF" };
                    info!(
                        relay,
                        time = %s.device_time,
                        alarms = s.alarm_count,
                        "📟 Switch status"
                    );
                }
                _ = reconnect.tick() => {
                    let busy = retry.as_ref().is_some_and(|task| !task.is_finished());
                    if !busy && self.link.state().can_connect() {
                        info!(address = %self.address, "Reconnecting...");
                        let link = self.link.clone();
                        let address = self.address.clone();
                        retry = Some(tokio::spawn(async move {
                            link.connect_and_wait(address).await
                        }));
                    }
                }
            }
        }

        if let Some(task) = retry {
            task.abort();
        }
        poller.abort();
        self.link.disconnect().await;
        Ok(())
    }
}

/// Connect, send one command, print whatever the device answers within
/// `linger`, then disconnect
pub async fn send_once(
    link: &Arc<ConnectionManager>,
    address: TargetAddress,
    command: &Command,
    linger: Duration,
) -> Result<Vec<String>> {
    let (observer, mut events) = ChannelObserver::new();
    link.subscribe(observer);

    if !link.connect_and_wait(address.clone()).await {
        bail!("could not connect to {address}");
    }

    let controller = DeviceController::new(link.clone());
    controller.send(command).await?;
    info!(%command, "Command sent");

    let replies = collect_replies(&mut events, linger).await;
    link.disconnect().await;
    Ok(replies)
}

async fn collect_replies(
    events: &mut mpsc::UnboundedReceiver<LinkEvent>,
    linger: Duration,
) -> Vec<String> {
    let deadline = Instant::now() + linger;
    let mut replies = Vec::new();

    while let Ok(Some(event)) = tokio::time::timeout_at(deadline, events.recv()).await {
        match event {
            LinkEvent::DataReceived(data) => {
                replies.push(String::from_utf8_lossy(&data).into_owned());
            }
            LinkEvent::StateChanged(ConnectionState::Disconnected) => break,
            LinkEvent::StateChanged(_) => {}
        }
    }
    replies
}

/// Status snapshot decoded from a set of replies
pub fn summarize(replies: &[String]) -> StatusSnapshot {
    StatusSnapshot::parse(&replies.concat())
}
