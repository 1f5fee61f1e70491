use std::sync::Arc;
use std::time::Duration;

use domain::protocol::GET_STATUS_FRAME;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::link::ConnectionManager;

/// Periodically asks the switch for its status while the link is up
pub struct StatusPoller {
    link: Arc<ConnectionManager>,
    period: Duration,
}

impl StatusPoller {
    pub fn new(link: Arc<ConnectionManager>, period: Duration) -> Self {
        Self { link, period }
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    pub async fn run(self, cancel: CancellationToken) {
        info!(period_ms = self.period.as_millis() as u64, "Starting status poll loop");
        let mut timer = tokio::time::interval_at(Instant::now() + self.period, self.period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Status poller stopped");
                    break;
                }
                _ = timer.tick() => {
                    if !self.link.is_connected() {
                        debug!("Skipping status poll, link down");
                        continue;
                    }
                    self.link.write(&GET_STATUS_FRAME).await;
                }
            }
        }
    }
}
