use std::sync::Arc;

use domain::protocol::StatusPolicy;
use domain::{ConnectionState, StatusFields, StatusSnapshot};
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::link::LinkObserver;

/// Keeps the latest decoded device status
///
/// Every inbound chunk is scanned on its own. Chunks with no recognisable
/// field leave the snapshot untouched; otherwise missing fields follow the
/// configured policy.
pub struct StatusTracker {
    policy: StatusPolicy,
    tx: watch::Sender<StatusSnapshot>,
}

impl StatusTracker {
    pub fn new(policy: StatusPolicy) -> Arc<Self> {
        let (tx, _) = watch::channel(StatusSnapshot::default());
        Arc::new(Self { policy, tx })
    }

    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> StatusSnapshot {
        self.tx.borrow().clone()
    }

    /// Decode one text blob; returns whether the snapshot changed
    pub fn apply(&self, text: &str) -> bool {
        let fields = StatusFields::parse(text);
        if fields.is_empty() {
            trace!(bytes = text.len(), "No status fields in chunk");
            return false;
        }

        let policy = self.policy;
        self.tx.send_if_modified(|current| {
            let next = current.merge(fields, policy);
            if next == *current {
                return false;
            }
            debug!(
                relay_on = next.relay_on,
                device_time = %next.device_time,
                alarm_count = next.alarm_count,
                "Device status updated"
            );
            *current = next;
            true
        })
    }
}

impl LinkObserver for StatusTracker {
    fn on_state_changed(&self, state: ConnectionState) {
        trace!(%state, "Status tracker saw state change");
    }

    fn on_data_received(&self, data: &[u8]) {
        self.apply(&String::from_utf8_lossy(data));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::protocol::MissingFieldPolicy;

    #[test]
    fn test_apply_publishes_snapshot() {
        let tracker = StatusTracker::new(StatusPolicy::default());
        let rx = tracker.subscribe();

        assert!(tracker.apply("STATUS:RELAY=ON TIME=03:07:00 ALARMS=2"));
        let s = rx.borrow().clone();
        assert!(s.relay_on);
        assert_eq!(s.device_time, "03:07:00");
        assert_eq!(s.alarm_count, 2);
    }

    #[test]
    fn test_noise_does_not_touch_snapshot() {
        let tracker = StatusTracker::new(StatusPolicy::default());
        tracker.apply("RELAY=ON ALARMS=1");
        assert!(!tracker.apply("OK\r\n"));
        assert!(tracker.current().relay_on);
    }

    #[test]
    fn test_default_policy_resets_missing_relay() {
        let tracker = StatusTracker::new(StatusPolicy::default());
        tracker.apply("RELAY=ON ALARMS=1");
        assert!(tracker.apply("ALARMS=1"));
        assert!(!tracker.current().relay_on);
    }

    #[test]
    fn test_keep_last_policy() {
        let tracker = StatusTracker::new(StatusPolicy {
            relay: MissingFieldPolicy::KeepLast,
            ..Default::default()
        });
        tracker.apply("RELAY=ON ALARMS=1");
        tracker.apply("ALARMS=5");
        let s = tracker.current();
        assert!(s.relay_on);
        assert_eq!(s.alarm_count, 5);
    }

    #[test]
    fn test_data_event_with_invalid_utf8() {
        let tracker = StatusTracker::new(StatusPolicy::default());
        let mut chunk = b"RELAY=ON ".to_vec();
        chunk.push(0xFF);
        tracker.on_data_received(&chunk);
        assert!(tracker.current().relay_on);
    }
}
