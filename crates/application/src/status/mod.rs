mod poller;
mod tracker;

pub use poller::StatusPoller;
pub use tracker::StatusTracker;
