//! Application layer - Link lifecycle and device workflows

pub mod controller;
pub mod link;
pub mod status;

pub use controller::DeviceController;
pub use link::{ChannelObserver, ConnectionManager, LinkEvent, LinkObserver, LinkOptions};
pub use status::{StatusPoller, StatusTracker};
