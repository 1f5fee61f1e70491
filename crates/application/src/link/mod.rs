//! Single-link connection management
//!
//! `ConnectionManager` owns the state machine and the live session,
//! `TransportHandle` wraps one opened stream and the reader loop turns
//! inbound bytes into data events for `LinkObserver`s.

mod dispatcher;
mod handle;
mod manager;
mod observer;
mod reader;

pub use dispatcher::ConnectCallback;
pub use handle::TransportHandle;
pub use manager::{ConnectionManager, LinkOptions};
pub use observer::{ChannelObserver, LinkEvent, LinkObserver};
