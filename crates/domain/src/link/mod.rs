mod address;
mod connection_state;
mod transport;

pub use address::TargetAddress;
pub use connection_state::ConnectionState;
pub use transport::{DuplexStream, Transport, TransportAvailability};
