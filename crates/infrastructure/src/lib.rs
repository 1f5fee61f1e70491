//! Infrastructure layer - Transports and configuration

pub mod config;
pub mod transport;

pub use config::ControllerConfig;
pub use transport::{
    RfcommConfig, RfcommTransport, SimulatorConfig, SimulatorTransport, TransportConfig,
    TransportFactory,
};
