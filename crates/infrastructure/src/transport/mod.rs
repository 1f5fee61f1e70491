mod rfcomm;
mod simulator;

pub use rfcomm::{RfcommConfig, RfcommTransport};
pub use simulator::{SimulatorConfig, SimulatorTransport};

use std::sync::Arc;

use domain::DomainError;
use domain::link::Transport;
use serde::{Deserialize, Serialize};

/// Which transport backs the link, with its settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum TransportConfig {
    Rfcomm(RfcommConfig),
    Simulator(SimulatorConfig),
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::Rfcomm(RfcommConfig::default())
    }
}

impl TransportConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Rfcomm(_) => "Rfcomm",
            Self::Simulator(_) => "Simulator",
        }
    }
}

/// Factory for creating transports
pub struct TransportFactory;

impl TransportFactory {
    pub fn create(config: &TransportConfig) -> Arc<dyn Transport> {
        match config {
            TransportConfig::Rfcomm(c) => Arc::new(RfcommTransport::new(c.clone())),
            TransportConfig::Simulator(c) => Arc::new(SimulatorTransport::new(c.clone())),
        }
    }

    /// Create a transport from a tagged JSON configuration
    pub fn from_value(config: serde_json::Value) -> Result<Arc<dyn Transport>, DomainError> {
        let config: TransportConfig = serde_json::from_value(config)
            .map_err(|e| DomainError::InvalidConfig(format!("Invalid transport config: {}", e)))?;
        Ok(Self::create(&config))
    }
}
