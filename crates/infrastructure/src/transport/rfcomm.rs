use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use domain::link::{DuplexStream, Transport, TransportAvailability};
use domain::{DomainError, TargetAddress};
use serde::{Deserialize, Serialize};
use tokio_serial::SerialPortBuilderExt;

/// RFCOMM transport configuration
///
/// The kernel exposes each bound RFCOMM channel as a tty (`rfcomm bind`),
/// so opening a session means opening that serial device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RfcommConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Hardware address -> tty path, e.g. `78:42:1C:18:E8:0A = "/dev/rfcomm0"`
    #[serde(default)]
    pub bindings: HashMap<String, String>,
    /// Path that must exist for the adapter to count as present
    #[serde(default)]
    pub adapter_path: Option<String>,
}

fn default_enabled() -> bool {
    true
}
fn default_baud_rate() -> u32 {
    115200
}

impl Default for RfcommConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            baud_rate: default_baud_rate(),
            bindings: HashMap::new(),
            adapter_path: None,
        }
    }
}

impl RfcommConfig {
    /// Resolve the tty backing `address`
    ///
    /// Bound addresses map through `bindings`; anything that already looks
    /// like a device path is used as-is.
    pub fn port_for(&self, address: &TargetAddress) -> Result<String, DomainError> {
        if let Some(port) = self.bindings.get(address.as_str()) {
            return Ok(port.clone());
        }
        // Config keys may come back lower-cased
        if let Some((_, port)) = self.bindings.iter().find(|(k, _)| same_device(k, address)) {
            return Ok(port.clone());
        }

        let raw = address.as_str();
        if raw.starts_with('/') || raw.to_uppercase().starts_with("COM") {
            return Ok(normalize_port_name(raw));
        }

        Err(DomainError::AddressUnresolvable(format!(
            "no RFCOMM binding for {address}"
        )))
    }
}

fn same_device(key: &str, address: &TargetAddress) -> bool {
    let key_bytes = TargetAddress::new(key).ok().and_then(|k| k.hardware());
    match (key_bytes, address.hardware()) {
        (Some(a), Some(b)) => a == b,
        _ => key.eq_ignore_ascii_case(address.as_str()),
    }
}

/// Windows needs `\\.\COM10` style names for reliable access
fn normalize_port_name(port: &str) -> String {
    if cfg!(target_os = "windows") && !port.to_uppercase().starts_with(r"\\.\") {
        format!(r"\\.\{}", port)
    } else {
        port.to_string()
    }
}

/// Bluetooth serial-profile transport over bound RFCOMM ttys
pub struct RfcommTransport {
    config: RfcommConfig,
}

impl RfcommTransport {
    pub fn new(config: RfcommConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Transport for RfcommTransport {
    fn availability(&self) -> TransportAvailability {
        if let Some(adapter) = &self.config.adapter_path {
            if !Path::new(adapter).exists() {
                return TransportAvailability::Absent;
            }
        }
        if !self.config.enabled {
            return TransportAvailability::Disabled;
        }
        TransportAvailability::Ready
    }

    async fn open(&self, address: &TargetAddress) -> Result<DuplexStream, DomainError> {
        let port_name = self.config.port_for(address)?;

        tracing::debug!(
            address = %address,
            port = %port_name,
            baud_rate = self.config.baud_rate,
            "Opening RFCOMM channel"
        );

        let port = tokio_serial::new(&port_name, self.config.baud_rate)
            .open_native_async()
            .map_err(|e| {
                tracing::warn!(
                    address = %address,
                    port = %port_name,
                    error = %e,
                    "Failed to open RFCOMM channel"
                );
                match e.kind() {
                    tokio_serial::ErrorKind::NoDevice => DomainError::AddressUnresolvable(format!(
                        "{address} ({port_name}): {e}"
                    )),
                    tokio_serial::ErrorKind::Io(std::io::ErrorKind::NotFound) => {
                        DomainError::AddressUnresolvable(format!("{address} ({port_name}): {e}"))
                    }
                    _ => DomainError::ConnectFailed(format!(
                        "{address} ({port_name}): {e}. Tip: check the channel is bound and not held by another process."
                    )),
                }
            })?;

        tracing::info!(address = %address, port = %port_name, "RFCOMM channel open");
        Ok(DuplexStream::from_stream(port))
    }
}
