use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use domain::protocol::StatusPolicy;
use serde::{Deserialize, Serialize};

use crate::transport::TransportConfig;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DeviceConfig {
    /// Target switch; may be left out and given on the command line
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_connect_timeout_ms() -> u64 {
    3000
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            address: None,
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LinkConfig {
    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,
}

fn default_read_buffer_size() -> usize {
    1024
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: default_read_buffer_size(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StatusConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Missing-field handling for `RELAY`, `TIME` and `ALARMS`
    #[serde(flatten)]
    pub policy: StatusPolicy,
}

fn default_poll_interval() -> u64 {
    5
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            policy: StatusPolicy::default(),
        }
    }
}

impl StatusConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ControllerConfig {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub link: LinkConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub status: StatusConfig,
}

impl ControllerConfig {
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .set_default("device.connect_timeout_ms", default_connect_timeout_ms() as i64)?
            .set_default("link.read_buffer_size", default_read_buffer_size() as i64)?
            // Required so the agent never starts on an empty configuration
            .add_source(File::with_name(&format!("{}/default", config_dir)).required(true))
            .add_source(File::with_name(&format!("{}/{}", config_dir, run_mode)).required(false))
            // Environment variables (e.g. SWITCH__DEVICE__ADDRESS=78:42:1C:18:E8:0A)
            .add_source(Environment::with_prefix("SWITCH").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.device.connect_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::protocol::MissingFieldPolicy;
    use std::fs;

    fn write_config(dir: &std::path::Path, body: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join("default.toml"), body).unwrap();
    }

    #[test]
    fn test_load_full_config() {
        let dir = std::env::temp_dir().join(format!("switch-config-full-{}", std::process::id()));
        write_config(
            &dir,
            r#"
[device]
address = "78:42:1C:18:E8:0A"
connect_timeout_ms = 5000

[link]
read_buffer_size = 256

[transport]
kind = "Rfcomm"
baud_rate = 9600

[transport.bindings]
"78:42:1C:18:E8:0A" = "/dev/rfcomm0"

[status]
poll_interval_secs = 10
relay = "KeepLast"
"#,
        );

        let config = ControllerConfig::load(dir.to_str().unwrap()).unwrap();
        assert_eq!(config.device.address.as_deref(), Some("78:42:1C:18:E8:0A"));
        assert_eq!(config.connect_timeout(), Duration::from_millis(5000));
        assert_eq!(config.link.read_buffer_size, 256);
        assert_eq!(config.status.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.status.policy.relay, MissingFieldPolicy::KeepLast);
        assert_eq!(config.status.policy.time, MissingFieldPolicy::Reset);
        match config.transport {
            TransportConfig::Rfcomm(rfcomm) => {
                assert_eq!(rfcomm.baud_rate, 9600);
                // Map keys may come back lower-cased; lookups ignore case
                let address = domain::TargetAddress::new("78:42:1C:18:E8:0A").unwrap();
                assert_eq!(rfcomm.port_for(&address).unwrap(), "/dev/rfcomm0");
            }
            other => panic!("unexpected transport {other:?}"),
        }

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_minimal_config_uses_defaults() {
        let dir = std::env::temp_dir().join(format!("switch-config-min-{}", std::process::id()));
        write_config(
            &dir,
            r#"
[transport]
kind = "Simulator"
"#,
        );

        let config = ControllerConfig::load(dir.to_str().unwrap()).unwrap();
        assert!(config.device.address.is_none());
        assert_eq!(config.device.connect_timeout_ms, 3000);
        assert_eq!(config.link.read_buffer_size, 1024);
        assert_eq!(config.status.poll_interval_secs, 5);
        assert!(matches!(config.transport, TransportConfig::Simulator(_)));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_default_file_is_an_error() {
        let dir = std::env::temp_dir().join("switch-config-does-not-exist");
        assert!(ControllerConfig::load(dir.to_str().unwrap()).is_err());
    }
}
