use std::time::{Duration, Instant};

use async_trait::async_trait;
use domain::link::{DuplexStream, Transport, TransportAvailability};
use domain::protocol::{AlarmAction, TimeOfDay};
use domain::{Command, CommandFrame, DomainError, TargetAddress};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::sleep;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Addresses that answer; empty means any address does
    #[serde(default = "default_addresses")]
    pub addresses: Vec<String>,
    #[serde(default)]
    pub connect_delay_ms: u64,
    #[serde(default)]
    pub relay_on: bool,
}

fn default_enabled() -> bool {
    true
}
fn default_addresses() -> Vec<String> {
    vec!["78:42:1C:18:E8:0A".to_string()]
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            addresses: default_addresses(),
            connect_delay_ms: 0,
            relay_on: false,
        }
    }
}

/// In-process stand-in for the switch, reachable through the `Transport` port
pub struct SimulatorTransport {
    config: SimulatorConfig,
}

impl SimulatorTransport {
    pub fn new(config: SimulatorConfig) -> Self {
        Self { config }
    }

    fn answers(&self, address: &TargetAddress) -> bool {
        self.config.addresses.is_empty()
            || self
                .config
                .addresses
                .iter()
                .any(|a| a.eq_ignore_ascii_case(address.as_str()))
    }
}

#[async_trait]
impl Transport for SimulatorTransport {
    fn availability(&self) -> TransportAvailability {
        if self.config.enabled {
            TransportAvailability::Ready
        } else {
            TransportAvailability::Disabled
        }
    }

    async fn open(&self, address: &TargetAddress) -> Result<DuplexStream, DomainError> {
        if self.config.connect_delay_ms > 0 {
            sleep(Duration::from_millis(self.config.connect_delay_ms)).await;
        }

        if !self.answers(address) {
            tracing::warn!(address = %address, "Simulated switch not in range");
            return Err(DomainError::AddressUnresolvable(address.to_string()));
        }

        let (client, device) = tokio::io::duplex(1024);
        let switch = SimulatedSwitch::new(self.config.relay_on);
        tokio::spawn(switch.run(device));

        tracing::info!(address = %address, "Simulator connected");
        Ok(DuplexStream::from_stream(client))
    }
}

#[derive(Debug, Clone)]
struct Alarm {
    at: TimeOfDay,
    action: AlarmAction,
    enabled: bool,
}

/// Firmware model: relay, wall clock and alarm table
struct SimulatedSwitch {
    relay_on: bool,
    /// Seconds since midnight at `clock_set`
    clock_base: u64,
    clock_set: Instant,
    alarms: Vec<Alarm>,
}

enum Reply {
    Text(String),
    /// Reply, then drop the link
    Restart(String),
}

impl SimulatedSwitch {
    fn new(relay_on: bool) -> Self {
        let mut switch = Self {
            relay_on,
            clock_base: 0,
            clock_set: Instant::now(),
            alarms: Vec::new(),
        };
        switch.set_clock(TimeOfDay::now());
        switch
    }

    fn set_clock(&mut self, t: TimeOfDay) {
        self.clock_base = t.hour() as u64 * 3600 + t.minute() as u64 * 60 + t.second() as u64;
        self.clock_set = Instant::now();
    }

    fn clock(&self) -> String {
        let secs = (self.clock_base + self.clock_set.elapsed().as_secs()) % SECONDS_PER_DAY;
        format!("{:02}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
    }

    fn status_line(&self) -> String {
        format!(
            "STATUS:RELAY={} TIME={} ALARMS={}\n",
            if self.relay_on { "ON" } else { "OFF" },
            self.clock(),
            self.alarms.len()
        )
    }

    fn handle(&mut self, command: Command) -> Reply {
        let text = match command {
            Command::LightOn => {
                self.relay_on = true;
                self.status_line()
            }
            Command::LightOff => {
                self.relay_on = false;
                self.status_line()
            }
            Command::ToggleLight => {
                self.relay_on = !self.relay_on;
                self.status_line()
            }
            Command::GetStatus => self.status_line(),
            Command::Reboot => return Reply::Restart("RESTARTING\n".to_string()),
            Command::ClearAlarms => {
                self.alarms.clear();
                "OK:ALARMS=0\n".to_string()
            }
            Command::SetTime(t) => {
                self.set_clock(t);
                format!("OK:TIME={}\n", self.clock())
            }
            Command::GetTime => format!("TIME={}\n", self.clock()),
            Command::GetAlarms => {
                let mut out = format!("ALARMS={}\n", self.alarms.len());
                for (i, alarm) in self.alarms.iter().enumerate() {
                    out.push_str(&format!(
                        "ALARM{}:{},{},{}\n",
                        i,
                        alarm.at,
                        alarm.action.as_str(),
                        if alarm.enabled { "ENABLED" } else { "DISABLED" }
                    ));
                }
                out
            }
            Command::AddAlarm { at, action } => {
                self.alarms.push(Alarm {
                    at,
                    action,
                    enabled: true,
                });
                format!("OK:ALARMS={}\n", self.alarms.len())
            }
            Command::EnableAlarm { index, enabled } => {
                match self.alarms.get_mut(index as usize) {
                    Some(alarm) => {
                        alarm.enabled = enabled;
                        "OK\n".to_string()
                    }
                    None => "ERR:NO_SUCH_ALARM\n".to_string(),
                }
            }
            Command::DeleteAlarm { index } => {
                if (index as usize) < self.alarms.len() {
                    self.alarms.remove(index as usize);
                    format!("OK:ALARMS={}\n", self.alarms.len())
                } else {
                    "ERR:NO_SUCH_ALARM\n".to_string()
                }
            }
        };
        Reply::Text(text)
    }

    async fn run(mut self, mut stream: tokio::io::DuplexStream) {
        let mut pending: Vec<u8> = Vec::new();
        let mut buf = [0u8; 256];

        loop {
            let n = match stream.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };
            pending.extend_from_slice(&buf[..n]);

            loop {
                let frame = match CommandFrame::parse(&pending) {
                    Ok(Some((frame, used))) => {
                        pending.drain(..used);
                        frame
                    }
                    Ok(None) => break,
                    Err(e) => {
                        // Resynchronise on the next byte
                        tracing::debug!(error = %e, "Simulator dropped a byte");
                        pending.remove(0);
                        continue;
                    }
                };

                let command = frame.payload_str().and_then(Command::from_payload);
                let reply = match command {
                    Some(command) => {
                        tracing::debug!(%command, "Simulator received command");
                        self.handle(command)
                    }
                    None => Reply::Text("ERR:UNKNOWN_COMMAND\n".to_string()),
                };

                match reply {
                    Reply::Text(text) => {
                        if stream.write_all(text.as_bytes()).await.is_err() {
                            return;
                        }
                    }
                    Reply::Restart(text) => {
                        let _ = stream.write_all(text.as_bytes()).await;
                        tracing::info!("Simulated switch restarting");
                        return;
                    }
                }
            }
        }
        tracing::info!("Simulator disconnected");
    }
}
