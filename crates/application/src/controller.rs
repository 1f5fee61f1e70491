use std::sync::Arc;

use domain::protocol::{AlarmAction, TimeOfDay};
use domain::{Command, DomainError};
use tracing::{debug, info, warn};

use crate::link::ConnectionManager;

/// Typed command surface over a managed link
#[derive(Clone)]
pub struct DeviceController {
    link: Arc<ConnectionManager>,
}

impl DeviceController {
    pub fn new(link: Arc<ConnectionManager>) -> Self {
        Self { link }
    }

    /// Encode and write one command
    pub async fn send(&self, command: &Command) -> Result<(), DomainError> {
        let bytes = command.encode();
        match self.link.try_write(&bytes).await {
            Ok(()) => {
                debug!(%command, bytes = bytes.len(), "Command sent");
                Ok(())
            }
            Err(e) => {
                warn!(%command, error = %e, "Command not sent");
                Err(e)
            }
        }
    }

    pub async fn light_on(&self) -> Result<(), DomainError> {
        self.send(&Command::LightOn).await
    }

    pub async fn light_off(&self) -> Result<(), DomainError> {
        self.send(&Command::LightOff).await
    }

    pub async fn toggle_light(&self) -> Result<(), DomainError> {
        self.send(&Command::ToggleLight).await
    }

    pub async fn request_status(&self) -> Result<(), DomainError> {
        self.send(&Command::GetStatus).await
    }

    pub async fn reboot(&self) -> Result<(), DomainError> {
        self.send(&Command::Reboot).await
    }

    pub async fn clear_alarms(&self) -> Result<(), DomainError> {
        self.send(&Command::ClearAlarms).await
    }

    /// Push the local wall-clock time to the device
    pub async fn sync_time(&self) -> Result<(), DomainError> {
        self.send(&Command::set_time_now()).await
    }

    pub async fn set_time(&self, at: TimeOfDay) -> Result<(), DomainError> {
        self.send(&Command::SetTime(at)).await
    }

    pub async fn add_alarm(&self, at: TimeOfDay, action: AlarmAction) -> Result<(), DomainError> {
        self.send(&Command::AddAlarm { at, action }).await
    }

    pub async fn enable_alarm(&self, index: u8, enabled: bool) -> Result<(), DomainError> {
        self.send(&Command::EnableAlarm { index, enabled }).await
    }

    pub async fn delete_alarm(&self, index: u8) -> Result<(), DomainError> {
        self.send(&Command::DeleteAlarm { index }).await
    }

    /// Run right after the link comes up: ask for status, then set the clock
    pub async fn handshake(&self) -> Result<(), DomainError> {
        self.request_status().await?;
        self.sync_time().await?;
        info!(address = ?self.link.connected_address(), "Handshake sent");
        Ok(())
    }
}
