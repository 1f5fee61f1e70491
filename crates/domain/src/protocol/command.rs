use chrono::{Local, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use super::frame::{
    CLEAR_ALARMS_FRAME, CommandFrame, GET_STATUS_FRAME, LIGHT_OFF_FRAME, LIGHT_ON_FRAME,
    REBOOT_FRAME,
};
use crate::error::{DomainError, Result};

/// 24-hour wall-clock time as the device understands it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TimeOfDayFields")]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
    second: u8,
}

#[derive(Deserialize)]
struct TimeOfDayFields {
    hour: u8,
    minute: u8,
    second: u8,
}

impl TryFrom<TimeOfDayFields> for TimeOfDay {
    type Error = DomainError;

    fn try_from(f: TimeOfDayFields) -> Result<Self> {
        Self::from_hms(f.hour, f.minute, f.second)
    }
}

impl TimeOfDay {
    pub fn from_hms(hour: u8, minute: u8, second: u8) -> Result<Self> {
        if hour > 23 || minute > 59 || second > 59 {
            return Err(DomainError::InvalidTime(format!(
                "{hour:02}:{minute:02}:{second:02}"
            )));
        }
        Ok(Self {
            hour,
            minute,
            second,
        })
    }

    /// Current local wall-clock time
    pub fn now() -> Self {
        Self::from(Local::now().time())
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    pub fn second(&self) -> u8 {
        self.second
    }

    /// `HH,MM,SS` as used inside command payloads
    fn wire(&self) -> String {
        format!("{:02},{:02},{:02}", self.hour, self.minute, self.second)
    }

    fn parse_wire(s: &str) -> Option<Self> {
        let mut parts = s.split(',');
        let hour = parts.next()?.parse().ok()?;
        let minute = parts.next()?.parse().ok()?;
        let second = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Self::from_hms(hour, minute, second).ok()
    }
}

impl From<NaiveTime> for TimeOfDay {
    fn from(t: NaiveTime) -> Self {
        Self {
            hour: t.hour() as u8,
            minute: t.minute() as u8,
            second: t.second() as u8,
        }
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
    }
}

impl std::str::FromStr for TimeOfDay {
    type Err = DomainError;

    /// Accepts `HH:MM` or `HH:MM:SS`
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || DomainError::InvalidTime(format!("{s:?}"));
        let mut parts = s.trim().split(':');
        let hour = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(invalid)?;
        let minute = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(invalid)?;
        let second = match parts.next() {
            Some(p) => p.parse().map_err(|_| invalid())?,
            None => 0,
        };
        if parts.next().is_some() {
            return Err(invalid());
        }
        Self::from_hms(hour, minute, second)
    }
}

/// Relay action an alarm fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmAction {
    RelayOn,
    RelayOff,
    RelayToggle,
}

impl AlarmAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RelayOn => "RELAY_ON",
            Self::RelayOff => "RELAY_OFF",
            Self::RelayToggle => "RELAY_TOGGLE",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "RELAY_ON" => Some(Self::RelayOn),
            "RELAY_OFF" => Some(Self::RelayOff),
            "RELAY_TOGGLE" => Some(Self::RelayToggle),
            _ => None,
        }
    }
}

/// Symbolic commands understood by the switch firmware
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    LightOn,
    LightOff,
    ToggleLight,
    GetStatus,
    Reboot,
    ClearAlarms,
    SetTime(TimeOfDay),
    GetTime,
    GetAlarms,
    AddAlarm { at: TimeOfDay, action: AlarmAction },
    EnableAlarm { index: u8, enabled: bool },
    DeleteAlarm { index: u8 },
}

impl Command {
    /// `SET_TIME` stamped with the local clock at call time
    pub fn set_time_now() -> Self {
        Self::SetTime(TimeOfDay::now())
    }

    /// ASCII payload carried inside the frame
    pub fn payload(&self) -> String {
        match self {
            Self::LightOn => "RELAY_ON".to_string(),
            Self::LightOff => "RELAY_OFF".to_string(),
            Self::ToggleLight => "RELAY_TOGGLE".to_string(),
            Self::GetStatus => "GET_STATUS".to_string(),
            Self::Reboot => "RESTART".to_string(),
            Self::ClearAlarms => "CLEAR_ALARMS".to_string(),
            Self::SetTime(t) => format!("SET_TIME={}", t.wire()),
            Self::GetTime => "GET_TIME".to_string(),
            Self::GetAlarms => "GET_ALARMS".to_string(),
            Self::AddAlarm { at, action } => {
                format!("ADD_ALARM={},{}", at.wire(), action.as_str())
            }
            Self::EnableAlarm { index, enabled } => format!(
                "ENABLE_ALARM={},{}",
                index,
                if *enabled { "ENABLE" } else { "DISABLE" }
            ),
            Self::DeleteAlarm { index } => format!("DELETE_ALARM={index}"),
        }
    }

    /// Encoded bytes ready for the wire
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::LightOn => LIGHT_ON_FRAME.to_vec(),
            Self::LightOff => LIGHT_OFF_FRAME.to_vec(),
            Self::GetStatus => GET_STATUS_FRAME.to_vec(),
            Self::Reboot => REBOOT_FRAME.to_vec(),
            Self::ClearAlarms => CLEAR_ALARMS_FRAME.to_vec(),
            _ => self.frame().to_bytes(),
        }
    }

    pub fn frame(&self) -> CommandFrame {
        CommandFrame::from_short_payload(self.payload().into_bytes())
    }

    /// Map a received payload back to a command (device side / diagnostics)
    pub fn from_payload(payload: &str) -> Option<Self> {
        let (name, arg) = match payload.split_once('=') {
            Some((name, arg)) => (name, Some(arg)),
            None => (payload, None),
        };

        match (name, arg) {
            ("RELAY_ON", None) => Some(Self::LightOn),
            ("RELAY_OFF", None) => Some(Self::LightOff),
            ("RELAY_TOGGLE", None) => Some(Self::ToggleLight),
            ("GET_STATUS", None) => Some(Self::GetStatus),
            ("RESTART", None) => Some(Self::Reboot),
            ("CLEAR_ALARMS", None) => Some(Self::ClearAlarms),
            ("GET_TIME", None) => Some(Self::GetTime),
            ("GET_ALARMS", None) => Some(Self::GetAlarms),
            ("SET_TIME", Some(arg)) => TimeOfDay::parse_wire(arg).map(Self::SetTime),
            ("ADD_ALARM", Some(arg)) => {
                let (time, action) = arg.rsplit_once(',')?;
                Some(Self::AddAlarm {
                    at: TimeOfDay::parse_wire(time)?,
                    action: AlarmAction::parse(action)?,
                })
            }
            ("ENABLE_ALARM", Some(arg)) => {
                let (index, flag) = arg.split_once(',')?;
                let enabled = match flag {
                    "ENABLE" => true,
                    "DISABLE" => false,
                    _ => return None,
                };
                Some(Self::EnableAlarm {
                    index: index.parse().ok()?,
                    enabled,
                })
            }
            ("DELETE_ALARM", Some(arg)) => Some(Self::DeleteAlarm {
                index: arg.parse().ok()?,
            }),
            _ => None,
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.payload())
    }
}
