use clap::{Parser, Subcommand, ValueEnum};
use domain::Command;
use domain::protocol::{AlarmAction, TimeOfDay};

#[derive(Parser, Debug)]
#[command(name = "switch-agent")]
#[command(author, version, about = "Bluetooth link agent for the online switch", long_about = None)]
pub struct Args {
    /// Path to config directory (defaults to the crate's config dir)
    #[arg(long)]
    pub config_dir: Option<String>,

    /// Override the target device address
    #[arg(short, long)]
    pub address: Option<String>,

    /// Talk to the in-process simulated switch instead of RFCOMM
    #[arg(long)]
    pub simulate: bool,

    /// Override the connect timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    #[command(subcommand)]
    pub action: Option<Action>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AlarmActionArg {
    On,
    Off,
    Toggle,
}

impl From<AlarmActionArg> for AlarmAction {
    fn from(a: AlarmActionArg) -> Self {
        match a {
            AlarmActionArg::On => Self::RelayOn,
            AlarmActionArg::Off => Self::RelayOff,
            AlarmActionArg::Toggle => Self::RelayToggle,
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Keep the link up, poll status and log it (default)
    Run,
    /// Print the device status once
    Status,
    /// Switch the relay on
    On,
    /// Switch the relay off
    Off,
    /// Flip the relay
    Toggle,
    /// Restart the device
    Reboot,
    /// Push the local time to the device
    SyncTime,
    /// Set the device clock to a given time (HH:MM[:SS])
    SetTime { time: TimeOfDay },
    /// Print the device clock
    GetTime,
    /// List configured alarms
    Alarms,
    /// Add an alarm firing at HH:MM[:SS]
    AddAlarm {
        time: TimeOfDay,
        #[arg(value_enum)]
        action: AlarmActionArg,
    },
    /// Enable the alarm at index
    EnableAlarm { index: u8 },
    /// Disable the alarm at index
    DisableAlarm { index: u8 },
    /// Delete the alarm at index
    DeleteAlarm { index: u8 },
    /// Delete every alarm
    ClearAlarms,
}

impl Action {
    /// The single command a one-shot action sends; `None` for `run`
    pub fn command(&self) -> Option<Command> {
        let command = match self {
            Self::Run => return None,
            Self::Status => Command::GetStatus,
            Self::On => Command::LightOn,
            Self::Off => Command::LightOff,
            Self::Toggle => Command::ToggleLight,
            Self::Reboot => Command::Reboot,
            Self::SyncTime => Command::set_time_now(),
            Self::SetTime { time } => Command::SetTime(*time),
            Self::GetTime => Command::GetTime,
            Self::Alarms => Command::GetAlarms,
            Self::AddAlarm { time, action } => Command::AddAlarm {
                at: *time,
                action: (*action).into(),
            },
            Self::EnableAlarm { index } => Command::EnableAlarm {
                index: *index,
                enabled: true,
            },
            Self::DisableAlarm { index } => Command::EnableAlarm {
                index: *index,
                enabled: false,
            },
            Self::DeleteAlarm { index } => Command::DeleteAlarm { index: *index },
            Self::ClearAlarms => Command::ClearAlarms,
        };
        Some(command)
    }
}
