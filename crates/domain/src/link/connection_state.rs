use serde::{Deserialize, Serialize};

/// Lifecycle state of the single managed link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ConnectionState {
    /// Never connected since the manager was created
    #[default]
    None,
    /// A connect attempt is in flight
    Connecting,
    /// Transport open and reader running
    Connected,
    /// Torn down, either on request or after the stream closed
    Disconnected,
    /// The last attempt (or its pre-flight check) failed
    Error,
}

impl ConnectionState {
    /// Check if state allows a new connect attempt without teardown first
    pub fn can_connect(&self) -> bool {
        matches!(self, Self::None | Self::Disconnected | Self::Error)
    }

    /// Check if currently connected
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Check if a live attempt or connection holds resources
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }

    /// Transition to connecting state
    pub fn to_connecting(&self) -> Result<Self, &'static str> {
        match self {
            Self::None | Self::Disconnected | Self::Error => Ok(Self::Connecting),
            _ => Err("Can only connect from None, Disconnected or Error state"),
        }
    }

    /// Transition to connected state
    pub fn to_connected(&self) -> Result<Self, &'static str> {
        match self {
            Self::Connecting => Ok(Self::Connected),
            _ => Err("Can only complete connection from Connecting state"),
        }
    }

    /// Transition to error state after a failed attempt
    pub fn to_error(&self) -> Result<Self, &'static str> {
        match self {
            Self::Connecting => Ok(Self::Error),
            _ => Err("Can only fail an attempt from Connecting state"),
        }
    }

    /// Transition to error state when the pre-flight check rejects a connect
    /// (allowed from any state)
    pub fn to_rejected(&self) -> Self {
        Self::Error
    }

    /// Transition to disconnected state (allowed from any state)
    pub fn to_disconnected(&self) -> Self {
        Self::Disconnected
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Connecting => "CONNECTING",
            Self::Connected => "CONNECTED",
            Self::Disconnected => "DISCONNECTED",
            Self::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
