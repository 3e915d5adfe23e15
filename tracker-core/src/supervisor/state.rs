use core::fmt;

/// Outer supervisor state, driven by the modem.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConnectionState {
    LteInit,
    LteDisconnected,
    LteConnected,
    Shutdown,
}

impl ConnectionState {
    pub const fn label(self) -> &'static str {
        match self {
            ConnectionState::LteInit => "lte-init",
            ConnectionState::LteDisconnected => "lte-disconnected",
            ConnectionState::LteConnected => "lte-connected",
            ConnectionState::Shutdown => "shutdown",
        }
    }

    pub const fn to_raw(self) -> u8 {
        match self {
            ConnectionState::LteInit => 0,
            ConnectionState::LteDisconnected => 1,
            ConnectionState::LteConnected => 2,
            ConnectionState::Shutdown => 3,
        }
    }

    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(ConnectionState::LteInit),
            1 => Some(ConnectionState::LteDisconnected),
            2 => Some(ConnectionState::LteConnected),
            3 => Some(ConnectionState::Shutdown),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Cloud session state. Only meaningful while [`ConnectionState::LteConnected`].
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum CloudSubState {
    #[default]
    CloudDisconnected,
    CloudConnected,
}

impl CloudSubState {
    pub const fn label(self) -> &'static str {
        match self {
            CloudSubState::CloudDisconnected => "cloud-disconnected",
            CloudSubState::CloudConnected => "cloud-connected",
        }
    }

    pub const fn is_connected(self) -> bool {
        matches!(self, CloudSubState::CloudConnected)
    }
}

impl fmt::Display for CloudSubState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Returns `true` when an expiring connection-check timer should raise a
/// connection timeout. In every other state the expiry is stale.
#[must_use]
pub const fn connection_check_due(state: ConnectionState, sub_state: CloudSubState) -> bool {
    matches!(
        (state, sub_state),
        (ConnectionState::LteConnected, CloudSubState::CloudDisconnected)
    )
}
