use serde::{Deserialize, Serialize};

/// Network association state of the node.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    #[default]
    Down,
    Connecting,
    Up,
}

impl LinkState {
    pub const fn is_up(&self) -> bool {
        matches!(self, Self::Up)
    }
}

impl core::fmt::Display for LinkState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Down => "down",
            Self::Connecting => "connecting",
            Self::Up => "up",
        })
    }
}

/// Result of one HTTP delivery attempt.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// The collector answered 200 or 201.
    Delivered,
    /// The collector answered with any other status.
    ServerRejected,
    /// No response could be obtained (DNS, connect, timeout, I/O).
    TransportFailed,
}

impl DeliveryOutcome {
    pub const fn from_status(status: u16) -> Self {
        match status {
            200 | 201 => Self::Delivered,
            _ => Self::ServerRejected,
        }
    }
}

impl core::fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Delivered => "delivered",
            Self::ServerRejected => "server rejected",
            Self::TransportFailed => "transport failed",
        })
    }
}
