//! Connection state machine

use crate::{Error, Result};

/// Lifecycle state of the managed connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConnectionStatus {
    /// No live connection (initial, torn down, or closed gracefully)
    #[default]
    Disconnected,

    /// Handshake initiated, not yet acknowledged
    Connecting,

    /// Handshake acknowledged, frames may flow both ways
    Connected,

    /// Transport fault; the connection is closed until the next `configure`
    Error,
}

impl ConnectionStatus {
    /// Check if transition is valid
    pub fn can_transition_to(&self, next: ConnectionStatus) -> bool {
        use ConnectionStatus::*;

        matches!(
            (self, next),
            (Disconnected, Connecting)
                | (Error, Connecting)
                | (Connecting, Connected)
                | (Connecting, Error)
                | (Connected, Error)
                | (_, Disconnected)
        )
    }

    /// Transition to new state
    pub fn transition(&mut self, next: ConnectionStatus) -> Result<()> {
        if !self.can_transition_to(next) {
            return Err(Error::InvalidState {
                expected: format!("valid transition from {}", self),
                actual: format!("{}", next),
            });
        }
        *self = next;
        Ok(())
    }

    /// Short label used in logs and metric labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
