//! Error types

use std::io;
use thiserror::Error;

/// Main error type for proofa-realtime operations
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration (bad address, unreadable certificate, ...)
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Address could not be parsed as a URL
    #[error("invalid address: {0}")]
    Url(#[from] url::ParseError),

    /// JSON encoding or decoding failed
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Frame violated the wire contract
    #[error("protocol error: {0}")]
    Protocol(String),

    /// State machine violation
    #[error("invalid state: expected {expected}, got {actual}")]
    InvalidState {
        /// Expected state description
        expected: String,
        /// Actual state description
        actual: String,
    },

    /// Transport is no longer accepting frames
    #[error("connection closed")]
    ConnectionClosed,

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_state_display() {
        let err = Error::InvalidState {
            expected: "valid transition from connected".into(),
            actual: "connecting".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid state: expected valid transition from connected, got connecting"
        );
    }

    #[test]
    fn test_json_error_converts() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = parse.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
