//! Connection configuration

use super::tls::TlsConfig;
use crate::protocol::constants::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_CREDENTIAL_PARAM, MAX_FRAME_LENGTH,
};
use std::time::Duration;

/// Connection configuration
///
/// Transport knobs shared by every connection a manager opens. The target
/// address and credential are not part of it: they arrive through
/// `ConnectionManager::configure`.
/// Use `ConnectionConfig::builder()` to override the defaults.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Handshake timeout (default: 10 seconds, `None` waits forever)
    pub connect_timeout: Option<Duration>,
    /// Query parameter carrying the credential (default: `token`)
    pub credential_param: String,
    /// Largest inbound frame accepted (default: 16 MiB)
    pub max_frame_size: usize,
    /// TLS settings for `wss://` endpoints (default: bundled roots)
    pub tls: Option<TlsConfig>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS)),
            credential_param: DEFAULT_CREDENTIAL_PARAM.to_string(),
            max_frame_size: MAX_FRAME_LENGTH,
            tls: None,
        }
    }
}

impl ConnectionConfig {
    /// Create a builder for advanced configuration
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let config = ConnectionConfig::builder()
    ///     .connect_timeout(Duration::from_secs(5))
    ///     .credential_param("access_token")
    ///     .build();
    /// ```
    pub fn builder() -> ConnectionConfigBuilder {
        ConnectionConfigBuilder {
            inner: ConnectionConfig::default(),
        }
    }
}

/// Builder for creating `ConnectionConfig`
#[derive(Debug, Clone)]
pub struct ConnectionConfigBuilder {
    inner: ConnectionConfig,
}

impl ConnectionConfigBuilder {
    /// Set the handshake timeout
    ///
    /// # Arguments
    ///
    /// * `duration` - Time allowed between opening the socket and the
    ///   server acknowledging the upgrade
    pub fn connect_timeout(mut self, duration: Duration) -> Self {
        self.inner.connect_timeout = Some(duration);
        self
    }

    /// Wait for the handshake without a timeout
    pub fn no_connect_timeout(mut self) -> Self {
        self.inner.connect_timeout = None;
        self
    }

    /// Set the query parameter that carries the credential
    pub fn credential_param(mut self, name: impl Into<String>) -> Self {
        self.inner.credential_param = name.into();
        self
    }

    /// Set the largest inbound frame accepted, in bytes
    pub fn max_frame_size(mut self, bytes: usize) -> Self {
        self.inner.max_frame_size = bytes;
        self
    }

    /// Set TLS settings for `wss://` endpoints
    pub fn tls(mut self, tls: TlsConfig) -> Self {
        self.inner.tls = Some(tls);
        self
    }

    /// Build the configuration
    pub fn build(self) -> ConnectionConfig {
        self.inner
    }
}
