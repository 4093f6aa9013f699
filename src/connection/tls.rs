//! TLS configuration for `wss://` endpoints.
//!
//! Every secure handshake goes through a rustls `ClientConfig` built here,
//! so the crypto provider and root store are always explicit.

use crate::{Error, Result};
use rustls::{ClientConfig, RootCertStore};
use rustls_pemfile::Item;
use std::fs;
use std::sync::Arc;

/// Where trusted root certificates come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RootSource {
    /// Mozilla roots bundled through `webpki-roots`
    #[default]
    Bundled,
    /// Operating system trust store via `rustls-native-certs`
    Native,
}

/// TLS configuration for secure WebSocket connections.
///
/// # Examples
///
/// ```ignore
/// use proofa_realtime::connection::TlsConfig;
///
/// // Bundled Mozilla roots (default)
/// let tls = TlsConfig::builder().build()?;
///
/// // Private CA for a staging backend
/// let tls = TlsConfig::builder()
///     .ca_cert_path("/etc/proofa/staging-ca.pem")
///     .build()?;
/// ```
#[derive(Clone)]
pub struct TlsConfig {
    /// Path to CA certificate file (None = use `roots`)
    ca_cert_path: Option<String>,
    /// Root store used when no CA file is given
    roots: RootSource,
    /// Compiled rustls ClientConfig
    client_config: Arc<ClientConfig>,
}

impl TlsConfig {
    /// Create a new TLS configuration builder.
    pub fn builder() -> TlsConfigBuilder {
        TlsConfigBuilder::default()
    }

    /// Get the rustls ClientConfig for this TLS configuration.
    pub fn client_config(&self) -> Arc<ClientConfig> {
        self.client_config.clone()
    }

    /// Root store used when no CA file was configured
    pub fn roots(&self) -> RootSource {
        self.roots
    }

    /// Custom CA file, if any
    pub fn ca_cert_path(&self) -> Option<&str> {
        self.ca_cert_path.as_deref()
    }
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("ca_cert_path", &self.ca_cert_path)
            .field("roots", &self.roots)
            .field("client_config", &"<ClientConfig>")
            .finish()
    }
}

/// Builder for TLS configuration.
#[derive(Debug, Default)]
pub struct TlsConfigBuilder {
    ca_cert_path: Option<String>,
    roots: RootSource,
}

impl TlsConfigBuilder {
    /// Trust only the certificates in this PEM file.
    ///
    /// Overrides [`roots`](Self::roots).
    pub fn ca_cert_path(mut self, path: impl Into<String>) -> Self {
        self.ca_cert_path = Some(path.into());
        self
    }

    /// Select the root store used when no CA file is given (default: bundled).
    pub fn roots(mut self, roots: RootSource) -> Self {
        self.roots = roots;
        self
    }

    /// Build the TLS configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - CA certificate file cannot be read
    /// - CA certificate is invalid PEM or holds no certificate
    /// - no native root certificate could be loaded
    pub fn build(self) -> Result<TlsConfig> {
        let root_store = match (&self.ca_cert_path, self.roots) {
            (Some(ca_path), _) => load_custom_ca(ca_path)?,
            (None, RootSource::Bundled) => {
                let mut store = RootCertStore::empty();
                store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
                store
            }
            (None, RootSource::Native) => load_native_roots()?,
        };

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let client_config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| Error::Config(format!("TLS protocol setup failed: {}", e)))?
            .with_root_certificates(root_store)
            .with_no_client_auth();

        Ok(TlsConfig {
            ca_cert_path: self.ca_cert_path,
            roots: self.roots,
            client_config: Arc::new(client_config),
        })
    }
}

fn load_native_roots() -> Result<RootCertStore> {
    let result = rustls_native_certs::load_native_certs();

    let mut store = RootCertStore::empty();
    let (added, _ignored) = store.add_parsable_certificates(result.certs);

    if added == 0 {
        return Err(Error::Config(format!(
            "failed to load any system root certificates ({} errors)",
            result.errors.len()
        )));
    }
    if !result.errors.is_empty() {
        tracing::debug!(
            errors = result.errors.len(),
            "some system root certificates could not be loaded"
        );
    }

    Ok(store)
}

/// Load a custom CA certificate from a PEM file.
fn load_custom_ca(ca_path: &str) -> Result<RootCertStore> {
    let ca_cert_data = fs::read(ca_path).map_err(|e| {
        Error::Config(format!(
            "failed to read CA certificate file '{}': {}",
            ca_path, e
        ))
    })?;

    let mut reader = std::io::Cursor::new(&ca_cert_data);
    let mut root_store = RootCertStore::empty();
    let mut found_certs = 0;

    loop {
        match rustls_pemfile::read_one(&mut reader) {
            Ok(Some(Item::X509Certificate(cert))) => {
                let _ = root_store.add_parsable_certificates(std::iter::once(cert));
                found_certs += 1;
            }
            Ok(Some(_)) => {
                // keys and CRLs are not trust anchors
            }
            Ok(None) => break,
            Err(_) => {
                return Err(Error::Config(format!(
                    "failed to parse CA certificate from '{}'",
                    ca_path
                )));
            }
        }
    }

    if found_certs == 0 {
        return Err(Error::Config(format!(
            "no valid certificates found in '{}'",
            ca_path
        )));
    }

    Ok(root_store)
}
