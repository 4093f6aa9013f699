//! Endpoint parsing and credential embedding
//!
//! Supports addresses of the form:
//! * ws://host[:port][/path][?params]
//! * wss://host[:port][/path][?params]
//! * http(s)://... (rewritten to ws(s)://, as browsers do)
//!
//! The transport cannot carry custom headers during the upgrade, so the
//! credential travels as a query parameter on the handshake URL.

use crate::{Error, Result};
use url::Url;

/// Placeholder written wherever a credential would otherwise be logged
const REDACTED: &str = "***";

/// Authentication credential sent once, in the handshake URL
///
/// `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a credential string
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Raw secret, only for building the handshake URL
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Credential({})", REDACTED)
    }
}

/// Parsed real-time endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: Url,
}

impl Endpoint {
    /// Parse an address
    ///
    /// # Errors
    ///
    /// * `Error::Url` if the address is not an absolute URL
    /// * `Error::Config` for unsupported schemes or a missing host
    pub fn parse(address: &str) -> Result<Self> {
        let mut url = Url::parse(address.trim())?;

        let scheme = match url.scheme() {
            "ws" | "http" => "ws",
            "wss" | "https" => "wss",
            other => {
                return Err(Error::Config(format!(
                    "unsupported scheme '{}': expected ws, wss, http or https",
                    other
                )))
            }
        };
        if url.scheme() != scheme {
            url.set_scheme(scheme)
                .map_err(|_| Error::Config(format!("cannot rewrite scheme to {}", scheme)))?;
        }

        if url.host_str().map_or(true, str::is_empty) {
            return Err(Error::Config("address must include a host".into()));
        }
        url.set_fragment(None);

        Ok(Self { url })
    }

    /// Whether the handshake needs TLS
    pub fn is_secure(&self) -> bool {
        self.url.scheme() == "wss"
    }

    /// Host name
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    /// Address without the credential
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Handshake URL: the address with `param=<credential>` appended
    ///
    /// Existing query parameters are kept, including an existing `param`.
    pub fn handshake_url(&self, credential: &Credential, param: &str) -> Url {
        let mut url = self.url.clone();
        url.query_pairs_mut().append_pair(param, credential.expose());
        url
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url)
    }
}

/// Render a handshake URL with the value of `param` masked
pub fn redact(url: &Url, param: &str) -> String {
    if url.query().is_none() {
        return url.to_string();
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == param { REDACTED.to_string() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();

    let mut masked = url.clone();
    masked.query_pairs_mut().clear().extend_pairs(pairs);
    masked.to_string()
}
