//! Addressing: where to connect and with which credential

mod endpoint;

pub use endpoint::{redact, Credential, Endpoint};
