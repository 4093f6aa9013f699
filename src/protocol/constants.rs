//! Wire constants

/// Maximum inbound frame length accepted by the decoder (16 MiB)
pub const MAX_FRAME_LENGTH: usize = 16 * 1024 * 1024;

/// Query parameter that carries the credential on the handshake URL
pub const DEFAULT_CREDENTIAL_PARAM: &str = "token";

/// Default handshake timeout, in seconds
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
