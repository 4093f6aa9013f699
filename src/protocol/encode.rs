//! Outbound frame encoding

use crate::Result;
use serde::Serialize;

/// Encode a payload into one outbound text frame
///
/// Uses compact JSON, so the frame never contains a newline: string values
/// escape embedded newlines as `\n`.
pub fn encode_frame<T: Serialize + ?Sized>(payload: &T) -> Result<String> {
    Ok(serde_json::to_string(payload)?)
}
