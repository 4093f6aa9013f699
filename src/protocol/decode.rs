//! Inbound frame decoding

use super::constants::MAX_FRAME_LENGTH;
use crate::{Error, Result};
use serde_json::Value;

/// Decode one inbound frame into a structured value
///
/// Frames are a single self-describing JSON document. Both text and binary
/// WebSocket payloads go through here; binary payloads must still hold UTF-8
/// JSON.
///
/// # Errors
///
/// * `Error::Protocol` if the frame exceeds `max_len` (or [`MAX_FRAME_LENGTH`]
///   when `max_len` is `None`)
/// * `Error::Json` if the payload is not valid JSON
pub fn decode_frame(data: &[u8], max_len: Option<usize>) -> Result<Value> {
    let limit = max_len.unwrap_or(MAX_FRAME_LENGTH);
    if data.len() > limit {
        return Err(Error::Protocol(format!(
            "frame length {} exceeds maximum allowed {}",
            data.len(),
            limit
        )));
    }

    Ok(serde_json::from_slice(data)?)
}
