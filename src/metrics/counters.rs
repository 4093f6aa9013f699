//! Counter and gauge helpers

use ::metrics::{counter, gauge};

/// A handshake was initiated
pub fn connection_opened() {
    counter!("proofa_realtime_connections_opened_total").increment(1);
    gauge!("proofa_realtime_connections_active").increment(1.0);
}

/// A live connection was released, `reason` is one of
/// `closed`, `error`, `replaced`, `disposed`
pub fn connection_released(reason: &'static str) {
    counter!("proofa_realtime_connections_released_total", "reason" => reason).increment(1);
    gauge!("proofa_realtime_connections_active").decrement(1.0);
}

/// A transport fault was reported to the error handler
pub fn transport_error(kind: &'static str) {
    counter!("proofa_realtime_transport_errors_total", "kind" => kind).increment(1);
}

/// An inbound frame arrived for the live connection
pub fn frame_received(bytes: usize) {
    counter!("proofa_realtime_frames_received_total").increment(1);
    counter!("proofa_realtime_bytes_received_total").increment(bytes as u64);
}

/// An inbound frame could not be decoded and was dropped
pub fn decode_failure() {
    counter!("proofa_realtime_decode_failures_total").increment(1);
}

/// A decoded message reached the message handler
pub fn message_dispatched() {
    counter!("proofa_realtime_messages_dispatched_total").increment(1);
}

/// A decoded message was discarded because no handler was registered
pub fn message_discarded() {
    counter!("proofa_realtime_messages_discarded_total").increment(1);
}

/// An outbound frame was handed to the transport
pub fn message_sent(bytes: usize) {
    counter!("proofa_realtime_messages_sent_total").increment(1);
    counter!("proofa_realtime_bytes_sent_total").increment(bytes as u64);
}

/// `send` was refused; `status` is the lifecycle state at the time
pub fn send_rejected(status: &'static str) {
    counter!("proofa_realtime_sends_rejected_total", "status" => status).increment(1);
}

/// A notification from a superseded or disposed connection was dropped
pub fn stale_event() {
    counter!("proofa_realtime_stale_events_total").increment(1);
}
