//! Message dispatch
//!
//! Turns inbound frames into JSON values and hands them to whatever handler
//! is registered at the moment the frame is dispatched.

mod handlers;

pub use handlers::{ErrorHandler, HandlerSlot, MessageHandler};

use crate::connection::{ConnectionId, TransportError};
use crate::metrics::counters;
use crate::protocol::decode_frame;

/// Result of dispatching one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Decoded and delivered to the message handler
    Delivered,
    /// Decoded, but no message handler was registered
    Discarded,
    /// Not valid structured data; dropped
    Malformed,
}

/// Routes decoded frames and faults to the current handler registration
#[derive(Debug, Clone)]
pub struct Dispatcher {
    handlers: HandlerSlot,
    max_frame_size: usize,
}

impl Dispatcher {
    /// Create a dispatcher reading from `handlers`
    pub fn new(handlers: HandlerSlot, max_frame_size: usize) -> Self {
        Self {
            handlers,
            max_frame_size,
        }
    }

    /// Handler registration this dispatcher reads from
    pub fn handlers(&self) -> &HandlerSlot {
        &self.handlers
    }

    /// Decode `frame` and deliver it to the current message handler
    ///
    /// Decode failures are logged and counted, never escalated.
    pub fn dispatch(&self, connection: ConnectionId, frame: &[u8]) -> DispatchOutcome {
        counters::frame_received(frame.len());

        let value = match decode_frame(frame, Some(self.max_frame_size)) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(%connection, error = %e, len = frame.len(), "failed to parse inbound frame");
                counters::decode_failure();
                return DispatchOutcome::Malformed;
            }
        };

        if self.handlers.call_message(value) {
            counters::message_dispatched();
            DispatchOutcome::Delivered
        } else {
            tracing::trace!(%connection, "no message handler registered, discarding message");
            counters::message_discarded();
            DispatchOutcome::Discarded
        }
    }

    /// Deliver a transport fault to the current error handler
    pub fn report_error(&self, connection: ConnectionId, err: &TransportError) {
        counters::transport_error(err.kind());
        if !self.handlers.call_error(err) {
            tracing::debug!(%connection, "no error handler registered");
        }
    }
}
