//! Transport abstraction
//!
//! A transport opens connections without blocking and reports everything
//! that happens afterwards (open, inbound frames, fault, close) as
//! [`TransportEvent`]s posted through an [`EventSink`]. The manager consumes
//! those events on its own task, so a transport never calls back into
//! manager state directly.

use crate::Result;
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use url::Url;

/// Identity of one connection attempt within a manager
///
/// Assigned from a per-manager counter; never reused, so a notification can
/// be matched to the exact connection that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Fault reported by a transport, handed to the error handler
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Address could not be turned into a handshake URL
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Handshake was refused or failed
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// Handshake did not complete in time
    #[error("handshake timed out after {0:?}")]
    Timeout(Duration),

    /// Socket-level failure on an established connection
    #[error("io error: {0}")]
    Io(String),

    /// Peer violated the WebSocket protocol
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl TransportError {
    /// Short label used in logs and metric labels
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidAddress(_) => "invalid_address",
            Self::Handshake(_) => "handshake",
            Self::Timeout(_) => "timeout",
            Self::Io(_) => "io",
            Self::Protocol(_) => "protocol",
        }
    }
}

/// What happened on a connection
#[derive(Debug, Clone)]
pub enum TransportEventKind {
    /// Handshake acknowledged
    Opened,
    /// One inbound frame payload
    Message(Bytes),
    /// Transport fault; no further events follow for this connection
    Error(TransportError),
    /// Connection closed; no further events follow for this connection
    Closed,
}

/// Notification posted by a transport
#[derive(Debug, Clone)]
pub struct TransportEvent {
    /// Connection that produced the notification
    pub connection: ConnectionId,
    /// What happened
    pub kind: TransportEventKind,
}

/// Posting side of the manager's notification queue, stamped with one
/// connection's identity
#[derive(Debug, Clone)]
pub struct EventSink {
    connection: ConnectionId,
    tx: mpsc::UnboundedSender<TransportEvent>,
}

impl EventSink {
    pub(crate) fn new(connection: ConnectionId, tx: mpsc::UnboundedSender<TransportEvent>) -> Self {
        Self { connection, tx }
    }

    /// Connection this sink reports for
    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    /// Report that the handshake was acknowledged
    pub fn opened(&self) {
        self.post(TransportEventKind::Opened);
    }

    /// Report one inbound frame
    pub fn message(&self, frame: impl Into<Bytes>) {
        self.post(TransportEventKind::Message(frame.into()));
    }

    /// Report a transport fault
    pub fn error(&self, err: TransportError) {
        self.post(TransportEventKind::Error(err));
    }

    /// Report that the connection closed
    pub fn closed(&self) {
        self.post(TransportEventKind::Closed);
    }

    fn post(&self, kind: TransportEventKind) {
        // The manager may already be gone; nothing is waiting for the event then.
        let _ = self.tx.send(TransportEvent {
            connection: self.connection,
            kind,
        });
    }
}

/// Opens connections for a manager
pub trait Transport {
    /// Handle to one open (or opening) connection
    type Handle: TransportHandle;

    /// Start connecting to `url`. Must not block: completion, frames,
    /// faults and closure are reported through `events`.
    fn open(&mut self, url: &Url, events: EventSink) -> Self::Handle;
}

/// Exclusive handle to one connection
pub trait TransportHandle {
    /// Queue one outbound text frame
    fn send(&mut self, frame: String) -> Result<()>;

    /// Request close. Idempotent; the transport may still post a `Closed`
    /// event afterwards.
    fn close(&mut self);
}
