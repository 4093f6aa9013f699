//! Connection management
//!
//! This module handles:
//! * Transport abstraction (WebSocket vs in-memory loopback)
//! * Connection lifecycle (configure, handshake, teardown)
//! * State machine enforcement
//! * TLS configuration for `wss://` endpoints

mod config;
mod manager;
pub mod memory;
mod state;
mod tls;
mod transport;
mod websocket;

pub use config::{ConnectionConfig, ConnectionConfigBuilder};
pub use manager::ConnectionManager;
pub use state::ConnectionStatus;
pub use tls::{RootSource, TlsConfig, TlsConfigBuilder};
pub use transport::{
    ConnectionId, EventSink, Transport, TransportError, TransportEvent, TransportEventKind,
    TransportHandle,
};
pub use websocket::{WebSocketHandle, WebSocketTransport};
