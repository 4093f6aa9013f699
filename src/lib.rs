//! proofa-realtime: real-time connection manager for the Proofa dashboard
//!
//! The crate owns exactly one long-lived WebSocket connection per
//! [`ConnectionManager`], authenticates the handshake with a credential
//! embedded in the address, and routes every inbound JSON frame to the
//! currently registered handler.
//!
//! The manager is single-threaded and cooperative: transport I/O runs in
//! background tasks that only post notifications, and the owner drives
//! delivery with [`ConnectionManager::process_next`].
//!
//! ```no_run
//! # async fn example() {
//! use proofa_realtime::{ConnectionConfig, ConnectionManager, ConnectionStatus};
//!
//! let mut manager = ConnectionManager::new(ConnectionConfig::default());
//! manager.on_message(|msg| println!("received {msg}"));
//! manager.configure(Some("wss://api.proofa.example/rt"), Some("tok123"));
//!
//! while manager.status() != ConnectionStatus::Connected {
//!     manager.process_next().await;
//! }
//! manager.send(&serde_json::json!({"type": "ping"}));
//! manager.dispose();
//! # }
//! ```

#![warn(missing_docs)]

pub mod client;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod metrics;
pub mod protocol;
pub mod util;

pub use client::{Credential, Endpoint};
pub use connection::{
    ConnectionConfig, ConnectionConfigBuilder, ConnectionId, ConnectionManager, ConnectionStatus,
    TlsConfig, TransportError,
};
pub use dispatch::HandlerSlot;
pub use error::{Error, Result};
