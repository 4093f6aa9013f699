//! Connection manager: lifecycle control plus message dispatch

use super::config::ConnectionConfig;
use super::state::ConnectionStatus;
use super::transport::{
    ConnectionId, EventSink, Transport, TransportError, TransportEvent, TransportEventKind,
    TransportHandle,
};
use super::websocket::WebSocketTransport;
use crate::client::{redact, Credential, Endpoint};
use crate::dispatch::{Dispatcher, HandlerSlot};
use crate::metrics::counters;
use crate::protocol::encode_frame;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, watch};

/// Address and credential of the current session
#[derive(Debug, Clone, PartialEq, Eq)]
struct Target {
    address: String,
    credential: Credential,
}

impl Target {
    fn from_inputs(address: Option<&str>, credential: Option<&str>) -> Option<Self> {
        match (address, credential) {
            (Some(address), Some(credential)) if !address.is_empty() && !credential.is_empty() => {
                Some(Self {
                    address: address.to_string(),
                    credential: Credential::new(credential),
                })
            }
            _ => None,
        }
    }
}

/// The single live transport resource
struct ActiveConnection<H> {
    id: ConnectionId,
    handle: H,
}

/// Owns one real-time connection and routes its messages
///
/// All methods run on the caller's task. Transport notifications queue up
/// until the owner calls [`process_next`](Self::process_next) or
/// [`process_pending`](Self::process_pending); handlers run inside those
/// calls. The manager never returns errors: faults surface as
/// [`ConnectionStatus::Error`] plus one error-handler call, rejected sends
/// as `false`.
pub struct ConnectionManager<T: Transport = WebSocketTransport> {
    config: ConnectionConfig,
    transport: T,
    target: Option<Target>,
    active: Option<ActiveConnection<T::Handle>>,
    next_id: u64,
    status: watch::Sender<ConnectionStatus>,
    dispatcher: Dispatcher,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    events_rx: mpsc::UnboundedReceiver<TransportEvent>,
    disposed: bool,
}

impl ConnectionManager<WebSocketTransport> {
    /// Create a manager backed by the WebSocket transport
    ///
    /// Connections are opened with `tokio::spawn`, so `configure` must run
    /// inside a Tokio runtime.
    pub fn new(config: ConnectionConfig) -> Self {
        let transport = WebSocketTransport::new(&config);
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> ConnectionManager<T> {
    /// Create a manager over any transport
    pub fn with_transport(config: ConnectionConfig, transport: T) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (status, _) = watch::channel(ConnectionStatus::Disconnected);
        let dispatcher = Dispatcher::new(HandlerSlot::new(), config.max_frame_size);

        Self {
            config,
            transport,
            target: None,
            active: None,
            next_id: 0,
            status,
            dispatcher,
            events_tx,
            events_rx,
            disposed: false,
        }
    }

    /// Set the target address and credential
    ///
    /// * Either value absent (or empty): any live connection is closed and
    ///   status becomes `Disconnected`.
    /// * Same values as the live connection: no-op.
    /// * Otherwise the live connection, if any, is closed and a new one opened.
    ///
    /// Calling again with the same values after the connection ended (error
    /// or close) opens a fresh connection.
    pub fn configure(&mut self, address: Option<&str>, credential: Option<&str>) {
        if self.disposed {
            tracing::warn!("configure called on a disposed connection manager, ignoring");
            return;
        }

        let target = Target::from_inputs(address, credential);
        if target.is_some() && target == self.target && self.active.is_some() {
            tracing::trace!("configure with unchanged target, keeping connection");
            return;
        }

        if self.release_active("replaced") {
            self.set_status(ConnectionStatus::Disconnected);
        }
        self.target = target;

        match self.target.clone() {
            Some(target) => self.open(&target),
            None => {
                tracing::debug!("address or credential absent, not connecting");
                self.set_status(ConnectionStatus::Disconnected);
            }
        }
    }

    /// Current lifecycle state
    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    /// Observe lifecycle changes
    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    /// Identity of the live connection, if any
    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.active.as_ref().map(|a| a.id)
    }

    /// Whether `dispose` has run
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Transmit one payload as a JSON text frame
    ///
    /// Returns whether the frame was handed to the transport. Nothing is
    /// queued: outside `Connected` the payload is dropped and `false`
    /// returned.
    pub fn send<P: Serialize + ?Sized>(&mut self, payload: &P) -> bool {
        let status = self.status();
        let active = match (&mut self.active, status) {
            (Some(active), ConnectionStatus::Connected) => active,
            _ => {
                tracing::warn!(%status, "cannot send message, connection is not open");
                counters::send_rejected(status.as_str());
                return false;
            }
        };

        let frame = match encode_frame(payload) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "cannot send message, payload is not serializable");
                counters::send_rejected("unserializable");
                return false;
            }
        };

        let len = frame.len();
        match active.handle.send(frame) {
            Ok(()) => {
                counters::message_sent(len);
                true
            }
            Err(e) => {
                tracing::warn!(connection = %active.id, error = %e, "transport refused outbound frame");
                counters::send_rejected("transport");
                false
            }
        }
    }

    /// Replace the message handler; the connection is left untouched
    pub fn on_message(&mut self, handler: impl FnMut(Value) + 'static) {
        self.dispatcher.handlers().set_on_message(handler);
    }

    /// Replace the error handler; the connection is left untouched
    pub fn on_error(&mut self, handler: impl FnMut(&TransportError) + 'static) {
        self.dispatcher.handlers().set_on_error(handler);
    }

    /// Shared handler slot, for replacing handlers from elsewhere
    /// (including from inside a running handler)
    pub fn handlers(&self) -> HandlerSlot {
        self.dispatcher.handlers().clone()
    }

    /// Tear down: close the live connection, drop all handlers, stop
    /// accepting `configure`. Safe to call more than once.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.release_active("disposed");
        self.target = None;
        self.dispatcher.handlers().clear();
        self.set_status(ConnectionStatus::Disconnected);
        tracing::debug!("connection manager disposed");
    }

    /// Wait for the next transport notification and handle it
    ///
    /// Never resolves while no connection produces events; drive it from a
    /// `select!` alongside the rest of the owner's work.
    pub async fn process_next(&mut self) {
        if let Some(event) = self.events_rx.recv().await {
            self.handle_event(event);
        }
    }

    /// Handle every notification already queued, without waiting.
    /// Returns how many were processed.
    pub fn process_pending(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
            processed += 1;
        }
        processed
    }

    fn open(&mut self, target: &Target) {
        self.next_id += 1;
        let id = ConnectionId::new(self.next_id);

        // Counts as a started attempt even if the address turns out unusable.
        self.set_status(ConnectionStatus::Connecting);

        let endpoint = match Endpoint::parse(&target.address) {
            Ok(endpoint) => endpoint,
            Err(e) => {
                tracing::error!(connection = %id, error = %e, "cannot connect to invalid address");
                self.set_status(ConnectionStatus::Error);
                self.dispatcher
                    .report_error(id, &TransportError::InvalidAddress(e.to_string()));
                return;
            }
        };

        let url = endpoint.handshake_url(&target.credential, &self.config.credential_param);
        tracing::info!(
            connection = %id,
            endpoint = %redact(&url, &self.config.credential_param),
            "opening realtime connection"
        );

        let sink = EventSink::new(id, self.events_tx.clone());
        let handle = self.transport.open(&url, sink);
        self.active = Some(ActiveConnection { id, handle });
        counters::connection_opened();
    }

    /// Close and forget the live connection. Its pending and future
    /// notifications no longer match and are dropped.
    fn release_active(&mut self, reason: &'static str) -> bool {
        let Some(mut active) = self.active.take() else {
            return false;
        };
        tracing::debug!(connection = %active.id, reason, "releasing connection");
        active.handle.close();
        counters::connection_released(reason);
        true
    }

    fn handle_event(&mut self, event: TransportEvent) {
        let is_live = self
            .active
            .as_ref()
            .is_some_and(|active| active.id == event.connection);
        if !is_live {
            tracing::trace!(connection = %event.connection, "discarding notification from stale connection");
            counters::stale_event();
            return;
        }

        match event.kind {
            TransportEventKind::Opened => {
                tracing::info!(connection = %event.connection, "realtime connection established");
                self.set_status(ConnectionStatus::Connected);
            }
            TransportEventKind::Message(frame) => {
                self.dispatcher.dispatch(event.connection, &frame);
            }
            TransportEventKind::Error(err) => {
                tracing::error!(connection = %event.connection, error = %err, "realtime connection failed");
                self.release_active("error");
                self.set_status(ConnectionStatus::Error);
                self.dispatcher.report_error(event.connection, &err);
            }
            TransportEventKind::Closed => {
                tracing::info!(connection = %event.connection, "realtime connection closed");
                self.release_active("closed");
                self.set_status(ConnectionStatus::Disconnected);
            }
        }
    }

    fn set_status(&mut self, next: ConnectionStatus) {
        let mut current = self.status();
        if current == next {
            return;
        }
        if let Err(e) = current.transition(next) {
            tracing::warn!(error = %e, "unexpected lifecycle transition");
            return;
        }
        tracing::debug!(status = %next, "status changed");
        self.status.send_replace(current);
    }
}

impl<T: Transport> Drop for ConnectionManager<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<T: Transport> std::fmt::Debug for ConnectionManager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("status", &self.status())
            .field("connection", &self.connection_id())
            .field("address", &self.target.as_ref().map(|t| t.address.as_str()))
            .field("handlers", self.dispatcher.handlers())
            .field("disposed", &self.disposed)
            .finish()
    }
}
