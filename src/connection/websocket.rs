//! WebSocket transport over `tokio-tungstenite`
//!
//! Each `open` spawns one I/O task that owns the socket. The task performs
//! the handshake, then pumps inbound frames into the manager's event queue
//! and outbound frames from the handle onto the socket. It never reads or
//! writes manager state.

use super::config::ConnectionConfig;
use super::tls::TlsConfig;
use super::transport::{EventSink, Transport, TransportError, TransportHandle};
use crate::{Error, Result};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, protocol::Message};
use tokio_tungstenite::{connect_async_tls_with_config, Connector, MaybeTlsStream, WebSocketStream};
use tracing::Instrument;
use url::Url;

/// Upper bound on the closing handshake once close was requested
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Command from the handle to the I/O task
#[derive(Debug)]
enum Outbound {
    Frame(String),
    Close,
}

/// Production transport
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    connect_timeout: Option<Duration>,
    tls: Option<TlsConfig>,
}

impl WebSocketTransport {
    /// Create a transport from connection settings
    ///
    /// Without explicit TLS settings, `wss://` handshakes use the bundled
    /// webpki roots.
    pub fn new(config: &ConnectionConfig) -> Self {
        let tls = match &config.tls {
            Some(tls) => Some(tls.clone()),
            None => match TlsConfig::builder().build() {
                Ok(tls) => Some(tls),
                Err(e) => {
                    tracing::warn!(error = %e, "default TLS configuration unavailable");
                    None
                }
            },
        };

        Self {
            connect_timeout: config.connect_timeout,
            tls,
        }
    }
}

impl Transport for WebSocketTransport {
    type Handle = WebSocketHandle;

    fn open(&mut self, url: &Url, events: EventSink) -> WebSocketHandle {
        let (tx, rx) = mpsc::unbounded_channel();

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                tracing::error!(error = %e, "websocket transport used outside a tokio runtime");
                events.error(TransportError::Io(format!("no tokio runtime: {}", e)));
                return WebSocketHandle { outbound: tx };
            }
        };

        let span = tracing::info_span!(
            "realtime_connection",
            connection = %events.connection(),
            host = url.host_str().unwrap_or_default(),
            path = url.path(),
        );
        let options = SocketOptions {
            connect_timeout: self.connect_timeout,
            connector: self
                .tls
                .as_ref()
                .map(|tls| Connector::Rustls(tls.client_config())),
        };

        runtime.spawn(run_socket(url.to_string(), options, events, rx).instrument(span));

        WebSocketHandle { outbound: tx }
    }
}

/// Handle to a connection owned by a background I/O task
#[derive(Debug)]
pub struct WebSocketHandle {
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl TransportHandle for WebSocketHandle {
    fn send(&mut self, frame: String) -> Result<()> {
        self.outbound
            .send(Outbound::Frame(frame))
            .map_err(|_| Error::ConnectionClosed)
    }

    fn close(&mut self) {
        let _ = self.outbound.send(Outbound::Close);
    }
}

impl Drop for WebSocketHandle {
    fn drop(&mut self) {
        self.close();
    }
}

struct SocketOptions {
    connect_timeout: Option<Duration>,
    connector: Option<Connector>,
}

async fn run_socket(
    url: String,
    options: SocketOptions,
    events: EventSink,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
) {
    tracing::debug!("starting websocket handshake");

    let ws = tokio::select! {
        result = handshake(&url, &options) => match result {
            Ok(ws) => ws,
            Err(e) => {
                tracing::error!(error = %e, "websocket handshake failed");
                events.error(e);
                return;
            }
        },
        _ = wait_for_close(&mut outbound) => {
            tracing::debug!("close requested during handshake");
            events.closed();
            return;
        }
    };

    tracing::info!("websocket connected");
    events.opened();

    let (mut write, mut read) = ws.split();

    loop {
        tokio::select! {
            cmd = outbound.recv() => match cmd {
                Some(Outbound::Frame(text)) => {
                    if let Err(e) = write.send(Message::Text(text)).await {
                        report_stream_error(&events, e);
                        return;
                    }
                }
                Some(Outbound::Close) | None => {
                    let _ = tokio::time::timeout(CLOSE_TIMEOUT, write.close()).await;
                    tracing::info!("websocket closed by client");
                    events.closed();
                    return;
                }
            },
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => events.message(text),
                Some(Ok(Message::Binary(data))) => events.message(data),
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!(?frame, "websocket closed by server");
                    let _ = tokio::time::timeout(CLOSE_TIMEOUT, write.close()).await;
                    events.closed();
                    return;
                }
                // ping/pong are answered by tungstenite
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    report_stream_error(&events, e);
                    return;
                }
                None => {
                    tracing::info!("websocket stream ended");
                    events.closed();
                    return;
                }
            }
        }
    }
}

async fn handshake(
    url: &str,
    options: &SocketOptions,
) -> std::result::Result<WsStream, TransportError> {
    let connect = connect_async_tls_with_config(url, None, false, options.connector.clone());

    let result = match options.connect_timeout {
        Some(limit) => tokio::time::timeout(limit, connect)
            .await
            .map_err(|_| TransportError::Timeout(limit))?,
        None => connect.await,
    };

    let (stream, response) = result.map_err(handshake_error)?;
    tracing::debug!(status = %response.status(), "handshake acknowledged");
    Ok(stream)
}

async fn wait_for_close(outbound: &mut mpsc::UnboundedReceiver<Outbound>) {
    while let Some(cmd) = outbound.recv().await {
        if matches!(cmd, Outbound::Close) {
            return;
        }
    }
}

fn handshake_error(err: tungstenite::Error) -> TransportError {
    match err {
        tungstenite::Error::Http(response) => {
            TransportError::Handshake(format!("server responded {}", response.status()))
        }
        tungstenite::Error::Url(e) => TransportError::InvalidAddress(e.to_string()),
        other => TransportError::Handshake(other.to_string()),
    }
}

fn report_stream_error(events: &EventSink, err: tungstenite::Error) {
    match err {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            tracing::info!("websocket connection already closed");
            events.closed();
        }
        tungstenite::Error::Io(e) => {
            tracing::error!(error = %e, "websocket i/o error");
            events.error(TransportError::Io(e.to_string()));
        }
        other => {
            tracing::error!(error = %other, "websocket protocol error");
            events.error(TransportError::Protocol(other.to_string()));
        }
    }
}
