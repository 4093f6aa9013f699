//! In-process loopback transport
//!
//! Every `open` creates a [`MemoryPeer`]: the far end of the connection,
//! driven by the caller. A peer acknowledges the handshake, pushes inbound
//! frames, injects faults and records what the manager sent. Nothing happens
//! until the peer says so, which makes lifecycle races reproducible.

use super::transport::{EventSink, Transport, TransportError, TransportHandle};
use crate::{Error, Result};
use std::cell::RefCell;
use std::rc::Rc;
use url::Url;

#[derive(Debug, Default)]
struct PeerState {
    sent: Vec<String>,
    close_requested: bool,
}

/// Remote side of one in-memory connection
#[derive(Debug, Clone)]
pub struct MemoryPeer {
    url: Url,
    events: EventSink,
    state: Rc<RefCell<PeerState>>,
}

impl MemoryPeer {
    /// Handshake URL the manager opened
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Value of one query parameter on the handshake URL
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    /// Acknowledge the handshake
    pub fn accept(&self) {
        self.events.opened();
    }

    /// Deliver one inbound text frame
    pub fn push_text(&self, frame: &str) {
        self.events.message(frame.as_bytes().to_vec());
    }

    /// Deliver one inbound binary frame
    pub fn push_binary(&self, frame: &[u8]) {
        self.events.message(frame.to_vec());
    }

    /// Report a transport fault
    pub fn fail(&self, err: TransportError) {
        self.events.error(err);
    }

    /// Report that the connection closed
    pub fn close(&self) {
        self.events.closed();
    }

    /// Frames the manager sent, in order
    pub fn sent(&self) -> Vec<String> {
        self.state.borrow().sent.clone()
    }

    /// Whether the manager asked to close this connection
    pub fn close_requested(&self) -> bool {
        self.state.borrow().close_requested
    }
}

/// Handle the manager holds for an in-memory connection
#[derive(Debug)]
pub struct MemoryHandle {
    state: Rc<RefCell<PeerState>>,
}

impl TransportHandle for MemoryHandle {
    fn send(&mut self, frame: String) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.close_requested {
            return Err(Error::ConnectionClosed);
        }
        state.sent.push(frame);
        Ok(())
    }

    fn close(&mut self) {
        self.state.borrow_mut().close_requested = true;
    }
}

/// Loopback transport; clones share the list of opened peers
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    peers: Rc<RefCell<Vec<MemoryPeer>>>,
}

impl MemoryTransport {
    /// Create a transport with no connections
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of connections opened so far
    pub fn open_count(&self) -> usize {
        self.peers.borrow().len()
    }

    /// All peers, oldest first
    pub fn peers(&self) -> Vec<MemoryPeer> {
        self.peers.borrow().clone()
    }

    /// Most recently opened peer
    pub fn last_peer(&self) -> Option<MemoryPeer> {
        self.peers.borrow().last().cloned()
    }

    /// Peers whose handle has not been asked to close
    pub fn live_count(&self) -> usize {
        self.peers
            .borrow()
            .iter()
            .filter(|p| !p.close_requested())
            .count()
    }
}

impl Transport for MemoryTransport {
    type Handle = MemoryHandle;

    fn open(&mut self, url: &Url, events: EventSink) -> MemoryHandle {
        let state = Rc::new(RefCell::new(PeerState::default()));
        self.peers.borrow_mut().push(MemoryPeer {
            url: url.clone(),
            events,
            state: state.clone(),
        });
        MemoryHandle { state }
    }
}
