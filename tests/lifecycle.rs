//! Lifecycle tests against the in-memory loopback transport
//!
//! The loopback peer decides when handshakes complete, frames arrive and
//! faults happen, so every interleaving here is deterministic.

use proofa_realtime::connection::memory::{MemoryPeer, MemoryTransport};
use proofa_realtime::{ConnectionConfig, ConnectionManager, ConnectionStatus, TransportError};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::rc::Rc;

const ADDRESS: &str = "wss://api.proofa.example/rt";

fn setup() -> (ConnectionManager<MemoryTransport>, MemoryTransport) {
    let transport = MemoryTransport::new();
    let manager = ConnectionManager::with_transport(ConnectionConfig::default(), transport.clone());
    (manager, transport)
}

fn connect(
    manager: &mut ConnectionManager<MemoryTransport>,
    transport: &MemoryTransport,
    credential: &str,
) -> MemoryPeer {
    manager.configure(Some(ADDRESS), Some(credential));
    let peer = transport.last_peer().expect("connection opened");
    peer.accept();
    manager.process_pending();
    assert_eq!(manager.status(), ConnectionStatus::Connected);
    peer
}

fn recorder() -> (Rc<RefCell<Vec<Value>>>, impl FnMut(Value) + 'static) {
    let seen: Rc<RefCell<Vec<Value>>> = Rc::default();
    let sink = seen.clone();
    (seen, move |msg| sink.borrow_mut().push(msg))
}

fn error_recorder() -> (
    Rc<RefCell<Vec<TransportError>>>,
    impl FnMut(&TransportError) + 'static,
) {
    let seen: Rc<RefCell<Vec<TransportError>>> = Rc::default();
    let sink = seen.clone();
    (seen, move |err: &TransportError| sink.borrow_mut().push(err.clone()))
}

#[test]
fn test_ping_round_trip() {
    let (mut manager, transport) = setup();
    let (seen, handler) = recorder();
    manager.on_message(handler);

    manager.configure(Some(ADDRESS), Some("tok123"));
    let peer = transport.last_peer().unwrap();
    assert_eq!(peer.query_param("token").as_deref(), Some("tok123"));
    assert_eq!(manager.status(), ConnectionStatus::Connecting);

    peer.accept();
    manager.process_pending();
    assert_eq!(manager.status(), ConnectionStatus::Connected);

    assert!(manager.send(&json!({"type": "ping"})));
    assert_eq!(peer.sent(), vec![r#"{"type":"ping"}"#.to_string()]);

    peer.push_text(r#"{"type":"pong"}"#);
    manager.process_pending();
    assert_eq!(*seen.borrow(), vec![json!({"type": "pong"})]);
}

#[test]
fn test_identical_configure_keeps_single_connection() {
    let (mut manager, transport) = setup();
    let peer = connect(&mut manager, &transport, "tok");

    for _ in 0..5 {
        manager.configure(Some(ADDRESS), Some("tok"));
    }

    assert_eq!(transport.open_count(), 1);
    assert!(!peer.close_requested());
    assert_eq!(manager.status(), ConnectionStatus::Connected);
}

#[test]
fn test_identical_configure_while_connecting_is_noop() {
    let (mut manager, transport) = setup();

    manager.configure(Some(ADDRESS), Some("tok"));
    manager.configure(Some(ADDRESS), Some("tok"));

    assert_eq!(transport.open_count(), 1);
    assert_eq!(manager.status(), ConnectionStatus::Connecting);
}

#[test]
fn test_new_credential_replaces_connection() {
    let (mut manager, transport) = setup();
    let first = connect(&mut manager, &transport, "tokA");

    manager.configure(Some(ADDRESS), Some("tokB"));

    assert!(first.close_requested());
    assert_eq!(transport.open_count(), 2);
    assert_eq!(transport.live_count(), 1);
    let second = transport.last_peer().unwrap();
    assert_eq!(second.query_param("token").as_deref(), Some("tokB"));
    assert_eq!(manager.status(), ConnectionStatus::Connecting);
}

#[test]
fn test_new_address_replaces_connection() {
    let (mut manager, transport) = setup();
    let first = connect(&mut manager, &transport, "tok");

    manager.configure(Some("wss://other.proofa.example/rt"), Some("tok"));

    assert!(first.close_requested());
    let second = transport.last_peer().unwrap();
    assert_eq!(second.url().host_str(), Some("other.proofa.example"));
}

#[test]
fn test_clearing_credential_disconnects() {
    let (mut manager, transport) = setup();
    let peer = connect(&mut manager, &transport, "tok");

    manager.configure(Some(ADDRESS), None);

    assert!(peer.close_requested());
    assert_eq!(transport.live_count(), 0);
    assert_eq!(manager.status(), ConnectionStatus::Disconnected);
    assert!(manager.connection_id().is_none());
}

#[test]
fn test_stale_close_after_reconfigure_is_ignored() {
    let (mut manager, transport) = setup();
    let first = connect(&mut manager, &transport, "tokA");

    manager.configure(Some(ADDRESS), Some("tokB"));
    let second = transport.last_peer().unwrap();
    second.accept();

    // The old socket reports its close after the new one is up.
    first.close();
    manager.process_pending();

    assert_eq!(manager.status(), ConnectionStatus::Connected);
    assert!(!second.close_requested());
}

#[test]
fn test_stale_messages_and_errors_are_ignored() {
    let (mut manager, transport) = setup();
    let (seen, handler) = recorder();
    let (errors, err_handler) = error_recorder();
    manager.on_message(handler);
    manager.on_error(err_handler);
    let first = connect(&mut manager, &transport, "tokA");

    manager.configure(Some(ADDRESS), Some("tokB"));
    first.push_text(r#"{"from":"old"}"#);
    first.fail(TransportError::Io("reset".into()));
    manager.process_pending();

    assert!(seen.borrow().is_empty());
    assert!(errors.borrow().is_empty());
    assert_eq!(manager.status(), ConnectionStatus::Connecting);
}

#[test]
fn test_error_after_connected() {
    let (mut manager, transport) = setup();
    let (errors, err_handler) = error_recorder();
    manager.on_error(err_handler);
    let peer = connect(&mut manager, &transport, "tok");

    peer.fail(TransportError::Io("connection reset".into()));
    manager.process_pending();

    assert_eq!(manager.status(), ConnectionStatus::Error);
    assert_eq!(
        *errors.borrow(),
        vec![TransportError::Io("connection reset".into())]
    );

    // No implicit reconnect.
    assert_eq!(transport.open_count(), 1);
    assert!(!manager.send(&json!({"type": "ping"})));
}

#[test]
fn test_identical_configure_after_error_reconnects() {
    let (mut manager, transport) = setup();
    let peer = connect(&mut manager, &transport, "tok");
    peer.fail(TransportError::Protocol("bad frame header".into()));
    manager.process_pending();
    assert_eq!(manager.status(), ConnectionStatus::Error);

    manager.configure(Some(ADDRESS), Some("tok"));

    assert_eq!(transport.open_count(), 2);
    assert_eq!(manager.status(), ConnectionStatus::Connecting);
}

#[test]
fn test_handshake_failure() {
    let (mut manager, transport) = setup();
    let (errors, err_handler) = error_recorder();
    manager.on_error(err_handler);

    manager.configure(Some(ADDRESS), Some("expired"));
    transport
        .last_peer()
        .unwrap()
        .fail(TransportError::Handshake("server responded 401 Unauthorized".into()));
    manager.process_pending();

    assert_eq!(manager.status(), ConnectionStatus::Error);
    assert_eq!(errors.borrow().len(), 1);
}

#[test]
fn test_server_close_sets_disconnected() {
    let (mut manager, transport) = setup();
    let (errors, err_handler) = error_recorder();
    manager.on_error(err_handler);
    let peer = connect(&mut manager, &transport, "tok");

    peer.close();
    manager.process_pending();

    assert_eq!(manager.status(), ConnectionStatus::Disconnected);
    assert!(errors.borrow().is_empty());
}

#[test]
fn test_send_rejected_outside_connected() {
    let (mut manager, transport) = setup();
    let ping = json!({"type": "ping"});

    // Disconnected
    assert!(!manager.send(&ping));

    // Connecting
    manager.configure(Some(ADDRESS), Some("tok"));
    assert!(!manager.send(&ping));

    // Error
    let peer = transport.last_peer().unwrap();
    peer.fail(TransportError::Timeout(std::time::Duration::from_secs(10)));
    manager.process_pending();
    assert_eq!(manager.status(), ConnectionStatus::Error);
    assert!(!manager.send(&ping));

    assert!(peer.sent().is_empty());
}

#[test]
fn test_send_is_not_queued_for_later() {
    let (mut manager, transport) = setup();
    manager.configure(Some(ADDRESS), Some("tok"));
    assert!(!manager.send(&json!({"early": true})));

    let peer = transport.last_peer().unwrap();
    peer.accept();
    manager.process_pending();

    assert!(peer.sent().is_empty());
}

#[test]
fn test_replacing_handler_does_not_reconnect() {
    let (mut manager, transport) = setup();
    let (first_seen, first) = recorder();
    let (second_seen, second) = recorder();
    manager.on_message(first);
    let peer = connect(&mut manager, &transport, "tok");

    peer.push_text(r#"{"n":1}"#);
    manager.process_pending();
    manager.on_message(second);
    manager.on_error(|_| {});
    peer.push_text(r#"{"n":2}"#);
    manager.process_pending();

    assert_eq!(transport.open_count(), 1);
    assert!(!peer.close_requested());
    assert_eq!(*first_seen.borrow(), vec![json!({"n": 1})]);
    assert_eq!(*second_seen.borrow(), vec![json!({"n": 2})]);
}

#[test]
fn test_handler_replaced_between_queue_and_delivery() {
    let (mut manager, transport) = setup();
    let (first_seen, first) = recorder();
    let (second_seen, second) = recorder();
    manager.on_message(first);
    let peer = connect(&mut manager, &transport, "tok");

    // Frame is queued under the first handler but delivered after the swap.
    peer.push_text(r#"{"n":1}"#);
    manager.on_message(second);
    manager.process_pending();

    assert!(first_seen.borrow().is_empty());
    assert_eq!(*second_seen.borrow(), vec![json!({"n": 1})]);
}

#[test]
fn test_handler_replaces_itself() {
    let (mut manager, transport) = setup();
    let (later_seen, later) = recorder();
    let slot = manager.handlers();
    let later = RefCell::new(Some(later));
    let calls = Rc::new(RefCell::new(0));
    let c = calls.clone();
    manager.on_message(move |_| {
        *c.borrow_mut() += 1;
        if let Some(next) = later.borrow_mut().take() {
            slot.set_on_message(next);
        }
    });
    let peer = connect(&mut manager, &transport, "tok");

    peer.push_text(r#"{"n":1}"#);
    peer.push_text(r#"{"n":2}"#);
    manager.process_pending();

    assert_eq!(*calls.borrow(), 1);
    assert_eq!(*later_seen.borrow(), vec![json!({"n": 2})]);
}

#[test]
fn test_malformed_frame_changes_nothing() {
    let (mut manager, transport) = setup();
    let (seen, handler) = recorder();
    let (errors, err_handler) = error_recorder();
    manager.on_message(handler);
    manager.on_error(err_handler);
    let peer = connect(&mut manager, &transport, "tok");

    peer.push_text("not json");
    peer.push_binary(&[0xff, 0xfe, 0x00]);
    peer.push_text(r#"{"ok":true}"#);
    manager.process_pending();

    assert_eq!(manager.status(), ConnectionStatus::Connected);
    assert!(errors.borrow().is_empty());
    assert_eq!(*seen.borrow(), vec![json!({"ok": true})]);
}

#[test]
fn test_oversized_frame_is_dropped() {
    let transport = MemoryTransport::new();
    let config = ConnectionConfig::builder().max_frame_size(16).build();
    let mut manager = ConnectionManager::with_transport(config, transport.clone());
    let (seen, handler) = recorder();
    manager.on_message(handler);
    let peer = connect(&mut manager, &transport, "tok");

    peer.push_text(r#"{"payload":"much too long for the limit"}"#);
    peer.push_text(r#"{"n":1}"#);
    manager.process_pending();

    assert_eq!(manager.status(), ConnectionStatus::Connected);
    assert_eq!(*seen.borrow(), vec![json!({"n": 1})]);
}

#[test]
fn test_message_without_handler_is_discarded() {
    let (mut manager, transport) = setup();
    let peer = connect(&mut manager, &transport, "tok");

    peer.push_text(r#"{"n":1}"#);
    assert_eq!(manager.process_pending(), 1);

    assert_eq!(manager.status(), ConnectionStatus::Connected);
}

#[test]
fn test_non_object_values_are_delivered() {
    let (mut manager, transport) = setup();
    let (seen, handler) = recorder();
    manager.on_message(handler);
    let peer = connect(&mut manager, &transport, "tok");

    peer.push_text("[1,2,3]");
    peer.push_text("42");
    manager.process_pending();

    assert_eq!(*seen.borrow(), vec![json!([1, 2, 3]), json!(42)]);
}

#[test]
fn test_dispose_silences_pending_events() {
    let (mut manager, transport) = setup();
    let (seen, handler) = recorder();
    let (errors, err_handler) = error_recorder();
    manager.on_message(handler);
    manager.on_error(err_handler);
    let peer = connect(&mut manager, &transport, "tok");

    peer.push_text(r#"{"n":1}"#);
    peer.fail(TransportError::Io("late".into()));
    manager.dispose();
    manager.process_pending();

    assert!(seen.borrow().is_empty());
    assert!(errors.borrow().is_empty());
    assert!(peer.close_requested());
    assert_eq!(manager.status(), ConnectionStatus::Disconnected);
}

#[test]
fn test_dispose_before_configure() {
    let (mut manager, transport) = setup();

    manager.dispose();
    manager.configure(Some(ADDRESS), Some("tok"));

    assert_eq!(transport.open_count(), 0);
    assert_eq!(manager.status(), ConnectionStatus::Disconnected);
}

#[test]
fn test_status_sequence_is_observable() {
    let (mut manager, transport) = setup();
    let mut rx = manager.subscribe_status();

    manager.configure(Some(ADDRESS), Some("tok"));
    assert_eq!(*rx.borrow_and_update(), ConnectionStatus::Connecting);

    let peer = transport.last_peer().unwrap();
    peer.accept();
    manager.process_pending();
    assert_eq!(*rx.borrow_and_update(), ConnectionStatus::Connected);

    peer.fail(TransportError::Io("reset".into()));
    manager.process_pending();
    assert_eq!(*rx.borrow_and_update(), ConnectionStatus::Error);

    manager.dispose();
    assert_eq!(*rx.borrow_and_update(), ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn test_process_next_delivers_in_order() {
    let (mut manager, transport) = setup();
    let (seen, handler) = recorder();
    manager.on_message(handler);
    manager.configure(Some(ADDRESS), Some("tok"));
    let peer = transport.last_peer().unwrap();

    peer.accept();
    peer.push_text(r#"{"n":1}"#);
    peer.push_text(r#"{"n":2}"#);
    for _ in 0..3 {
        manager.process_next().await;
    }

    assert_eq!(manager.status(), ConnectionStatus::Connected);
    assert_eq!(*seen.borrow(), vec![json!({"n": 1}), json!({"n": 2})]);
}
