//! Callback registration slot

use crate::connection::TransportError;
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;

/// Handler invoked with every decoded inbound message
pub type MessageHandler = Box<dyn FnMut(Value)>;

/// Handler invoked once per transport fault
pub type ErrorHandler = Box<dyn FnMut(&TransportError)>;

#[derive(Default)]
struct Registration {
    on_message: Option<MessageHandler>,
    on_error: Option<ErrorHandler>,
    // Bumped on every write so a handler taken out for a call is only put
    // back when nobody replaced it in the meantime.
    message_generation: u64,
    error_generation: u64,
}

/// Shared, replaceable (message handler, error handler) pair
///
/// Cloning yields another reference to the same slot. Writes take effect for
/// the next dispatch; the live connection is never touched.
#[derive(Clone, Default)]
pub struct HandlerSlot {
    inner: Rc<RefCell<Registration>>,
}

impl HandlerSlot {
    /// Create an empty slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the message handler
    pub fn set_on_message(&self, handler: impl FnMut(Value) + 'static) {
        self.replace_on_message(Some(Box::new(handler)));
    }

    /// Replace the error handler
    pub fn set_on_error(&self, handler: impl FnMut(&TransportError) + 'static) {
        self.replace_on_error(Some(Box::new(handler)));
    }

    /// Remove the message handler; later messages are discarded
    pub fn clear_on_message(&self) {
        self.replace_on_message(None);
    }

    /// Remove the error handler
    pub fn clear_on_error(&self) {
        self.replace_on_error(None);
    }

    /// Remove both handlers
    pub fn clear(&self) {
        self.clear_on_message();
        self.clear_on_error();
    }

    /// Whether a message handler is registered
    pub fn has_message_handler(&self) -> bool {
        self.inner.borrow().on_message.is_some()
    }

    /// Whether an error handler is registered
    pub fn has_error_handler(&self) -> bool {
        self.inner.borrow().on_error.is_some()
    }

    fn replace_on_message(&self, handler: Option<MessageHandler>) {
        let mut reg = self.inner.borrow_mut();
        reg.on_message = handler;
        reg.message_generation += 1;
    }

    fn replace_on_error(&self, handler: Option<ErrorHandler>) {
        let mut reg = self.inner.borrow_mut();
        reg.on_error = handler;
        reg.error_generation += 1;
    }

    /// Call the current message handler. Returns false when none is registered.
    pub(crate) fn call_message(&self, value: Value) -> bool {
        let (handler, generation) = {
            let mut reg = self.inner.borrow_mut();
            (reg.on_message.take(), reg.message_generation)
        };
        let Some(mut handler) = handler else {
            return false;
        };

        // No borrow is held here, so the handler may write to the slot.
        handler(value);

        let mut reg = self.inner.borrow_mut();
        if reg.message_generation == generation {
            reg.on_message = Some(handler);
        }
        true
    }

    /// Call the current error handler. Returns false when none is registered.
    pub(crate) fn call_error(&self, err: &TransportError) -> bool {
        let (handler, generation) = {
            let mut reg = self.inner.borrow_mut();
            (reg.on_error.take(), reg.error_generation)
        };
        let Some(mut handler) = handler else {
            return false;
        };

        handler(err);

        let mut reg = self.inner.borrow_mut();
        if reg.error_generation == generation {
            reg.on_error = Some(handler);
        }
        true
    }
}

impl std::fmt::Debug for HandlerSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reg = self.inner.borrow();
        f.debug_struct("HandlerSlot")
            .field("on_message", &reg.on_message.is_some())
            .field("on_error", &reg.on_error.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    #[test]
    fn test_empty_slot_reports_no_handler() {
        let slot = HandlerSlot::new();
        assert!(!slot.call_message(json!(1)));
        assert!(!slot.call_error(&TransportError::Io("reset".into())));
    }

    #[test]
    fn test_latest_handler_wins() {
        let slot = HandlerSlot::new();
        let first = Rc::new(Cell::new(0));
        let second = Rc::new(Cell::new(0));

        let f = first.clone();
        slot.set_on_message(move |_| f.set(f.get() + 1));
        assert!(slot.call_message(json!(1)));

        let s = second.clone();
        slot.set_on_message(move |_| s.set(s.get() + 1));
        assert!(slot.call_message(json!(2)));

        assert_eq!(first.get(), 1);
        assert_eq!(second.get(), 1);
    }

    #[test]
    fn test_clone_aliases_the_same_slot() {
        let slot = HandlerSlot::new();
        let alias = slot.clone();
        alias.set_on_error(|_| {});
        assert!(slot.has_error_handler());
    }

    #[test]
    fn test_handler_may_replace_itself() {
        let slot = HandlerSlot::new();
        let hits = Rc::new(Cell::new(0));

        let inner_slot = slot.clone();
        let h = hits.clone();
        slot.set_on_message(move |_| {
            let h = h.clone();
            inner_slot.set_on_message(move |_| h.set(h.get() + 10));
        });

        slot.call_message(json!(null));
        slot.call_message(json!(null));
        assert_eq!(hits.get(), 10);
    }

    #[test]
    fn test_handler_may_clear_itself() {
        let slot = HandlerSlot::new();
        let inner_slot = slot.clone();
        slot.set_on_message(move |_| inner_slot.clear_on_message());

        assert!(slot.call_message(json!(null)));
        assert!(!slot.has_message_handler());
    }

    #[test]
    fn test_debug_shows_presence_only() {
        let slot = HandlerSlot::new();
        slot.set_on_message(|_| {});
        let debug = format!("{:?}", slot);
        assert!(debug.contains("on_message: true"));
        assert!(debug.contains("on_error: false"));
    }
}
