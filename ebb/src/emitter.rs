//! An in-process, single-threaded named-event emitter.
//!
//! This is the push side the rest of the crate pulls from: the same shape
//! as a DOM event target, with `once` listeners only. Applications that
//! produce their own events can use it directly; the crate's tests use it
//! as their capability.

use std::{
    cell::{Cell, RefCell},
    convert::Infallible,
    fmt,
};

use hashbrown::HashMap;
use tracing::trace;

use crate::capability::{EventCapability, Handler};

/// Token identifying one listener registered with a [`LocalEmitter`].
///
/// Tokens are unique for the lifetime of the emitter, so a token whose
/// listener already fired can never accidentally remove a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerToken(u64);

struct Listener<E> {
    id:      u64,
    handler: Handler<E>,
}

/// A single-threaded emitter of named events with one-shot listeners.
pub struct LocalEmitter<E> {
    listeners: RefCell<HashMap<String, Vec<Listener<E>>>>,
    next_id:   Cell<u64>,
}

impl<E> LocalEmitter<E> {
    /// Create an emitter with no listeners.
    pub fn new() -> Self {
        Self {
            listeners: RefCell::new(HashMap::new()),
            next_id:   Cell::new(0),
        }
    }

    /// Number of listeners currently registered for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.borrow().get(event).map_or(0, Vec::len)
    }
}

impl<E: Clone> LocalEmitter<E> {
    /// Fire `event`, invoking every listener registered for it in
    /// registration order. Listeners are removed before they run (`once`
    /// semantics). Returns how many fired.
    pub fn emit(&self, event: &str, payload: E) -> usize {
        // Take the whole batch out first so a handler that re-subscribes
        // registers for the next firing, not this one.
        let fired = self
            .listeners
            .borrow_mut()
            .remove(event)
            .unwrap_or_default();
        trace!(event, listeners = fired.len(), "emit");
        let count = fired.len();
        for listener in fired {
            (listener.handler)(payload.clone());
        }
        count
    }
}

impl<E> Default for LocalEmitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for LocalEmitter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalEmitter")
            .field("events", &self.listeners.borrow().len())
            .field("next_id", &self.next_id.get())
            .finish_non_exhaustive()
    }
}

impl<E> EventCapability<E> for LocalEmitter<E> {
    type Error = Infallible;
    type Token = ListenerToken;

    fn subscribe_once(
        &self,
        event: &str,
        handler: Handler<E>,
    ) -> Result<ListenerToken, Infallible> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.listeners
            .borrow_mut()
            .entry_ref(event)
            .or_default()
            .push(Listener { id, handler });
        Ok(ListenerToken(id))
    }

    fn unsubscribe(&self, token: ListenerToken) -> Result<(), Infallible> {
        let mut listeners = self.listeners.borrow_mut();
        for list in listeners.values_mut() {
            list.retain(|listener| listener.id != token.0);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;

    #[test]
    fn listeners_fire_once_in_registration_order() {
        let emitter = LocalEmitter::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for tag in ["a", "b"] {
            let seen = Rc::clone(&seen);
            emitter
                .subscribe_once("tick", Box::new(move |v: u32| seen.borrow_mut().push((tag, v))))
                .unwrap();
        }

        assert_eq!(emitter.emit("tick", 1), 2);
        assert_eq!(*seen.borrow(), [("a", 1), ("b", 1)]);
        // everyone was one-shot
        assert_eq!(emitter.emit("tick", 2), 0);
    }

    #[test]
    fn emit_without_listeners_is_a_no_op() {
        let emitter = LocalEmitter::new();
        assert_eq!(emitter.emit("tick", 1u32), 0);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let emitter = LocalEmitter::<u32>::new();
        let token = emitter.subscribe_once("tick", Box::new(|_| {})).unwrap();
        assert_eq!(emitter.listener_count("tick"), 1);
        emitter.unsubscribe(token).unwrap();
        assert_eq!(emitter.listener_count("tick"), 0);
        emitter.unsubscribe(token).unwrap();
        assert_eq!(emitter.listener_count("tick"), 0);
    }

    #[test]
    fn unsubscribe_after_firing_is_a_no_op() {
        let emitter = LocalEmitter::new();
        let token = emitter.subscribe_once("tick", Box::new(|_: u32| {})).unwrap();
        assert_eq!(emitter.emit("tick", 1), 1);
        emitter.unsubscribe(token).unwrap();
        assert_eq!(emitter.listener_count("tick"), 0);
    }

    #[test]
    fn events_are_independent_per_name() {
        let emitter = LocalEmitter::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for name in ["tick", "tock"] {
            let seen = Rc::clone(&seen);
            emitter
                .subscribe_once(name, Box::new(move |v: u32| seen.borrow_mut().push((name, v))))
                .unwrap();
        }

        assert_eq!(emitter.emit("tick", 1), 1);
        assert_eq!(*seen.borrow(), [("tick", 1)]);
        assert_eq!(emitter.listener_count("tick"), 0);
        assert_eq!(emitter.listener_count("tock"), 1);
    }
}
