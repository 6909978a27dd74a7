//! The boundary between the iterator and whatever produces events.
//!
//! The [`EventCapability`] trait is the only thing the pull side knows about
//! the push side: a way to register a listener for one firing of a named
//! event, and a way to remove it again. A DOM-style event target, a
//! server-sent-events connection, or this crate's own
//! [`LocalEmitter`](crate::emitter::LocalEmitter) all fit behind it.

use std::rc::Rc;

use crate::iter::EventIterator;

/// Callback invoked with the payload when the subscribed event fires.
pub type Handler<E> = Box<dyn FnOnce(E)>;

/// A push-based source of named events.
///
/// Implementations must provide "once" semantics: a handler passed to
/// [`subscribe_once`](Self::subscribe_once) is invoked at most one time and
/// its registration is removed after it fires.
pub trait EventCapability<E> {
    /// Opaque handle identifying one registered listener.
    type Token;
    /// Error for failed subscribe or unsubscribe operations.
    type Error: std::error::Error + 'static;

    /// Register `handler` for the next firing of `event`.
    ///
    /// Must not block the caller; the handler is invoked later, from
    /// whatever delivers the event.
    fn subscribe_once(&self, event: &str, handler: Handler<E>)
        -> Result<Self::Token, Self::Error>;

    /// Remove a previously registered listener.
    ///
    /// Idempotent: removing a listener that has already fired, or was
    /// already removed, is a no-op.
    fn unsubscribe(&self, token: Self::Token) -> Result<(), Self::Error>;
}

impl<C, E> EventCapability<E> for &C
where
    C: EventCapability<E>,
{
    type Error = C::Error;
    type Token = C::Token;

    fn subscribe_once(
        &self,
        event: &str,
        handler: Handler<E>,
    ) -> Result<Self::Token, Self::Error> {
        (**self).subscribe_once(event, handler)
    }

    fn unsubscribe(&self, token: Self::Token) -> Result<(), Self::Error> {
        (**self).unsubscribe(token)
    }
}

impl<C, E> EventCapability<E> for Rc<C>
where
    C: EventCapability<E>,
{
    type Error = C::Error;
    type Token = C::Token;

    fn subscribe_once(
        &self,
        event: &str,
        handler: Handler<E>,
    ) -> Result<Self::Token, Self::Error> {
        (**self).subscribe_once(event, handler)
    }

    fn unsubscribe(&self, token: Self::Token) -> Result<(), Self::Error> {
        (**self).unsubscribe(token)
    }
}

/// Convenience for going straight from a capability to a sequence.
pub trait EventCapabilityExt<E>: EventCapability<E> + Sized {
    /// Iterate over firings of `event`, pull-style.
    ///
    /// Pass `&capability` or an `Rc` of it to keep using the capability
    /// while the iterator is alive.
    fn events(self, event: impl Into<String>) -> EventIterator<Self, E>
    where
        E: 'static,
    {
        EventIterator::new(self, event)
    }
}

impl<C, E> EventCapabilityExt<E> for C where C: EventCapability<E> {}
