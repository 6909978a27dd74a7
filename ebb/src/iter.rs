//! The core state machine bridging push-based events to pull-based
//! iteration.
//!
//! [`EventIterator`] exposes a two-operation protocol: [`next`] hands out a
//! future that resolves with the next firing of the bound event, [`stop`]
//! ends the sequence. A consumer loops on `next` until it sees
//! [`IterStep::Done`], or polls the iterator as a [`Stream`].
//!
//! [`next`]: EventIterator::next
//! [`stop`]: EventIterator::stop

use std::{
    cell::{Cell, RefCell},
    fmt,
    future::Future,
    pin::Pin,
    rc::Rc,
    task::{ready, Context, Poll, Waker},
};

use futures_core::{future::FusedFuture, stream::FusedStream, Stream};
use thiserror::Error;
use tracing::{debug, trace};

use crate::capability::EventCapability;

/// Error produced by a [`next`](EventIterator::next) request.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error<C> {
    /// A second request was issued while one was already in flight.
    ///
    /// The in-flight request is left untouched and still resolves
    /// normally; only the offending request sees this error.
    #[error("a next() request is already in flight for this iterator")]
    RequestInFlight,
    /// The capability failed to register a listener.
    ///
    /// The iterator stops itself when this happens, so a half-registered
    /// listener can never be left behind.
    #[error("event capability error: {0}")]
    Capability(#[source] C),
}

/// One step of an event sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterStep<E> {
    /// The bound event fired with this payload.
    Event(E),
    /// The sequence has stopped. Carries the total number of events
    /// delivered over its lifetime.
    Done(u64),
}

/// Shared between a pending request's future and the handler registered
/// with the capability. This is the single resolver slot: the handler
/// stores the payload here and wakes whoever is awaiting it.
struct Slot<E> {
    payload: RefCell<Option<E>>,
    waker:   RefCell<Option<Waker>>,
}

impl<E> Slot<E> {
    fn new() -> Self {
        Self {
            payload: RefCell::new(None),
            waker:   RefCell::new(None),
        }
    }

    /// Called by the capability's handler when the event fires.
    fn fire(&self, payload: E) {
        *self.payload.borrow_mut() = Some(payload);
        self.wake();
    }

    fn take_payload(&self) -> Option<E> {
        self.payload.borrow_mut().take()
    }

    fn wake(&self) {
        if let Some(waker) = self.waker.borrow_mut().take() {
            waker.wake();
        }
    }

    fn register(&self, waker: &Waker) {
        let mut slot = self.waker.borrow_mut();
        if slot.as_ref().map_or(true, |old| !old.will_wake(waker)) {
            if let Some(old) = slot.replace(waker.clone()) {
                old.wake();
            }
        }
    }
}

/// The at-most-one outstanding request. `token` stays `None` until the
/// listener is actually installed, which happens on first poll.
struct Request<T, E> {
    slot:  Rc<Slot<E>>,
    token: Option<T>,
}

impl<T, E> Request<T, E> {
    fn new() -> Self {
        Self {
            slot:  Rc::new(Slot::new()),
            token: None,
        }
    }
}

/// Pull-based iteration over one named event of one capability instance.
///
/// Each [`next`](Self::next) call admits a single request, installs a
/// one-shot listener when the request is first polled, and resolves with
/// the payload when the event fires. [`stop`](Self::stop) ends the
/// sequence; it is idempotent and resolves a pending request terminally.
///
/// # Events between requests
///
/// The iterator only observes the event while a request is actively
/// awaiting it. Events that fire between requests are dropped, not
/// buffered, and events that fire before the first request are never
/// seen. Consumers that cannot tolerate this need a queueing source in
/// front of the iterator, not a different iterator.
pub struct EventIterator<C, E>
where
    C: EventCapability<E>,
{
    capability: C,
    event:      String,
    /// One-way transition to `false`; never reset.
    running:    Cell<bool>,
    delivered:  Cell<u64>,
    pending:    RefCell<Option<Request<C::Token, E>>>,
}

impl<C, E> EventIterator<C, E>
where
    C: EventCapability<E>,
{
    /// Stop the sequence.
    ///
    /// Sets the iterator to its terminal state, resolves a pending
    /// [`next`](Self::next) request with [`IterStep::Done`], and removes
    /// any outstanding listener before returning. Returns the number of
    /// events delivered; calling it again returns the same count and does
    /// nothing else.
    pub fn stop(&self) -> u64 {
        if self.running.replace(false) {
            debug!(
                event = %self.event,
                delivered = self.delivered.get(),
                "stopping event iterator"
            );
            let request = self.pending.borrow_mut().take();
            if let Some(request) = request {
                request.slot.wake();
                self.teardown(request);
            }
        }
        self.delivered.get()
    }

    /// Number of events handed to the consumer so far.
    pub fn delivered(&self) -> u64 {
        self.delivered.get()
    }

    /// Whether [`stop`](Self::stop) has been called yet.
    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    /// Name of the event this iterator is bound to.
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Remove the request from the pending slot, but only if it is the one
    /// owning `slot`.
    fn take_pending_if(&self, slot: &Rc<Slot<E>>) -> Option<Request<C::Token, E>> {
        let mut pending = self.pending.borrow_mut();
        match pending.as_ref() {
            Some(request) if Rc::ptr_eq(&request.slot, slot) => pending.take(),
            _ => None,
        }
    }

    fn owns_pending(&self, slot: &Rc<Slot<E>>) -> bool {
        self.pending
            .borrow()
            .as_ref()
            .map_or(false, |request| Rc::ptr_eq(&request.slot, slot))
    }

    /// Deregister the request's listener, if one was installed. Teardown
    /// never fails from the caller's perspective; an unsubscribe error is
    /// logged and dropped.
    fn teardown(&self, request: Request<C::Token, E>) {
        if let Some(token) = request.token {
            trace!(event = %self.event, "removing listener");
            if let Err(error) = self.capability.unsubscribe(token) {
                debug!(event = %self.event, %error, "unsubscribe failed during teardown");
            }
        }
    }
}

impl<C, E> EventIterator<C, E>
where
    C: EventCapability<E>,
    E: 'static,
{
    /// Create an iterator over firings of `event` on `capability`.
    pub fn new(capability: C, event: impl Into<String>) -> Self {
        Self {
            capability,
            event: event.into(),
            running: Cell::new(true),
            delivered: Cell::new(0),
            pending: RefCell::new(None),
        }
    }

    /// Request the next event.
    ///
    /// The returned future resolves with [`IterStep::Event`] when the
    /// bound event fires, or with [`IterStep::Done`] if the iterator was
    /// stopped first (a payload racing in after the stop is discarded).
    /// Once the iterator is stopped every call resolves `Done`
    /// immediately, without touching the capability.
    ///
    /// At most one request may be in flight; a second concurrent call
    /// resolves with [`Error::RequestInFlight`] and leaves the first one
    /// undisturbed. The listener is only installed once the future is
    /// polled, and dropping the future before it resolves removes the
    /// listener and frees the request slot.
    pub fn next(&self) -> NextEvent<'_, C, E> {
        let state = if !self.running.get() {
            NextState::Finished
        } else {
            let mut pending = self.pending.borrow_mut();
            if pending.is_some() {
                NextState::Rejected
            } else {
                let request = Request::new();
                let slot = Rc::clone(&request.slot);
                *pending = Some(request);
                NextState::Armed { slot }
            }
        };
        NextEvent { iter: self, state }
    }

    /// Drive the request owning `slot` towards resolution.
    ///
    /// `Ready(Ok(Some(payload)))` is a delivery, `Ready(Ok(None))` is the
    /// terminal result. Exactly one `Ready` is produced per request.
    fn poll_request(
        &self,
        slot: &Rc<Slot<E>>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<E>, Error<C::Error>>> {
        loop {
            if !self.running.get() {
                // stop() already tore the listener down; a payload that
                // slipped in regardless is dropped here.
                return Poll::Ready(Ok(None));
            }
            if let Some(payload) = slot.take_payload() {
                if let Some(request) = self.take_pending_if(slot) {
                    // The capability's once semantics removed the listener
                    // when it fired; this unsubscribe is the idempotent
                    // belt-and-braces pass.
                    self.teardown(request);
                }
                self.delivered.set(self.delivered.get() + 1);
                return Poll::Ready(Ok(Some(payload)));
            }
            if !self.owns_pending(slot) {
                // The request slot was taken over, which only happens when
                // stream polling is interleaved with a manual next().
                // Fail loudly instead of pending forever.
                return Poll::Ready(Err(Error::RequestInFlight));
            }
            if self.needs_listener(slot) {
                if let Err(error) = self.install_listener(slot) {
                    debug!(event = %self.event, %error, "subscribe failed, stopping iterator");
                    self.running.set(false);
                    if let Some(request) = self.take_pending_if(slot) {
                        self.teardown(request);
                    }
                    return Poll::Ready(Err(Error::Capability(error)));
                }
                // Re-check the payload: a capability may deliver
                // synchronously from subscribe_once if the event was
                // already queued.
                continue;
            }
            slot.register(cx.waker());
            return Poll::Pending;
        }
    }

    fn needs_listener(&self, slot: &Rc<Slot<E>>) -> bool {
        self.pending
            .borrow()
            .as_ref()
            .map_or(false, |request| {
                Rc::ptr_eq(&request.slot, slot) && request.token.is_none()
            })
    }

    fn install_listener(&self, slot: &Rc<Slot<E>>) -> Result<(), C::Error> {
        let handler_slot = Rc::clone(slot);
        trace!(event = %self.event, "installing one-shot listener");
        let token = self
            .capability
            .subscribe_once(&self.event, Box::new(move |payload| handler_slot.fire(payload)))?;
        let mut stale = Some(token);
        {
            let mut pending = self.pending.borrow_mut();
            if let Some(request) = pending.as_mut() {
                if Rc::ptr_eq(&request.slot, slot) {
                    request.token = stale.take();
                }
            }
        }
        // The request went away while we were subscribing; remove the
        // listener again so no token stays outstanding.
        if let Some(token) = stale {
            if let Err(error) = self.capability.unsubscribe(token) {
                debug!(event = %self.event, %error, "unsubscribe failed during teardown");
            }
        }
        Ok(())
    }
}

impl<C, E> fmt::Debug for EventIterator<C, E>
where
    C: EventCapability<E>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventIterator")
            .field("event", &self.event)
            .field("running", &self.running.get())
            .field("delivered", &self.delivered.get())
            .field("pending", &self.pending.borrow().is_some())
            .finish_non_exhaustive()
    }
}

impl<C, E> Drop for EventIterator<C, E>
where
    C: EventCapability<E>,
{
    fn drop(&mut self) {
        self.stop();
    }
}

/// The iterate-until-done sugar: each item is one delivered payload, and
/// the stream ends once the iterator is stopped.
///
/// The stream drives the same single request slot as
/// [`next`](EventIterator::next); don't interleave the two on one
/// iterator.
impl<C, E> Stream for EventIterator<C, E>
where
    C: EventCapability<E>,
    E: 'static,
{
    type Item = Result<E, Error<C::Error>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.into_ref().get_ref();
        if !this.running.get() {
            return Poll::Ready(None);
        }
        let slot = {
            let mut pending = this.pending.borrow_mut();
            let request = pending.get_or_insert_with(Request::new);
            Rc::clone(&request.slot)
        };
        match ready!(this.poll_request(&slot, cx)) {
            Ok(Some(payload)) => Poll::Ready(Some(Ok(payload))),
            Ok(None) => Poll::Ready(None),
            Err(error) => Poll::Ready(Some(Err(error))),
        }
    }
}

impl<C, E> FusedStream for EventIterator<C, E>
where
    C: EventCapability<E>,
    E: 'static,
{
    fn is_terminated(&self) -> bool {
        !self.running.get()
    }
}

enum NextState<E> {
    /// Admitted; owns the iterator's pending request slot.
    Armed { slot: Rc<Slot<E>> },
    /// Another request was in flight at admission time.
    Rejected,
    /// The iterator was already stopped; resolves terminally.
    Finished,
    /// Output already produced.
    Resolved,
}

/// Future returned by [`EventIterator::next`].
///
/// Dropping it before it resolves cancels this one request: the listener,
/// if installed, is removed and the iterator is ready for a new request.
pub struct NextEvent<'a, C, E>
where
    C: EventCapability<E>,
{
    iter:  &'a EventIterator<C, E>,
    state: NextState<E>,
}

impl<C, E> Future for NextEvent<'_, C, E>
where
    C: EventCapability<E>,
    E: 'static,
{
    type Output = Result<IterStep<E>, Error<C::Error>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match &this.state {
            NextState::Rejected => {
                this.state = NextState::Resolved;
                Poll::Ready(Err(Error::RequestInFlight))
            },
            NextState::Finished => {
                this.state = NextState::Resolved;
                Poll::Ready(Ok(IterStep::Done(this.iter.delivered.get())))
            },
            NextState::Armed { slot } => {
                let slot = Rc::clone(slot);
                let result = ready!(this.iter.poll_request(&slot, cx));
                this.state = NextState::Resolved;
                Poll::Ready(match result {
                    Ok(Some(payload)) => Ok(IterStep::Event(payload)),
                    Ok(None) => Ok(IterStep::Done(this.iter.delivered.get())),
                    Err(error) => Err(error),
                })
            },
            NextState::Resolved => panic!("NextEvent polled after completion"),
        }
    }
}

impl<C, E> FusedFuture for NextEvent<'_, C, E>
where
    C: EventCapability<E>,
    E: 'static,
{
    fn is_terminated(&self) -> bool {
        matches!(self.state, NextState::Resolved)
    }
}

impl<C, E> Drop for NextEvent<'_, C, E>
where
    C: EventCapability<E>,
{
    fn drop(&mut self) {
        // Dropping an unresolved request is the per-request cancel: the
        // iterator goes back to ready with no listener left behind.
        if let NextState::Armed { slot } = &self.state {
            if let Some(request) = self.iter.take_pending_if(slot) {
                self.iter.teardown(request);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::Cell,
        convert::Infallible,
        future::Future,
        pin::Pin,
        rc::Rc,
        task::{Context, Poll},
    };

    use futures_util::task::noop_waker;

    use super::*;
    use crate::{
        capability::{EventCapability, EventCapabilityExt, Handler},
        emitter::{ListenerToken, LocalEmitter},
    };

    fn poll<F: Future + Unpin>(fut: &mut F) -> Poll<F::Output> {
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        Pin::new(fut).poll(&mut cx)
    }

    fn poll_stream<S: Stream + Unpin>(stream: &mut S) -> Poll<Option<S::Item>> {
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        Pin::new(stream).poll_next(&mut cx)
    }

    #[test]
    fn delivers_events_in_firing_order() {
        let emitter = LocalEmitter::new();
        let ticks = (&emitter).events("tick");
        for i in 1..=3u32 {
            let mut next = ticks.next();
            assert_eq!(poll(&mut next), Poll::Pending);
            assert_eq!(emitter.emit("tick", i), 1);
            assert_eq!(poll(&mut next), Poll::Ready(Ok(IterStep::Event(i))));
        }
        assert_eq!(ticks.delivered(), 3);
        assert_eq!(emitter.listener_count("tick"), 0);
    }

    #[test]
    fn stop_before_first_request_is_terminal() {
        let emitter = LocalEmitter::<u32>::new();
        let ticks = (&emitter).events("tick");
        assert_eq!(ticks.stop(), 0);
        assert!(!ticks.is_running());
        let mut next = ticks.next();
        assert_eq!(poll(&mut next), Poll::Ready(Ok(IterStep::Done(0))));
        assert_eq!(emitter.listener_count("tick"), 0);
    }

    #[test]
    fn stop_while_pending_resolves_terminal() {
        let emitter = LocalEmitter::new();
        let ticks = (&emitter).events("tick");

        let mut first = ticks.next();
        assert_eq!(poll(&mut first), Poll::Pending);
        assert_eq!(emitter.emit("tick", 1u32), 1);
        assert_eq!(poll(&mut first), Poll::Ready(Ok(IterStep::Event(1))));
        drop(first);

        let mut second = ticks.next();
        assert_eq!(poll(&mut second), Poll::Pending);
        assert_eq!(emitter.listener_count("tick"), 1);
        assert_eq!(ticks.stop(), 1);
        assert_eq!(emitter.listener_count("tick"), 0);
        assert_eq!(poll(&mut second), Poll::Ready(Ok(IterStep::Done(1))));
    }

    #[test]
    fn concurrent_request_is_rejected() {
        let emitter = LocalEmitter::new();
        let ticks = (&emitter).events("tick");

        let mut first = ticks.next();
        assert_eq!(poll(&mut first), Poll::Pending);
        let mut second = ticks.next();
        assert_eq!(poll(&mut second), Poll::Ready(Err(Error::RequestInFlight)));

        // the original request is untouched and resolves normally
        assert_eq!(emitter.emit("tick", 7u32), 1);
        assert_eq!(poll(&mut first), Poll::Ready(Ok(IterStep::Event(7))));
    }

    #[test]
    fn listener_installs_on_first_poll() {
        let emitter = LocalEmitter::<u32>::new();
        let ticks = (&emitter).events("tick");

        let unpolled = ticks.next();
        assert_eq!(emitter.listener_count("tick"), 0);
        drop(unpolled);
        assert_eq!(emitter.listener_count("tick"), 0);

        let mut next = ticks.next();
        assert_eq!(poll(&mut next), Poll::Pending);
        assert_eq!(emitter.listener_count("tick"), 1);
    }

    #[test]
    fn dropping_pending_request_removes_listener() {
        let emitter = LocalEmitter::new();
        let ticks = (&emitter).events("tick");

        let mut next = ticks.next();
        assert_eq!(poll(&mut next), Poll::Pending);
        assert_eq!(emitter.listener_count("tick"), 1);
        drop(next);
        assert_eq!(emitter.listener_count("tick"), 0);
        assert!(ticks.is_running());

        // the iterator accepts a new request afterwards
        let mut next = ticks.next();
        assert_eq!(poll(&mut next), Poll::Pending);
        assert_eq!(emitter.emit("tick", 5u32), 1);
        assert_eq!(poll(&mut next), Poll::Ready(Ok(IterStep::Event(5))));
    }

    #[test]
    fn dropping_iterator_removes_listener() {
        let emitter = LocalEmitter::<u32>::new();
        let mut ticks = (&emitter).events("tick");
        assert_eq!(poll_stream(&mut ticks), Poll::Pending);
        assert_eq!(emitter.listener_count("tick"), 1);
        drop(ticks);
        assert_eq!(emitter.listener_count("tick"), 0);
    }

    /// Counts capability calls, to observe deregistration exactly-once
    /// behavior.
    #[derive(Debug)]
    struct Counting<'a> {
        inner:        &'a LocalEmitter<u32>,
        subscribed:   Cell<usize>,
        unsubscribed: Cell<usize>,
    }

    impl<'a> Counting<'a> {
        fn new(inner: &'a LocalEmitter<u32>) -> Self {
            Self {
                inner,
                subscribed: Cell::new(0),
                unsubscribed: Cell::new(0),
            }
        }
    }

    impl EventCapability<u32> for Counting<'_> {
        type Error = Infallible;
        type Token = ListenerToken;

        fn subscribe_once(
            &self,
            event: &str,
            handler: Handler<u32>,
        ) -> Result<Self::Token, Infallible> {
            self.subscribed.set(self.subscribed.get() + 1);
            self.inner.subscribe_once(event, handler)
        }

        fn unsubscribe(&self, token: Self::Token) -> Result<(), Infallible> {
            self.unsubscribed.set(self.unsubscribed.get() + 1);
            self.inner.unsubscribe(token)
        }
    }

    #[test]
    fn stop_is_idempotent_and_deregisters_once() {
        let emitter = LocalEmitter::new();
        let capability = Counting::new(&emitter);
        let ticks = (&capability).events("tick");

        let mut next = ticks.next();
        assert_eq!(poll(&mut next), Poll::Pending);
        assert_eq!(capability.subscribed.get(), 1);

        assert_eq!(ticks.stop(), 0);
        assert_eq!(capability.unsubscribed.get(), 1);
        assert_eq!(ticks.stop(), 0);
        assert_eq!(capability.unsubscribed.get(), 1);
        assert_eq!(poll(&mut next), Poll::Ready(Ok(IterStep::Done(0))));
    }

    /// Ignores unsubscribe, as if deregistration were deferred: lets an
    /// event slip in after stop().
    #[derive(Debug)]
    struct Sticky<'a>(&'a LocalEmitter<u32>);

    impl EventCapability<u32> for Sticky<'_> {
        type Error = Infallible;
        type Token = ListenerToken;

        fn subscribe_once(
            &self,
            event: &str,
            handler: Handler<u32>,
        ) -> Result<Self::Token, Infallible> {
            self.0.subscribe_once(event, handler)
        }

        fn unsubscribe(&self, _token: Self::Token) -> Result<(), Infallible> {
            Ok(())
        }
    }

    #[test]
    fn event_firing_after_stop_is_discarded() {
        let emitter = LocalEmitter::new();
        let capability = Sticky(&emitter);
        let ticks = (&capability).events("tick");

        let mut next = ticks.next();
        assert_eq!(poll(&mut next), Poll::Pending);
        assert_eq!(ticks.stop(), 0);
        // the listener outlived stop() because unsubscribe was a no-op
        assert_eq!(emitter.emit("tick", 9u32), 1);
        assert_eq!(poll(&mut next), Poll::Ready(Ok(IterStep::Done(0))));
        assert_eq!(ticks.delivered(), 0);
    }

    #[derive(Error, Debug, PartialEq, Eq)]
    #[error("subscribe refused")]
    struct Refused;

    #[derive(Debug)]
    struct Failing;

    impl EventCapability<u32> for Failing {
        type Error = Refused;
        type Token = ();

        fn subscribe_once(
            &self,
            _event: &str,
            _handler: Handler<u32>,
        ) -> Result<(), Refused> {
            Err(Refused)
        }

        fn unsubscribe(&self, _token: ()) -> Result<(), Refused> {
            Ok(())
        }
    }

    #[test]
    fn subscribe_failure_stops_iterator() {
        let ticks = Failing.events("tick");
        let mut next = ticks.next();
        assert_eq!(poll(&mut next), Poll::Ready(Err(Error::Capability(Refused))));
        assert!(!ticks.is_running());
        let mut next = ticks.next();
        assert_eq!(poll(&mut next), Poll::Ready(Ok(IterStep::Done(0))));
    }

    #[test]
    fn stream_yields_until_stopped() {
        let emitter = LocalEmitter::new();
        let mut ticks = (&emitter).events("tick");

        assert_eq!(poll_stream(&mut ticks), Poll::Pending);
        assert_eq!(emitter.emit("tick", 1u32), 1);
        assert_eq!(poll_stream(&mut ticks), Poll::Ready(Some(Ok(1))));
        assert_eq!(poll_stream(&mut ticks), Poll::Pending);
        assert_eq!(emitter.emit("tick", 2), 1);
        assert_eq!(poll_stream(&mut ticks), Poll::Ready(Some(Ok(2))));
        ticks.stop();
        assert_eq!(poll_stream(&mut ticks), Poll::Ready(None));
        assert!(FusedStream::is_terminated(&ticks));
    }

    #[test]
    fn end_to_end_with_executor() -> anyhow::Result<()> {
        let ex = smol::LocalExecutor::new();
        let emitter = Rc::new(LocalEmitter::new());
        let ticks = Rc::new(Rc::clone(&emitter).events("tick"));

        let consumer = {
            let ticks = Rc::clone(&ticks);
            ex.spawn(async move {
                let mut seen = Vec::new();
                loop {
                    match ticks.next().await? {
                        IterStep::Event(v) => seen.push(v),
                        IterStep::Done(count) => return anyhow::Ok((seen, count)),
                    }
                }
            })
        };

        while ex.try_tick() {}
        emitter.emit("tick", 1u32);
        while ex.try_tick() {}
        emitter.emit("tick", 2);
        while ex.try_tick() {}
        ticks.stop();
        let (seen, count) = smol::block_on(ex.run(consumer))?;
        assert_eq!(seen, [1, 2]);
        assert_eq!(count, 2);
        Ok(())
    }
}
