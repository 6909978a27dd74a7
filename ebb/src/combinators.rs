//! Thin sequence transformations over the iterator protocol.
//!
//! Everything here is a pass-through loop on
//! [`next`](EventIterator::next): no extra synchronization, no buffering.
//! The derived sequences own their source, so stopping or dropping them
//! stops the source too.

use std::{
    pin::Pin,
    task::{ready, Context, Poll},
};

use futures_core::{stream::FusedStream, Stream};
use pin_project::pin_project;
use thiserror::Error;

use crate::{
    capability::EventCapability,
    iter::{Error, EventIterator, IterStep},
};

/// Error produced by [`EventIterator::each`] and the `each` methods of the
/// derived sequences.
///
/// In both cases the source sequence was stopped before the error was
/// returned, so no listener is left behind.
#[derive(Error, Debug)]
pub enum EachError<C, A> {
    /// The underlying sequence failed.
    #[error(transparent)]
    Iter(Error<C>),
    /// The per-event action failed.
    #[error("event action failed: {0}")]
    Action(#[source] A),
}

impl<C, E> EventIterator<C, E>
where
    C: EventCapability<E>,
    E: 'static,
{
    /// Run `action` on every event, in arrival order, until the sequence
    /// stops. Resolves with the number of events delivered.
    ///
    /// If `action` fails, the iterator is stopped first and the error is
    /// then returned as [`EachError::Action`].
    pub async fn each<F, A>(&self, mut action: F) -> Result<u64, EachError<C::Error, A>>
    where
        F: FnMut(E) -> Result<(), A>,
    {
        loop {
            match self.next().await {
                Ok(IterStep::Event(payload)) => {
                    if let Err(error) = action(payload) {
                        self.stop();
                        return Err(EachError::Action(error));
                    }
                },
                Ok(IterStep::Done(count)) => return Ok(count),
                Err(error) => {
                    self.stop();
                    return Err(EachError::Iter(error));
                },
            }
        }
    }

    /// Transform every payload with `f`.
    ///
    /// The derived sequence speaks the same protocol; its terminal count
    /// is the source's delivered count.
    pub fn map<F, U>(self, f: F) -> Mapped<C, E, F>
    where
        F: FnMut(E) -> U,
    {
        Mapped { source: self, f }
    }

    /// Keep only payloads satisfying `predicate`.
    ///
    /// A request on the derived sequence keeps re-requesting from the
    /// source until a matching payload (or the terminal result) appears.
    /// Payloads the predicate drops still count as delivered by the
    /// source, so the terminal count includes them.
    pub fn filter<P>(self, predicate: P) -> Filtered<C, E, P>
    where
        P: FnMut(&E) -> bool,
    {
        Filtered {
            source: self,
            predicate,
        }
    }
}

/// Sequence produced by [`EventIterator::map`].
#[pin_project]
pub struct Mapped<C, E, F>
where
    C: EventCapability<E>,
{
    #[pin]
    source: EventIterator<C, E>,
    f:      F,
}

impl<C, E, F> Mapped<C, E, F>
where
    C: EventCapability<E>,
    E: 'static,
{
    /// Next transformed payload, or the terminal count.
    pub async fn next<U>(&mut self) -> Result<IterStep<U>, Error<C::Error>>
    where
        F: FnMut(E) -> U,
    {
        match self.source.next().await? {
            IterStep::Event(payload) => Ok(IterStep::Event((self.f)(payload))),
            IterStep::Done(count) => Ok(IterStep::Done(count)),
        }
    }

    /// Stop the source sequence.
    pub fn stop(&self) -> u64 {
        self.source.stop()
    }

    /// Like [`EventIterator::each`], over transformed payloads.
    pub async fn each<U, G, A>(&mut self, mut action: G) -> Result<u64, EachError<C::Error, A>>
    where
        F: FnMut(E) -> U,
        G: FnMut(U) -> Result<(), A>,
    {
        loop {
            match self.next().await {
                Ok(IterStep::Event(value)) => {
                    if let Err(error) = action(value) {
                        self.source.stop();
                        return Err(EachError::Action(error));
                    }
                },
                Ok(IterStep::Done(count)) => return Ok(count),
                Err(error) => {
                    self.source.stop();
                    return Err(EachError::Iter(error));
                },
            }
        }
    }
}

impl<C, E, F, U> Stream for Mapped<C, E, F>
where
    C: EventCapability<E>,
    E: 'static,
    F: FnMut(E) -> U,
{
    type Item = Result<U, Error<C::Error>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        match ready!(this.source.poll_next(cx)) {
            Some(Ok(payload)) => Poll::Ready(Some(Ok((this.f)(payload)))),
            Some(Err(error)) => Poll::Ready(Some(Err(error))),
            None => Poll::Ready(None),
        }
    }
}

impl<C, E, F, U> FusedStream for Mapped<C, E, F>
where
    C: EventCapability<E>,
    E: 'static,
    F: FnMut(E) -> U,
{
    fn is_terminated(&self) -> bool {
        !self.source.is_running()
    }
}

/// Sequence produced by [`EventIterator::filter`].
#[pin_project]
pub struct Filtered<C, E, P>
where
    C: EventCapability<E>,
{
    #[pin]
    source:    EventIterator<C, E>,
    predicate: P,
}

impl<C, E, P> Filtered<C, E, P>
where
    C: EventCapability<E>,
    E: 'static,
    P: FnMut(&E) -> bool,
{
    /// Next payload satisfying the predicate, or the terminal count.
    pub async fn next(&mut self) -> Result<IterStep<E>, Error<C::Error>> {
        loop {
            match self.source.next().await? {
                IterStep::Event(payload) => {
                    if (self.predicate)(&payload) {
                        return Ok(IterStep::Event(payload));
                    }
                },
                IterStep::Done(count) => return Ok(IterStep::Done(count)),
            }
        }
    }

    /// Stop the source sequence.
    pub fn stop(&self) -> u64 {
        self.source.stop()
    }

    /// Like [`EventIterator::each`], over payloads passing the predicate.
    pub async fn each<G, A>(&mut self, mut action: G) -> Result<u64, EachError<C::Error, A>>
    where
        G: FnMut(E) -> Result<(), A>,
    {
        loop {
            match self.next().await {
                Ok(IterStep::Event(payload)) => {
                    if let Err(error) = action(payload) {
                        self.source.stop();
                        return Err(EachError::Action(error));
                    }
                },
                Ok(IterStep::Done(count)) => return Ok(count),
                Err(error) => {
                    self.source.stop();
                    return Err(EachError::Iter(error));
                },
            }
        }
    }
}

impl<C, E, P> Stream for Filtered<C, E, P>
where
    C: EventCapability<E>,
    E: 'static,
    P: FnMut(&E) -> bool,
{
    type Item = Result<E, Error<C::Error>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        loop {
            match ready!(this.source.as_mut().poll_next(cx)) {
                Some(Ok(payload)) => {
                    if (this.predicate)(&payload) {
                        return Poll::Ready(Some(Ok(payload)));
                    }
                },
                Some(Err(error)) => return Poll::Ready(Some(Err(error))),
                None => return Poll::Ready(None),
            }
        }
    }
}

impl<C, E, P> FusedStream for Filtered<C, E, P>
where
    C: EventCapability<E>,
    E: 'static,
    P: FnMut(&E) -> bool,
{
    fn is_terminated(&self) -> bool {
        !self.source.is_running()
    }
}
