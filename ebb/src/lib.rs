//! Pull-based asynchronous iteration over push-based event sources.
//!
//! Push-based APIs deliver events by invoking a callback you registered.
//! This crate turns that inside out: an [`EventIterator`] lets a consumer
//! ask for "the next event" and await the answer, repeatedly, until the
//! sequence is explicitly stopped. Under the hood each request installs a
//! single one-shot listener on the source and removes it again when the
//! event fires, when the request is dropped, or when the iterator stops —
//! the consumer never manages callbacks itself.
//!
//! The source is abstracted as an [`EventCapability`]: anything that can
//! register a listener for one firing of a named event and remove it
//! again. [`LocalEmitter`] is a ready-made in-process implementation.
//!
//! Two things to know about the contract:
//!
//! - Exactly one request may be in flight per iterator. A second
//!   concurrent [`next`](EventIterator::next) is a usage error and is
//!   rejected with [`Error::RequestInFlight`], without disturbing the
//!   first request.
//! - The iterator only observes events while a request is awaiting one.
//!   Events firing between requests (or before the first) are dropped,
//!   not buffered.
//!
//! There is no built-in timeout; race the [`next`](EventIterator::next)
//! future against a timer and drop it (or call
//! [`stop`](EventIterator::stop)) to get one.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//!
//! use ebb::{EventCapabilityExt, IterStep, LocalEmitter};
//!
//! let ex = smol::LocalExecutor::new();
//! let emitter = Rc::new(LocalEmitter::new());
//! let ticks = Rc::new(Rc::clone(&emitter).events("tick"));
//!
//! let consumer = {
//!     let ticks = Rc::clone(&ticks);
//!     ex.spawn(async move {
//!         let mut seen = Vec::new();
//!         loop {
//!             match ticks.next().await.unwrap() {
//!                 IterStep::Event(v) => seen.push(v),
//!                 IterStep::Done(count) => return (seen, count),
//!             }
//!         }
//!     })
//! };
//!
//! while ex.try_tick() {}
//! emitter.emit("tick", 1u32);
//! while ex.try_tick() {}
//! emitter.emit("tick", 2);
//! while ex.try_tick() {}
//! ticks.stop();
//!
//! let (seen, count) = smol::block_on(ex.run(consumer));
//! assert_eq!(seen, [1, 2]);
//! assert_eq!(count, 2);
//! ```

pub mod capability;
pub mod combinators;
pub mod emitter;
pub mod iter;

pub use capability::{EventCapability, EventCapabilityExt, Handler};
pub use combinators::{EachError, Filtered, Mapped};
pub use emitter::{ListenerToken, LocalEmitter};
pub use iter::{Error, EventIterator, IterStep, NextEvent};
