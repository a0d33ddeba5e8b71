//! Deferred-value engine: promises, chaining, thenable adoption.
//!
//! This crate is the whole system:
//! - [`Promise`] - the state machine core and chaining engine
//! - [`EventLoop`] / [`JobQueue`] - the deferred-job facility settlement
//!   effects are dispatched through
//! - Convenience constructors [`Promise::resolve`], [`Promise::reject`]
//!   and [`Promise::lift`]
//!
//! # Overview
//!
//! A promise settles at most once. Handlers registered with
//! [`Promise::then`] never run before the registering code unwinds, even
//! when the promise is already settled; they are deferred through the
//! scheduler capability the promise was built with, and run when the
//! event loop is driven.
//!
//! # Examples
//!
//! ```
//! use promise_runtime::{EventLoop, Handler, Promise};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let event_loop = EventLoop::new();
//! let result = Rc::new(Cell::new(0));
//!
//! let promise = Promise::new(event_loop.scheduler(), |resolve, _reject| {
//!     resolve.resolve(5);
//!     Ok(())
//! });
//!
//! let slot = Rc::clone(&result);
//! promise.then(
//!     Some(Handler::new(move |value: i32| {
//!         slot.set(value * 2);
//!         Ok((value * 2).into())
//!     })),
//!     None,
//! );
//!
//! // Nothing has run yet: settlement is never observed synchronously.
//! assert_eq!(result.get(), 0);
//!
//! event_loop.run_until_idle();
//! assert_eq!(result.get(), 10);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod event_loop;
pub mod job_queue;
pub mod promise;

// Re-export main types at crate root
pub use event_loop::EventLoop;
pub use job_queue::{Defer, Job, JobQueue};
pub use promise::{
    Handler, OnFulfilled, OnRejected, Promise, PromiseState, Rejector, Resolver,
};
