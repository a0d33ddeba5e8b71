//! Shared leaf types for the promise engine.
//!
//! This crate defines the vocabulary the runtime is built from:
//! - [`PromiseError`] - the rejection-reason domain
//! - [`Thenable`] - the contract any foreign deferred value can implement
//!   to have its eventual outcome adopted by a promise
//! - [`Resolvable`] / [`Liftable`] - tagged sums separating plain values
//!   from adoptable thenables (and, for `lift`, from error values)
//!
//! It carries no runtime of its own; everything here is a type or a
//! contract consumed by `promise_runtime`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod thenable;

// Re-export main types at crate root
pub use error::{ErrorKind, PromiseError};
pub use thenable::{ErrorAdapter, Liftable, Resolvable, Thenable, ValueAdapter};
