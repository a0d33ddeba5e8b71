//! The thenable contract and the tagged value sums built on it.
//!
//! Anything that can eventually produce a value or a reason may implement
//! [`Thenable`]; a promise resolved with such a value defers its own
//! settlement until the thenable reports its outcome ("adoption"). The
//! original untyped "does it have a callable `then` member" probe becomes
//! the explicit [`Resolvable`] sum here: a resolution input is either a
//! plain value or a thenable capability, decided by the caller's type, not
//! by runtime inspection.

use std::fmt;
use std::ptr;
use std::rc::Rc;

use crate::PromiseError;

/// Continuation handed to a thenable for its eventual value.
///
/// The value may itself be resolvable to another thenable, which is how
/// arbitrarily deep adoption chains unwind.
pub type ValueAdapter<T> = Box<dyn FnOnce(Resolvable<T>)>;

/// Continuation handed to a thenable for its eventual rejection reason.
///
/// Reasons are final; they are never re-inspected for thenable-ness.
pub type ErrorAdapter = Box<dyn FnOnce(PromiseError)>;

/// A foreign deferred value whose outcome a promise can adopt.
///
/// Implementations invoke at most one adapter, once. The engine guards
/// against implementations that signal both adapters or fail after
/// signalling: only the first signal wins. An implementation that can
/// neither subscribe nor signal reports that by returning `Err`, which
/// rejects the adopting promise.
pub trait Thenable<T> {
    /// Registers the adopting promise's continuations with this thenable.
    fn subscribe(
        self: Rc<Self>,
        on_value: ValueAdapter<T>,
        on_error: ErrorAdapter,
    ) -> Result<(), PromiseError>;

    /// Stable address identifying the underlying deferred state, used to
    /// detect a promise adopting itself. Foreign thenables keep the
    /// anonymous default.
    fn identity(&self) -> *const () {
        ptr::null()
    }
}

/// A value a promise can be resolved with: either settled data or a
/// thenable to adopt.
pub enum Resolvable<T> {
    /// A plain value; the promise fulfills with it directly
    Value(T),
    /// A thenable; the promise tracks its eventual outcome
    Thenable(Rc<dyn Thenable<T>>),
}

impl<T> Resolvable<T> {
    /// Returns whether resolution would adopt rather than fulfill.
    pub fn is_thenable(&self) -> bool {
        matches!(self, Resolvable::Thenable(_))
    }
}

impl<T> From<T> for Resolvable<T> {
    fn from(value: T) -> Self {
        Resolvable::Value(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for Resolvable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolvable::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Resolvable::Thenable(_) => write!(f, "Thenable(...)"),
        }
    }
}

/// Input to the permissive `lift` constructor.
///
/// `lift` broadens interoperability with values that are not already
/// promises: thenables are adopted, error values reject, anything else
/// fulfills.
pub enum Liftable<T> {
    /// A plain value; lifts to a fulfilled promise
    Value(T),
    /// An error value; lifts to a rejected promise
    Error(PromiseError),
    /// A thenable; lifts to a promise adopting its outcome
    Thenable(Rc<dyn Thenable<T>>),
}

impl<T: fmt::Debug> fmt::Debug for Liftable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Liftable::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Liftable::Error(reason) => f.debug_tuple("Error").field(reason).finish(),
            Liftable::Thenable(_) => write!(f, "Thenable(...)"),
        }
    }
}
