//! Promise implementation: state machine, resolution procedure, chaining.
//!
//! A [`Promise`] is a cheaply clonable handle over shared single-threaded
//! state. It settles at most once, `Pending` to `Fulfilled` or `Rejected`,
//! and every observable effect of settlement is dispatched through the
//! [`Defer`] facility - a handler registered on an already-settled promise
//! still never runs before the registering code unwinds.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use promise_types::{
    ErrorAdapter, Liftable, PromiseError, Resolvable, Thenable, ValueAdapter,
};

use crate::job_queue::{Defer, Job};

/// The externally visible state of a promise.
///
/// Once settled (Fulfilled or Rejected), a promise cannot change state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromiseState {
    /// The initial state; neither fulfilled nor rejected
    Pending,
    /// Settled with a value
    Fulfilled,
    /// Settled with a rejection reason
    Rejected,
}

/// A one-shot transformation attached through [`Promise::then`].
///
/// The closure reports failure by returning `Err`, which rejects the
/// derived promise. An `Ok` result re-enters the resolution procedure, so
/// a handler returning a thenable makes the derived promise adopt it.
pub struct Handler<A, T> {
    callback: Box<dyn FnOnce(A) -> Result<Resolvable<T>, PromiseError>>,
}

impl<A, T> Handler<A, T> {
    /// Creates a new Handler from a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(A) -> Result<Resolvable<T>, PromiseError> + 'static,
    {
        Self {
            callback: Box::new(f),
        }
    }

    /// Invokes the handler, consuming it.
    pub fn call(self, input: A) -> Result<Resolvable<T>, PromiseError> {
        (self.callback)(input)
    }
}

impl<A, T> fmt::Debug for Handler<A, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler {{ ... }}")
    }
}

/// Handler invoked with the fulfillment value.
pub type OnFulfilled<T> = Handler<T, T>;

/// Handler invoked with the rejection reason.
pub type OnRejected<T> = Handler<PromiseError, T>;

/// Pending-side subscriber: a pair of one-shot continuations, exactly one
/// of which runs (as a deferred job) when the promise settles.
struct Observer<T> {
    on_fulfilled: Box<dyn FnOnce(T)>,
    on_rejected: Box<dyn FnOnce(PromiseError)>,
}

/// A settled outcome, cloned once per observer at drain time.
#[derive(Clone)]
enum Outcome<T> {
    Fulfilled(T),
    Rejected(PromiseError),
}

enum State<T> {
    Pending { observers: Vec<Observer<T>> },
    Fulfilled { value: T },
    Rejected { reason: PromiseError },
}

struct Inner<T> {
    scheduler: Rc<dyn Defer>,
    state: RefCell<State<T>>,
    /// First-call-wins latch shared by the resolve/reject capabilities.
    /// Stays armed while an adoption is in flight, so a second capability
    /// call during adoption is still a no-op.
    settled_once: Cell<bool>,
}

/// A deferred value: a handle to a result that is not available yet.
///
/// # Examples
///
/// ```
/// use promise_runtime::{EventLoop, Handler, Promise};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let event_loop = EventLoop::new();
/// let doubled = Rc::new(Cell::new(0));
///
/// let promise = Promise::new(event_loop.scheduler(), |resolve, _reject| {
///     resolve.resolve(21);
///     Ok(())
/// });
///
/// let seen = Rc::clone(&doubled);
/// promise.then(
///     Some(Handler::new(move |value: i32| {
///         seen.set(value * 2);
///         Ok((value * 2).into())
///     })),
///     None,
/// );
///
/// event_loop.run_until_idle();
/// assert_eq!(doubled.get(), 42);
/// ```
pub struct Promise<T> {
    inner: Rc<Inner<T>>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.inner.state.borrow() {
            State::Pending { .. } => "Pending",
            State::Fulfilled { .. } => "Fulfilled",
            State::Rejected { .. } => "Rejected",
        };
        write!(f, "Promise({state})")
    }
}

/// Capability to resolve a promise, handed to its setup routine.
///
/// Clonable; the first effective call to either capability of a pair wins
/// and all later calls are no-ops.
pub struct Resolver<T> {
    inner: Rc<Inner<T>>,
}

impl<T> Clone for Resolver<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> Resolver<T> {
    /// Resolves the promise with a plain value or a thenable to adopt.
    pub fn resolve(&self, value: impl Into<Resolvable<T>>) {
        if self.inner.settled_once.replace(true) {
            return;
        }
        resolve_inner(&self.inner, value.into());
    }
}

impl<T> fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Resolver {{ ... }}")
    }
}

/// Capability to reject a promise, handed to its setup routine.
pub struct Rejector<T> {
    inner: Rc<Inner<T>>,
}

impl<T> Clone for Rejector<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> Rejector<T> {
    /// Rejects the promise. The reason is carried verbatim; it is never
    /// inspected for thenable-ness.
    pub fn reject(&self, reason: PromiseError) {
        if self.inner.settled_once.replace(true) {
            return;
        }
        settle(&self.inner, Outcome::Rejected(reason));
    }
}

impl<T> fmt::Debug for Rejector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rejector {{ ... }}")
    }
}

impl<T: Clone + 'static> Promise<T> {
    /// Creates a promise and immediately runs `setup` with its resolve and
    /// reject capabilities.
    ///
    /// `setup` runs synchronously. An `Err` returned before the promise is
    /// settled is an implicit rejection with that reason; an `Err` after a
    /// capability has been used is ignored.
    pub fn new<F>(scheduler: Rc<dyn Defer>, setup: F) -> Self
    where
        F: FnOnce(Resolver<T>, Rejector<T>) -> Result<(), PromiseError>,
    {
        let promise = Self::pending(scheduler);
        let resolver = Resolver {
            inner: Rc::clone(&promise.inner),
        };
        let rejector = Rejector {
            inner: Rc::clone(&promise.inner),
        };
        if let Err(reason) = setup(resolver, rejector) {
            if !promise.inner.settled_once.replace(true) {
                settle(&promise.inner, Outcome::Rejected(reason));
            }
        }
        promise
    }

    /// Creates a promise settled as if `value` had been passed through the
    /// resolution procedure.
    ///
    /// A plain value wires the fulfilled state directly, with nothing
    /// scheduled; a thenable starts adoption right away.
    pub fn resolve(scheduler: Rc<dyn Defer>, value: impl Into<Resolvable<T>>) -> Self {
        let promise = Self::pending(scheduler);
        resolve_inner(&promise.inner, value.into());
        promise
    }

    /// Creates a rejected promise. The reason is never inspected.
    pub fn reject(scheduler: Rc<dyn Defer>, reason: PromiseError) -> Self {
        let promise = Self::pending(scheduler);
        settle(&promise.inner, Outcome::Rejected(reason));
        promise
    }

    /// Permissive adapter over values that are not already promises:
    /// thenables are adopted, error values reject, plain values fulfill.
    pub fn lift(scheduler: Rc<dyn Defer>, value: Liftable<T>) -> Self {
        match value {
            Liftable::Value(value) => Self::resolve(scheduler, Resolvable::Value(value)),
            Liftable::Error(reason) => Self::reject(scheduler, reason),
            Liftable::Thenable(thenable) => {
                Self::resolve(scheduler, Resolvable::Thenable(thenable))
            }
        }
    }

    /// Registers handlers for this promise's settlement and returns the
    /// derived promise their outcome feeds.
    ///
    /// A missing handler passes the outcome through unchanged: a fulfilled
    /// value fulfills the derived promise, a rejection reason rejects it.
    /// Handlers always run as deferred jobs, even when this promise is
    /// already settled at registration time.
    pub fn then(
        &self,
        on_fulfilled: Option<OnFulfilled<T>>,
        on_rejected: Option<OnRejected<T>>,
    ) -> Promise<T> {
        let derived = Self::pending(Rc::clone(&self.inner.scheduler));

        let fulfil_target = Rc::clone(&derived.inner);
        let reject_target = Rc::clone(&derived.inner);
        let observer = Observer {
            on_fulfilled: Box::new(move |value: T| match on_fulfilled {
                None => settle(&fulfil_target, Outcome::Fulfilled(value)),
                Some(handler) => match handler.call(value) {
                    Ok(resolvable) => resolve_inner(&fulfil_target, resolvable),
                    Err(reason) => settle(&fulfil_target, Outcome::Rejected(reason)),
                },
            }),
            on_rejected: Box::new(move |reason: PromiseError| match on_rejected {
                None => settle(&reject_target, Outcome::Rejected(reason)),
                Some(handler) => match handler.call(reason) {
                    Ok(resolvable) => resolve_inner(&reject_target, resolvable),
                    Err(reason) => settle(&reject_target, Outcome::Rejected(reason)),
                },
            }),
        };

        observe(&self.inner, observer);
        derived
    }

    /// Returns the current state.
    ///
    /// Introspection is synchronous; observation through handlers never
    /// is.
    pub fn state(&self) -> PromiseState {
        match &*self.inner.state.borrow() {
            State::Pending { .. } => PromiseState::Pending,
            State::Fulfilled { .. } => PromiseState::Fulfilled,
            State::Rejected { .. } => PromiseState::Rejected,
        }
    }

    /// Returns the fulfillment value, if fulfilled.
    pub fn value(&self) -> Option<T> {
        match &*self.inner.state.borrow() {
            State::Fulfilled { value } => Some(value.clone()),
            _ => None,
        }
    }

    /// Returns the rejection reason, if rejected.
    pub fn error(&self) -> Option<PromiseError> {
        match &*self.inner.state.borrow() {
            State::Rejected { reason } => Some(reason.clone()),
            _ => None,
        }
    }

    /// This promise as an adoptable thenable capability.
    pub fn as_thenable(&self) -> Rc<dyn Thenable<T>> {
        Rc::new(self.clone()) as Rc<dyn Thenable<T>>
    }

    fn pending(scheduler: Rc<dyn Defer>) -> Self {
        Self {
            inner: Rc::new(Inner {
                scheduler,
                state: RefCell::new(State::Pending {
                    observers: Vec::new(),
                }),
                settled_once: Cell::new(false),
            }),
        }
    }
}

impl<T: Clone + 'static> Thenable<T> for Promise<T> {
    fn subscribe(
        self: Rc<Self>,
        on_value: ValueAdapter<T>,
        on_error: ErrorAdapter,
    ) -> Result<(), PromiseError> {
        observe(
            &self.inner,
            Observer {
                on_fulfilled: Box::new(move |value| on_value(Resolvable::Value(value))),
                on_rejected: on_error,
            },
        );
        Ok(())
    }

    fn identity(&self) -> *const () {
        Rc::as_ptr(&self.inner).cast::<()>()
    }
}

/// Resolution procedure: route a resolution input to direct settlement or
/// thenable adoption.
fn resolve_inner<T: Clone + 'static>(inner: &Rc<Inner<T>>, value: Resolvable<T>) {
    match value {
        Resolvable::Value(value) => settle(inner, Outcome::Fulfilled(value)),
        Resolvable::Thenable(thenable) => adopt(inner, thenable),
    }
}

/// Defers this promise's settlement to a thenable's eventual outcome.
fn adopt<T: Clone + 'static>(inner: &Rc<Inner<T>>, thenable: Rc<dyn Thenable<T>>) {
    if thenable.identity() == Rc::as_ptr(inner).cast::<()>() {
        settle(
            inner,
            Outcome::Rejected(PromiseError::type_mismatch(
                "promise cannot adopt itself",
            )),
        );
        return;
    }

    tracing::trace!("adopting thenable");

    // One guard per adoption level: whichever adapter signals first wins,
    // whatever the thenable does afterwards.
    let fired = Rc::new(Cell::new(false));

    let on_value: ValueAdapter<T> = {
        let fired = Rc::clone(&fired);
        let target = Rc::clone(inner);
        Box::new(move |value| {
            if !fired.replace(true) {
                resolve_inner(&target, value);
            }
        })
    };
    let on_error: ErrorAdapter = {
        let fired = Rc::clone(&fired);
        let target = Rc::clone(inner);
        Box::new(move |reason| {
            if !fired.replace(true) {
                settle(&target, Outcome::Rejected(reason));
            }
        })
    };

    if let Err(reason) = thenable.subscribe(on_value, on_error) {
        if !fired.replace(true) {
            settle(inner, Outcome::Rejected(reason));
        }
    }
}

/// Registers an observer: queued while pending, scheduled immediately
/// against the fixed outcome once settled.
fn observe<T: Clone + 'static>(inner: &Rc<Inner<T>>, observer: Observer<T>) {
    let outcome = {
        let mut state = inner.state.borrow_mut();
        match &mut *state {
            State::Pending { observers } => {
                observers.push(observer);
                return;
            }
            State::Fulfilled { value } => Outcome::Fulfilled(value.clone()),
            State::Rejected { reason } => Outcome::Rejected(reason.clone()),
        }
    };
    schedule_observer(&inner.scheduler, observer, outcome);
}

/// Finalize-and-drain: transition out of Pending and schedule one job per
/// queued observer with the fixed outcome. A settled promise ignores
/// further settlement attempts.
fn settle<T: Clone + 'static>(inner: &Rc<Inner<T>>, outcome: Outcome<T>) {
    let previous = {
        let mut state = inner.state.borrow_mut();
        if !matches!(&*state, State::Pending { .. }) {
            return;
        }
        let settled = match &outcome {
            Outcome::Fulfilled(value) => State::Fulfilled {
                value: value.clone(),
            },
            Outcome::Rejected(reason) => State::Rejected {
                reason: reason.clone(),
            },
        };
        std::mem::replace(&mut *state, settled)
    };
    let observers = match previous {
        State::Pending { observers } => observers,
        _ => return,
    };

    tracing::trace!(observers = observers.len(), "promise settled");
    for observer in observers {
        schedule_observer(&inner.scheduler, observer, outcome.clone());
    }
}

fn schedule_observer<T: Clone + 'static>(
    scheduler: &Rc<dyn Defer>,
    observer: Observer<T>,
    outcome: Outcome<T>,
) {
    scheduler.defer(Job::new(move || match outcome {
        Outcome::Fulfilled(value) => (observer.on_fulfilled)(value),
        Outcome::Rejected(reason) => (observer.on_rejected)(reason),
    }));
}
