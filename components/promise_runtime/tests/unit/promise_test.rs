//! Unit tests for the Promise state machine and chaining engine

use promise_runtime::{EventLoop, Handler, Promise, PromiseState, Rejector, Resolver};
use promise_types::{ErrorKind, Liftable, PromiseError, Resolvable};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Builds a pending promise whose capabilities outlive the setup routine.
fn pending_pair(event_loop: &EventLoop) -> (Promise<i32>, Resolver<i32>, Rejector<i32>) {
    let caps = Rc::new(RefCell::new(None));
    let slot = Rc::clone(&caps);
    let promise = Promise::new(event_loop.scheduler(), move |resolve, reject| {
        *slot.borrow_mut() = Some((resolve, reject));
        Ok(())
    });
    let (resolver, rejector) = caps.borrow_mut().take().unwrap();
    (promise, resolver, rejector)
}

#[test]
fn new_promise_is_pending() {
    let event_loop = EventLoop::new();
    let (promise, _resolver, _rejector) = pending_pair(&event_loop);
    assert_eq!(promise.state(), PromiseState::Pending);
    assert!(promise.value().is_none());
    assert!(promise.error().is_none());
}

#[test]
fn setup_runs_synchronously() {
    let event_loop = EventLoop::new();
    let ran = Rc::new(Cell::new(false));
    let flag = Rc::clone(&ran);
    let _promise: Promise<i32> = Promise::new(event_loop.scheduler(), move |_, _| {
        flag.set(true);
        Ok(())
    });
    assert!(ran.get());
}

#[test]
fn resolve_settles_without_driving_the_loop() {
    let event_loop = EventLoop::new();
    let (promise, resolver, _rejector) = pending_pair(&event_loop);
    resolver.resolve(42);
    assert_eq!(promise.state(), PromiseState::Fulfilled);
    assert_eq!(promise.value(), Some(42));
}

#[test]
fn settlement_is_irreversible() {
    let event_loop = EventLoop::new();
    let (promise, resolver, rejector) = pending_pair(&event_loop);
    resolver.resolve(1);
    resolver.resolve(2);
    rejector.reject(PromiseError::application("late"));
    assert_eq!(promise.state(), PromiseState::Fulfilled);
    assert_eq!(promise.value(), Some(1));
}

#[test]
fn reject_wins_when_called_first() {
    let event_loop = EventLoop::new();
    let (promise, resolver, rejector) = pending_pair(&event_loop);
    rejector.reject(PromiseError::application("first"));
    resolver.resolve(5);
    assert_eq!(promise.state(), PromiseState::Rejected);
    assert_eq!(promise.error(), Some(PromiseError::application("first")));
}

#[test]
fn then_returns_a_new_pending_promise() {
    let event_loop = EventLoop::new();
    let promise = Promise::resolve(event_loop.scheduler(), 5);
    let derived = promise.then(None, None);
    assert_eq!(promise.state(), PromiseState::Fulfilled);
    assert_eq!(derived.state(), PromiseState::Pending);
}

#[test]
fn handlers_never_run_before_the_loop_is_driven() {
    let event_loop = EventLoop::new();
    let promise = Promise::resolve(event_loop.scheduler(), 5);
    let ran = Rc::new(Cell::new(false));

    let flag = Rc::clone(&ran);
    promise.then(
        Some(Handler::new(move |value: i32| {
            flag.set(true);
            Ok(value.into())
        })),
        None,
    );

    assert!(!ran.get());
    event_loop.run_until_idle();
    assert!(ran.get());
}

#[test]
fn chained_transform_doubles_the_value() {
    let event_loop = EventLoop::new();
    let promise = Promise::resolve(event_loop.scheduler(), 5);
    let derived = promise.then(
        Some(Handler::new(|value: i32| Ok(Resolvable::Value(value * 2)))),
        None,
    );

    event_loop.run_until_idle();
    assert_eq!(derived.state(), PromiseState::Fulfilled);
    assert_eq!(derived.value(), Some(10));
}

#[test]
fn missing_fulfillment_handler_passes_the_value_through() {
    let event_loop = EventLoop::new();
    let promise = Promise::resolve(event_loop.scheduler(), 5);
    let derived = promise.then(
        None,
        Some(Handler::new(|_reason| Ok(Resolvable::Value(99)))),
    );

    event_loop.run_until_idle();
    assert_eq!(derived.value(), Some(5));
}

#[test]
fn missing_rejection_handler_passes_the_reason_through() {
    let event_loop = EventLoop::new();
    let promise: Promise<i32> =
        Promise::reject(event_loop.scheduler(), PromiseError::application("down"));
    let derived = promise.then(
        Some(Handler::new(|value: i32| Ok(Resolvable::Value(value + 1)))),
        None,
    );

    event_loop.run_until_idle();
    assert_eq!(derived.state(), PromiseState::Rejected);
    assert_eq!(derived.error(), Some(PromiseError::application("down")));
}

#[test]
fn failing_handler_rejects_the_derived_promise() {
    let event_loop = EventLoop::new();
    let promise = Promise::resolve(event_loop.scheduler(), 1);
    let derived = promise.then(
        Some(Handler::new(|_value: i32| {
            Err(PromiseError::execution("handler blew up"))
        })),
        None,
    );

    event_loop.run_until_idle();
    assert_eq!(derived.state(), PromiseState::Rejected);
    assert_eq!(
        derived.error(),
        Some(PromiseError::execution("handler blew up"))
    );
}

#[test]
fn rejection_handler_can_recover() {
    let event_loop = EventLoop::new();
    let promise: Promise<i32> =
        Promise::reject(event_loop.scheduler(), PromiseError::application("down"));
    let derived = promise.then(
        None,
        Some(Handler::new(|_reason| Ok(Resolvable::Value(7)))),
    );

    event_loop.run_until_idle();
    assert_eq!(derived.state(), PromiseState::Fulfilled);
    assert_eq!(derived.value(), Some(7));
}

#[test]
fn observers_are_notified_in_registration_order() {
    let event_loop = EventLoop::new();
    let (promise, resolver, _rejector) = pending_pair(&event_loop);
    let order = Rc::new(RefCell::new(vec![]));

    for tag in 1..=3 {
        let order = Rc::clone(&order);
        promise.then(
            Some(Handler::new(move |value: i32| {
                order.borrow_mut().push(tag);
                Ok(value.into())
            })),
            None,
        );
    }

    resolver.resolve(0);
    event_loop.run_until_idle();
    assert_eq!(*order.borrow(), vec![1, 2, 3]);
}

#[test]
fn then_on_settled_promise_still_defers() {
    let event_loop = EventLoop::new();
    let promise = Promise::resolve(event_loop.scheduler(), 5);
    event_loop.run_until_idle();

    let ran = Rc::new(Cell::new(false));
    let flag = Rc::clone(&ran);
    let derived = promise.then(
        Some(Handler::new(move |value: i32| {
            flag.set(true);
            Ok(value.into())
        })),
        None,
    );

    assert!(!ran.get());
    assert_eq!(event_loop.pending_jobs(), 1);
    event_loop.run_until_idle();
    assert!(ran.get());
    assert_eq!(derived.value(), Some(5));
}

#[test]
fn each_then_call_produces_its_own_derived_promise() {
    let event_loop = EventLoop::new();
    let (promise, resolver, _rejector) = pending_pair(&event_loop);

    let doubled = promise.then(
        Some(Handler::new(|value: i32| Ok(Resolvable::Value(value * 2)))),
        None,
    );
    let negated = promise.then(
        Some(Handler::new(|value: i32| Ok(Resolvable::Value(-value)))),
        None,
    );

    resolver.resolve(3);
    event_loop.run_until_idle();
    assert_eq!(doubled.value(), Some(6));
    assert_eq!(negated.value(), Some(-3));
    assert_eq!(promise.value(), Some(3));
}

#[test]
fn transforms_compose_along_a_chain() {
    let event_loop = EventLoop::new();
    let (promise, resolver, _rejector) = pending_pair(&event_loop);

    let chained = promise
        .then(
            Some(Handler::new(|value: i32| Ok(Resolvable::Value(value + 1)))),
            None,
        )
        .then(
            Some(Handler::new(|value: i32| Ok(Resolvable::Value(value * 10)))),
            None,
        );

    resolver.resolve(4);
    event_loop.run_until_idle();
    assert_eq!(chained.value(), Some(50));
}

#[test]
fn handler_returning_a_thenable_is_adopted() {
    let event_loop = EventLoop::new();
    let promise = Promise::resolve(event_loop.scheduler(), 1);
    let replacement = Promise::resolve(event_loop.scheduler(), 9);

    let derived = promise.then(
        Some(Handler::new(move |_value: i32| {
            Ok(Resolvable::Thenable(replacement.as_thenable()))
        })),
        None,
    );

    event_loop.run_until_idle();
    assert_eq!(derived.value(), Some(9));
}

#[test]
fn resolve_constructor_is_finalized_immediately() {
    let event_loop = EventLoop::new();
    let promise = Promise::resolve(event_loop.scheduler(), 5);
    assert_eq!(promise.state(), PromiseState::Fulfilled);
    assert!(event_loop.is_idle());
}

#[test]
fn reject_constructor_is_finalized_immediately() {
    let event_loop = EventLoop::new();
    let promise: Promise<i32> =
        Promise::reject(event_loop.scheduler(), PromiseError::application("no"));
    assert_eq!(promise.state(), PromiseState::Rejected);
    assert!(event_loop.is_idle());
}

#[test]
fn lift_fulfills_plain_values() {
    let event_loop = EventLoop::new();
    let promise = Promise::lift(event_loop.scheduler(), Liftable::Value(11));
    assert_eq!(promise.value(), Some(11));
}

#[test]
fn lift_rejects_error_values() {
    let event_loop = EventLoop::new();
    let promise: Promise<i32> = Promise::lift(
        event_loop.scheduler(),
        Liftable::Error(PromiseError::application("bad input")),
    );
    assert_eq!(promise.state(), PromiseState::Rejected);
    assert_eq!(promise.error().unwrap().kind, ErrorKind::Application);
}

#[test]
fn lift_adopts_thenables() {
    let event_loop = EventLoop::new();
    let source = Promise::resolve(event_loop.scheduler(), 3);
    let promise = Promise::lift(
        event_loop.scheduler(),
        Liftable::Thenable(source.as_thenable()),
    );

    event_loop.run_until_idle();
    assert_eq!(promise.value(), Some(3));
}
