//! Unit tests for unhandled rejection tracking

use async_runtime::{EventLoop, EventLoopConfig, Promise, RejectionPolicy, Task};
use core_types::{JsError, Value};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn rejection_without_handler_is_reported_at_checkpoint() {
    init_logging();
    let el = EventLoop::new();
    let promise = Promise::rejected(&el, JsError::error("nobody listens"));

    el.run_until_done().unwrap();
    let reported = el.take_unhandled_rejections();
    assert_eq!(reported.len(), 1);
    assert_eq!(reported[0].promise_id, promise.id());
    assert_eq!(reported[0].error, JsError::error("nobody listens"));

    assert!(el.take_unhandled_rejections().is_empty());
}

#[test]
fn handler_attached_in_same_turn_prevents_report() {
    let el = EventLoop::new();
    let promise = Promise::rejected(&el, JsError::error("handled"));
    promise.catch(|_| Ok(Value::Undefined));

    el.run_until_done().unwrap();
    assert!(el.take_unhandled_rejections().is_empty());
}

#[test]
fn rejection_with_pending_handler_is_never_tracked() {
    let el = EventLoop::new();
    let (promise, _, reject) = Promise::with_resolvers(&el);
    promise.catch(|_| Ok(Value::Undefined));
    reject.reject(JsError::error("already observed"));

    el.run_until_done().unwrap();
    assert!(el.take_unhandled_rejections().is_empty());
}

#[test]
fn unhandled_derived_promise_is_reported() {
    let el = EventLoop::new();
    Promise::resolved(&el, Value::Undefined)
        .on_fulfilled(|_| Err::<Value, _>(JsError::error("handler threw")));

    el.run_until_done().unwrap();
    let reported = el.take_unhandled_rejections();
    assert_eq!(reported.len(), 1);
    assert_eq!(reported[0].error.message, "handler threw");
}

#[test]
fn late_handler_still_runs() {
    init_logging();
    let el = EventLoop::new();
    let promise = Promise::rejected(&el, JsError::error("late"));
    el.run_until_done().unwrap();
    assert_eq!(el.take_unhandled_rejections().len(), 1);

    let recovered = promise.catch(|e| Ok(Value::from(e.message)));
    el.run_until_done().unwrap();
    assert_eq!(recovered.result(), Some(Value::from("late")));
    assert!(el.take_unhandled_rejections().is_empty());
}

#[test]
fn handler_attached_from_later_task_is_too_late() {
    init_logging();
    let el = EventLoop::new();
    let (promise, _, reject) = Promise::with_resolvers(&el);
    el.enqueue_task(Task::new(move || {
        reject.reject(JsError::error("first turn"));
        Ok(())
    }));
    let later = promise.clone();
    el.enqueue_task(Task::new(move || {
        later.catch(|_| Ok(Value::Undefined));
        Ok(())
    }));

    el.run_until_done().unwrap();
    let reported = el.take_unhandled_rejections();
    assert_eq!(reported.len(), 1);
    assert_eq!(reported[0].promise_id, promise.id());
}

#[test]
fn silent_policy_still_records() {
    let config = EventLoopConfig {
        unhandled_rejections: RejectionPolicy::Silent,
    };
    let el = EventLoop::with_config(config);
    Promise::rejected(&el, JsError::error("quiet"));

    el.run_until_done().unwrap();
    assert_eq!(el.config().unhandled_rejections, RejectionPolicy::Silent);
    assert_eq!(el.take_unhandled_rejections().len(), 1);
}

#[test]
fn shutdown_reports_then_clears() {
    let el = EventLoop::new();
    Promise::rejected(&el, JsError::error("at exit"));

    el.shutdown();
    assert!(el.take_unhandled_rejections().is_empty());
}
