//! Unit tests for then / catch / finally chaining

use async_runtime::{EventLoop, Handler, Promise, PromiseState};
use core_types::{ErrorKind, JsError, Value};
use std::sync::{Arc, Mutex};

type Log = Arc<Mutex<Vec<String>>>;

fn log() -> Log {
    Arc::new(Mutex::new(vec![]))
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

#[test]
fn then_invokes_only_success_handler_on_fulfilment() {
    let el = EventLoop::new();
    let calls = log();
    let (a, b) = (calls.clone(), calls.clone());

    let source = Promise::resolved(&el, Value::Smi(2));
    let derived = source.then(
        Some(Handler::new(move |v: Value| {
            a.lock().unwrap().push(format!("ok {}", v));
            Ok(Value::Smi(4))
        })),
        Some(Handler::new(move |e: JsError| {
            b.lock().unwrap().push(format!("err {}", e));
            Ok(Value::Undefined)
        })),
    );

    el.run_all_microtasks().unwrap();
    assert_eq!(entries(&calls), vec!["ok 2"]);
    assert_eq!(derived.result(), Some(Value::Smi(4)));
}

#[test]
fn then_invokes_only_failure_handler_on_rejection() {
    let el = EventLoop::new();
    let calls = log();
    let (a, b) = (calls.clone(), calls.clone());

    let source = Promise::rejected(&el, JsError::error("Oops"));
    let derived = source.then(
        Some(Handler::new(move |_: Value| {
            a.lock().unwrap().push("ok".to_string());
            Ok(Value::Undefined)
        })),
        Some(Handler::new(move |e: JsError| {
            b.lock().unwrap().push(e.message);
            Ok(Value::from("recovered"))
        })),
    );

    el.run_all_microtasks().unwrap();
    assert_eq!(entries(&calls), vec!["Oops"]);
    assert_eq!(derived.result(), Some(Value::from("recovered")));
}

#[test]
fn rejection_passes_through_success_only_steps() {
    let el = EventLoop::new();
    let source = Promise::rejected(&el, JsError::error("Oops"));
    let derived = source
        .on_fulfilled(|v| Ok(v))
        .on_fulfilled(|_| Ok(Value::from("never")));

    el.run_all_microtasks().unwrap();
    assert_eq!(derived.error(), Some(JsError::error("Oops")));
}

#[test]
fn fulfilment_passes_through_catch() {
    let el = EventLoop::new();
    let derived = Promise::resolved(&el, Value::Smi(9)).catch(|_| Ok(Value::Null));
    el.run_all_microtasks().unwrap();
    assert_eq!(derived.result(), Some(Value::Smi(9)));
}

#[test]
fn handler_error_rejects_derived() {
    let el = EventLoop::new();
    let derived = Promise::resolved(&el, Value::Smi(404))
        .on_fulfilled(|status| Err::<Value, _>(JsError::error(status.to_string())));
    el.run_all_microtasks().unwrap();
    assert_eq!(derived.error(), Some(JsError::error("404")));
}

#[test]
fn handler_panic_rejects_derived_with_handler_error() {
    let el = EventLoop::new();
    let derived = Promise::resolved(&el, Value::Undefined).on_fulfilled(|_| -> Result<Value, JsError> {
        panic!("handler exploded")
    });
    el.run_all_microtasks().unwrap();
    let error = derived.error().expect("rejected");
    assert_eq!(error.kind, ErrorKind::HandlerError);
    assert_eq!(error.message, "handler exploded");
}

#[test]
fn handler_returning_promise_chains_through_it() {
    let el = EventLoop::new();
    let (inner, resolve_inner, _) = Promise::with_resolvers(&el);
    let returned = inner.clone();
    let derived = Promise::resolved(&el, Value::Undefined).on_fulfilled(move |_| Ok(returned));

    el.run_all_microtasks().unwrap();
    assert!(derived.is_pending());

    resolve_inner.resolve(Value::from("json body"));
    el.run_all_microtasks().unwrap();
    assert_eq!(derived.result(), Some(Value::from("json body")));
}

#[test]
fn catch_then_continues_chain() {
    let el = EventLoop::new();
    let calls = log();
    let c = calls.clone();
    let derived = Promise::rejected(&el, JsError::error("Promise failed."))
        .on_fulfilled(|v| Ok(v))
        .catch(|e| Ok(Value::from(e.to_string())))
        .on_fulfilled(move |v| {
            c.lock().unwrap().push(v.to_string());
            Ok(Value::Undefined)
        });

    el.run_all_microtasks().unwrap();
    assert_eq!(entries(&calls), vec!["Error: Promise failed."]);
    assert_eq!(derived.state(), PromiseState::Fulfilled);
}

#[test]
fn reactions_fire_in_registration_order() {
    let el = EventLoop::new();
    let calls = log();
    let (source, resolve, _) = Promise::with_resolvers(&el);

    for i in 0..3 {
        let c = calls.clone();
        source.on_fulfilled(move |_| {
            c.lock().unwrap().push(format!("reaction {}", i));
            Ok(Value::Undefined)
        });
    }
    assert!(source.has_pending_reactions());

    resolve.resolve(Value::Undefined);
    el.run_all_microtasks().unwrap();
    assert_eq!(
        entries(&calls),
        vec!["reaction 0", "reaction 1", "reaction 2"]
    );
}

#[test]
fn finally_runs_once_and_preserves_fulfilment() {
    let el = EventLoop::new();
    let calls = log();
    let c = calls.clone();
    let derived = Promise::resolved(&el, Value::from("done")).finally(move || {
        c.lock().unwrap().push("finally".to_string());
        Ok(Value::Smi(0))
    });

    el.run_all_microtasks().unwrap();
    assert_eq!(entries(&calls), vec!["finally"]);
    assert_eq!(derived.result(), Some(Value::from("done")));
}

#[test]
fn finally_runs_once_and_preserves_rejection() {
    let el = EventLoop::new();
    let calls = log();
    let c = calls.clone();
    let derived = Promise::rejected(&el, JsError::error("Promise failed.")).finally(move || {
        c.lock().unwrap().push("finally".to_string());
        Ok(Value::Undefined)
    });

    el.run_all_microtasks().unwrap();
    assert_eq!(entries(&calls), vec!["finally"]);
    assert_eq!(derived.error(), Some(JsError::error("Promise failed.")));
}

#[test]
fn finally_error_overrides_outcome() {
    let el = EventLoop::new();
    let derived = Promise::resolved(&el, Value::Smi(1))
        .finally(|| Err::<Value, _>(JsError::error("cleanup failed")));
    el.run_all_microtasks().unwrap();
    assert_eq!(derived.error(), Some(JsError::error("cleanup failed")));
}

#[test]
fn finally_rejecting_promise_overrides_outcome() {
    let el = EventLoop::new();
    let failing = Promise::rejected(&el, JsError::error("async cleanup failed"));
    let derived = Promise::resolved(&el, Value::Smi(1)).finally(move || Ok(failing));
    el.run_all_microtasks().unwrap();
    assert_eq!(derived.error(), Some(JsError::error("async cleanup failed")));
}

#[test]
fn finally_waits_for_returned_promise_then_forwards_original() {
    let el = EventLoop::new();
    let (gate, open_gate, _) = Promise::with_resolvers(&el);
    let returned = gate.clone();
    let derived = Promise::resolved(&el, Value::from("original")).finally(move || Ok(returned));

    el.run_all_microtasks().unwrap();
    assert!(derived.is_pending());

    open_gate.resolve(Value::from("ignored"));
    el.run_all_microtasks().unwrap();
    assert_eq!(derived.result(), Some(Value::from("original")));
}

#[test]
fn then_catch_finally_order() {
    let el = EventLoop::new();
    let calls = log();
    let (a, b, c) = (calls.clone(), calls.clone(), calls.clone());
    let timers = el.clone();

    Promise::new(&el, move |_, reject| {
        timers.set_timeout(1000, move || {
            reject.reject(JsError::error("Promise failed."));
            Ok(())
        });
        Ok(())
    })
    .on_fulfilled(move |v| {
        a.lock().unwrap().push(format!("value {}", v));
        Ok(Value::Undefined)
    })
    .catch(move |e| {
        b.lock().unwrap().push(e.to_string());
        Ok(Value::Undefined)
    })
    .finally(move || {
        c.lock().unwrap().push("done".to_string());
        Ok(Value::Undefined)
    });

    el.run_until_done().unwrap();
    assert_eq!(entries(&calls), vec!["Error: Promise failed.", "done"]);
    assert!(el.take_unhandled_rejections().is_empty());
}
