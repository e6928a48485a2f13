//! Async functions on top of promises.
//!
//! [`EventLoop::spawn_async`] runs a future as an async function: the body
//! runs synchronously up to its first await, and the call returns the
//! function's own promise straight away. Awaiting a [`Promise`] attaches a
//! reaction to it and suspends; the reaction wakes the function, which is
//! then resumed from a microtask with the settled result.

use crate::event_loop::EventLoop;
use crate::promise::{panic_message, Handler, Promise, Rejecter, Resolution, Resolver};
use crate::task_queue::MicroTask;
use core_types::{JsError, Value};
use futures::future::{BoxFuture, FutureExt};
use futures::task::{waker_ref, ArcWake};
use parking_lot::Mutex;
use std::future::{Future, IntoFuture};
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// The suspension point created by awaiting a [`Promise`].
///
/// Resolves to `Ok(value)` when the promise fulfils and `Err(error)` when
/// it rejects, so the rejection can be handled right at the await with
/// `match` or propagated with `?`. The first poll always suspends, even
/// if the promise has already settled.
#[derive(Debug)]
pub struct PromiseFuture {
    promise: Promise,
    registered: bool,
}

impl Future for PromiseFuture {
    type Output = Result<Value, JsError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if !self.registered {
            self.registered = true;
            let on_fulfilled = cx.waker().clone();
            let on_rejected = cx.waker().clone();
            self.promise.then(
                Some(Handler::new(move |_: Value| {
                    on_fulfilled.wake();
                    Ok(Value::Undefined)
                })),
                Some(Handler::new(move |_: JsError| {
                    on_rejected.wake();
                    Ok(Value::Undefined)
                })),
            );
            return Poll::Pending;
        }

        match self.promise.settlement() {
            Some(settlement) => Poll::Ready(settlement.into_result()),
            None => Poll::Pending,
        }
    }
}

impl IntoFuture for Promise {
    type Output = Result<Value, JsError>;
    type IntoFuture = PromiseFuture;

    fn into_future(self) -> Self::IntoFuture {
        PromiseFuture {
            promise: self,
            registered: false,
        }
    }
}

type Body = BoxFuture<'static, Result<Resolution, JsError>>;

/// A running async function: its suspended body and the capabilities of
/// the promise it settles.
struct AsyncFunction {
    body: Mutex<Option<Body>>,
    resolver: Resolver,
    rejecter: Rejecter,
    event_loop: EventLoop,
}

impl ArcWake for AsyncFunction {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        let function = Arc::clone(arc_self);
        arc_self
            .event_loop
            .enqueue_microtask(MicroTask::new(move || {
                function.step();
                Ok(())
            }));
    }
}

impl AsyncFunction {
    /// Polls the body once, settling the function's promise if it finished.
    fn step(self: &Arc<Self>) {
        let mut slot = self.body.lock();
        let Some(mut body) = slot.take() else {
            return;
        };

        let waker = waker_ref(self);
        let mut cx = Context::from_waker(&waker);
        let polled = panic::catch_unwind(AssertUnwindSafe(|| body.as_mut().poll(&mut cx)));

        let finished = match polled {
            Ok(Poll::Pending) => {
                *slot = Some(body);
                return;
            }
            Ok(Poll::Ready(result)) => result,
            Err(payload) => Err(JsError::handler_panic(panic_message(&*payload))),
        };
        drop(slot);

        match finished {
            Ok(resolution) => self.resolver.resolve(resolution),
            Err(error) => {
                log::debug!("async function rejected: {}", error);
                self.rejecter.reject(error);
            }
        }
    }
}

impl EventLoop {
    /// Runs `body` as an async function and returns its promise.
    ///
    /// The body runs synchronously until it first awaits. An `Ok` return
    /// resolves the promise (returning a promise chains through it); an
    /// `Err`, including one propagated from an await with `?`, rejects it.
    /// A panic in the body rejects it with a `HandlerError`.
    ///
    /// There is no cancellation: a body awaiting a promise that never
    /// settles stays suspended.
    ///
    /// # Examples
    ///
    /// ```
    /// use async_runtime::{EventLoop, Promise};
    /// use core_types::Value;
    ///
    /// let event_loop = EventLoop::new();
    /// let (pending, resolve, _) = Promise::with_resolvers(&event_loop);
    ///
    /// let doubled = event_loop.spawn_async(async move {
    ///     let value = pending.await?;
    ///     Ok(Value::Smi(value.as_number().unwrap_or(0.0) as i32 * 2))
    /// });
    ///
    /// resolve.resolve(Value::Smi(21));
    /// event_loop.run_until_done().unwrap();
    /// assert_eq!(doubled.result(), Some(Value::Smi(42)));
    /// ```
    pub fn spawn_async<F, R>(&self, body: F) -> Promise
    where
        F: Future<Output = Result<R, JsError>> + Send + 'static,
        R: Into<Resolution> + 'static,
    {
        let (promise, resolver, rejecter) = Promise::with_resolvers(self);
        let function = Arc::new(AsyncFunction {
            body: Mutex::new(Some(async move { body.await.map(Into::<Resolution>::into) }.boxed())),
            resolver,
            rejecter,
            event_loop: self.clone(),
        });

        function.step();
        promise
    }
}
