//! Promise implementation following the Promise/A+ model.
//!
//! A [`Promise`] settles exactly once, to [`PromiseState::Fulfilled`] or
//! [`PromiseState::Rejected`]. Reactions attached with [`Promise::then`]
//! always run as microtasks on the promise's [`EventLoop`], never inline,
//! and in the order they were attached.

use crate::event_loop::EventLoop;
use crate::task_queue::MicroTask;
use core_types::{JsError, Value};
use parking_lot::Mutex;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Identifier of a promise, unique per event loop.
pub type PromiseId = u64;

/// The state of a Promise.
///
/// Once settled (Fulfilled or Rejected), a Promise cannot change state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromiseState {
    /// The initial state; the promise is neither fulfilled nor rejected.
    Pending,
    /// The promise has been fulfilled with a value.
    Fulfilled,
    /// The promise has been rejected with an error.
    Rejected,
}

/// The outcome of a settled promise.
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    /// Success payload
    Fulfilled(Value),
    /// Failure payload
    Rejected(JsError),
}

impl Settlement {
    /// Converts the settlement into a `Result`.
    pub fn into_result(self) -> Result<Value, JsError> {
        match self {
            Settlement::Fulfilled(value) => Ok(value),
            Settlement::Rejected(error) => Err(error),
        }
    }
}

/// What a promise is resolved with: a plain value, or another promise
/// whose outcome it should adopt.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// Fulfil with this value
    Value(Value),
    /// Follow this promise and forward its outcome
    Promise(Promise),
}

impl From<Value> for Resolution {
    fn from(value: Value) -> Self {
        Resolution::Value(value)
    }
}

impl From<Promise> for Resolution {
    fn from(promise: Promise) -> Self {
        Resolution::Promise(promise)
    }
}

/// Result returned by reaction handlers.
pub type HandlerResult = Result<Resolution, JsError>;

/// A one-shot reaction handler taking the settlement payload `A`.
///
/// Returning `Err` rejects the derived promise. A panic inside the handler
/// is caught and rejects the derived promise with
/// [`ErrorKind::HandlerError`](core_types::ErrorKind::HandlerError).
pub struct Handler<A> {
    callback: Box<dyn FnOnce(A) -> HandlerResult + Send>,
}

impl<A: 'static> Handler<A> {
    /// Creates a new Handler from a closure.
    pub fn new<F, R>(f: F) -> Self
    where
        F: FnOnce(A) -> Result<R, JsError> + Send + 'static,
        R: Into<Resolution> + 'static,
    {
        Self {
            callback: Box::new(move |arg: A| f(arg).map(Into::<Resolution>::into)),
        }
    }

    /// Calls the handler, converting a panic into a rejection.
    pub fn call(self, arg: A) -> HandlerResult {
        let callback = self.callback;
        panic::catch_unwind(AssertUnwindSafe(move || callback(arg)))
            .unwrap_or_else(|payload| Err(JsError::handler_panic(panic_message(&*payload))))
    }
}

impl<A> std::fmt::Debug for Handler<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Handler {{ ... }}")
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}

/// A reaction to be triggered when a Promise settles.
///
/// This represents the handlers registered via `.then()`. A reaction with
/// no handlers forwards the settlement unchanged.
#[derive(Debug)]
pub struct PromiseReaction {
    /// The promise that will be resolved/rejected based on this reaction
    promise: Promise,
    /// Handler for fulfilled state
    on_fulfilled: Option<Handler<Value>>,
    /// Handler for rejected state
    on_rejected: Option<Handler<JsError>>,
}

impl PromiseReaction {
    fn forward(target: Promise) -> Self {
        Self {
            promise: target,
            on_fulfilled: None,
            on_rejected: None,
        }
    }

    fn run(self, settlement: Settlement) {
        let outcome = match settlement {
            Settlement::Fulfilled(value) => match self.on_fulfilled {
                Some(handler) => handler.call(value),
                None => Ok(Resolution::Value(value)),
            },
            Settlement::Rejected(error) => match self.on_rejected {
                Some(handler) => handler.call(error),
                None => Err(error),
            },
        };

        match outcome {
            Ok(resolution) => self.promise.resolve_with(resolution),
            Err(error) => self.promise.reject_with(error),
        }
    }
}

#[derive(Debug)]
struct PromiseInner {
    id: PromiseId,
    state: PromiseState,
    result: Option<Value>,
    error: Option<JsError>,
    reactions: Vec<PromiseReaction>,
    handled: bool,
    // The promise this one is locked onto while a resolution is in progress.
    following: Option<Weak<Mutex<PromiseInner>>>,
}

impl PromiseInner {
    fn settlement(&self) -> Option<Settlement> {
        match self.state {
            PromiseState::Pending => None,
            PromiseState::Fulfilled => Some(Settlement::Fulfilled(
                self.result.clone().unwrap_or(Value::Undefined),
            )),
            PromiseState::Rejected => self.error.clone().map(Settlement::Rejected),
        }
    }
}

/// A deferred value.
///
/// `Promise` is a shared handle: clones refer to the same state, which
/// lives as long as its longest holder. State and reaction list are
/// guarded by one mutex per promise; handlers never run while it is held.
///
/// # Examples
///
/// ```
/// use async_runtime::{EventLoop, Promise, PromiseState};
/// use core_types::Value;
///
/// let event_loop = EventLoop::new();
/// let promise = Promise::new(&event_loop, |resolve, _reject| {
///     resolve.resolve(Value::Smi(42));
///     Ok(())
/// });
///
/// assert_eq!(promise.state(), PromiseState::Fulfilled);
/// assert_eq!(promise.result(), Some(Value::Smi(42)));
/// ```
#[derive(Clone)]
pub struct Promise {
    inner: Arc<Mutex<PromiseInner>>,
    event_loop: EventLoop,
}

impl std::fmt::Debug for Promise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Promise")
            .field("id", &inner.id)
            .field("state", &inner.state)
            .field("result", &inner.result)
            .field("error", &inner.error)
            .finish()
    }
}

/// Shared "already resolved" flag behind a resolver/rejecter pair.
struct Capability {
    promise: Promise,
    already_resolved: AtomicBool,
}

impl Capability {
    fn claim(&self) -> bool {
        let claimed = !self.already_resolved.swap(true, Ordering::AcqRel);
        if !claimed {
            log::trace!(
                "promise #{} already resolved, ignoring settlement",
                self.promise.id()
            );
        }
        claimed
    }
}

/// The success capability handed to a promise's starter routine.
#[derive(Clone)]
pub struct Resolver {
    capability: Arc<Capability>,
}

impl Resolver {
    /// Resolves the promise.
    ///
    /// Resolving with another promise adopts its eventual outcome. Only
    /// the first call to this resolver or its paired [`Rejecter`] has an
    /// effect.
    pub fn resolve(&self, value: impl Into<Resolution>) {
        if self.capability.claim() {
            self.capability.promise.resolve_with(value.into());
        }
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Resolver(#{})", self.capability.promise.id())
    }
}

/// The failure capability handed to a promise's starter routine.
#[derive(Clone)]
pub struct Rejecter {
    capability: Arc<Capability>,
}

impl Rejecter {
    /// Rejects the promise unless it was already resolved.
    ///
    /// A rejection without a reason is expressed as
    /// `reject(JsError::error(""))`: kind [`ErrorKind::Error`] with an
    /// empty message.
    ///
    /// [`ErrorKind::Error`]: core_types::ErrorKind::Error
    pub fn reject(&self, error: JsError) {
        if self.capability.claim() {
            self.capability.promise.reject_with(error);
        }
    }
}

impl std::fmt::Debug for Rejecter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Rejecter(#{})", self.capability.promise.id())
    }
}

impl Promise {
    /// Creates a promise and runs `starter` synchronously with its
    /// resolve and reject capabilities.
    ///
    /// An `Err` returned by `starter`, or a panic inside it, rejects the
    /// promise unless `starter` already resolved it.
    pub fn new<F>(event_loop: &EventLoop, starter: F) -> Self
    where
        F: FnOnce(Resolver, Rejecter) -> Result<(), JsError>,
    {
        let (promise, resolver, rejecter) = Self::with_resolvers(event_loop);
        let fallback = rejecter.clone();

        match panic::catch_unwind(AssertUnwindSafe(move || starter(resolver, rejecter))) {
            Ok(Ok(())) => {}
            Ok(Err(error)) => fallback.reject(error),
            Err(payload) => fallback.reject(JsError::handler_panic(panic_message(&*payload))),
        }

        promise
    }

    /// Creates a pending promise along with its capabilities.
    pub fn with_resolvers(event_loop: &EventLoop) -> (Self, Resolver, Rejecter) {
        let promise = Self::pending(event_loop);
        let capability = Arc::new(Capability {
            promise: promise.clone(),
            already_resolved: AtomicBool::new(false),
        });
        (
            promise,
            Resolver {
                capability: Arc::clone(&capability),
            },
            Rejecter { capability },
        )
    }

    /// Creates a promise resolved with `value`.
    ///
    /// Resolving with a promise returns a new promise following it.
    pub fn resolved(event_loop: &EventLoop, value: impl Into<Resolution>) -> Self {
        let promise = Self::pending(event_loop);
        promise.resolve_with(value.into());
        promise
    }

    /// Creates a promise rejected with `error`.
    pub fn rejected(event_loop: &EventLoop, error: JsError) -> Self {
        let promise = Self::pending(event_loop);
        promise.reject_with(error);
        promise
    }

    fn pending(event_loop: &EventLoop) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PromiseInner {
                id: event_loop.next_promise_id(),
                state: PromiseState::Pending,
                result: None,
                error: None,
                reactions: Vec::new(),
                handled: false,
                following: None,
            })),
            event_loop: event_loop.clone(),
        }
    }

    /// Unique id of this promise within its event loop.
    pub fn id(&self) -> PromiseId {
        self.inner.lock().id
    }

    /// The current state.
    pub fn state(&self) -> PromiseState {
        self.inner.lock().state
    }

    /// Returns true while the promise has not settled.
    pub fn is_pending(&self) -> bool {
        self.state() == PromiseState::Pending
    }

    /// The fulfilment value, if fulfilled.
    pub fn result(&self) -> Option<Value> {
        self.inner.lock().result.clone()
    }

    /// The rejection reason, if rejected.
    pub fn error(&self) -> Option<JsError> {
        self.inner.lock().error.clone()
    }

    /// The settlement, if settled.
    pub fn settlement(&self) -> Option<Settlement> {
        self.inner.lock().settlement()
    }

    /// Checks if there are reactions waiting for settlement.
    pub fn has_pending_reactions(&self) -> bool {
        !self.inner.lock().reactions.is_empty()
    }

    /// Returns true if both handles refer to the same promise.
    pub fn ptr_eq(&self, other: &Promise) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Adds handlers for fulfillment and/or rejection.
    ///
    /// Returns a new Promise settled by whichever handler runs. A missing
    /// handler passes the settlement through to the returned promise.
    ///
    /// # Arguments
    ///
    /// * `on_fulfilled` - Optional handler called when Promise fulfills
    /// * `on_rejected` - Optional handler called when Promise rejects
    pub fn then(
        &self,
        on_fulfilled: Option<Handler<Value>>,
        on_rejected: Option<Handler<JsError>>,
    ) -> Promise {
        let derived = Promise::pending(&self.event_loop);
        self.add_reaction(PromiseReaction {
            promise: derived.clone(),
            on_fulfilled,
            on_rejected,
        });
        derived
    }

    /// Attaches a fulfilment handler only; rejections pass through.
    pub fn on_fulfilled<F, R>(&self, f: F) -> Promise
    where
        F: FnOnce(Value) -> Result<R, JsError> + Send + 'static,
        R: Into<Resolution> + 'static,
    {
        self.then(Some(Handler::new(f)), None)
    }

    /// Attaches a rejection handler only; fulfilments pass through.
    pub fn catch<F, R>(&self, f: F) -> Promise
    where
        F: FnOnce(JsError) -> Result<R, JsError> + Send + 'static,
        R: Into<Resolution> + 'static,
    {
        self.then(None, Some(Handler::new(f)))
    }

    /// Runs `on_settled` once whatever the outcome, then forwards the
    /// original outcome.
    ///
    /// If `on_settled` returns `Err`, or a promise that rejects, that
    /// rejection replaces the original outcome. A returned promise is
    /// waited on before forwarding.
    pub fn finally<F, R>(&self, on_settled: F) -> Promise
    where
        F: FnOnce() -> Result<R, JsError> + Send + 'static,
        R: Into<Resolution> + 'static,
    {
        // Only one of the two handlers ever runs.
        let slot = Arc::new(Mutex::new(Some(on_settled)));
        let for_rejection = Arc::clone(&slot);

        self.then(
            Some(Handler::new(move |value: Value| {
                run_finally(&slot, Settlement::Fulfilled(value))
            })),
            Some(Handler::new(move |error: JsError| {
                run_finally(&for_rejection, Settlement::Rejected(error))
            })),
        )
    }

    fn add_reaction(&self, reaction: PromiseReaction) {
        let (settlement, newly_handled_rejection) = {
            let mut inner = self.inner.lock();
            let was_handled = std::mem::replace(&mut inner.handled, true);
            match inner.settlement() {
                None => {
                    inner.reactions.push(reaction);
                    return;
                }
                Some(settlement) => {
                    let rejected = matches!(settlement, Settlement::Rejected(_));
                    (settlement, rejected && !was_handled)
                }
            }
        };

        if newly_handled_rejection {
            self.event_loop.rejection_handled(self.id());
        }
        self.schedule(reaction, settlement);
    }

    fn schedule(&self, reaction: PromiseReaction, settlement: Settlement) {
        self.event_loop.enqueue_microtask(MicroTask::new(move || {
            reaction.run(settlement);
            Ok(())
        }));
    }

    /// The resolution procedure, without the already-resolved check.
    fn resolve_with(&self, resolution: Resolution) {
        match resolution {
            Resolution::Value(value) => self.fulfill(value),
            Resolution::Promise(inner) => {
                if self.ptr_eq(&inner) || follows(&inner.inner, &self.inner) {
                    self.reject_with(JsError::cyclic_resolution());
                    return;
                }
                {
                    let mut state = self.inner.lock();
                    if state.state != PromiseState::Pending {
                        return;
                    }
                    state.following = Some(Arc::downgrade(&inner.inner));
                }
                inner.add_reaction(PromiseReaction::forward(self.clone()));
            }
        }
    }

    fn fulfill(&self, value: Value) {
        let (id, reactions) = {
            let mut inner = self.inner.lock();
            if inner.state != PromiseState::Pending {
                return;
            }
            inner.state = PromiseState::Fulfilled;
            inner.result = Some(value.clone());
            inner.following = None;
            (inner.id, std::mem::take(&mut inner.reactions))
        };

        log::debug!("promise #{} fulfilled", id);
        for reaction in reactions {
            self.schedule(reaction, Settlement::Fulfilled(value.clone()));
        }
    }

    fn reject_with(&self, error: JsError) {
        let (id, reactions, handled) = {
            let mut inner = self.inner.lock();
            if inner.state != PromiseState::Pending {
                return;
            }
            inner.state = PromiseState::Rejected;
            inner.error = Some(error.clone());
            inner.following = None;
            (inner.id, std::mem::take(&mut inner.reactions), inner.handled)
        };

        log::debug!("promise #{} rejected: {}", id, error);
        if !handled {
            self.event_loop.track_rejection(id, error.clone());
        }
        for reaction in reactions {
            self.schedule(reaction, Settlement::Rejected(error.clone()));
        }
    }
}

/// Returns true if `start` is locked onto `target`, directly or through
/// a chain of promises that are themselves locked on.
fn follows(start: &Arc<Mutex<PromiseInner>>, target: &Arc<Mutex<PromiseInner>>) -> bool {
    let mut current = start.lock().following.as_ref().and_then(Weak::upgrade);
    while let Some(next) = current {
        if Arc::ptr_eq(&next, target) {
            return true;
        }
        current = next.lock().following.as_ref().and_then(Weak::upgrade);
    }
    false
}

fn run_finally<F, R>(slot: &Mutex<Option<F>>, original: Settlement) -> HandlerResult
where
    F: FnOnce() -> Result<R, JsError>,
    R: Into<Resolution> + 'static,
{
    let callback = slot.lock().take();
    let outcome = match callback {
        Some(callback) => callback()?.into(),
        None => Resolution::Value(Value::Undefined),
    };

    match outcome {
        Resolution::Value(_) => original.into_result().map(Resolution::Value),
        Resolution::Promise(pending) => {
            let forwarded = pending.then(
                Some(Handler::new(move |_: Value| original.into_result())),
                None,
            );
            Ok(Resolution::Promise(forwarded))
        }
    }
}
