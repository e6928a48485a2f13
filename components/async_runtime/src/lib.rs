//! Async runtime: deferred values, continuations and async functions.
//!
//! This crate provides:
//! - Promise implementation following the Promise/A+ model
//! - Event loop with task, microtask and timer queues
//! - Async functions that suspend at awaited promises
//! - Unhandled rejection tracking
//!
//! # Overview
//!
//! - [`EventLoop`] - Main event loop coordinating task execution
//! - [`Promise`] - Deferred value settled exactly once
//! - [`EventLoop::spawn_async`] - Runs a future as an async function
//!
//! # Examples
//!
//! ## Promise Usage
//!
//! ```
//! use async_runtime::{EventLoop, Promise, PromiseState};
//! use core_types::Value;
//! use std::sync::{Arc, Mutex};
//!
//! let event_loop = EventLoop::new();
//! let timer_loop = event_loop.clone();
//! let promise = Promise::new(&event_loop, move |resolve, _reject| {
//!     timer_loop.set_timeout(1000, move || {
//!         resolve.resolve(Value::from("done"));
//!         Ok(())
//!     });
//!     Ok(())
//! });
//!
//! let seen = Arc::new(Mutex::new(None));
//! let sink = seen.clone();
//! promise.on_fulfilled(move |value| {
//!     *sink.lock().unwrap() = Some(value);
//!     Ok(Value::Undefined)
//! });
//!
//! assert_eq!(promise.state(), PromiseState::Pending);
//! event_loop.run_until_done().unwrap();
//! assert_eq!(*seen.lock().unwrap(), Some(Value::from("done")));
//! ```
//!
//! ## Async Function Usage
//!
//! ```
//! use async_runtime::{EventLoop, Promise};
//! use core_types::{JsError, Value};
//!
//! let event_loop = EventLoop::new();
//! let failing = Promise::rejected(&event_loop, JsError::error("boom"));
//!
//! let recovered = event_loop.spawn_async(async move {
//!     let message = match failing.await {
//!         Ok(value) => value.to_string(),
//!         Err(error) => error.message,
//!     };
//!     Ok(Value::from(message))
//! });
//!
//! event_loop.run_until_done().unwrap();
//! assert_eq!(recovered.result(), Some(Value::from("boom")));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod async_function;
pub mod config;
pub mod event_loop;
pub mod promise;
pub mod rejection;
pub mod task_queue;

// Re-export main types at crate root
pub use async_function::PromiseFuture;
pub use config::{EventLoopConfig, RejectionPolicy};
pub use event_loop::EventLoop;
pub use promise::{
    Handler, HandlerResult, Promise, PromiseId, PromiseReaction, PromiseState, Rejecter,
    Resolution, Resolver, Settlement,
};
pub use rejection::{RejectionTracker, UnhandledRejection};
pub use task_queue::{MicroTask, MicrotaskQueue, Task, TaskQueue, TimerId, TimerQueue};
