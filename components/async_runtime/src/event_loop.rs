//! Event loop implementation.
//!
//! This module provides the event loop that coordinates task, microtask
//! and timer execution following the browser event loop model.

use crate::config::{EventLoopConfig, RejectionPolicy};
use crate::promise::PromiseId;
use crate::rejection::{HandledOutcome, RejectionTracker, UnhandledRejection};
use crate::task_queue::{MicroTask, MicrotaskQueue, Task, TaskQueue, TimerId, TimerQueue};
use core_types::JsError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// The event loop.
///
/// Each iteration (turn) of the loop:
/// 1. Takes the oldest task from the task queue and executes it
/// 2. Drains all microtasks in the microtask queue
/// 3. Reports rejections that are still unhandled
/// 4. When both queues are empty, advances the virtual clock to the next
///    timer and queues its task
///
/// `EventLoop` is a cheap handle: clones share the same queues. Promises
/// keep a handle so they can schedule their reactions.
///
/// # Examples
///
/// ```
/// use async_runtime::{EventLoop, Task};
///
/// let event_loop = EventLoop::new();
///
/// event_loop.enqueue_task(Task::new(|| Ok(())));
/// event_loop.run_until_done().unwrap();
/// ```
#[derive(Clone, Default)]
pub struct EventLoop {
    shared: Arc<Shared>,
}

#[derive(Default)]
struct Shared {
    config: EventLoopConfig,
    task_queue: Mutex<TaskQueue>,
    microtask_queue: Mutex<MicrotaskQueue>,
    timers: Mutex<TimerQueue>,
    rejections: Mutex<RejectionTracker>,
    next_promise_id: AtomicU64,
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("tasks", &self.shared.task_queue.lock().len())
            .field("microtasks", &self.shared.microtask_queue.lock().len())
            .field("timers", &self.shared.timers.lock().len())
            .finish()
    }
}

impl EventLoop {
    /// Creates a new EventLoop with empty queues and default configuration.
    pub fn new() -> Self {
        Self::with_config(EventLoopConfig::default())
    }

    /// Creates a new EventLoop with the given configuration.
    pub fn with_config(config: EventLoopConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                ..Shared::default()
            }),
        }
    }

    /// Returns the configuration this loop was created with.
    pub fn config(&self) -> &EventLoopConfig {
        &self.shared.config
    }

    /// Runs the event loop until every task, microtask and timer is processed.
    ///
    /// # Returns
    ///
    /// `Ok(())` if all tasks completed successfully, or the first error a
    /// task or microtask returned.
    pub fn run_until_done(&self) -> Result<(), JsError> {
        loop {
            self.process_one_cycle()?;

            if self.is_task_queue_empty() && self.is_microtask_queue_empty() {
                match self.next_timer() {
                    Some(task) => self.enqueue_task(task),
                    None => break,
                }
            }
        }

        Ok(())
    }

    /// Adds a task to the task queue.
    ///
    /// The task will be executed in the next available iteration of the event loop.
    pub fn enqueue_task(&self, task: Task) {
        self.shared.task_queue.lock().enqueue(task);
    }

    /// Adds a microtask to the microtask queue.
    ///
    /// The microtask will be executed after the current task completes.
    pub fn enqueue_microtask(&self, microtask: MicroTask) {
        self.shared.microtask_queue.lock().enqueue(microtask);
    }

    /// Returns true if the task queue is empty.
    pub fn is_task_queue_empty(&self) -> bool {
        self.shared.task_queue.lock().is_empty()
    }

    /// Returns true if the microtask queue is empty.
    pub fn is_microtask_queue_empty(&self) -> bool {
        self.shared.microtask_queue.lock().is_empty()
    }

    /// Returns true if no timer is pending.
    pub fn has_pending_timers(&self) -> bool {
        !self.shared.timers.lock().is_empty()
    }

    /// Runs all microtasks in the queue until empty.
    ///
    /// This drains the microtask queue completely. New microtasks added during
    /// execution will also be processed before this method returns.
    pub fn run_all_microtasks(&self) -> Result<(), JsError> {
        while let Some(microtask) = self.next_microtask() {
            microtask.run()?;
        }
        Ok(())
    }

    /// Runs all tasks in the queue (without processing microtasks between them).
    ///
    /// This is primarily for testing purposes.
    pub fn run_all_tasks(&self) -> Result<(), JsError> {
        while let Some(task) = self.next_task() {
            task.run()?;
        }
        Ok(())
    }

    /// Processes one complete cycle: one task followed by all microtasks,
    /// then the unhandled rejection checkpoint.
    pub fn process_one_cycle(&self) -> Result<(), JsError> {
        if let Some(task) = self.next_task() {
            task.run()?;
        }

        self.run_all_microtasks()?;
        self.rejection_checkpoint();
        Ok(())
    }

    /// Schedules `callback` to run as a task once `delay_ms` of virtual
    /// time has elapsed.
    pub fn set_timeout<F>(&self, delay_ms: u64, callback: F) -> TimerId
    where
        F: FnOnce() -> Result<(), JsError> + Send + 'static,
    {
        self.shared.timers.lock().schedule(delay_ms, Task::new(callback))
    }

    /// Cancels a pending timer. Returns false if it already fired.
    pub fn clear_timeout(&self, id: TimerId) -> bool {
        self.shared.timers.lock().cancel(id)
    }

    /// Current virtual time in milliseconds.
    pub fn now(&self) -> u64 {
        self.shared.timers.lock().now()
    }

    /// Reports every rejection still unhandled at this point.
    ///
    /// Called automatically at the end of each turn.
    pub fn rejection_checkpoint(&self) {
        let fresh = self.shared.rejections.lock().checkpoint();
        if self.shared.config.unhandled_rejections == RejectionPolicy::Warn {
            for rejection in &fresh {
                log::warn!(
                    "Unhandled promise rejection (promise #{}): {}",
                    rejection.promise_id,
                    rejection.error
                );
            }
        }
    }

    /// Drains the rejections reported as unhandled so far.
    ///
    /// Drained promises are forgotten; a handler attached to one of them
    /// later is not logged as handled late.
    pub fn take_unhandled_rejections(&self) -> Vec<UnhandledRejection> {
        self.shared.rejections.lock().take_reported()
    }

    /// Runs a last rejection checkpoint, then drops every queued task,
    /// microtask and timer along with the rejection registry.
    ///
    /// Queued work may hold promises that hold this loop; clearing the
    /// queues releases them.
    pub fn shutdown(&self) {
        self.rejection_checkpoint();
        self.shared.task_queue.lock().clear();
        self.shared.microtask_queue.lock().clear();
        self.shared.timers.lock().clear();
        self.shared.rejections.lock().clear();
        log::debug!("event loop shut down");
    }

    pub(crate) fn next_promise_id(&self) -> PromiseId {
        self.shared.next_promise_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn track_rejection(&self, promise_id: PromiseId, error: JsError) {
        self.shared.rejections.lock().track(promise_id, error);
    }

    pub(crate) fn rejection_handled(&self, promise_id: PromiseId) {
        let outcome = self.shared.rejections.lock().handle(promise_id);
        if outcome == HandledOutcome::AfterReport {
            log::info!("Promise rejection handled late (promise #{})", promise_id);
        }
    }

    // Each helper releases its lock before the dequeued callback runs.
    fn next_task(&self) -> Option<Task> {
        self.shared.task_queue.lock().dequeue()
    }

    fn next_microtask(&self) -> Option<MicroTask> {
        self.shared.microtask_queue.lock().dequeue()
    }

    fn next_timer(&self) -> Option<Task> {
        self.shared.timers.lock().pop_next()
    }
}
