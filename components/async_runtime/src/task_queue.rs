//! Task, microtask and timer queue management.
//!
//! This module provides the queues used by the event loop. Tasks are
//! executed one at a time, with all microtasks draining after each task.
//! Timers hold tasks until the virtual clock reaches their due time.

use core_types::JsError;
use std::collections::{BTreeMap, VecDeque};

/// A task to be executed by the event loop.
///
/// Tasks represent work to be done in the next iteration of the event loop.
/// Examples include timer callbacks and transport completions.
pub struct Task {
    callback: Box<dyn FnOnce() -> Result<(), JsError> + Send>,
}

impl Task {
    /// Creates a new Task from a closure.
    ///
    /// # Arguments
    ///
    /// * `f` - The function to execute when the task runs
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> Result<(), JsError> + Send + 'static,
    {
        Self {
            callback: Box::new(f),
        }
    }

    /// Executes the task.
    pub fn run(self) -> Result<(), JsError> {
        (self.callback)()
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Task {{ ... }}")
    }
}

/// A microtask to be executed by the event loop.
///
/// Microtasks are executed after each task. Promise reactions and
/// resumptions of suspended async computations are microtasks.
pub struct MicroTask {
    callback: Box<dyn FnOnce() -> Result<(), JsError> + Send>,
}

impl MicroTask {
    /// Creates a new MicroTask from a closure.
    ///
    /// # Arguments
    ///
    /// * `f` - The function to execute when the microtask runs
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> Result<(), JsError> + Send + 'static,
    {
        Self {
            callback: Box::new(f),
        }
    }

    /// Executes the microtask.
    pub fn run(self) -> Result<(), JsError> {
        (self.callback)()
    }
}

impl std::fmt::Debug for MicroTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MicroTask {{ ... }}")
    }
}

/// A queue for tasks.
///
/// Tasks are processed in FIFO order, one at a time.
#[derive(Debug, Default)]
pub struct TaskQueue {
    queue: VecDeque<Task>,
}

impl TaskQueue {
    /// Creates a new empty TaskQueue.
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Adds a task to the end of the queue.
    pub fn enqueue(&mut self, task: Task) {
        self.queue.push_back(task);
    }

    /// Removes and returns the next task from the queue.
    pub fn dequeue(&mut self) -> Option<Task> {
        self.queue.pop_front()
    }

    /// Returns true if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns the number of tasks in the queue.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Drops every queued task.
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

/// A queue for microtasks.
///
/// Microtasks are drained completely after each task.
#[derive(Debug, Default)]
pub struct MicrotaskQueue {
    queue: VecDeque<MicroTask>,
}

impl MicrotaskQueue {
    /// Creates a new empty MicrotaskQueue.
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Adds a microtask to the end of the queue.
    pub fn enqueue(&mut self, microtask: MicroTask) {
        self.queue.push_back(microtask);
    }

    /// Removes and returns the next microtask from the queue.
    pub fn dequeue(&mut self) -> Option<MicroTask> {
        self.queue.pop_front()
    }

    /// Returns true if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns the number of microtasks in the queue.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Drops every queued microtask.
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

/// Identifier returned by `set_timeout`, used to cancel a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Timers ordered by due time on a virtual millisecond clock.
///
/// Timers with the same due time fire in the order they were scheduled.
#[derive(Debug, Default)]
pub struct TimerQueue {
    now: u64,
    next_id: u64,
    timers: BTreeMap<(u64, TimerId), Task>,
}

impl TimerQueue {
    /// Creates an empty timer queue with the clock at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time in milliseconds.
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Schedules `task` to become runnable `delay_ms` after now.
    pub fn schedule(&mut self, delay_ms: u64, task: Task) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let due = self.now.saturating_add(delay_ms);
        self.timers.insert((due, id), task);
        id
    }

    /// Cancels a timer. Returns false if it already fired or never existed.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let key = self.timers.keys().find(|(_, timer)| *timer == id).copied();
        match key {
            Some(key) => self.timers.remove(&key).is_some(),
            None => false,
        }
    }

    /// Advances the clock to the earliest timer and returns its task.
    pub fn pop_next(&mut self) -> Option<Task> {
        let key = *self.timers.keys().next()?;
        let task = self.timers.remove(&key)?;
        self.now = self.now.max(key.0);
        Some(task)
    }

    /// Returns true if no timer is pending.
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Returns the number of pending timers.
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// Drops every pending timer. The clock is left where it is.
    pub fn clear(&mut self) {
        self.timers.clear();
    }
}
