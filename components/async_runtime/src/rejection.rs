//! Unhandled rejection tracking.
//!
//! A promise that rejects while no reaction is attached is recorded here.
//! Attaching any reaction later removes the record. Records that survive
//! until the end of an event-loop turn are reported once.

use crate::promise::PromiseId;
use core_types::JsError;
use std::collections::HashSet;

/// A rejected promise nobody attached a failure path to before the
/// end of the turn in which it rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct UnhandledRejection {
    /// Id of the rejected promise
    pub promise_id: PromiseId,
    /// The rejection reason
    pub error: JsError,
}

/// Outcome of marking a promise as handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandledOutcome {
    /// The rejection was still waiting for the checkpoint
    BeforeReport,
    /// The rejection had already been reported as unhandled
    AfterReport,
    /// The promise was not tracked
    Untracked,
}

/// Registry of rejected promises without handlers.
#[derive(Debug, Default)]
pub struct RejectionTracker {
    pending: Vec<UnhandledRejection>,
    reported: Vec<UnhandledRejection>,
    reported_ids: HashSet<PromiseId>,
}

impl RejectionTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a rejection that has no handler yet.
    pub fn track(&mut self, promise_id: PromiseId, error: JsError) {
        self.pending.push(UnhandledRejection { promise_id, error });
    }

    /// Removes a promise once a handler has been attached.
    pub fn handle(&mut self, promise_id: PromiseId) -> HandledOutcome {
        if let Some(index) = self.pending.iter().position(|r| r.promise_id == promise_id) {
            self.pending.remove(index);
            HandledOutcome::BeforeReport
        } else if self.reported_ids.remove(&promise_id) {
            HandledOutcome::AfterReport
        } else {
            HandledOutcome::Untracked
        }
    }

    /// Moves every pending record to the reported list and returns the
    /// newly reported ones.
    pub fn checkpoint(&mut self) -> Vec<UnhandledRejection> {
        let fresh = std::mem::take(&mut self.pending);
        for rejection in &fresh {
            self.reported_ids.insert(rejection.promise_id);
        }
        self.reported.extend(fresh.iter().cloned());
        fresh
    }

    /// Drains the reported rejections.
    ///
    /// Drained records are forgotten entirely: a handler attached to one of
    /// them afterwards yields [`HandledOutcome::Untracked`] instead of
    /// [`HandledOutcome::AfterReport`].
    pub fn take_reported(&mut self) -> Vec<UnhandledRejection> {
        let drained = std::mem::take(&mut self.reported);
        for rejection in &drained {
            self.reported_ids.remove(&rejection.promise_id);
        }
        drained
    }

    /// Number of rejections waiting for the next checkpoint.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Forgets everything.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.reported.clear();
        self.reported_ids.clear();
    }
}
