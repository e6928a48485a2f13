//! Geolocation as a promise
//!
//! Position providers report through a success/error callback pair.
//! [`current_position`] hands a promise's resolver and rejecter to the
//! provider as that pair, so the callback API becomes a single promise.

use async_runtime::{EventLoop, Promise};
use core_types::{JsError, Value};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// A geographic position report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Accuracy in meters
    pub accuracy: f64,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
}

impl Position {
    /// Returns the position held by a settled promise value.
    pub fn from_value(value: &Value) -> Option<Arc<Position>> {
        value.downcast::<Position>()
    }
}

/// Why a position could not be obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionErrorCode {
    /// The user or platform refused access
    PermissionDenied = 1,
    /// No position could be determined
    PositionUnavailable = 2,
    /// The provider gave up waiting
    Timeout = 3,
}

impl PositionErrorCode {
    /// The numeric code
    pub fn code(self) -> u16 {
        self as u16
    }
}

/// Error reported through a provider's error callback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (code {})", .code.code())]
pub struct PositionError {
    /// Error code
    pub code: PositionErrorCode,
    /// Human-readable description
    pub message: String,
}

impl PositionError {
    /// Create a position error
    pub fn new(code: PositionErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<PositionError> for JsError {
    fn from(error: PositionError) -> Self {
        JsError::error(error.to_string())
    }
}

/// Success callback handed to a [`PositionSource`].
pub type SuccessCallback = Box<dyn FnOnce(Position) + Send>;

/// Error callback handed to a [`PositionSource`].
pub type ErrorCallback = Box<dyn FnOnce(PositionError) + Send>;

/// A provider of position reports.
///
/// Calls exactly one of the callbacks, now or later. Calling both, or one
/// twice, is harmless for [`current_position`]: only the first report
/// counts.
pub trait PositionSource {
    /// Requests the current position.
    fn get_current_position(&self, on_success: SuccessCallback, on_error: ErrorCallback);
}

/// Requests the current position from `source` as a promise.
///
/// Fulfils with the [`Position`] as a [`Value::Native`] or rejects with the
/// provider's error converted to a plain `Error`.
pub fn current_position(event_loop: &EventLoop, source: &dyn PositionSource) -> Promise {
    Promise::new(event_loop, |resolve, reject| {
        source.get_current_position(
            Box::new(move |position| resolve.resolve(Value::native(position))),
            Box::new(move |error| {
                log::debug!("position request failed: {}", error);
                reject.reject(error.into());
            }),
        );
        Ok(())
    })
}
