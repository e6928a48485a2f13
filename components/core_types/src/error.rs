//! Error values carried by rejected promises.
//!
//! Every failure that can settle a promise is a [`JsError`]: user-raised
//! errors, handler panics, cyclic resolution, transport failures and
//! HTTP status errors constructed by callers.

use std::fmt;
use thiserror::Error;

/// The kind of error carried by a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Plain user-raised error, the `Error("...")` of a script
    Error,
    /// A promise was resolved with itself, directly or through a chain
    CyclicResolution,
    /// A handler or starter routine panicked
    HandlerError,
    /// The network exchange did not complete
    TransportFailure,
    /// A response was obtained but its status was not 2xx
    HttpStatusError,
    /// A body could not be decoded
    SyntaxError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Error => "Error",
            ErrorKind::CyclicResolution => "CyclicResolutionError",
            ErrorKind::HandlerError => "HandlerError",
            ErrorKind::TransportFailure => "TransportFailure",
            ErrorKind::HttpStatusError => "HttpStatusError",
            ErrorKind::SyntaxError => "SyntaxError",
        };
        f.write_str(name)
    }
}

/// An error with a kind, a human-readable message and, for request
/// failures, the HTTP status code.
///
/// # Examples
///
/// ```
/// use core_types::{ErrorKind, JsError};
///
/// let error = JsError::error("Oops");
/// assert_eq!(error.kind, ErrorKind::Error);
/// assert_eq!(error.to_string(), "Error: Oops");
///
/// let status = JsError::http_status(404);
/// assert_eq!(status.status, Some(404));
/// assert_eq!(status.message, "404");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct JsError {
    /// The type of error
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
    /// HTTP status code, present for [`ErrorKind::HttpStatusError`]
    pub status: Option<u16>,
}

impl JsError {
    /// Creates an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    /// Creates a plain user error.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Error, message)
    }

    /// The error used when a promise would resolve to itself.
    pub fn cyclic_resolution() -> Self {
        Self::new(
            ErrorKind::CyclicResolution,
            "Chaining cycle detected for promise",
        )
    }

    /// Wraps a panic raised inside a handler or starter routine.
    pub fn handler_panic(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::HandlerError, message)
    }

    /// Creates a transport failure (no response was obtained).
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TransportFailure, message)
    }

    /// Creates an HTTP status error for a response that was obtained
    /// but did not carry a 2xx status.
    pub fn http_status(status: u16) -> Self {
        Self {
            kind: ErrorKind::HttpStatusError,
            message: status.to_string(),
            status: Some(status),
        }
    }

    /// Creates a decoding error.
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SyntaxError, message)
    }
}

impl From<serde_json::Error> for JsError {
    fn from(err: serde_json::Error) -> Self {
        Self::syntax(err.to_string())
    }
}
