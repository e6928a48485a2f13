//! Core value and error types shared by the runtime components.
//!
//! # Overview
//!
//! - [`Value`] - Payload a promise fulfils with
//! - [`JsError`] - Payload a promise rejects with
//! - [`ErrorKind`] - Classification of rejections
//!
//! # Examples
//!
//! ```
//! use core_types::{ErrorKind, JsError, Value};
//!
//! let num = Value::Smi(42);
//! assert!(num.is_truthy());
//! assert_eq!(num.type_of(), "number");
//!
//! let error = JsError::error("boom");
//! assert_eq!(error.kind, ErrorKind::Error);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod value;

pub use error::{ErrorKind, JsError};
pub use value::Value;
