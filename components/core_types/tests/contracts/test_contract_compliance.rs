//! Contract compliance tests for core_types
//!
//! Settlement payloads must be shareable across threads because promise
//! state is guarded by a mutex and handlers are `Send`.

use core_types::{ErrorKind, JsError, Value};

fn assert_send_sync<T: Send + Sync + 'static>() {}

#[cfg(test)]
mod payload_contract_tests {
    use super::*;

    #[test]
    fn test_value_is_send_sync() {
        assert_send_sync::<Value>();
    }

    #[test]
    fn test_error_is_send_sync() {
        assert_send_sync::<JsError>();
        assert_send_sync::<ErrorKind>();
    }

    #[test]
    fn test_value_clone_preserves_native_identity() {
        let value = Value::native(String::from("response"));
        assert_eq!(value.clone(), value);
    }

    #[test]
    fn test_error_clone_is_equal() {
        let error = JsError::http_status(503);
        assert_eq!(error.clone(), error);
    }
}
