//! Integration test suite for the promise runtime
//!
//! Shared fixtures for tests that drive the event loop, promises, async
//! functions and the web platform APIs together.

/// Re-export components for test convenience
pub mod components {
    pub use async_runtime;
    pub use core_types;
    pub use web_platform;
}

pub mod support {
    //! Fixtures: an in-memory HTTP transport, a timer-driven position
    //! source and an ordered event log.

    use async_runtime::EventLoop;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use web_platform::{
        ErrorCallback, Position, PositionError, PositionSource, RawResponse, RequestInit,
        RequestMethod, SuccessCallback, Transport, TransportError,
    };

    /// Installs `env_logger` once per test binary.
    pub fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    /// Ordered record of what happened, shared between closures.
    #[derive(Debug, Clone, Default)]
    pub struct EventLog(Arc<Mutex<Vec<String>>>);

    impl EventLog {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push(&self, entry: impl Into<String>) {
            self.0.lock().unwrap().push(entry.into());
        }

        pub fn entries(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    /// In-memory HTTP server keyed by method and URL.
    ///
    /// Unknown routes answer 404 with an empty JSON object, like the
    /// public JSON placeholder API does.
    #[derive(Default)]
    pub struct MockTransport {
        routes: HashMap<(RequestMethod, String), Result<RawResponse, TransportError>>,
        requests: Mutex<Vec<(String, RequestInit)>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(
            mut self,
            method: RequestMethod,
            url: &str,
            status: u16,
            body: &str,
        ) -> Self {
            self.routes.insert(
                (method, url.to_string()),
                Ok(RawResponse::new(status, body).with_header("Content-Type", "application/json")),
            );
            self
        }

        pub fn fail(mut self, method: RequestMethod, url: &str, error: TransportError) -> Self {
            self.routes.insert((method, url.to_string()), Err(error));
            self
        }

        /// Requests received so far, in order.
        pub fn requests(&self) -> Vec<(String, RequestInit)> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Transport for MockTransport {
        fn send(&self, url: &str, request: &RequestInit) -> Result<RawResponse, TransportError> {
            self.requests
                .lock()
                .unwrap()
                .push((url.to_string(), request.clone()));
            self.routes
                .get(&(request.method, url.to_string()))
                .cloned()
                .unwrap_or_else(|| Ok(RawResponse::new(404, "{}")))
        }
    }

    /// Position source that answers from a timer after `delay_ms`.
    pub struct TimerPositionSource {
        pub event_loop: EventLoop,
        pub delay_ms: u64,
        pub outcome: Result<Position, PositionError>,
    }

    impl PositionSource for TimerPositionSource {
        fn get_current_position(&self, on_success: SuccessCallback, on_error: ErrorCallback) {
            let outcome = self.outcome.clone();
            self.event_loop.set_timeout(self.delay_ms, move || {
                match outcome {
                    Ok(position) => on_success(position),
                    Err(error) => on_error(error),
                }
                Ok(())
            });
        }
    }
}
