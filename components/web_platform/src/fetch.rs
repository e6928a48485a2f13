//! Fetch API on top of promises
//!
//! [`Fetcher::fetch`] issues one request/response exchange through a
//! pluggable [`Transport`] and returns a promise for the [`Response`].
//! Error classification follows the browser: a response with any status
//! fulfils the promise, and only a failed exchange rejects it. Callers
//! that want HTTP errors as rejections opt in with
//! [`Response::error_for_status`].

use async_runtime::{EventLoop, Promise, Task};
use core_types::{JsError, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// HTTP methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
}

impl std::fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestMethod::Get => write!(f, "GET"),
            RequestMethod::Post => write!(f, "POST"),
            RequestMethod::Put => write!(f, "PUT"),
            RequestMethod::Delete => write!(f, "DELETE"),
            RequestMethod::Head => write!(f, "HEAD"),
            RequestMethod::Options => write!(f, "OPTIONS"),
            RequestMethod::Patch => write!(f, "PATCH"),
        }
    }
}

/// Header value sent with JSON request bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// Options for a single request: method, headers and body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestInit {
    /// HTTP method
    pub method: RequestMethod,
    /// Request headers
    pub headers: BTreeMap<String, String>,
    /// Request body
    pub body: Option<String>,
}

impl RequestInit {
    /// A plain GET request.
    pub fn get() -> Self {
        Self::default()
    }

    /// A POST request carrying `payload` encoded as JSON.
    ///
    /// ```
    /// use serde_json::json;
    /// use web_platform::{RequestInit, RequestMethod};
    ///
    /// let init = RequestInit::post_json(&json!({ "title": "foo", "userId": 1 })).unwrap();
    /// assert_eq!(init.method, RequestMethod::Post);
    /// assert_eq!(init.header("content-type"), Some("application/json; charset=UTF-8"));
    /// ```
    pub fn post_json<T: Serialize + ?Sized>(payload: &T) -> Result<Self, JsError> {
        let body = serde_json::to_string(payload)
            .map_err(|e| JsError::error(format!("failed to encode request body: {}", e)))?;
        Ok(Self {
            method: RequestMethod::Post,
            body: Some(body),
            ..Self::default()
        }
        .with_header("Content-type", JSON_CONTENT_TYPE))
    }

    /// Sets a header, replacing any existing header with the same name.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
        self.headers.insert(name, value.into());
        self
    }

    /// Sets the method.
    pub fn with_method(mut self, method: RequestMethod) -> Self {
        self.method = method;
        self
    }

    /// Looks up a header, ignoring ASCII case.
    pub fn header(&self, name: &str) -> Option<&str> {
        lookup_header(&self.headers, name)
    }
}

fn lookup_header<'a>(headers: &'a BTreeMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// What a [`Transport`] hands back for a completed exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse {
    /// Status code
    pub status: u16,
    /// Response headers
    pub headers: BTreeMap<String, String>,
    /// Response body
    pub body: String,
}

impl RawResponse {
    /// Create a response with a status and body
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    /// Adds a header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// A request that never produced a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The connection could not be established or was dropped
    #[error("connection failed: {0}")]
    Connection(String),
    /// No response within the transport's deadline
    #[error("request timed out")]
    Timeout,
    /// The URL could not be used
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl From<TransportError> for JsError {
    fn from(error: TransportError) -> Self {
        JsError::transport(error.to_string())
    }
}

/// Performs the byte-level exchange for a request.
///
/// Implementations run inside an event-loop task and must return once the
/// exchange is over.
pub trait Transport: Send + Sync {
    /// Sends `request` to `url` and returns the response.
    fn send(&self, url: &str, request: &RequestInit) -> Result<RawResponse, TransportError>;
}

/// Fetcher configuration.
///
/// ```
/// use web_platform::FetchConfig;
///
/// let config: FetchConfig = serde_json::from_str(
///     r#"{ "base_url": "https://jsonplaceholder.typicode.com" }"#,
/// ).unwrap();
/// assert_eq!(
///     config.resolve_url("/posts/1"),
///     "https://jsonplaceholder.typicode.com/posts/1"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Prefix for endpoints that are not absolute URLs
    pub base_url: Option<String>,
    /// Headers sent with every request unless the request sets them
    pub default_headers: BTreeMap<String, String>,
}

impl FetchConfig {
    /// Resolves `endpoint` against `base_url`.
    pub fn resolve_url(&self, endpoint: &str) -> String {
        match &self.base_url {
            Some(base) if !endpoint.contains("://") => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                endpoint.trim_start_matches('/')
            ),
            _ => endpoint.to_string(),
        }
    }

    fn apply_defaults(&self, mut request: RequestInit) -> RequestInit {
        for (name, value) in &self.default_headers {
            if request.header(name).is_none() {
                request.headers.insert(name.clone(), value.clone());
            }
        }
        request
    }
}

/// The response to a fetch.
///
/// Stored in a settled promise as a [`Value::Native`]; recover it with
/// [`Response::from_value`].
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    status_text: String,
    url: String,
    headers: BTreeMap<String, String>,
    body: String,
    event_loop: EventLoop,
}

impl Response {
    fn from_raw(raw: RawResponse, url: String, event_loop: EventLoop) -> Self {
        Self {
            status: raw.status,
            status_text: status_text(raw.status).to_string(),
            url,
            headers: raw.headers,
            body: raw.body,
            event_loop,
        }
    }

    /// Returns the response held by a settled fetch value.
    pub fn from_value(value: &Value) -> Option<Arc<Response>> {
        value.downcast::<Response>()
    }

    /// Check if the response is OK (status 200-299)
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Status code
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Reason phrase for common status codes
    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    /// The URL the request went to
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Looks up a response header, ignoring ASCII case
    pub fn header(&self, name: &str) -> Option<&str> {
        lookup_header(&self.headers, name)
    }

    /// Decodes the body as JSON.
    ///
    /// The returned promise fulfils with [`Value::Json`], or rejects with a
    /// `SyntaxError` when the body is not valid JSON.
    pub fn json(&self) -> Promise {
        let body = self.body.clone();
        Promise::new(&self.event_loop, move |resolve, _| {
            let decoded: serde_json::Value = serde_json::from_str(&body)?;
            resolve.resolve(Value::Json(decoded));
            Ok(())
        })
    }

    /// Reads the body as text.
    pub fn text(&self) -> Promise {
        Promise::resolved(&self.event_loop, Value::from(self.body.clone()))
    }

    /// Turns a non-2xx status into an `HttpStatusError`.
    ///
    /// ```
    /// # use async_runtime::EventLoop;
    /// # use web_platform::{Fetcher, RawResponse, RequestInit, Response, Transport, TransportError};
    /// # use std::sync::Arc;
    /// # struct NotFound;
    /// # impl Transport for NotFound {
    /// #     fn send(&self, _: &str, _: &RequestInit) -> Result<RawResponse, TransportError> {
    /// #         Ok(RawResponse::new(404, ""))
    /// #     }
    /// # }
    /// let event_loop = EventLoop::new();
    /// let fetcher = Fetcher::new(&event_loop, Arc::new(NotFound));
    ///
    /// let checked = fetcher.fetch("/posts/999", None).on_fulfilled(|value| {
    ///     let response = Response::from_value(&value).expect("response");
    ///     response.error_for_status()?;
    ///     Ok(response.json())
    /// });
    ///
    /// event_loop.run_until_done().unwrap();
    /// assert_eq!(checked.error().and_then(|e| e.status), Some(404));
    /// ```
    pub fn error_for_status(&self) -> Result<(), JsError> {
        if self.ok() {
            Ok(())
        } else {
            Err(JsError::http_status(self.status))
        }
    }

    /// Wraps the response as a promise payload.
    pub fn into_value(self) -> Value {
        Value::native(self)
    }
}

/// Get status text for common status codes
fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "",
    }
}

/// Issues requests on an event loop.
#[derive(Clone)]
pub struct Fetcher {
    event_loop: EventLoop,
    transport: Arc<dyn Transport>,
    config: FetchConfig,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Fetcher {
    /// Create a fetcher with the default configuration
    pub fn new(event_loop: &EventLoop, transport: Arc<dyn Transport>) -> Self {
        Self::with_config(event_loop, transport, FetchConfig::default())
    }

    /// Create a fetcher with a configuration
    pub fn with_config(
        event_loop: &EventLoop,
        transport: Arc<dyn Transport>,
        config: FetchConfig,
    ) -> Self {
        Self {
            event_loop: event_loop.clone(),
            transport,
            config,
        }
    }

    /// The configuration in use
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Starts a request and returns a promise for its [`Response`].
    ///
    /// The exchange runs in a later event-loop task, so the caller always
    /// continues first. The promise fulfils for every status code and
    /// rejects with a `TransportFailure` only when the transport fails.
    /// There are no retries.
    pub fn fetch(&self, endpoint: &str, init: Option<RequestInit>) -> Promise {
        let url = self.config.resolve_url(endpoint);
        let request = self.config.apply_defaults(init.unwrap_or_default());
        let transport = Arc::clone(&self.transport);
        let event_loop = self.event_loop.clone();
        let (promise, resolve, reject) = Promise::with_resolvers(&self.event_loop);

        self.event_loop.enqueue_task(Task::new(move || {
            log::debug!("fetch {} {}", request.method, url);
            match transport.send(&url, &request) {
                Ok(raw) => {
                    log::debug!("fetch {} {} -> {}", request.method, url, raw.status);
                    resolve.resolve(Response::from_raw(raw, url, event_loop).into_value());
                }
                Err(error) => {
                    log::debug!("fetch {} {} failed: {}", request.method, url, error);
                    reject.reject(error.into());
                }
            }
            Ok(())
        }));

        promise
    }
}
