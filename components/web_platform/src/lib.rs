//! Web platform APIs on top of the async runtime
//!
//! Implements promise-returning Fetch and Geolocation.

pub mod fetch;
pub mod geolocation;

// Re-export main types
pub use fetch::{
    FetchConfig, Fetcher, RawResponse, RequestInit, RequestMethod, Response, Transport,
    TransportError, JSON_CONTENT_TYPE,
};
pub use geolocation::{
    current_position, ErrorCallback, Position, PositionError, PositionErrorCode, PositionSource,
    SuccessCallback,
};
