//! Event loop configuration.

use serde::Deserialize;

/// What to do with rejections still unhandled at the end of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RejectionPolicy {
    /// Log each report with `log::warn!` and record it
    #[default]
    Warn,
    /// Record the report without logging
    Silent,
}

/// Configuration for an [`EventLoop`](crate::EventLoop).
///
/// ```
/// use async_runtime::{EventLoopConfig, RejectionPolicy};
///
/// let config: EventLoopConfig =
///     serde_json::from_str(r#"{ "unhandled_rejections": "silent" }"#).unwrap();
/// assert_eq!(config.unhandled_rejections, RejectionPolicy::Silent);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventLoopConfig {
    /// Reporting policy for unhandled rejections
    pub unhandled_rejections: RejectionPolicy,
}
