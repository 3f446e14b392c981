//! Error types for the trawl-browser crate.

use std::time::Duration;

use thiserror::Error;

/// Errors from the CDP transport and the commands layered on it.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// Failed to establish a WebSocket connection to the DevTools endpoint.
    #[error("failed to connect to DevTools at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    /// The connection is gone; no further commands can be sent.
    #[error("devtools connection closed")]
    Closed,

    /// A CDP command returned an error response.
    #[error("CDP error {code}: {message}")]
    CdpError {
        code: i64,
        message: String,
        data: Option<String>,
    },

    /// A CDP command timed out waiting for its response.
    #[error("CDP command '{method}' timed out after {duration:?}")]
    Timeout { method: String, duration: Duration },

    /// Serialization or unexpected message format.
    #[error("CDP protocol error: {detail}")]
    Protocol { detail: String },

    /// No element matched the selector.
    #[error("element not found: {selector}")]
    ElementNotFound { selector: String },

    /// JavaScript evaluation raised in the page.
    #[error("JavaScript exception: {message}")]
    JsException { message: String },

    /// Navigation was refused by the browser.
    #[error("navigation failed: {reason}")]
    NavigationFailed { reason: String },
}
