//! The page-driver seam.
//!
//! [`PageDriver`] is the closed surface the interpreter needs from a
//! browser page. The CDP implementation lives in `trawl-browser`; tests
//! drive the engine with scripted in-memory implementations. Every method
//! is async and fallible; a driver reporting [`DriverError::PageGone`] ends
//! the page's loop cleanly.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Load states a page can be awaited on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Load,
    DomContentLoaded,
    NetworkIdle,
}

impl LoadState {
    /// Parse a workflow argument ("load", "domcontentloaded", "networkidle").
    pub fn from_arg(arg: Option<&str>) -> Self {
        match arg {
            Some("domcontentloaded") => LoadState::DomContentLoaded,
            Some("networkidle") => LoadState::NetworkIdle,
            _ => LoadState::Load,
        }
    }
}

/// Errors reported by a page driver.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The page (or its transport) is closed; no further calls can succeed.
    #[error("page is gone: {0}")]
    PageGone(String),

    /// No element matched the selector.
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// A wait exceeded its deadline.
    #[error("timed out waiting for {what} after {duration:?}")]
    Timeout { what: String, duration: Duration },

    /// JavaScript evaluation raised in the page.
    #[error("javascript exception: {0}")]
    Js(String),

    /// Any other driver-level failure.
    #[error("driver call failed: {0}")]
    Call(String),
}

/// A controllable browser page.
///
/// Implementations must be shareable across tasks (`Send + Sync`); the
/// interpreter holds pages in `Arc` and hands them to pool jobs and to the
/// host through `flag` events.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate and wait for the frame to settle.
    async fn goto(&self, url: &str) -> Result<(), DriverError>;

    /// The live URL.
    async fn current_url(&self) -> Result<String, DriverError>;

    /// Cookie jar scoped to `url`, flattened to name → value.
    async fn cookies_for(&self, url: &str) -> Result<HashMap<String, String>, DriverError>;

    /// Whether `selector` is attached to the DOM, probing for at most
    /// `timeout`. A probe that never sees the element resolves `Ok(false)`.
    async fn is_attached(&self, selector: &str, timeout: Duration) -> Result<bool, DriverError>;

    /// Click the element. With `force`, bypass hit-testing (dispatch a
    /// synthetic click instead of a trusted pointer event).
    async fn click(&self, selector: &str, force: bool) -> Result<(), DriverError>;

    /// Replace the element's value.
    async fn fill(&self, selector: &str, text: &str) -> Result<(), DriverError>;

    /// Focus the element and type character by character.
    async fn type_text(&self, selector: &str, text: &str) -> Result<(), DriverError>;

    /// Focus the element and press a named key.
    async fn press(&self, selector: &str, key: &str) -> Result<(), DriverError>;

    /// Wait for a load state, bounded by `timeout`.
    async fn wait_for_load_state(
        &self,
        state: LoadState,
        timeout: Duration,
    ) -> Result<(), DriverError>;

    /// Wait until `selector` attaches, bounded by `timeout`.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration)
        -> Result<(), DriverError>;

    /// Evaluate a JavaScript expression in the page, awaiting promises.
    async fn evaluate(&self, expression: &str) -> Result<Value, DriverError>;

    /// Capture a PNG screenshot.
    async fn screenshot(&self) -> Result<Vec<u8>, DriverError>;

    /// Scroll the viewport by `delta` viewport heights (negative scrolls up).
    async fn scroll_by_viewports(&self, delta: f64) -> Result<(), DriverError>;

    /// Reload the page.
    async fn reload(&self) -> Result<(), DriverError>;

    /// History navigation.
    async fn go_back(&self) -> Result<(), DriverError>;
    async fn go_forward(&self) -> Result<(), DriverError>;

    /// Install URL patterns to block (ad-block support). Idempotent.
    async fn set_blocked_urls(&self, patterns: &[String]) -> Result<(), DriverError>;

    /// Open a sibling page in the same browser, navigate it to `url`, and
    /// wait for network idle.
    async fn open_page(&self, url: &str) -> Result<Arc<dyn PageDriver>, DriverError>;

    /// Take the next popup opened by this page, if one is pending.
    async fn take_popup(&self) -> Result<Option<Arc<dyn PageDriver>>, DriverError>;

    /// Whether the page is still open and responsive.
    fn is_open(&self) -> bool;

    /// Close the page.
    async fn close(&self) -> Result<(), DriverError>;
}
