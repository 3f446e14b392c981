//! Page-state extraction.
//!
//! Before every matching decision the interpreter derives a fresh
//! [`PageState`] from the live page: the URL (with the authored-URL
//! override preserving matches across redirects), the cookie jar scoped to
//! the current URL, and the subset of candidate selectors currently
//! attached to the DOM.

use std::time::Duration;

use tracing::debug;

use crate::driver::{DriverError, PageDriver};
use trawl_types::{PageState, Pair};

/// Per-selector attachment probe budget.
pub const SELECTOR_PROBE_TIMEOUT: Duration = Duration::from_millis(1500);

/// Observe the page.
///
/// `pairs`/`alive` describe the run's remaining workflow: when the last
/// alive pair's `where.url` is a plain string that differs from the live
/// URL and is not `about:blank`, that authored URL is reported instead.
/// This keeps a recorded workflow matching after the site redirects to a
/// final URL the author never saw.
///
/// Any driver failure here means the page is unobservable and is mapped to
/// [`DriverError::PageGone`] so the caller can end the loop cleanly.
pub async fn observe_state(
    page: &dyn PageDriver,
    pairs: &[Pair],
    alive: &[bool],
    candidates: &[String],
) -> Result<PageState, DriverError> {
    let live_url = page
        .current_url()
        .await
        .map_err(|e| DriverError::PageGone(e.to_string()))?;

    let url = authored_url_override(pairs, alive, &live_url)
        .unwrap_or_else(|| live_url.clone());

    let cookies = page
        .cookies_for(&live_url)
        .await
        .map_err(|e| DriverError::PageGone(e.to_string()))?;

    let mut selectors = Vec::new();
    for candidate in candidates {
        match page.is_attached(candidate, SELECTOR_PROBE_TIMEOUT).await {
            Ok(true) => selectors.push(candidate.clone()),
            Ok(false) => {}
            Err(DriverError::PageGone(reason)) => return Err(DriverError::PageGone(reason)),
            Err(e) => {
                debug!(selector = %candidate, error = %e, "selector probe failed, dropping");
            }
        }
    }

    Ok(PageState {
        url,
        cookies,
        selectors,
    })
}

/// The authored URL to report instead of the live one, if the override
/// applies. Regex guards cannot be reported as URLs and never override.
fn authored_url_override(pairs: &[Pair], alive: &[bool], live_url: &str) -> Option<String> {
    let last_alive = pairs
        .iter()
        .enumerate()
        .rev()
        .find(|(i, _)| alive.get(*i).copied().unwrap_or(false))
        .map(|(_, pair)| pair)?;

    let authored = last_alive.where_.url.as_ref()?.as_exact()?;
    if authored != live_url && authored != "about:blank" {
        Some(authored.to_string())
    } else {
        None
    }
}
