//! Best-effort ad blocking.
//!
//! A shared, read-only list of ad and tracking URL patterns is installed
//! on every page through the driver's request-blocking hook. Installation
//! is idempotent per page and never fatal: pages that refuse the hook are
//! interpreted unblocked.

use tracing::debug;

use crate::driver::PageDriver;

/// URL patterns blocked on every interpreted page.
pub const DEFAULT_BLOCKLIST: &[&str] = &[
    "*://*.doubleclick.net/*",
    "*://*.googlesyndication.com/*",
    "*://*.googleadservices.com/*",
    "*://*.google-analytics.com/*",
    "*://*.googletagmanager.com/*",
    "*://*.adnxs.com/*",
    "*://*.adsafeprotected.com/*",
    "*://*.amazon-adsystem.com/*",
    "*://*.criteo.com/*",
    "*://*.outbrain.com/*",
    "*://*.taboola.com/*",
    "*://*.scorecardresearch.com/*",
    "*://*.quantserve.com/*",
    "*://*.moatads.com/*",
];

/// Install the blocklist on a page. Failures are logged and ignored.
pub async fn install(page: &dyn PageDriver) {
    let patterns: Vec<String> = DEFAULT_BLOCKLIST.iter().map(|p| p.to_string()).collect();
    if let Err(e) = page.set_blocked_urls(&patterns).await {
        debug!(error = %e, "ad-block install failed, continuing without it");
    }
}
