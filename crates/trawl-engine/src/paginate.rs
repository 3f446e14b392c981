//! Multi-page list extraction.
//!
//! Five strategies: `none`, `scrollDown`, `scrollUp`, `clickNext`,
//! `clickLoadMore`. Items are de-duplicated across pages by JSON identity,
//! capped by `limit`, and delivered to the host as one complete list when
//! pagination terminates. Every DOM interaction gets at most three
//! attempts with a one-second pause; retry exhaustion returns the partial
//! accumulation and never raises.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::driver::{LoadState, PageDriver};
use crate::scripts;

/// Attempts per DOM interaction.
pub const INTERACT_ATTEMPTS: u32 = 3;
/// Pause between interaction attempts.
pub const INTERACT_BACKOFF: Duration = Duration::from_secs(1);
/// Settle time after scrolls and clicks, before re-reading layout.
const LAYOUT_SETTLE: Duration = Duration::from_millis(500);
/// Budget for a post-click navigation wait.
const NAV_WAIT: Duration = Duration::from_secs(10);
/// Consecutive fruitless load-more clicks before giving up.
const LOAD_MORE_FRUITLESS_LIMIT: usize = 2;

/// Pagination strategy selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PaginationKind {
    #[default]
    None,
    ScrollDown,
    ScrollUp,
    ClickNext,
    ClickLoadMore,
}

/// Pagination configuration inside a `scrapeList` argument.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(rename = "type", default)]
    pub kind: PaginationKind,

    /// Comma-separated candidate selectors for the next/load-more
    /// affordance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
}

/// `scrapeList` arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListScrape {
    pub list_selector: String,

    /// Per-item field specs, passed through to the in-page extractor.
    #[serde(default)]
    pub fields: Value,

    /// Cap on the delivered result length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,

    #[serde(default)]
    pub pagination: Pagination,
}

impl Pagination {
    /// Split the comma-separated selector into trimmed candidates.
    pub fn candidates(&self) -> Vec<String> {
        self.selector
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }
}

/// Observable content signature of the current page: URL, item count, and
/// a digest of the first three items. Used by `clickNext` to decide
/// whether a click actually advanced.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ContentSignature {
    url: String,
    count: usize,
    digest: [u8; 32],
}

fn signature(url: &str, items: &[Value]) -> ContentSignature {
    let mut hasher = Sha256::new();
    for item in items.iter().take(3) {
        hasher.update(item.to_string().as_bytes());
        hasher.update(b"|");
    }
    ContentSignature {
        url: url.to_string(),
        count: items.len(),
        digest: hasher.finalize().into(),
    }
}

fn reached_limit(len: usize, limit: Option<usize>) -> bool {
    limit.is_some_and(|l| len >= l)
}

/// Merge newly extracted items, de-duplicating by JSON identity and
/// respecting the limit. Returns how many items were actually added.
fn merge_items(
    all: &mut Vec<Value>,
    seen: &mut HashSet<String>,
    items: Vec<Value>,
    limit: Option<usize>,
) -> usize {
    let mut added = 0;
    for item in items {
        if reached_limit(all.len(), limit) {
            break;
        }
        if seen.insert(item.to_string()) {
            all.push(item);
            added += 1;
        }
    }
    added
}

/// Run the configured pagination strategy to completion and return the
/// accumulated, de-duplicated, capped list. Failures terminate the
/// strategy early with whatever was collected.
pub async fn collect_list(page: &Arc<dyn PageDriver>, cfg: &ListScrape) -> Vec<Value> {
    match cfg.pagination.kind {
        PaginationKind::None => extract_once(page, cfg).await,
        PaginationKind::ScrollDown => scroll_until_settled(page, cfg, false).await,
        PaginationKind::ScrollUp => scroll_until_settled(page, cfg, true).await,
        PaginationKind::ClickNext => click_next(page, cfg).await,
        PaginationKind::ClickLoadMore => click_load_more(page, cfg).await,
    }
}

async fn extract_items(page: &Arc<dyn PageDriver>, cfg: &ListScrape) -> Vec<Value> {
    let call = scripts::scrape_list_call(&cfg.list_selector, &cfg.fields, cfg.limit);
    match page.evaluate(&call).await {
        Ok(Value::Array(items)) => items,
        Ok(other) => {
            debug!(result = %other, "list extraction returned a non-array");
            Vec::new()
        }
        Err(e) => {
            warn!(error = %e, "list extraction failed");
            Vec::new()
        }
    }
}

async fn extract_once(page: &Arc<dyn PageDriver>, cfg: &ListScrape) -> Vec<Value> {
    let mut all = Vec::new();
    let mut seen = HashSet::new();
    merge_items(&mut all, &mut seen, extract_items(page, cfg).await, cfg.limit);
    all
}

async fn scroll_extent(page: &Arc<dyn PageDriver>) -> Option<i64> {
    match page.evaluate(&scripts::scroll_extent_call()).await {
        Ok(value) => value.as_i64().or_else(|| value.as_f64().map(|f| f as i64)),
        Err(e) => {
            warn!(error = %e, "scroll extent read failed");
            None
        }
    }
}

/// scrollDown/scrollUp: scroll to the end (or top), wait for layout, and
/// stop once the scroll extent stops growing; then extract everything.
async fn scroll_until_settled(page: &Arc<dyn PageDriver>, cfg: &ListScrape, up: bool) -> Vec<Value> {
    let scroll_call = if up {
        scripts::scroll_to_top_call()
    } else {
        scripts::scroll_to_bottom_call()
    };

    let mut previous: Option<i64> = None;
    loop {
        if page.evaluate(&scroll_call).await.is_err() {
            break;
        }
        sleep(LAYOUT_SETTLE).await;

        let Some(extent) = scroll_extent(page).await else {
            break;
        };
        if previous == Some(extent) {
            break;
        }
        previous = Some(extent);

        // With a limit we can stop as soon as enough rows are attached,
        // without waiting for the feed to run dry.
        if let Some(limit) = cfg.limit {
            let attached = extract_items(page, cfg).await;
            if attached.len() >= limit {
                break;
            }
        }
    }

    extract_once(page, cfg).await
}

/// Click a selector with bounded attempts. Returns true once a click lands.
async fn click_with_retry(page: &Arc<dyn PageDriver>, selector: &str) -> bool {
    for attempt in 1..=INTERACT_ATTEMPTS {
        match page.click(selector, false).await {
            Ok(()) => return true,
            Err(e) => {
                debug!(selector, attempt, error = %e, "pagination click failed");
                sleep(INTERACT_BACKOFF).await;
            }
        }
    }
    false
}

/// clickNext: scrape, advance through a next-page affordance, repeat.
///
/// Candidate selectors are tried in order, three attempts each with a
/// one-second backoff; a candidate that exhausts its attempts is evicted
/// for the remainder of the run. An attempt only counts as an advance when
/// the content signature changes and the navigation does not land on an
/// already-visited URL. When no candidate advances, `history.forward()` is
/// tried once and the run terminates.
async fn click_next(page: &Arc<dyn PageDriver>, cfg: &ListScrape) -> Vec<Value> {
    let mut all = Vec::new();
    let mut seen = HashSet::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut candidates = cfg.pagination.candidates();

    loop {
        let page_items = extract_items(page, cfg).await;
        merge_items(&mut all, &mut seen, page_items.clone(), cfg.limit);
        if reached_limit(all.len(), cfg.limit) {
            break;
        }

        let url = match page.current_url().await {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "page gone during clickNext");
                break;
            }
        };
        visited.insert(url.clone());
        let before = signature(&url, &page_items);

        let mut advanced = false;
        let mut exhausted = Vec::new();
        'candidates: for selector in candidates.clone() {
            for attempt in 1..=INTERACT_ATTEMPTS {
                if page.click(&selector, false).await.is_err() {
                    debug!(selector = %selector, attempt, "next-page click failed");
                    sleep(INTERACT_BACKOFF).await;
                    continue;
                }

                let _ = page
                    .wait_for_load_state(LoadState::DomContentLoaded, NAV_WAIT)
                    .await;
                sleep(LAYOUT_SETTLE).await;

                let Ok(new_url) = page.current_url().await else {
                    return all;
                };
                let after = signature(&new_url, &extract_items(page, cfg).await);
                let walked_back = new_url != url && visited.contains(&new_url);

                if after != before && !walked_back {
                    advanced = true;
                    break 'candidates;
                }
                debug!(selector = %selector, attempt, "click produced no observable change");
                sleep(INTERACT_BACKOFF).await;
            }
            exhausted.push(selector);
        }

        if !exhausted.is_empty() {
            candidates.retain(|c| !exhausted.contains(c));
        }

        if !advanced {
            // Last resort: the site may have pushed a history entry without
            // letting the click through.
            if page.go_forward().await.is_ok() {
                sleep(LAYOUT_SETTLE).await;
                merge_items(&mut all, &mut seen, extract_items(page, cfg).await, cfg.limit);
            }
            break;
        }
    }

    all
}

/// clickLoadMore: click the affordance, scroll to the bottom, scrape the
/// grown list. Stops when the scroll extent no longer changes after a
/// click, or after two consecutive clicks that add nothing new.
async fn click_load_more(page: &Arc<dyn PageDriver>, cfg: &ListScrape) -> Vec<Value> {
    let mut all = Vec::new();
    let mut seen = HashSet::new();
    let mut candidates = cfg.pagination.candidates();
    let mut fruitless = 0usize;

    merge_items(&mut all, &mut seen, extract_items(page, cfg).await, cfg.limit);
    if reached_limit(all.len(), cfg.limit) {
        return all;
    }

    loop {
        if candidates.is_empty() {
            break;
        }
        let Some(before_extent) = scroll_extent(page).await else {
            break;
        };

        let mut clicked = false;
        let mut exhausted = Vec::new();
        for selector in candidates.clone() {
            if click_with_retry(page, &selector).await {
                clicked = true;
                break;
            }
            exhausted.push(selector);
        }
        candidates.retain(|c| !exhausted.contains(c));
        if !clicked {
            break;
        }

        sleep(LAYOUT_SETTLE).await;
        if page.evaluate(&scripts::scroll_to_bottom_call()).await.is_err() {
            break;
        }
        sleep(LAYOUT_SETTLE).await;

        let Some(after_extent) = scroll_extent(page).await else {
            break;
        };
        let added = merge_items(&mut all, &mut seen, extract_items(page, cfg).await, cfg.limit);
        if reached_limit(all.len(), cfg.limit) {
            break;
        }
        if after_extent == before_extent {
            break;
        }
        if added == 0 {
            fruitless += 1;
            if fruitless >= LOAD_MORE_FRUITLESS_LIMIT {
                break;
            }
        } else {
            fruitless = 0;
        }
    }

    all
}
