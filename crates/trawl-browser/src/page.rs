//! High-level CDP page driver.
//!
//! [`CdpPage`] implements the engine's `PageDriver` trait over one page
//! target's DevTools WebSocket. Trusted input goes through the Input
//! domain (box-model center clicks, per-character key events); everything
//! observational goes through `Runtime.evaluate`. A background watcher
//! turns `Target.targetCreated` events into a popup queue the interpreter
//! drains each loop iteration.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use serde_json::{json, Value};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::cdp::{CdpClient, CdpEvent};
use crate::error::BrowserError;
use trawl_engine::driver::{DriverError, LoadState, PageDriver};

/// Poll interval for readiness and attachment probes.
const POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Extra quiet time after `readyState === "complete"` for network idle.
const NETWORK_IDLE_GRACE: Duration = Duration::from_millis(500);
/// Navigation budget for `goto` and sibling page opens.
const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// A page target driven over CDP.
pub struct CdpPage {
    client: CdpClient,
    ws_url: String,
    target_id: String,
    popups: Mutex<VecDeque<String>>,
    open: Arc<AtomicBool>,
}

impl CdpPage {
    /// Connect to a page target and prepare it for interpretation:
    /// enables the Page, Runtime and Network domains and starts target
    /// discovery for popup tracking.
    pub async fn connect(ws_url: &str) -> Result<Arc<Self>, BrowserError> {
        let client = CdpClient::connect(ws_url).await?;
        client.enable_domain("Page").await?;
        client.enable_domain("Runtime").await?;
        client.enable_domain("Network").await?;

        // Target discovery is what surfaces popups; a browser that refuses
        // it still interprets fine, just without popup fan-out.
        if let Err(e) = client
            .send_command("Target.setDiscoverTargets", json!({ "discover": true }))
            .await
        {
            debug!(error = %e, "target discovery unavailable");
        }

        let target_id = target_id_from_ws_url(ws_url).unwrap_or_default();
        let page = Arc::new(Self {
            client,
            ws_url: ws_url.to_string(),
            target_id,
            popups: Mutex::new(VecDeque::new()),
            open: Arc::new(AtomicBool::new(true)),
        });

        Self::spawn_target_watcher(&page);
        Ok(page)
    }

    fn spawn_target_watcher(page: &Arc<Self>) {
        let mut events = page.client.subscribe();
        let weak = Arc::downgrade(page);
        tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                        debug!(missed, "target watcher lagged behind the event stream");
                        continue;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                };
                let Some(page) = weak.upgrade() else { break };
                page.handle_target_event(&event);
            }
            if let Some(page) = weak.upgrade() {
                page.open.store(false, Ordering::Release);
            }
        });
    }

    fn handle_target_event(&self, event: &CdpEvent) {
        match event.method.as_str() {
            "Target.targetCreated" => {
                if let Some(popup_id) = popup_target_from_event(event, &self.target_id) {
                    info!(popup = %popup_id, "popup target discovered");
                    self.popups
                        .lock()
                        .expect("popup queue lock poisoned")
                        .push_back(popup_id);
                }
            }
            "Target.targetDestroyed" => {
                let destroyed = event
                    .params
                    .get("targetId")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                if destroyed == self.target_id {
                    self.open.store(false, Ordering::Release);
                }
            }
            "Inspector.detached" => {
                self.open.store(false, Ordering::Release);
            }
            _ => {}
        }
    }

    /// Evaluate an expression, surfacing page exceptions as errors.
    async fn eval(&self, expression: &str) -> Result<Value, BrowserError> {
        let result = self
            .client
            .send_command(
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                }),
            )
            .await?;

        if let Some(exception) = result.get("exceptionDetails") {
            let message = exception
                .get("exception")
                .and_then(|e| e.get("description"))
                .and_then(Value::as_str)
                .or_else(|| exception.get("text").and_then(Value::as_str))
                .unwrap_or("unknown exception")
                .to_string();
            return Err(BrowserError::JsException { message });
        }

        Ok(result
            .get("result")
            .and_then(|r| r.get("value"))
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn document_root(&self) -> Result<i64, BrowserError> {
        let result = self
            .client
            .send_command("DOM.getDocument", json!({}))
            .await?;
        result
            .get("root")
            .and_then(|r| r.get("nodeId"))
            .and_then(Value::as_i64)
            .ok_or_else(|| BrowserError::Protocol {
                detail: "DOM.getDocument returned no root nodeId".to_string(),
            })
    }

    async fn query_node(&self, selector: &str) -> Result<i64, BrowserError> {
        let root = self.document_root().await?;
        let result = self
            .client
            .send_command(
                "DOM.querySelector",
                json!({ "nodeId": root, "selector": selector }),
            )
            .await?;
        let node_id = result.get("nodeId").and_then(Value::as_i64).unwrap_or(0);
        if node_id == 0 {
            return Err(BrowserError::ElementNotFound {
                selector: selector.to_string(),
            });
        }
        Ok(node_id)
    }

    async fn element_center(&self, node_id: i64) -> Result<(f64, f64), BrowserError> {
        let result = self
            .client
            .send_command("DOM.getBoxModel", json!({ "nodeId": node_id }))
            .await?;
        let quad: Vec<f64> = result
            .get("model")
            .and_then(|m| m.get("content"))
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(Value::as_f64).collect())
            .unwrap_or_default();
        center_of_quad(&quad).ok_or_else(|| BrowserError::Protocol {
            detail: "DOM.getBoxModel returned an unusable content quad".to_string(),
        })
    }

    async fn dispatch_mouse(&self, kind: &str, x: f64, y: f64) -> Result<(), BrowserError> {
        self.client
            .send_command(
                "Input.dispatchMouseEvent",
                json!({
                    "type": kind,
                    "x": x,
                    "y": y,
                    "button": "left",
                    "clickCount": 1,
                }),
            )
            .await?;
        Ok(())
    }

    async fn focus_node(&self, selector: &str) -> Result<i64, BrowserError> {
        let node_id = self.query_node(selector).await?;
        self.client
            .send_command("DOM.focus", json!({ "nodeId": node_id }))
            .await?;
        Ok(node_id)
    }

    async fn attached_now(&self, selector: &str) -> Result<bool, BrowserError> {
        let expression = format!("!!document.querySelector({})", js_str(selector));
        Ok(self.eval(&expression).await?.as_bool().unwrap_or(false))
    }

    fn gone(&self, e: BrowserError) -> DriverError {
        if self.client.is_closed() || !self.open.load(Ordering::Acquire) {
            return DriverError::PageGone(e.to_string());
        }
        map_error(e)
    }
}

fn map_error(e: BrowserError) -> DriverError {
    match e {
        BrowserError::Closed | BrowserError::ConnectionFailed { .. } => {
            DriverError::PageGone(e.to_string())
        }
        BrowserError::Timeout { method, duration } => DriverError::Timeout {
            what: method,
            duration,
        },
        BrowserError::JsException { message } => DriverError::Js(message),
        BrowserError::ElementNotFound { selector } => DriverError::ElementNotFound(selector),
        other => DriverError::Call(other.to_string()),
    }
}

fn js_str(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

/// The target id is the final path segment of the page WebSocket URL.
pub fn target_id_from_ws_url(ws_url: &str) -> Option<String> {
    let trimmed = ws_url.trim_end_matches('/');
    let (_, id) = trimmed.rsplit_once('/')?;
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// Derive a sibling target's WebSocket URL from this page's URL.
pub fn sibling_ws_url(ws_url: &str, target_id: &str) -> Option<String> {
    let trimmed = ws_url.trim_end_matches('/');
    let (base, _) = trimmed.rsplit_once('/')?;
    Some(format!("{base}/{target_id}"))
}

/// Center of an 8-value content quad.
pub fn center_of_quad(quad: &[f64]) -> Option<(f64, f64)> {
    if quad.len() < 8 {
        return None;
    }
    let xs: Vec<f64> = quad.iter().step_by(2).copied().collect();
    let ys: Vec<f64> = quad.iter().skip(1).step_by(2).copied().collect();
    let min_x = xs.iter().cloned().fold(f64::INFINITY, f64::min);
    let max_x = xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min_y = ys.iter().cloned().fold(f64::INFINITY, f64::min);
    let max_y = ys.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max_x <= min_x || max_y <= min_y {
        return None;
    }
    Some(((min_x + max_x) / 2.0, (min_y + max_y) / 2.0))
}

/// Flatten a `Network.getCookies` response to name → value.
pub fn parse_cookies(result: &Value) -> HashMap<String, String> {
    result
        .get("cookies")
        .and_then(Value::as_array)
        .map(|cookies| {
            cookies
                .iter()
                .filter_map(|c| {
                    let name = c.get("name")?.as_str()?;
                    let value = c.get("value")?.as_str()?;
                    Some((name.to_string(), value.to_string()))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// The popup target id carried by a `Target.targetCreated` event, if the
/// new target is a page opened by `opener_id`.
pub fn popup_target_from_event(event: &CdpEvent, opener_id: &str) -> Option<String> {
    if event.method != "Target.targetCreated" {
        return None;
    }
    let target_info = event.params.get("targetInfo")?;
    if target_info.get("type")?.as_str()? != "page" {
        return None;
    }
    if target_info.get("openerId")?.as_str()? != opener_id {
        return None;
    }
    Some(target_info.get("targetId")?.as_str()?.to_string())
}

/// Pick the history entry id `delta` steps from the current index.
pub fn history_entry_for_delta(history: &Value, delta: i64) -> Option<i64> {
    let current = history.get("currentIndex")?.as_i64()?;
    let entries = history.get("entries")?.as_array()?;
    let target = current + delta;
    if target < 0 {
        return None;
    }
    entries.get(target as usize)?.get("id")?.as_i64()
}

/// The `document.readyState` values that satisfy a load state.
fn accepted_ready_states(state: LoadState) -> &'static [&'static str] {
    match state {
        LoadState::Load | LoadState::NetworkIdle => &["complete"],
        LoadState::DomContentLoaded => &["interactive", "complete"],
    }
}

#[async_trait]
impl PageDriver for CdpPage {
    async fn goto(&self, url: &str) -> Result<(), DriverError> {
        let result = self
            .client
            .send_command("Page.navigate", json!({ "url": url }))
            .await
            .map_err(|e| self.gone(e))?;
        if let Some(error_text) = result.get("errorText").and_then(Value::as_str) {
            return Err(map_error(BrowserError::NavigationFailed {
                reason: error_text.to_string(),
            }));
        }
        // Best-effort settle; slow pages are retried by the main loop's
        // own waitForLoadState.
        let _ = self.wait_for_load_state(LoadState::Load, NAVIGATION_TIMEOUT).await;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        let value = self
            .eval("window.location.href")
            .await
            .map_err(|e| self.gone(e))?;
        value
            .as_str()
            .map(String::from)
            .ok_or_else(|| DriverError::Call("location.href was not a string".to_string()))
    }

    async fn cookies_for(&self, url: &str) -> Result<HashMap<String, String>, DriverError> {
        let result = self
            .client
            .send_command("Network.getCookies", json!({ "urls": [url] }))
            .await
            .map_err(|e| self.gone(e))?;
        Ok(parse_cookies(&result))
    }

    async fn is_attached(&self, selector: &str, timeout: Duration) -> Result<bool, DriverError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.attached_now(selector).await {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                // Malformed selectors raise in querySelector; treat the
                // selector as simply not attached.
                Err(BrowserError::JsException { message }) => {
                    debug!(selector, error = %message, "attachment probe raised");
                    return Ok(false);
                }
                Err(e) => return Err(self.gone(e)),
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn click(&self, selector: &str, force: bool) -> Result<(), DriverError> {
        if force {
            let expression = format!(
                "(() => {{ const el = document.querySelector({}); if (!el) return false; el.click(); return true; }})()",
                js_str(selector)
            );
            let clicked = self
                .eval(&expression)
                .await
                .map_err(|e| self.gone(e))?
                .as_bool()
                .unwrap_or(false);
            if !clicked {
                return Err(DriverError::ElementNotFound(selector.to_string()));
            }
            return Ok(());
        }

        let node_id = self.query_node(selector).await.map_err(|e| self.gone(e))?;
        let (x, y) = self
            .element_center(node_id)
            .await
            .map_err(|e| self.gone(e))?;
        self.dispatch_mouse("mousePressed", x, y)
            .await
            .map_err(|e| self.gone(e))?;
        self.dispatch_mouse("mouseReleased", x, y)
            .await
            .map_err(|e| self.gone(e))?;
        Ok(())
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<(), DriverError> {
        let expression = format!(
            "(() => {{ const el = document.querySelector({sel}); if (!el) return false; \
             el.focus(); el.value = {val}; \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); return true; }})()",
            sel = js_str(selector),
            val = js_str(text),
        );
        let filled = self
            .eval(&expression)
            .await
            .map_err(|e| self.gone(e))?
            .as_bool()
            .unwrap_or(false);
        if !filled {
            return Err(DriverError::ElementNotFound(selector.to_string()));
        }
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<(), DriverError> {
        self.focus_node(selector).await.map_err(|e| self.gone(e))?;
        for ch in text.chars() {
            let ch = ch.to_string();
            for kind in ["keyDown", "keyUp"] {
                self.client
                    .send_command(
                        "Input.dispatchKeyEvent",
                        json!({
                            "type": kind,
                            "text": ch,
                            "unmodifiedText": ch,
                            "key": ch,
                        }),
                    )
                    .await
                    .map_err(|e| self.gone(e))?;
            }
        }
        Ok(())
    }

    async fn press(&self, selector: &str, key: &str) -> Result<(), DriverError> {
        self.focus_node(selector).await.map_err(|e| self.gone(e))?;
        for kind in ["rawKeyDown", "keyUp"] {
            self.client
                .send_command(
                    "Input.dispatchKeyEvent",
                    json!({ "type": kind, "key": key }),
                )
                .await
                .map_err(|e| self.gone(e))?;
        }
        Ok(())
    }

    async fn wait_for_load_state(
        &self,
        state: LoadState,
        timeout: Duration,
    ) -> Result<(), DriverError> {
        let accepted = accepted_ready_states(state);
        let deadline = Instant::now() + timeout;
        loop {
            let ready = self
                .eval("document.readyState")
                .await
                .map_err(|e| self.gone(e))?;
            if ready
                .as_str()
                .map(|r| accepted.contains(&r))
                .unwrap_or(false)
            {
                if state == LoadState::NetworkIdle {
                    sleep(NETWORK_IDLE_GRACE).await;
                }
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DriverError::Timeout {
                    what: format!("load state {state:?}"),
                    duration: timeout,
                });
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), DriverError> {
        if self.is_attached(selector, timeout).await? {
            Ok(())
        } else {
            Err(DriverError::Timeout {
                what: format!("selector {selector}"),
                duration: timeout,
            })
        }
    }

    async fn evaluate(&self, expression: &str) -> Result<Value, DriverError> {
        self.eval(expression).await.map_err(|e| self.gone(e))
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        let result = self
            .client
            .send_command("Page.captureScreenshot", json!({ "format": "png" }))
            .await
            .map_err(|e| self.gone(e))?;
        let data = result
            .get("data")
            .and_then(Value::as_str)
            .ok_or_else(|| DriverError::Call("captureScreenshot returned no data".to_string()))?;
        B64.decode(data)
            .map_err(|e| DriverError::Call(format!("failed to decode screenshot: {e}")))
    }

    async fn scroll_by_viewports(&self, delta: f64) -> Result<(), DriverError> {
        let expression = format!("window.scrollBy(0, window.innerHeight * {delta})");
        self.eval(&expression).await.map_err(|e| self.gone(e))?;
        Ok(())
    }

    async fn reload(&self) -> Result<(), DriverError> {
        self.client
            .send_command("Page.reload", json!({}))
            .await
            .map_err(|e| self.gone(e))?;
        Ok(())
    }

    async fn go_back(&self) -> Result<(), DriverError> {
        self.navigate_history(-1).await
    }

    async fn go_forward(&self) -> Result<(), DriverError> {
        self.navigate_history(1).await
    }

    async fn set_blocked_urls(&self, patterns: &[String]) -> Result<(), DriverError> {
        self.client
            .send_command("Network.setBlockedURLs", json!({ "urls": patterns }))
            .await
            .map_err(|e| self.gone(e))?;
        Ok(())
    }

    async fn open_page(&self, url: &str) -> Result<Arc<dyn PageDriver>, DriverError> {
        let result = self
            .client
            .send_command("Target.createTarget", json!({ "url": url }))
            .await
            .map_err(|e| self.gone(e))?;
        let target_id = result
            .get("targetId")
            .and_then(Value::as_str)
            .ok_or_else(|| DriverError::Call("createTarget returned no targetId".to_string()))?;
        let ws_url = sibling_ws_url(&self.ws_url, target_id)
            .ok_or_else(|| DriverError::Call("cannot derive sibling WebSocket URL".to_string()))?;

        let page: Arc<dyn PageDriver> = CdpPage::connect(&ws_url).await.map_err(map_error)?;
        if let Err(e) = page
            .wait_for_load_state(LoadState::NetworkIdle, NAVIGATION_TIMEOUT)
            .await
        {
            debug!(url, error = %e, "opened page did not reach network idle");
        }
        Ok(page)
    }

    async fn take_popup(&self) -> Result<Option<Arc<dyn PageDriver>>, DriverError> {
        let popup_id = self
            .popups
            .lock()
            .expect("popup queue lock poisoned")
            .pop_front();
        let Some(popup_id) = popup_id else {
            return Ok(None);
        };
        let ws_url = match sibling_ws_url(&self.ws_url, &popup_id) {
            Some(url) => url,
            None => return Ok(None),
        };
        match CdpPage::connect(&ws_url).await {
            Ok(page) => {
                let page: Arc<dyn PageDriver> = page;
                Ok(Some(page))
            }
            Err(e) => {
                warn!(popup = %popup_id, error = %e, "failed to attach to popup");
                Ok(None)
            }
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire) && !self.client.is_closed()
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.open.store(false, Ordering::Release);
        self.client
            .send_command("Page.close", json!({}))
            .await
            .map_err(map_error)?;
        Ok(())
    }
}

impl CdpPage {
    async fn navigate_history(&self, delta: i64) -> Result<(), DriverError> {
        let history = self
            .client
            .send_command("Page.getNavigationHistory", json!({}))
            .await
            .map_err(|e| self.gone(e))?;
        let entry_id = history_entry_for_delta(&history, delta).ok_or_else(|| {
            DriverError::Call(format!("no history entry at offset {delta}"))
        })?;
        self.client
            .send_command(
                "Page.navigateToHistoryEntry",
                json!({ "entryId": entry_id }),
            )
            .await
            .map_err(|e| self.gone(e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_id_from_page_ws_url() {
        assert_eq!(
            target_id_from_ws_url("ws://127.0.0.1:9222/devtools/page/AB12CD").as_deref(),
            Some("AB12CD")
        );
        assert_eq!(
            target_id_from_ws_url("ws://127.0.0.1:9222/devtools/page/AB12CD/").as_deref(),
            Some("AB12CD")
        );
        assert!(target_id_from_ws_url("no-slashes-here").is_none());
        assert!(target_id_from_ws_url("").is_none());
    }

    #[test]
    fn sibling_url_swaps_target_id() {
        assert_eq!(
            sibling_ws_url("ws://127.0.0.1:9222/devtools/page/AAA", "BBB").as_deref(),
            Some("ws://127.0.0.1:9222/devtools/page/BBB")
        );
    }

    #[test]
    fn quad_center_basic() {
        let quad = [0.0, 0.0, 100.0, 0.0, 100.0, 50.0, 0.0, 50.0];
        let (x, y) = center_of_quad(&quad).unwrap();
        assert!((x - 50.0).abs() < f64::EPSILON);
        assert!((y - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn quad_center_rejects_degenerate() {
        assert!(center_of_quad(&[0.0, 0.0, 100.0, 0.0]).is_none());
        let flat = [10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0];
        assert!(center_of_quad(&flat).is_none());
    }

    #[test]
    fn cookie_response_flattens() {
        let response = json!({
            "cookies": [
                { "name": "session", "value": "tok-1", "domain": ".example.com" },
                { "name": "theme", "value": "dark", "domain": ".example.com" },
                { "name": "broken" }
            ]
        });
        let cookies = parse_cookies(&response);
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies.get("session").map(String::as_str), Some("tok-1"));
        assert_eq!(cookies.get("theme").map(String::as_str), Some("dark"));
    }

    #[test]
    fn cookie_response_without_cookies_is_empty() {
        assert!(parse_cookies(&json!({})).is_empty());
    }

    #[test]
    fn popup_events_filter_on_opener_and_type() {
        let event = CdpEvent {
            method: "Target.targetCreated".to_string(),
            params: json!({
                "targetInfo": {
                    "targetId": "POPUP1",
                    "type": "page",
                    "openerId": "ME"
                }
            }),
        };
        assert_eq!(popup_target_from_event(&event, "ME").as_deref(), Some("POPUP1"));
        assert!(popup_target_from_event(&event, "OTHER").is_none());

        let worker = CdpEvent {
            method: "Target.targetCreated".to_string(),
            params: json!({
                "targetInfo": { "targetId": "W", "type": "service_worker", "openerId": "ME" }
            }),
        };
        assert!(popup_target_from_event(&worker, "ME").is_none());

        let other = CdpEvent {
            method: "Target.targetDestroyed".to_string(),
            params: json!({ "targetId": "X" }),
        };
        assert!(popup_target_from_event(&other, "ME").is_none());
    }

    #[test]
    fn history_entry_selection() {
        let history = json!({
            "currentIndex": 1,
            "entries": [
                { "id": 10, "url": "https://a.com" },
                { "id": 11, "url": "https://b.com" },
                { "id": 12, "url": "https://c.com" }
            ]
        });
        assert_eq!(history_entry_for_delta(&history, 1), Some(12));
        assert_eq!(history_entry_for_delta(&history, -1), Some(10));
        assert_eq!(history_entry_for_delta(&history, 2), None);
        assert_eq!(history_entry_for_delta(&history, -2), None);
    }

    #[test]
    fn ready_states_per_load_state() {
        assert_eq!(accepted_ready_states(LoadState::Load), &["complete"][..]);
        assert_eq!(
            accepted_ready_states(LoadState::DomContentLoaded),
            &["interactive", "complete"][..]
        );
        assert_eq!(
            accepted_ready_states(LoadState::NetworkIdle),
            &["complete"][..]
        );
    }

    #[test]
    fn js_str_escapes_quotes() {
        assert_eq!(js_str(r#"a"b"#), r#""a\"b""#);
    }
}
