//! Shared fixtures for integration tests.
//!
//! Each integration test file compiles common/ as its own module, so not
//! every helper is used in every file.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use trawl_engine::driver::{DriverError, LoadState, PageDriver};
use trawl_engine::host::{Host, Resume};

// ---------------------------------------------------------------------------
// MockPage
// ---------------------------------------------------------------------------

/// Snapshot of mock state handed to evaluation closures.
#[derive(Debug, Clone)]
pub struct MockView {
    pub url: String,
    pub counters: HashMap<String, usize>,
    pub scroll_height: i64,
}

impl MockView {
    pub fn counter(&self, name: &str) -> usize {
        self.counters.get(name).copied().unwrap_or(0)
    }
}

/// What a successful click does to the page. Effects queue per selector
/// and are consumed one per click; an empty queue clicks without effect.
#[derive(Debug, Clone)]
pub enum ClickEffect {
    /// Navigate, attaching and detaching selectors along the way.
    Navigate {
        url: String,
        attach: Vec<String>,
        detach: Vec<String>,
    },
    /// Bump a named counter (drives evaluation closures).
    Count(String),
    /// Detach a selector without navigating.
    Detach(String),
    /// Click lands but nothing observable changes.
    Nothing,
}

type EvalFn = Box<dyn Fn(&MockView) -> Value + Send + Sync>;

#[derive(Default)]
struct MockState {
    url: String,
    cookies: HashMap<String, String>,
    attached: HashSet<String>,
    click_effects: HashMap<String, VecDeque<ClickEffect>>,
    forward_effects: VecDeque<ClickEffect>,
    counters: HashMap<String, usize>,
    scroll_height: i64,
    open: bool,
    blocked_urls: Vec<String>,
    popups: VecDeque<Arc<MockPage>>,
    link_pages: HashMap<String, Arc<MockPage>>,
    log: Vec<String>,
}

/// A scripted in-memory page driver.
///
/// Thread-safe via `Arc<Mutex<_>>` -- can be cloned into pool jobs and
/// inspected after the run.
pub struct MockPage {
    state: Mutex<MockState>,
    eval_rules: Mutex<Vec<(String, EvalFn)>>,
}

impl MockPage {
    pub fn new(url: &str) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(MockState {
                url: url.to_string(),
                scroll_height: 1000,
                open: true,
                ..Default::default()
            }),
            eval_rules: Mutex::new(Vec::new()),
        })
    }

    fn locked(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().expect("mock page lock poisoned")
    }

    // -- configuration ------------------------------------------------------

    pub fn attach(&self, selector: &str) -> &Self {
        self.locked().attached.insert(selector.to_string());
        self
    }

    pub fn set_cookie(&self, name: &str, value: &str) -> &Self {
        self.locked()
            .cookies
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn on_click(&self, selector: &str, effects: Vec<ClickEffect>) -> &Self {
        self.locked()
            .click_effects
            .insert(selector.to_string(), effects.into());
        self
    }

    pub fn on_forward(&self, effects: Vec<ClickEffect>) -> &Self {
        self.locked().forward_effects = effects.into();
        self
    }

    /// Register an evaluation rule: when the final line of an evaluated
    /// expression contains `needle`, the closure supplies the result.
    pub fn on_eval(
        &self,
        needle: &str,
        f: impl Fn(&MockView) -> Value + Send + Sync + 'static,
    ) -> &Self {
        self.eval_rules
            .lock()
            .expect("eval rules lock poisoned")
            .push((needle.to_string(), Box::new(f)));
        self
    }

    pub fn on_open_page(&self, url: &str, page: Arc<MockPage>) -> &Self {
        self.locked().link_pages.insert(url.to_string(), page);
        self
    }

    pub fn push_popup(&self, page: Arc<MockPage>) -> &Self {
        self.locked().popups.push_back(page);
        self
    }

    // -- inspection ---------------------------------------------------------

    pub fn log(&self) -> Vec<String> {
        self.locked().log.clone()
    }

    pub fn log_count(&self, entry: &str) -> usize {
        self.locked().log.iter().filter(|l| *l == entry).count()
    }

    pub fn url(&self) -> String {
        self.locked().url.clone()
    }

    pub fn blocked_urls(&self) -> Vec<String> {
        self.locked().blocked_urls.clone()
    }

    pub fn still_open(&self) -> bool {
        self.locked().open
    }

    // -- internals ----------------------------------------------------------

    fn view(state: &MockState) -> MockView {
        MockView {
            url: state.url.clone(),
            counters: state.counters.clone(),
            scroll_height: state.scroll_height,
        }
    }

    fn apply_effect(state: &mut MockState, effect: ClickEffect) {
        match effect {
            ClickEffect::Navigate {
                url,
                attach,
                detach,
            } => {
                state.url = url;
                for s in detach {
                    state.attached.remove(&s);
                }
                for s in attach {
                    state.attached.insert(s);
                }
            }
            ClickEffect::Count(name) => {
                *state.counters.entry(name).or_insert(0) += 1;
            }
            ClickEffect::Detach(selector) => {
                state.attached.remove(&selector);
            }
            ClickEffect::Nothing => {}
        }
    }
}

#[async_trait]
impl PageDriver for MockPage {
    async fn goto(&self, url: &str) -> Result<(), DriverError> {
        let mut state = self.locked();
        state.log.push(format!("goto:{url}"));
        state.url = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        let state = self.locked();
        if !state.open {
            return Err(DriverError::PageGone("mock page closed".to_string()));
        }
        Ok(state.url.clone())
    }

    async fn cookies_for(&self, _url: &str) -> Result<HashMap<String, String>, DriverError> {
        Ok(self.locked().cookies.clone())
    }

    async fn is_attached(&self, selector: &str, _timeout: Duration) -> Result<bool, DriverError> {
        Ok(self.locked().attached.contains(selector))
    }

    async fn click(&self, selector: &str, _force: bool) -> Result<(), DriverError> {
        let mut state = self.locked();
        if !state.attached.contains(selector) {
            state.log.push(format!("click-missed:{selector}"));
            return Err(DriverError::ElementNotFound(selector.to_string()));
        }
        state.log.push(format!("click:{selector}"));
        let effect = state
            .click_effects
            .get_mut(selector)
            .and_then(VecDeque::pop_front)
            .unwrap_or(ClickEffect::Nothing);
        Self::apply_effect(&mut state, effect);
        Ok(())
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<(), DriverError> {
        self.locked().log.push(format!("fill:{selector}:{text}"));
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<(), DriverError> {
        self.locked().log.push(format!("type:{selector}:{text}"));
        Ok(())
    }

    async fn press(&self, selector: &str, key: &str) -> Result<(), DriverError> {
        self.locked().log.push(format!("press:{selector}:{key}"));
        Ok(())
    }

    async fn wait_for_load_state(
        &self,
        _state: LoadState,
        _timeout: Duration,
    ) -> Result<(), DriverError> {
        Ok(())
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), DriverError> {
        if self.locked().attached.contains(selector) {
            Ok(())
        } else {
            Err(DriverError::Timeout {
                what: selector.to_string(),
                duration: timeout,
            })
        }
    }

    async fn evaluate(&self, expression: &str) -> Result<Value, DriverError> {
        let call_line = expression
            .trim_end()
            .lines()
            .last()
            .unwrap_or("")
            .to_string();

        let view = {
            let state = self.locked();
            if !state.open {
                return Err(DriverError::PageGone("mock page closed".to_string()));
            }
            Self::view(&state)
        };

        // Built-in page mechanics come first so that, e.g., an extent rule
        // on "Math.max(document.body.scrollHeight" never swallows the
        // scroll-to-bottom call (which embeds the same expression).
        if call_line == "document.readyState" {
            return Ok(json!("complete"));
        }
        if call_line.contains("window.scrollTo") {
            let mut state = self.locked();
            *state.counters.entry("scrolls".to_string()).or_insert(0) += 1;
            state.log.push("scroll-to-edge".to_string());
            return Ok(Value::Null);
        }

        {
            let rules = self.eval_rules.lock().expect("eval rules lock poisoned");
            for (needle, f) in rules.iter() {
                if call_line.contains(needle.as_str()) {
                    return Ok(f(&view));
                }
            }
        }

        if call_line.starts_with("Math.max(document.body.scrollHeight") {
            return Ok(json!(view.scroll_height));
        }
        if call_line.contains("location.href") {
            return Ok(json!(view.url));
        }
        Ok(Value::Null)
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        self.locked().log.push("screenshot".to_string());
        Ok(vec![0x89, b'P', b'N', b'G'])
    }

    async fn scroll_by_viewports(&self, delta: f64) -> Result<(), DriverError> {
        self.locked().log.push(format!("scroll:{delta}"));
        Ok(())
    }

    async fn reload(&self) -> Result<(), DriverError> {
        self.locked().log.push("reload".to_string());
        Ok(())
    }

    async fn go_back(&self) -> Result<(), DriverError> {
        self.locked().log.push("back".to_string());
        Ok(())
    }

    async fn go_forward(&self) -> Result<(), DriverError> {
        let mut state = self.locked();
        state.log.push("forward".to_string());
        let effect = state
            .forward_effects
            .pop_front()
            .unwrap_or(ClickEffect::Nothing);
        Self::apply_effect(&mut state, effect);
        Ok(())
    }

    async fn set_blocked_urls(&self, patterns: &[String]) -> Result<(), DriverError> {
        self.locked().blocked_urls = patterns.to_vec();
        Ok(())
    }

    async fn open_page(&self, url: &str) -> Result<Arc<dyn PageDriver>, DriverError> {
        let page = self.locked().link_pages.get(url).cloned();
        match page {
            Some(page) => {
                self.locked().log.push(format!("open:{url}"));
                let page: Arc<dyn PageDriver> = page;
                Ok(page)
            }
            None => Err(DriverError::Call(format!("no page configured for {url}"))),
        }
    }

    async fn take_popup(&self) -> Result<Option<Arc<dyn PageDriver>>, DriverError> {
        let popup = self.locked().popups.pop_front();
        Ok(popup.map(|p| {
            let page: Arc<dyn PageDriver> = p;
            page
        }))
    }

    fn is_open(&self) -> bool {
        self.locked().open
    }

    async fn close(&self) -> Result<(), DriverError> {
        let mut state = self.locked();
        state.log.push("close".to_string());
        state.open = false;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RecordingHost
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Recorded {
    serializable: Vec<Value>,
    binary: Vec<(Vec<u8>, String)>,
    active_ids: Vec<usize>,
    debug: Vec<String>,
    flags: usize,
}

/// A host that records every callback and resumes flags immediately.
#[derive(Default)]
pub struct RecordingHost {
    inner: Mutex<Recorded>,
}

impl RecordingHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn locked(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.inner.lock().expect("recording host lock poisoned")
    }

    pub fn serializable(&self) -> Vec<Value> {
        self.locked().serializable.clone()
    }

    pub fn binary(&self) -> Vec<(Vec<u8>, String)> {
        self.locked().binary.clone()
    }

    pub fn active_ids(&self) -> Vec<usize> {
        self.locked().active_ids.clone()
    }

    pub fn debug_messages(&self) -> Vec<String> {
        self.locked().debug.clone()
    }

    pub fn flag_count(&self) -> usize {
        self.locked().flags
    }
}

#[async_trait]
impl Host for RecordingHost {
    async fn serializable(&self, data: Value) {
        self.locked().serializable.push(data);
    }

    async fn binary(&self, data: Vec<u8>, mime_type: &str) {
        self.locked().binary.push((data, mime_type.to_string()));
    }

    async fn active_id(&self, index: usize) {
        self.locked().active_ids.push(index);
    }

    async fn debug_message(&self, message: &str) {
        self.locked().debug.push(message.to_string());
    }

    async fn flag(&self, _page: Arc<dyn PageDriver>, resume: Resume) {
        self.locked().flags += 1;
        resume.resume();
    }
}

// ---------------------------------------------------------------------------
// Trait-object helpers
// ---------------------------------------------------------------------------

/// Hand a mock page to the interpreter as a driver trait object.
pub fn dyn_page(page: &Arc<MockPage>) -> Arc<dyn PageDriver> {
    let page: Arc<dyn PageDriver> = page.clone();
    page
}

/// Hand a recording host to the interpreter as a host trait object.
pub fn dyn_host(host: &Arc<RecordingHost>) -> Option<Arc<dyn Host>> {
    let host: Arc<dyn Host> = host.clone();
    Some(host)
}
