//! The interpreter: per-page main loop and run lifecycle.
//!
//! One interpreter is created per workflow and may interpret several pages
//! (popups, enqueued links), each with its own bookkeeping over a shared
//! run copy of the initialized workflow. Only one `run` may be active at a
//! time; a second call while one is active is a misuse error. `run` itself
//! never fails once started -- recoverable errors are logged and turned
//! into early termination with partial results.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::actions;
use crate::adblock;
use crate::driver::{LoadState, PageDriver};
use crate::error::EngineError;
use crate::host::{Host, NoopHost};
use crate::matcher::match_index;
use crate::pool::JobPool;
use crate::state::observe_state;
use trawl_types::{substitute_params, Pair, ParamMap, Workflow};

/// Best-effort load settle budget at the top of each loop iteration.
const LOAD_SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Interpreter tuning knobs. All optional with these defaults.
#[derive(Debug, Clone)]
pub struct InterpreterOptions {
    /// Consecutive firings of the same pair tolerated before the page's
    /// loop terminates.
    pub max_repeats: usize,
    /// Concurrent page jobs (popups + enqueued links).
    pub max_concurrency: usize,
    /// Emit `debug_message` events to the host.
    pub debug: bool,
}

impl Default for InterpreterOptions {
    fn default() -> Self {
        Self {
            max_repeats: 5,
            max_concurrency: 5,
            debug: false,
        }
    }
}

/// The workflow interpreter.
pub struct Interpreter {
    workflow: Workflow,
    pub(crate) options: InterpreterOptions,
    pub(crate) host: Arc<dyn Host>,
    pub(crate) pool: JobPool,
    schema_buffer: Mutex<Map<String, Value>>,
    run_copy: Mutex<Workflow>,
    running: AtomicBool,
    stopped: AtomicBool,
}

impl Interpreter {
    /// Validate the workflow and build an interpreter.
    ///
    /// Without a host, callbacks are dropped (a warning is logged once).
    pub fn new(
        workflow: Workflow,
        options: InterpreterOptions,
        host: Option<Arc<dyn Host>>,
    ) -> Result<Arc<Self>, EngineError> {
        workflow.validate()?;
        let host = host.unwrap_or_else(|| {
            warn!("no host attached; scraped data and events will be dropped");
            Arc::new(NoopHost)
        });
        let pool = JobPool::new(options.max_concurrency);
        Ok(Arc::new(Self {
            workflow,
            options,
            host,
            pool,
            schema_buffer: Mutex::new(Map::new()),
            run_copy: Mutex::new(Workflow::default()),
            running: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }))
    }

    /// Ask the interpreter to stop. Page loops exit before their next
    /// iteration; in-flight actions run to completion.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Interpret the workflow against a page.
    ///
    /// `params` fills `{"$param": …}` placeholders in the action arguments.
    /// Completes when no pair matches on any page and the job pool has
    /// drained. The only errors are misuse (double `run`); everything else
    /// is recovered or logged.
    pub async fn run(
        self: Arc<Self>,
        page: Arc<dyn PageDriver>,
        params: Option<ParamMap>,
    ) -> Result<(), EngineError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(EngineError::AlreadyRunning);
        }
        self.stopped.store(false, Ordering::SeqCst);

        let mut workflow = self.workflow.clone();
        if let Some(params) = &params {
            substitute_params(&mut workflow, params);
        }
        workflow.strip_special_selectors();
        *self.run_copy.lock().expect("run copy lock poisoned") = workflow;

        Arc::clone(&self).interpret_page(page).await;
        self.pool.drain().await;

        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Submit another page (popup) to the pool.
    pub(crate) fn submit_page(interp: &Arc<Self>, page: Arc<dyn PageDriver>, label: &str) {
        let job_interp = Arc::clone(interp);
        interp.pool.submit(
            label,
            Box::pin(async move {
                job_interp.interpret_page(page).await;
            }),
        );
    }

    /// Submit a discovered link: open a sibling page, then interpret it.
    pub(crate) fn submit_link(interp: &Arc<Self>, opener: Arc<dyn PageDriver>, url: String) {
        let job_interp = Arc::clone(interp);
        interp.pool.submit(
            "link",
            Box::pin(async move {
                match opener.open_page(&url).await {
                    Ok(page) => job_interp.interpret_page(page).await,
                    Err(e) => warn!(url = %url, error = %e, "failed to open enqueued link"),
                }
            }),
        );
    }

    /// The per-page main loop: observe → match → execute → repeat.
    async fn interpret_page(self: Arc<Self>, page: Arc<dyn PageDriver>) {
        let pairs: Vec<Pair> = self
            .run_copy
            .lock()
            .expect("run copy lock poisoned")
            .0
            .clone();
        let mut alive = vec![true; pairs.len()];
        let mut fired: Vec<String> = Vec::new();
        let mut last_action: Option<usize> = None;
        let mut repeat_count = 0usize;

        adblock::install(page.as_ref()).await;

        loop {
            if self.is_stopped() || !page.is_open() {
                break;
            }

            // Popups discovered since the previous iteration fan out as
            // independent loops over the same run copy.
            while let Ok(Some(popup)) = page.take_popup().await {
                Self::submit_page(&self, popup, "popup");
            }

            let _ = page
                .wait_for_load_state(LoadState::Load, LOAD_SETTLE_TIMEOUT)
                .await;

            let candidates = candidate_selectors(&pairs, &alive);
            let state = match observe_state(page.as_ref(), &pairs, &alive, &candidates).await {
                Ok(state) => state,
                Err(e) => {
                    info!(error = %e, "page unobservable, ending its loop");
                    break;
                }
            };

            let Some(index) = match_index(&pairs, &alive, &state, &fired) else {
                debug!(url = %state.url, "no pair matches, ending page loop");
                break;
            };

            if last_action == Some(index) {
                repeat_count += 1;
            } else {
                repeat_count = 0;
            }
            if repeat_count > self.options.max_repeats {
                info!(pair = index, "repeat limit exceeded, ending page loop");
                break;
            }
            last_action = Some(index);

            self.host.active_id(index).await;
            self.debug(format!("executing pair {index}")).await;

            match actions::run_body(&self, &page, &pairs[index].what).await {
                Ok(()) => {
                    if let Some(id) = &pairs[index].id {
                        fired.push(id.clone());
                    }
                    alive[index] = false;
                }
                Err(e) => {
                    // The pair stays alive; the loop moves on and the
                    // repeat guard bounds how often it can keep failing.
                    warn!(pair = index, error = %e, "pair body failed");
                    self.debug(format!("pair {index} failed: {e}")).await;
                }
            }
        }
    }

    /// Merge a schema row into the cumulative buffer and return a snapshot.
    pub(crate) fn merge_schema_row(&self, row: Map<String, Value>) -> Map<String, Value> {
        let mut buffer = self
            .schema_buffer
            .lock()
            .expect("schema buffer lock poisoned");
        actions::merge_row(&mut buffer, row);
        buffer.clone()
    }

    /// Emit a debug message when the debug channel is enabled.
    pub(crate) async fn debug(&self, message: String) {
        if self.options.debug {
            self.host.debug_message(&message).await;
        }
    }
}

/// Seed selectors for the next observation: the selectors of the last
/// still-alive pair that has a non-empty selector list. Only selectors
/// that can still fire a pair are worth probing.
fn candidate_selectors(pairs: &[Pair], alive: &[bool]) -> Vec<String> {
    pairs
        .iter()
        .enumerate()
        .rev()
        .filter(|(i, _)| alive.get(*i).copied().unwrap_or(false))
        .find_map(|(_, pair)| {
            pair.where_
                .selectors
                .as_ref()
                .filter(|s| !s.is_empty())
                .cloned()
        })
        .unwrap_or_default()
}
