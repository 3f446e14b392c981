//! Action execution.
//!
//! Each step of a fired pair's body dispatches over the closed action
//! table: either a built-in scraping/navigation primitive or a driver
//! method. Argument normalization: absent or `null` means no arguments, a
//! list spreads positionally, anything else is a single argument. `type`
//! and `press` take at most (selector, value) -- extra positional values
//! are dropped so stray modifier arguments cannot leak typed secrets.
//!
//! Error policy: `waitForLoadState` retries once with `domcontentloaded`;
//! `click` retries once with force and on a second failure skips the rest
//! of the body silently; everything else propagates to the main loop,
//! which logs and moves to its next iteration.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::driver::{LoadState, PageDriver};
use crate::error::EngineError;
use crate::host::Resume;
use crate::interpreter::Interpreter;
use crate::paginate::{self, ListScrape};
use crate::scripts;
use trawl_types::{first_unresolved_param, Action};

/// Settle pause between consecutive actions.
pub const ACTION_SETTLE: Duration = Duration::from_millis(500);
/// Default budget for explicit waits.
const DEFAULT_WAIT: Duration = Duration::from_secs(30);

/// Execute a pair's body to completion.
///
/// Returns `Ok(())` when the body completed (including the silent
/// click-skip path); the caller then records the firing. A propagated
/// failure leaves the pair unfired.
pub(crate) async fn run_body(
    interp: &Arc<Interpreter>,
    page: &Arc<dyn PageDriver>,
    body: &[Action],
) -> Result<(), EngineError> {
    for action in body {
        if let Some(name) = action.args.as_ref().and_then(first_unresolved_param) {
            return Err(EngineError::UnresolvedParam {
                action: action.action.clone(),
                name: name.to_string(),
            });
        }

        let flow = execute_action(interp, page, action).await?;
        sleep(ACTION_SETTLE).await;
        if flow.is_break() {
            break;
        }
    }
    Ok(())
}

fn positional(args: &Option<Value>) -> Vec<Value> {
    match args {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(value) => vec![value.clone()],
    }
}

fn arg_str(args: &[Value], index: usize) -> Option<&str> {
    args.get(index).and_then(Value::as_str)
}

fn required_str<'a>(args: &'a [Value], index: usize, action: &str) -> Result<&'a str, EngineError> {
    arg_str(args, index).ok_or_else(|| EngineError::BadArgs {
        action: action.to_string(),
        reason: format!("expected a string at position {index}"),
    })
}

async fn execute_action(
    interp: &Arc<Interpreter>,
    page: &Arc<dyn PageDriver>,
    action: &Action,
) -> Result<ControlFlow<()>, EngineError> {
    let args = positional(&action.args);
    let name = action.action.as_str();
    debug!(action = name, "executing action");

    match name {
        // -- built-in primitives -------------------------------------------
        "screenshot" => {
            let bytes = page.screenshot().await?;
            interp.host.binary(bytes, "image/png").await;
        }
        "scrape" => {
            let call = scripts::scrape_one_call(arg_str(&args, 0));
            let record = page.evaluate(&call).await?;
            interp.host.serializable(record).await;
        }
        "scrapeSchema" => {
            let schema = args.first().cloned().ok_or_else(|| EngineError::BadArgs {
                action: name.to_string(),
                reason: "expected a schema object".to_string(),
            })?;
            let row = page.evaluate(&scripts::scrape_schema_call(&schema)).await?;
            let row = match row {
                Value::Object(map) => map,
                other => {
                    return Err(EngineError::BadArgs {
                        action: name.to_string(),
                        reason: format!("schema extraction returned {other}"),
                    })
                }
            };
            let merged = interp.merge_schema_row(row);
            interp.host.serializable(Value::Object(merged)).await;
        }
        "scrapeList" => {
            let raw = args.first().cloned().ok_or_else(|| EngineError::BadArgs {
                action: name.to_string(),
                reason: "expected a list configuration".to_string(),
            })?;
            let cfg: ListScrape =
                serde_json::from_value(raw).map_err(|e| EngineError::BadArgs {
                    action: name.to_string(),
                    reason: e.to_string(),
                })?;
            let items = paginate::collect_list(page, &cfg).await;
            interp.host.serializable(Value::Array(items)).await;
        }
        "scrapeListAuto" => {
            let call = scripts::auto_detect_call(arg_str(&args, 0));
            let candidates = page.evaluate(&call).await?;
            interp.host.serializable(candidates).await;
        }
        "scroll" => {
            let delta = args.first().and_then(Value::as_f64).unwrap_or(1.0);
            page.scroll_by_viewports(delta).await?;
        }
        "script" => {
            let code = required_str(&args, 0, name)?;
            let result = page.evaluate(&scripts::wrap_user_script(code)).await?;
            interp.debug(format!("script result: {result}")).await;
        }
        "enqueueLinks" => {
            let selector = required_str(&args, 0, name)?;
            let hrefs = page.evaluate(&scripts::collect_hrefs_call(selector)).await?;
            let hrefs: Vec<String> = hrefs
                .as_array()
                .map(|list| {
                    list.iter()
                        .filter_map(|v| v.as_str().map(String::from))
                        .collect()
                })
                .unwrap_or_default();
            debug!(count = hrefs.len(), "enqueueing discovered links");
            for href in hrefs {
                Interpreter::submit_link(interp, Arc::clone(page), href);
            }
            if let Err(e) = page.close().await {
                debug!(error = %e, "failed to close page after enqueueLinks");
            }
        }
        "flag" => {
            let (resume, resumed) = Resume::new();
            interp.host.flag(Arc::clone(page), resume).await;
            // A dropped handle counts as an implicit resume.
            let _ = resumed.await;
        }

        // -- driver methods ------------------------------------------------
        "goto" => {
            page.goto(required_str(&args, 0, name)?).await?;
        }
        "click" => {
            let selector = required_str(&args, 0, name)?;
            if let Err(first) = page.click(selector, false).await {
                debug!(selector, error = %first, "click failed, retrying with force");
                if let Err(second) = page.click(selector, true).await {
                    warn!(selector, error = %second, "forced click failed, skipping rest of body");
                    return Ok(ControlFlow::Break(()));
                }
            }
        }
        "type" => {
            let selector = required_str(&args, 0, name)?;
            let text = arg_str(&args, 1).unwrap_or_default();
            page.type_text(selector, text).await?;
        }
        "fill" => {
            let selector = required_str(&args, 0, name)?;
            let text = arg_str(&args, 1).unwrap_or_default();
            page.fill(selector, text).await?;
        }
        "press" => {
            let selector = required_str(&args, 0, name)?;
            let key = arg_str(&args, 1).unwrap_or_default();
            page.press(selector, key).await?;
        }
        "waitForLoadState" => {
            let state = LoadState::from_arg(arg_str(&args, 0));
            if let Err(first) = page.wait_for_load_state(state, DEFAULT_WAIT).await {
                debug!(error = %first, "waitForLoadState failed, retrying with domcontentloaded");
                page.wait_for_load_state(LoadState::DomContentLoaded, DEFAULT_WAIT)
                    .await?;
            }
        }
        "waitForTimeout" => {
            let ms = args.first().and_then(Value::as_u64).unwrap_or(0);
            sleep(Duration::from_millis(ms)).await;
        }
        "waitForSelector" => {
            let selector = required_str(&args, 0, name)?;
            let timeout = args
                .get(1)
                .and_then(Value::as_u64)
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_WAIT);
            page.wait_for_selector(selector, timeout).await?;
        }
        "reload" => {
            page.reload().await?;
        }
        "goBack" => {
            page.go_back().await?;
        }
        "goForward" => {
            page.go_forward().await?;
        }

        // Unreachable for validated workflows.
        other => {
            return Err(EngineError::BadArgs {
                action: other.to_string(),
                reason: "not in the dispatch table".to_string(),
            });
        }
    }

    Ok(ControlFlow::Continue(()))
}

/// First-non-null-wins merge of a schema row into a cumulative buffer.
/// Fields already set are never overwritten; null extractions never claim
/// a field.
pub(crate) fn merge_row(buffer: &mut Map<String, Value>, row: Map<String, Value>) {
    for (field, value) in row {
        if value.is_null() {
            continue;
        }
        buffer.entry(field).or_insert(value);
    }
}
