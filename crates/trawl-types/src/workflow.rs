//! Workflow, pair and action types, plus structural validation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::WorkflowError;
use crate::guard::Where;

/// Built-in interpreter primitives.
pub const BUILTIN_ACTIONS: &[&str] = &[
    "screenshot",
    "enqueueLinks",
    "scrape",
    "scrapeSchema",
    "scrapeList",
    "scrapeListAuto",
    "scroll",
    "script",
    "flag",
];

/// Driver methods addressable from a workflow body.
///
/// This is the closed dispatch table: dotted-path lookup into the driver is
/// replaced by membership here, checked during validation.
pub const DRIVER_ACTIONS: &[&str] = &[
    "goto",
    "click",
    "type",
    "fill",
    "press",
    "waitForLoadState",
    "waitForTimeout",
    "waitForSelector",
    "reload",
    "goBack",
    "goForward",
];

/// Whether an action name is dispatchable.
pub fn is_known_action(name: &str) -> bool {
    BUILTIN_ACTIONS.contains(&name) || DRIVER_ACTIONS.contains(&name)
}

/// One step of a pair's body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Action name; must pass [`is_known_action`].
    pub action: String,

    /// A single argument value or a positional list; absent means none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
}

impl Action {
    pub fn new(action: impl Into<String>, args: Option<Value>) -> Self {
        Self {
            action: action.into(),
            args,
        }
    }
}

/// A *where→what* pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pair {
    /// Stable id, referenced by `$before`/`$after` guards. Pairs without an
    /// id fire without being recorded in the history.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "where")]
    pub where_: Where,

    pub what: Vec<Action>,
}

/// An ordered list of pairs. Later pairs win ties: the matcher scans from
/// the tail, so a later, more specific rule overrides an earlier general one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Workflow(pub Vec<Pair>);

impl Workflow {
    /// Parse a workflow from a JSON value and validate it.
    ///
    /// Shape errors (not an array, missing `where`/`what`, non-string action
    /// names, unknown `$` operators) surface from deserialization; unknown
    /// action names and invalid regexes from [`Workflow::validate`].
    pub fn from_value(value: Value) -> Result<Self, WorkflowError> {
        let workflow: Workflow = serde_json::from_value(value)
            .map_err(|e| WorkflowError::Malformed(e.to_string()))?;
        workflow.validate()?;
        Ok(workflow)
    }

    /// Validate pair guards and action names against the dispatch table.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        for (index, pair) in self.0.iter().enumerate() {
            pair.where_.validate(index)?;
            for step in &pair.what {
                if !is_known_action(&step.action) {
                    return Err(WorkflowError::UnknownAction {
                        index,
                        name: step.action.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Drop guard selectors that cross iframe (`:>>`) or shadow-DOM (`>>`)
    /// boundaries. Those selectors only make sense to the in-page
    /// extractors; the matcher probes the top document.
    pub fn strip_special_selectors(&mut self) {
        for pair in &mut self.0 {
            strip_where(&mut pair.where_);
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn strip_where(where_: &mut Where) {
    if let Some(selectors) = &mut where_.selectors {
        selectors.retain(|s| !s.contains(":>>") && !s.contains(">>"));
    }
    for child in where_
        .and
        .iter_mut()
        .flatten()
        .chain(where_.or.iter_mut().flatten())
    {
        strip_where(child);
    }
    if let Some(child) = &mut where_.not {
        strip_where(child);
    }
}
