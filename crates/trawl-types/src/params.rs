//! Parameter substitution for action arguments.
//!
//! A placeholder is an object of the exact shape `{"$param": "<name>"}`.
//! Substitution replaces it with the caller-supplied value; placeholders
//! with no matching parameter are left in place and surface as an error
//! when the action holding them executes.

use std::collections::HashMap;

use serde_json::Value;

use crate::workflow::Workflow;

/// Caller-supplied parameter mapping.
pub type ParamMap = HashMap<String, Value>;

/// Substitute `{"$param": name}` placeholders throughout a workflow's
/// action arguments. Idempotent on workflows without placeholders.
pub fn substitute_params(workflow: &mut Workflow, params: &ParamMap) {
    for pair in &mut workflow.0 {
        for action in &mut pair.what {
            if let Some(args) = &mut action.args {
                substitute_value(args, params);
            }
        }
    }
}

fn substitute_value(value: &mut Value, params: &ParamMap) {
    if let Some(name) = placeholder_name(value) {
        if let Some(replacement) = params.get(name) {
            *value = replacement.clone();
        }
        return;
    }
    match value {
        Value::Array(items) => {
            for item in items {
                substitute_value(item, params);
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                substitute_value(item, params);
            }
        }
        _ => {}
    }
}

/// The name of the first unresolved placeholder in a value tree, if any.
pub fn first_unresolved_param(value: &Value) -> Option<&str> {
    if let Some(name) = placeholder_name(value) {
        return Some(name);
    }
    match value {
        Value::Array(items) => items.iter().find_map(first_unresolved_param),
        Value::Object(map) => map.values().find_map(first_unresolved_param),
        _ => None,
    }
}

fn placeholder_name(value: &Value) -> Option<&str> {
    let map = value.as_object()?;
    if map.len() != 1 {
        return None;
    }
    map.get("$param")?.as_str()
}
