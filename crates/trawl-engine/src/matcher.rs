//! Guard matching over observed page state.
//!
//! Every predicate present at a node must hold (logical AND); absent
//! predicates are unconstrained. An empty guard therefore matches any
//! state. Selection scans the run's still-alive pairs from last to first
//! and returns the first match: later-declared rules are more specific
//! overrides, and tail-first scanning makes an override beat a more
//! general earlier rule without extra annotations.

use trawl_types::{PageState, Pair, StringMatcher, Where};

/// Evaluate a guard against a page state and the ordered list of
/// already-fired pair ids.
pub fn where_matches(where_: &Where, state: &PageState, fired: &[String]) -> bool {
    if let Some(url) = &where_.url {
        if !url.matches(&state.url) {
            return false;
        }
    }

    if let Some(cookies) = &where_.cookies {
        for (name, expected) in cookies {
            match state.cookies.get(name) {
                Some(value) if expected.matches(value) => {}
                _ => return false,
            }
        }
    }

    if let Some(selectors) = &where_.selectors {
        if !selectors_match(selectors, &state.selectors) {
            return false;
        }
    }

    if let Some(children) = &where_.and {
        if !children.iter().all(|c| where_matches(c, state, fired)) {
            return false;
        }
    }

    if let Some(children) = &where_.or {
        if !children.iter().any(|c| where_matches(c, state, fired)) {
            return false;
        }
    }

    if let Some(child) = &where_.not {
        if where_matches(child, state, fired) {
            return false;
        }
    }

    if let Some(id) = &where_.before {
        if id_fired(id, fired) {
            return false;
        }
    }

    if let Some(id) = &where_.after {
        if !id_fired(id, fired) {
            return false;
        }
    }

    true
}

/// The selectors predicate holds iff the guard's list and the observed
/// list intersect, or both are empty.
fn selectors_match(guard: &[String], observed: &[String]) -> bool {
    if guard.is_empty() && observed.is_empty() {
        return true;
    }
    guard.iter().any(|s| observed.contains(s))
}

fn id_fired(id: &StringMatcher, fired: &[String]) -> bool {
    fired.iter().any(|f| id.matches(f))
}

/// Find the pair to fire: scan alive pairs from the tail and return the
/// index of the first whose guard matches.
pub fn match_index(
    pairs: &[Pair],
    alive: &[bool],
    state: &PageState,
    fired: &[String],
) -> Option<usize> {
    pairs
        .iter()
        .enumerate()
        .rev()
        .filter(|(i, _)| alive.get(*i).copied().unwrap_or(false))
        .find(|(_, pair)| where_matches(&pair.where_, state, fired))
        .map(|(i, _)| i)
}
