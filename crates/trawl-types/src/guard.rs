//! Guard (`where` clause) model.
//!
//! A guard is a tree whose leaves are base predicates over page state (URL,
//! cookies, attached selectors) and whose internal nodes are the boolean
//! combinators `$and`, `$or`, `$not`, plus the execution-history predicates
//! `$before` and `$after`. Base predicates present at a single node combine
//! conjunctively.
//!
//! Unknown `$`-prefixed keys are rejected at deserialization time, so a
//! guard that parses is a guard the matcher fully understands.

use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;

/// A string predicate: exact equality or a regular-expression match.
///
/// On the wire this is either a plain JSON string or `{"$regex": "pattern"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringMatcher {
    /// Exact string equality.
    Exact(String),
    /// Regular-expression match.
    Regex {
        #[serde(rename = "$regex")]
        pattern: String,
    },
}

impl StringMatcher {
    /// Test a value against this matcher.
    ///
    /// Patterns are compiled during workflow validation, so a failure to
    /// compile here means the matcher was never validated; it matches
    /// nothing rather than panicking.
    pub fn matches(&self, value: &str) -> bool {
        match self {
            StringMatcher::Exact(expected) => expected == value,
            StringMatcher::Regex { pattern } => Regex::new(pattern)
                .map(|re| re.is_match(value))
                .unwrap_or(false),
        }
    }

    /// The exact string, if this matcher is not a regex.
    pub fn as_exact(&self) -> Option<&str> {
        match self {
            StringMatcher::Exact(s) => Some(s),
            StringMatcher::Regex { .. } => None,
        }
    }

    /// Compile-check the pattern (no-op for exact matchers).
    pub fn validate(&self, index: usize) -> Result<(), WorkflowError> {
        if let StringMatcher::Regex { pattern } = self {
            Regex::new(pattern).map_err(|e| WorkflowError::InvalidRegex {
                index,
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }
}

/// A guard node. All fields optional; an empty guard matches any state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Where {
    /// Page URL predicate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<StringMatcher>,

    /// Cookie name → expected value predicates. Every listed cookie must be
    /// present and match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookies: Option<HashMap<String, StringMatcher>>,

    /// Candidate selectors; the guard holds iff at least one of them is
    /// attached in the observed state (both-empty also holds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selectors: Option<Vec<String>>,

    /// All children must match.
    #[serde(rename = "$and", skip_serializing_if = "Option::is_none")]
    pub and: Option<Vec<Where>>,

    /// At least one child must match.
    #[serde(rename = "$or", skip_serializing_if = "Option::is_none")]
    pub or: Option<Vec<Where>>,

    /// Child must not match.
    #[serde(rename = "$not", skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<Where>>,

    /// Holds iff no fired pair id matches the given matcher.
    #[serde(rename = "$before", skip_serializing_if = "Option::is_none")]
    pub before: Option<StringMatcher>,

    /// Holds iff some fired pair id matches the given matcher.
    #[serde(rename = "$after", skip_serializing_if = "Option::is_none")]
    pub after: Option<StringMatcher>,
}

impl Where {
    /// True when no predicate is present at this node.
    pub fn is_empty(&self) -> bool {
        self.url.is_none()
            && self.cookies.is_none()
            && self.selectors.is_none()
            && self.and.is_none()
            && self.or.is_none()
            && self.not.is_none()
            && self.before.is_none()
            && self.after.is_none()
    }

    /// Compile-check every regex in the tree.
    pub fn validate(&self, index: usize) -> Result<(), WorkflowError> {
        if let Some(m) = &self.url {
            m.validate(index)?;
        }
        if let Some(cookies) = &self.cookies {
            for m in cookies.values() {
                m.validate(index)?;
            }
        }
        for child in self.and.iter().flatten().chain(self.or.iter().flatten()) {
            child.validate(index)?;
        }
        if let Some(child) = &self.not {
            child.validate(index)?;
        }
        if let Some(m) = &self.before {
            m.validate(index)?;
        }
        if let Some(m) = &self.after {
            m.validate(index)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn exact_matcher_from_plain_string() {
        let m: StringMatcher = serde_json::from_value(json!("https://example.com")).unwrap();
        assert!(m.matches("https://example.com"));
        assert!(!m.matches("https://example.com/x"));
        assert_eq!(m.as_exact(), Some("https://example.com"));
    }

    #[test]
    fn regex_matcher_from_dollar_regex() {
        let m: StringMatcher = serde_json::from_value(json!({ "$regex": "example\\.com" })).unwrap();
        assert!(m.matches("https://example.com/page/2"));
        assert!(!m.matches("https://other.org"));
        assert_eq!(m.as_exact(), None);
    }

    #[test]
    fn invalid_regex_fails_validation() {
        let m = StringMatcher::Regex {
            pattern: "(".into(),
        };
        assert!(m.validate(0).is_err());
        // And never matches at runtime.
        assert!(!m.matches("anything"));
    }

    #[test]
    fn empty_guard_parses_and_is_empty() {
        let w: Where = serde_json::from_value(json!({})).unwrap();
        assert!(w.is_empty());
    }

    #[test]
    fn full_guard_round_trips() {
        let input = json!({
            "url": { "$regex": "shop\\." },
            "cookies": { "session": "abc123" },
            "selectors": ["#cart", ".checkout"],
            "$after": "login"
        });
        let w: Where = serde_json::from_value(input.clone()).unwrap();
        assert!(!w.is_empty());
        assert_eq!(serde_json::to_value(&w).unwrap(), input);
    }

    #[test]
    fn unknown_operator_is_rejected() {
        let result: Result<Where, _> =
            serde_json::from_value(json!({ "$sometimes": { "url": "x" } }));
        assert!(result.is_err(), "unknown $-operator must fail to parse");
    }

    #[test]
    fn nested_combinators_parse() {
        let w: Where = serde_json::from_value(json!({
            "$or": [
                { "url": "https://a.com" },
                { "$and": [
                    { "selectors": ["#next"] },
                    { "$not": { "$after": "done" } }
                ]}
            ]
        }))
        .unwrap();
        assert!(w.or.is_some());
        assert!(w.validate(0).is_ok());
    }

    #[test]
    fn nested_invalid_regex_caught_by_validate() {
        let w: Where = serde_json::from_value(json!({
            "$and": [ { "url": { "$regex": "[" } } ]
        }))
        .unwrap();
        assert!(w.validate(3).is_err());
    }
}
