//! Observed page state.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The observable state of a page at one instant: its URL, the cookie jar
/// scoped to that URL, and the candidate selectors currently attached to
/// the DOM. Recomputed before every matching decision and never cached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageState {
    pub url: String,
    pub cookies: HashMap<String, String>,
    pub selectors: Vec<String>,
}

impl PageState {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            cookies: HashMap::new(),
            selectors: Vec::new(),
        }
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selectors.push(selector.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates() {
        let state = PageState::new("https://example.com")
            .with_cookie("session", "abc")
            .with_selector("#next")
            .with_selector(".item");
        assert_eq!(state.url, "https://example.com");
        assert_eq!(state.cookies.get("session").map(String::as_str), Some("abc"));
        assert_eq!(state.selectors, vec!["#next", ".item"]);
    }

    #[test]
    fn serializes_to_expected_shape() {
        let state = PageState::new("https://a.com").with_cookie("k", "v");
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["url"], "https://a.com");
        assert_eq!(value["cookies"]["k"], "v");
        assert!(value["selectors"].as_array().unwrap().is_empty());
    }
}
