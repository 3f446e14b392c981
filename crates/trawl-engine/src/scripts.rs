//! In-page extraction runtime and its call builders.
//!
//! The extraction primitives run inside the page: a small JavaScript
//! runtime is installed once per page (idempotent, guarded by a window
//! flag) and every call builder prefixes its expression with the install
//! snippet. Selectors handed to these primitives may cross iframe
//! boundaries with `:>>` and shadow-DOM boundaries with `>>`; the runtime
//! resolves the hops, the Rust side never parses them.
//!
//! Arguments are embedded as JSON literals via `serde_json`, which makes
//! them valid JavaScript literals and closes string-escaping holes.

use serde_json::Value;

/// Idempotent runtime install. Evaluated before every extraction call.
pub const RUNTIME_INSTALL: &str = r#"
(() => {
    if (window.__trawlRuntime) { return; }

    const IFRAME_SEP = ':>>';
    const SHADOW_SEP = '>>';

    // Walk a '>>'-separated selector through shadow roots.
    const shadowQuery = (root, selector) => {
        const parts = selector.split(SHADOW_SEP).map((p) => p.trim()).filter((p) => p);
        let el = null;
        let ctx = root;
        for (const part of parts) {
            if (!ctx || !ctx.querySelector) { return null; }
            el = ctx.querySelector(part);
            if (!el) { return null; }
            ctx = el.shadowRoot || el;
        }
        return el;
    };

    // Resolve ':>>' iframe hops, returning the innermost document and the
    // remaining leaf selector.
    const frameContext = (root, selector) => {
        const parts = selector.split(IFRAME_SEP).map((p) => p.trim());
        let ctx = root;
        for (let i = 0; i < parts.length - 1; i++) {
            const frame = shadowQuery(ctx, parts[i]);
            if (!frame || !frame.contentDocument) { return null; }
            ctx = frame.contentDocument;
        }
        return { ctx, leaf: parts[parts.length - 1] };
    };

    const queryOne = (root, selector) => {
        const resolved = frameContext(root, selector);
        if (!resolved) { return null; }
        return shadowQuery(resolved.ctx, resolved.leaf);
    };

    const queryAll = (root, selector) => {
        const resolved = frameContext(root, selector);
        if (!resolved) { return []; }
        const parts = resolved.leaf.split(SHADOW_SEP).map((p) => p.trim()).filter((p) => p);
        let ctx = resolved.ctx;
        for (let i = 0; i < parts.length - 1; i++) {
            const el = ctx.querySelector ? ctx.querySelector(parts[i]) : null;
            if (!el) { return []; }
            ctx = el.shadowRoot || el;
        }
        if (!ctx || !ctx.querySelectorAll) { return []; }
        return Array.from(ctx.querySelectorAll(parts[parts.length - 1] || '*'));
    };

    const fieldValue = (el, attribute) => {
        if (!el) { return null; }
        if (attribute) {
            if (attribute === 'href' && el.href) { return el.href; }
            if (attribute === 'src' && el.src) { return el.src; }
            return el.getAttribute(attribute);
        }
        return (el.innerText || el.textContent || '').trim();
    };

    const scrapeOne = (selector) => {
        const el = selector ? queryOne(document, selector) : document.body;
        if (!el) { return null; }
        const attributes = {};
        for (const attr of Array.from(el.attributes || [])) {
            attributes[attr.name] = attr.value;
        }
        const record = { text: (el.innerText || '').trim(), attributes };
        if (el.href) { record.href = el.href; }
        if (el.src) { record.src = el.src; }
        return record;
    };

    const scrapeSchema = (schema) => {
        const row = {};
        for (const [name, spec] of Object.entries(schema || {})) {
            const el = queryOne(document, spec.selector);
            row[name] = fieldValue(el, spec.attribute);
        }
        return row;
    };

    const scrapeList = (listSelector, fields, limit) => {
        const out = [];
        for (const parent of queryAll(document, listSelector)) {
            if (limit && out.length >= limit) { break; }
            const record = {};
            for (const [name, spec] of Object.entries(fields || {})) {
                const el = spec.selector
                    ? (parent.querySelector(spec.selector) || queryOne(parent, spec.selector))
                    : parent;
                record[name] = fieldValue(el, spec.attribute);
            }
            out.push(record);
        }
        return out;
    };

    // Group a container's children by tag + class signature and offer the
    // largest group as list-item candidates.
    const autoDetectList = (seed) => {
        const container = seed ? queryOne(document, seed) : document.body;
        if (!container) { return []; }
        const groups = new Map();
        for (const child of Array.from(container.children || [])) {
            const key = child.tagName + '|' + (child.className || '');
            if (!groups.has(key)) { groups.set(key, []); }
            groups.get(key).push(child);
        }
        let best = [];
        for (const group of groups.values()) {
            if (group.length > best.length) { best = group; }
        }
        return best.map((el) => {
            const classes = String(el.className || '').trim().split(/\s+/).filter((c) => c);
            return {
                selector: el.tagName.toLowerCase() + (classes.length ? '.' + classes.join('.') : ''),
                innerText: (el.innerText || '').trim(),
            };
        });
    };

    const collectHrefs = (selector) =>
        Array.from(document.querySelectorAll(selector))
            .map((el) => el.href)
            .filter((href) => !!href);

    window.__trawlRuntime = { queryOne, queryAll, scrapeOne, scrapeSchema, scrapeList, autoDetectList, collectHrefs };
})();
"#;

fn js_str(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

fn with_runtime(call: String) -> String {
    format!("{RUNTIME_INSTALL}\n{call}")
}

/// Single-element scrape; `None` scrapes the document body.
pub fn scrape_one_call(selector: Option<&str>) -> String {
    let arg = selector.map(js_str).unwrap_or_else(|| "null".to_string());
    with_runtime(format!("window.__trawlRuntime.scrapeOne({arg})"))
}

/// Schema scrape over a `field → {selector, attribute, …}` mapping.
pub fn scrape_schema_call(schema: &Value) -> String {
    with_runtime(format!("window.__trawlRuntime.scrapeSchema({schema})"))
}

/// List scrape of `list_selector`'s matches with per-item `fields`.
pub fn scrape_list_call(list_selector: &str, fields: &Value, limit: Option<usize>) -> String {
    let limit = limit.map(|l| l.to_string()).unwrap_or_else(|| "null".to_string());
    with_runtime(format!(
        "window.__trawlRuntime.scrapeList({}, {fields}, {limit})",
        js_str(list_selector)
    ))
}

/// List auto-detection candidates for `seed` (or the body).
pub fn auto_detect_call(seed: Option<&str>) -> String {
    let arg = seed.map(js_str).unwrap_or_else(|| "null".to_string());
    with_runtime(format!("window.__trawlRuntime.autoDetectList({arg})"))
}

/// All hrefs under elements matching `selector`.
pub fn collect_hrefs_call(selector: &str) -> String {
    with_runtime(format!(
        "window.__trawlRuntime.collectHrefs({})",
        js_str(selector)
    ))
}

/// The page's scroll extent (grows as lazy content loads).
pub fn scroll_extent_call() -> String {
    "Math.max(document.body.scrollHeight, document.documentElement.scrollHeight)".to_string()
}

/// Scroll to the bottom of the scroll container.
pub fn scroll_to_bottom_call() -> String {
    "window.scrollTo(0, Math.max(document.body.scrollHeight, document.documentElement.scrollHeight))"
        .to_string()
}

/// Scroll to the top.
pub fn scroll_to_top_call() -> String {
    "window.scrollTo(0, 0)".to_string()
}

/// Wrap a user-supplied `script` body as an async IIFE with `page` and
/// `log` bindings. The body runs in the page context; `page` is the page's
/// own window and `log` forwards to the console.
pub fn wrap_user_script(code: &str) -> String {
    format!(
        "(async () => {{ const page = window; const log = (...args) => console.log(...args);\n{code}\n}})()"
    )
}
