//! The trawl workflow interpreter.
//!
//! Drives a controllable browser page through a declarative workflow:
//! repeatedly observe the page state, pick the most recent still-applicable
//! pair, execute its body, and loop. Scraped records and binary artifacts
//! cross back to the host through the [`Host`] trait.
//!
//! # Architecture
//!
//! - **`driver`**: the [`PageDriver`] trait -- the closed surface the
//!   interpreter needs from a browser page. `trawl-browser` implements it
//!   over CDP; tests implement it with scripted mocks.
//! - **`matcher`**: guard evaluation and tail-first pair selection.
//! - **`state`**: page-state extraction (URL, cookies, attached selectors).
//! - **`actions`**: the action executor and its dispatch table.
//! - **`scripts`**: the in-page extraction runtime and its call builders.
//! - **`paginate`**: multi-page list extraction across five strategies.
//! - **`pool`**: the bounded job pool for popups and enqueued links.
//! - **`interpreter`**: the per-page main loop and run lifecycle.
//!
//! # Example (conceptual)
//!
//! ```ignore
//! let workflow = Workflow::from_value(serde_json::json!([
//!     { "where": { "url": { "$regex": "example\\.com" } },
//!       "what": [ { "action": "scrape" } ] }
//! ]))?;
//! let interpreter = Interpreter::new(workflow, InterpreterOptions::default(), Some(host))?;
//! interpreter.run(page, None).await?;
//! ```

pub mod actions;
pub mod adblock;
pub mod driver;
pub mod error;
pub mod host;
pub mod interpreter;
pub mod matcher;
pub mod paginate;
pub mod pool;
pub mod scripts;
pub mod state;

pub use driver::{DriverError, LoadState, PageDriver};
pub use error::EngineError;
pub use host::{Host, NoopHost, Resume};
pub use interpreter::{Interpreter, InterpreterOptions};
pub use paginate::{ListScrape, Pagination, PaginationKind};
