//! Trawl: a declarative web-scraping workflow interpreter.
//!
//! A workflow is an ordered list of *where→what* pairs. The engine drives
//! a browser page, repeatedly observes its state, picks the most recent
//! still-applicable pair, executes its actions, and loops -- producing
//! serializable records and binary artifacts through host callbacks.
//!
//! The workspace splits into:
//!
//! - [`types`]: the workflow data model, validation and parameter
//!   substitution
//! - [`engine`]: the interpreter (matcher, executor, scraping primitives,
//!   pagination, concurrency)
//! - [`browser`]: the CDP page driver
//!
//! The commonly used entry points are re-exported at the crate root.

pub use trawl_browser as browser;
pub use trawl_engine as engine;
pub use trawl_types as types;

pub use trawl_browser::CdpPage;
pub use trawl_engine::{
    EngineError, Host, Interpreter, InterpreterOptions, NoopHost, PageDriver, Resume,
};
pub use trawl_types::{PageState, Workflow, WorkflowError};
