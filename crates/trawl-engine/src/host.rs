//! The host interface.
//!
//! The interpreter talks back to its host through exactly five methods:
//! serializable records, binary artifacts, the active pair index, debug
//! messages, and `flag` breakpoint events. Hosts that don't care implement
//! nothing and get [`NoopHost`], which logs a warning at attach time and
//! resumes every flag immediately.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::driver::PageDriver;

/// Resume handle delivered with a `flag` event.
///
/// The interpreter suspends the page's loop until [`Resume::resume`] is
/// called or the handle is dropped. Holding the handle without calling it
/// pauses the run indefinitely; stepping is pause-then-resume.
#[derive(Debug)]
pub struct Resume {
    tx: Option<oneshot::Sender<()>>,
}

impl Resume {
    pub(crate) fn new() -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Let the interpreter continue.
    pub fn resume(mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Callbacks and events crossing the interpreter boundary.
#[async_trait]
pub trait Host: Send + Sync {
    /// A scraped, serializable record (single scrape, schema snapshot, or a
    /// complete paginated list).
    async fn serializable(&self, data: Value);

    /// Binary artifact delivery (screenshots).
    async fn binary(&self, data: Vec<u8>, mime_type: &str);

    /// The pair index about to execute.
    async fn active_id(&self, index: usize);

    /// Diagnostic message; emitted only when the interpreter runs with
    /// `debug` enabled.
    async fn debug_message(&self, message: &str);

    /// Breakpoint hook: the page being interpreted and a resume handle.
    async fn flag(&self, page: Arc<dyn PageDriver>, resume: Resume);
}

/// Host that drops every callback. Flags resume immediately.
pub struct NoopHost;

#[async_trait]
impl Host for NoopHost {
    async fn serializable(&self, _data: Value) {}

    async fn binary(&self, _data: Vec<u8>, _mime_type: &str) {}

    async fn active_id(&self, _index: usize) {}

    async fn debug_message(&self, _message: &str) {}

    async fn flag(&self, _page: Arc<dyn PageDriver>, resume: Resume) {
        resume.resume();
    }
}
