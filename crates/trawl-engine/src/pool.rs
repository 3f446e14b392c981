//! Bounded job pool for popups and enqueued links.
//!
//! Jobs are futures that each interpret one page. At most `capacity` run
//! concurrently; excess jobs queue on the semaphore. The top-level run
//! completes only when the pool drains, including jobs submitted by jobs.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{Notify, Semaphore};
use tracing::debug;
use uuid::Uuid;

/// A type-erased page job.
pub type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Counting-semaphore job pool.
pub struct JobPool {
    semaphore: Arc<Semaphore>,
    active: Arc<AtomicUsize>,
    drained: Arc<Notify>,
}

impl JobPool {
    /// A pool running at most `capacity` jobs concurrently.
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity.max(1))),
            active: Arc::new(AtomicUsize::new(0)),
            drained: Arc::new(Notify::new()),
        }
    }

    /// Submit a job. It runs once a concurrency slot frees up.
    pub fn submit(&self, label: &str, job: Job) {
        let job_id = Uuid::new_v4();
        debug!(%job_id, label, "job submitted");

        self.active.fetch_add(1, Ordering::AcqRel);
        let semaphore = Arc::clone(&self.semaphore);
        let active = Arc::clone(&self.active);
        let drained = Arc::clone(&self.drained);
        let label = label.to_string();

        tokio::spawn(async move {
            // The semaphore is never closed, so acquisition only fails if
            // the pool itself is dropped mid-shutdown.
            if let Ok(_permit) = semaphore.acquire_owned().await {
                debug!(%job_id, label, "job started");
                job.await;
                debug!(%job_id, label, "job finished");
            }
            if active.fetch_sub(1, Ordering::AcqRel) == 1 {
                drained.notify_waiters();
            }
        });
    }

    /// Number of jobs submitted but not yet finished.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Wait until every submitted job (including ones submitted while
    /// draining) has finished.
    pub async fn drain(&self) {
        loop {
            let notified = self.drained.notified();
            if self.active.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }
}
