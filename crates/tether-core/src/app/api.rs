//! Outbox - presentation 層が触る唯一の API
//!
//! ```ignore
//! let outbox = OutboxBuilder::new()
//!     .storage(storage)
//!     .remote_store(remote)
//!     .connectivity(&monitor)
//!     .build()
//!     .await?;
//!
//! let id = outbox.submit(record).await;   // すぐ返る。配送は非同期
//! println!("pending: {}", outbox.pending_count().await);
//! outbox.flush();                          // 手動リトライ
//! ```

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::domain::{Job, JobId, Target, VisitorRecord};
use crate::ports::{Clock, IdGenerator};

use super::engine::{DrainReport, SyncEngine, Trigger};
use super::status::OutboxStatus;

/// Handle over one outbox. Construct once per process with
/// [`super::OutboxBuilder`].
pub struct Outbox {
    engine: Arc<SyncEngine>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    target: Target,
    shutdown_tx: watch::Sender<bool>,
    watcher: Option<JoinHandle<()>>,
}

impl Outbox {
    pub(crate) fn new(
        engine: Arc<SyncEngine>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
        target: Target,
        shutdown_tx: watch::Sender<bool>,
        watcher: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            engine,
            ids,
            clock,
            target,
            shutdown_tx,
            watcher,
        }
    }

    /// Queue `record` for delivery and return its job id.
    ///
    /// The job is persisted before this returns. If online, a drain is
    /// requested in the background; this never waits for the network.
    pub async fn submit(&self, record: VisitorRecord) -> JobId {
        let id = self.ids.generate_job_id();
        let job = Job::insert(id, self.target.clone(), record, self.clock.now());
        self.engine.append(job).await;

        if self.engine.is_online() {
            self.engine.request_drain(Trigger::Submit);
        } else {
            debug!(job_id = %id, "Offline, job waits for reconnect");
        }
        id
    }

    /// Jobs in the outbox, quarantined ones included.
    pub async fn pending_count(&self) -> usize {
        self.engine.pending_count().await
    }

    pub fn is_draining(&self) -> bool {
        self.engine.is_draining()
    }

    pub fn is_online(&self) -> bool {
        self.engine.is_online()
    }

    /// Request a manual drain in the background. Coalesced if one is active.
    pub fn flush(&self) {
        self.engine.request_drain(Trigger::Manual);
    }

    /// Run a manual drain cycle and report what it did.
    ///
    /// Returns a skipped report if a drain is already active. A transient
    /// failure still schedules the usual follow-up in the background.
    pub async fn flush_now(&self) -> DrainReport {
        let report = self.engine.drain(Trigger::Manual).await;
        if report.wants_retry() && self.engine.settings().auto_retry {
            self.engine.request_drain(Trigger::Retry);
        }
        report
    }

    /// Snapshot of the queue in delivery order.
    pub async fn jobs(&self) -> Vec<Job> {
        self.engine.snapshot().await
    }

    pub async fn status(&self) -> OutboxStatus {
        let jobs = self.engine.snapshot().await;
        let mut status = OutboxStatus {
            online: self.engine.is_online(),
            draining: self.engine.is_draining(),
            persist_failed: self.engine.persist_failed(),
            ..OutboxStatus::default()
        };
        status.count_jobs(&jobs);
        status
    }

    /// Drop a job without delivering it (e.g. a quarantined record the user
    /// gave up on). Returns `false` if it is unknown or a drain is active.
    pub async fn discard(&self, job_id: JobId) -> bool {
        self.engine.discard(job_id).await
    }

    /// Wait until background drains requested so far have finished.
    pub async fn wait_idle(&self) {
        self.engine.wait_idle().await;
    }

    /// Stop following connectivity and wait for background drains to finish.
    /// In-flight deliveries are not cancelled.
    pub async fn shutdown(mut self) {
        // ignore send error: the watcher may already be gone
        let _ = self.shutdown_tx.send(true);
        if let Some(watcher) = self.watcher.take() {
            let _ = watcher.await;
        }
        self.engine.wait_idle().await;
        info!("Outbox shut down");
    }
}
