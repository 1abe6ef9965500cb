//! SyncEngine - outbox を Remote Store へ流し込むループ
//!
//! # フロー（1 サイクル）
//! 1. single-flight ガードを取る（取れなければ何もしない）
//! 2. オフライン / 空なら何もしない
//! 3. 先頭のジョブから順に: backoff → deliver → 成功なら削除して次へ
//! 4. 失敗したら attempts を増やして記録し、サイクルを止める
//!
//! # 設計原則
//! - ジョブ列を変更するのは engine だけ（API は末尾への追加のみ）
//! - 変更と永続化は同じロックの中で行う（読み手からは原子的に見える）
//! - backoff 待ちと配送の間はロックを持たない

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, Notify, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::{FailureClass, Job, JobId, JobOp};
use crate::outbox::{OutboxStore, RetryPolicy, classify};
use crate::ports::RemoteStore;

/// What started a drain cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Connectivity went from offline to online.
    Reconnect,
    /// A job was submitted while online.
    Submit,
    /// Follow-up after a transient failure.
    Retry,
    /// Explicit flush request from the application.
    Manual,
}

impl Trigger {
    /// Manual flushes also retry quarantined jobs.
    pub fn is_manual(self) -> bool {
        matches!(self, Trigger::Manual)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyDraining,
    Offline,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    /// The cycle did not start.
    Skipped(SkipReason),

    /// Every job was delivered.
    Exhausted,

    /// A delivery failed and the cycle stopped there.
    Failed {
        job_id: JobId,
        class: FailureClass,
        quarantined: bool,
    },

    /// An automatic cycle reached a quarantined job and stopped without
    /// touching it.
    Blocked { job_id: JobId },
}

/// Result of one drain cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainReport {
    pub trigger: Trigger,
    pub delivered: usize,
    pub outcome: DrainOutcome,
}

impl DrainReport {
    fn skipped(trigger: Trigger, reason: SkipReason) -> Self {
        Self {
            trigger,
            delivered: 0,
            outcome: DrainOutcome::Skipped(reason),
        }
    }

    pub fn was_skipped(&self) -> bool {
        matches!(self.outcome, DrainOutcome::Skipped(_))
    }

    /// Stopped on a transient failure that still has attempts left.
    pub fn wants_retry(&self) -> bool {
        matches!(
            self.outcome,
            DrainOutcome::Failed {
                quarantined: false,
                ..
            }
        )
    }
}

/// Engine tuning, taken from [`crate::config::OutboxConfig`].
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub retry_policy: RetryPolicy,
    pub save_retries: u32,
    pub save_retry_delay: Duration,
    pub auto_retry: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            retry_policy: RetryPolicy::default(),
            save_retries: 2,
            save_retry_delay: Duration::from_millis(50),
            auto_retry: true,
        }
    }
}

/// Clears the single-flight flag when the cycle ends, whatever the exit path.
struct DrainGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> DrainGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct SyncEngine {
    store: OutboxStore,
    remote: Arc<dyn RemoteStore>,
    settings: EngineSettings,

    /// In-memory queue; the persisted copy is rewritten after each mutation.
    jobs: Mutex<Vec<Job>>,

    draining: AtomicBool,
    online: AtomicBool,
    persist_failed: AtomicBool,

    /// Spawned cycle runners that have not finished yet.
    in_flight: AtomicUsize,
    idle: Notify,
}

impl SyncEngine {
    /// Build an engine over the jobs currently persisted in `store`.
    pub async fn load(
        store: OutboxStore,
        remote: Arc<dyn RemoteStore>,
        settings: EngineSettings,
        online: bool,
    ) -> Self {
        let jobs = store.load().await;
        info!(pending = jobs.len(), online, "Outbox loaded");
        Self {
            store,
            remote,
            settings,
            jobs: Mutex::new(jobs),
            draining: AtomicBool::new(false),
            online: AtomicBool::new(online),
            persist_failed: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
            idle: Notify::new(),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    /// Did the most recent persist fail (even after retries)?
    pub fn persist_failed(&self) -> bool {
        self.persist_failed.load(Ordering::Acquire)
    }

    /// Record a connectivity signal. Returns `true` on an offline -> online transition.
    pub fn set_online(&self, online: bool) -> bool {
        let was_online = self.online.swap(online, Ordering::AcqRel);
        if was_online != online {
            info!(online, "Connectivity changed");
        }
        !was_online && online
    }

    pub async fn pending_count(&self) -> usize {
        self.jobs.lock().await.len()
    }

    pub async fn snapshot(&self) -> Vec<Job> {
        self.jobs.lock().await.clone()
    }

    /// Append a job and persist.
    pub async fn append(&self, job: Job) {
        let mut jobs = self.jobs.lock().await;
        debug!(job_id = %job.id, position = jobs.len(), "Enqueued job");
        jobs.push(job);
        self.persist(&jobs).await;
    }

    /// Remove a job outside of a drain cycle. Refused while draining.
    pub async fn discard(&self, job_id: JobId) -> bool {
        let mut jobs = self.jobs.lock().await;
        if self.is_draining() {
            warn!(job_id = %job_id, "Refusing to discard while a drain is active");
            return false;
        }
        let before = jobs.len();
        jobs.retain(|j| j.id != job_id);
        if jobs.len() == before {
            return false;
        }
        info!(job_id = %job_id, "Discarded job");
        self.persist(&jobs).await;
        true
    }

    /// Run one drain cycle to its natural end.
    pub async fn drain(&self, trigger: Trigger) -> DrainReport {
        let Some(_guard) = DrainGuard::acquire(&self.draining) else {
            debug!(?trigger, "Drain already active, coalescing");
            return DrainReport::skipped(trigger, SkipReason::AlreadyDraining);
        };
        if !self.is_online() {
            return DrainReport::skipped(trigger, SkipReason::Offline);
        }
        if self.jobs.lock().await.is_empty() {
            return DrainReport::skipped(trigger, SkipReason::Empty);
        }

        debug!(?trigger, "Drain started");
        let mut delivered = 0;
        let outcome = loop {
            let head = self.jobs.lock().await.first().cloned();
            let Some(job) = head else {
                break DrainOutcome::Exhausted;
            };

            if !job.state().is_automatically_retried() && !trigger.is_manual() {
                debug!(job_id = %job.id, "Head job is quarantined, waiting for manual flush");
                break DrainOutcome::Blocked { job_id: job.id };
            }

            if job.attempts > 0 {
                let delay = self.settings.retry_policy.backoff(job.attempts);
                debug!(job_id = %job.id, attempts = job.attempts, ?delay, "Backing off");
                tokio::time::sleep(delay).await;
            }

            let result = match &job.op {
                JobOp::Insert { target, payload } => self.remote.deliver(target, payload).await,
            };

            match result {
                Ok(()) => {
                    let mut jobs = self.jobs.lock().await;
                    jobs.retain(|j| j.id != job.id);
                    self.persist(&jobs).await;
                    delivered += 1;
                    info!(job_id = %job.id, attempts = job.attempts + 1, "Delivered job");
                }
                Err(err) => {
                    let class = classify(&err);
                    let mut jobs = self.jobs.lock().await;
                    let mut quarantined = false;
                    if let Some(entry) = jobs.iter_mut().find(|j| j.id == job.id) {
                        entry.record_failure(&err, class);
                        let policy = &self.settings.retry_policy;
                        if class.is_fatal() || policy.is_exhausted(entry.attempts) {
                            entry.quarantine();
                        }
                        quarantined = entry.quarantined;
                        warn!(
                            job_id = %job.id,
                            attempts = entry.attempts,
                            ?class,
                            quarantined,
                            error = %err,
                            "Delivery failed"
                        );
                    }
                    self.persist(&jobs).await;
                    break DrainOutcome::Failed {
                        job_id: job.id,
                        class,
                        quarantined,
                    };
                }
            }
        };

        debug!(?trigger, delivered, ?outcome, "Drain finished");
        DrainReport {
            trigger,
            delivered,
            outcome,
        }
    }

    /// Run cycles until there is nothing more to do for this request.
    ///
    /// A cycle that stopped on a transient failure is followed by a `Retry`
    /// cycle while online (when `auto_retry` is on). A cycle that emptied the
    /// queue is re-run if jobs arrived while its guard was still held.
    pub async fn run(&self, trigger: Trigger) -> DrainReport {
        let first = self.drain(trigger).await;
        let mut last = first.clone();
        loop {
            let again = if last.wants_retry() {
                self.settings.auto_retry && self.is_online()
            } else if matches!(last.outcome, DrainOutcome::Exhausted) {
                self.is_online() && self.pending_count().await > 0
            } else {
                false
            };
            if !again {
                break;
            }
            last = self.drain(Trigger::Retry).await;
        }
        first
    }

    /// Start [`SyncEngine::run`] in the background.
    pub fn request_drain(self: &Arc<Self>, trigger: Trigger) {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let report = engine.run(trigger).await;
            if report.was_skipped() {
                debug!(?trigger, outcome = ?report.outcome, "Background drain skipped");
            } else {
                debug!(?report, "Background drain done");
            }
            if engine.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
                engine.idle.notify_waiters();
            }
        });
    }

    /// Wait until no background drain is running or scheduled.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.in_flight.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Follow connectivity signals until `shutdown` fires or the monitor goes away.
    pub fn watch_connectivity(
        self: &Arc<Self>,
        mut signals: watch::Receiver<bool>,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    changed = signals.changed() => {
                        if changed.is_err() {
                            debug!("Connectivity monitor dropped, watcher stopping");
                            break;
                        }
                        let online = *signals.borrow_and_update();
                        if engine.set_online(online) {
                            engine.request_drain(Trigger::Reconnect);
                        }
                    }
                }
            }
        })
    }

    /// Persist `jobs`, retrying a few times. Failure is logged, never raised:
    /// the in-memory queue stays authoritative and the next save catches up.
    async fn persist(&self, jobs: &[Job]) {
        let mut attempt = 0;
        loop {
            match self.store.save(jobs).await {
                Ok(()) => {
                    self.persist_failed.store(false, Ordering::Release);
                    return;
                }
                Err(e) if attempt < self.settings.save_retries => {
                    attempt += 1;
                    debug!(error = %e, attempt, "Outbox save failed, retrying");
                    tokio::time::sleep(self.settings.save_retry_delay).await;
                }
                Err(e) => {
                    self.persist_failed.store(true, Ordering::Release);
                    warn!(
                        key = %self.store.key(),
                        error = %e,
                        pending = jobs.len(),
                        "Outbox save failed; queued jobs may be lost on exit"
                    );
                    return;
                }
            }
        }
    }
}
