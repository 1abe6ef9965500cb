//! Status - UI 向けのスナップショット

use serde::{Deserialize, Serialize};

use crate::domain::Job;
use crate::outbox::JobState;

/// Counters for a status banner ("Online - 3 pending (syncing...)").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxStatus {
    pub online: bool,
    pub draining: bool,

    /// All jobs still in the outbox, quarantined ones included.
    pub pending: usize,

    /// Jobs waiting for a manual flush or discard.
    pub quarantined: usize,

    /// Jobs that failed at least once and will be retried automatically.
    pub retrying: usize,

    /// The latest save failed; the queue only lives in memory until the next
    /// successful save.
    pub persist_failed: bool,
}

impl OutboxStatus {
    pub(crate) fn count_jobs(&mut self, jobs: &[Job]) {
        self.pending = jobs.len();
        for job in jobs {
            match job.state() {
                JobState::Pending => {}
                JobState::Retrying => self.retrying += 1,
                JobState::Quarantined => self.quarantined += 1,
            }
        }
    }
}
