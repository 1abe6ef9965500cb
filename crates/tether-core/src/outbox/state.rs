//! Job state as seen from the outside (list display, status counters).

use serde::{Deserialize, Serialize};

use crate::domain::Job;

/// Derived state of a job still in the outbox.
///
/// State transitions:
/// - Pending -> (delivered, removed)
/// - Pending -> Retrying -> ... -> (delivered, removed)
/// - Pending / Retrying -> Quarantined (fatal failure or attempt ceiling)
/// - Quarantined -> (manual flush succeeds, removed)
///
/// Delivered jobs leave the outbox, so there is no `Succeeded` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Never attempted.
    Pending,

    /// Failed transiently; retried with backoff on the next automatic drain.
    Retrying,

    /// Excluded from automatic retry until a manual flush or discard.
    Quarantined,
}

impl JobState {
    pub fn of(job: &Job) -> Self {
        if job.quarantined {
            JobState::Quarantined
        } else if job.attempts == 0 {
            JobState::Pending
        } else {
            JobState::Retrying
        }
    }

    /// Will an automatic drain try this job?
    pub fn is_automatically_retried(self) -> bool {
        !matches!(self, JobState::Quarantined)
    }
}
