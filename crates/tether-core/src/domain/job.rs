//! Job record: one pending write held in the outbox.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::outbox::JobState;

use super::errors::{DeliveryError, FailureClass, FailureInfo};
use super::ids::JobId;
use super::record::VisitorRecord;

/// Remote collection / resource a job writes to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Target(String);

impl Target {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Target {
    fn default() -> Self {
        Self::new("visitantes")
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Operation carried by a job.
///
/// Closed set: adding a kind forces every `match` (the engine's delivery
/// dispatch in particular) to handle it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobOp {
    Insert {
        target: Target,
        payload: VisitorRecord,
    },
}

/// One queued write and its retry metadata.
///
/// Design:
/// - `id` / `op` / `created_at` never change after `submit`.
/// - `attempts` only grows; the engine is the only writer of the retry fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,

    #[serde(flatten)]
    pub op: JobOp,

    /// Delivery attempts already made.
    pub attempts: u32,

    /// Most recent failure text (diagnostics only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_failure: Option<FailureInfo>,

    /// Set after a fatal failure or when the attempt ceiling is reached.
    /// Only a manual flush retries a quarantined job.
    #[serde(default)]
    pub quarantined: bool,

    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn insert(
        id: JobId,
        target: Target,
        payload: VisitorRecord,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            op: JobOp::Insert { target, payload },
            attempts: 0,
            last_error: None,
            last_failure: None,
            quarantined: false,
            created_at,
        }
    }

    pub fn target(&self) -> &Target {
        match &self.op {
            JobOp::Insert { target, .. } => target,
        }
    }

    pub fn payload(&self) -> &VisitorRecord {
        match &self.op {
            JobOp::Insert { payload, .. } => payload,
        }
    }

    /// Count a failed attempt and remember why it failed.
    pub fn record_failure(&mut self, error: &DeliveryError, class: FailureClass) {
        self.attempts = self.attempts.saturating_add(1);
        self.last_error = Some(error.to_string());
        self.last_failure = Some(FailureInfo {
            class,
            code: error.code,
        });
    }

    pub fn quarantine(&mut self) {
        self.quarantined = true;
    }

    pub fn state(&self) -> JobState {
        JobState::of(self)
    }
}
