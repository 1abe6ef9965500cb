//! Errors - 配送エラーと分類
//!
//! Remote Store は自由文のメッセージではなく、構造化された [`ReasonCode`] を返します。
//! Transient / Fatal の判定は `outbox::classify` がこのコードだけを見て行います。

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a failed delivery is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Network failure, timeout, server fault: may succeed later.
    Transient,

    /// Client-side rejection: the same payload will never succeed.
    Fatal,
}

impl FailureClass {
    pub fn is_fatal(self) -> bool {
        matches!(self, FailureClass::Fatal)
    }
}

/// Reason code reported by the Remote Store for a failed delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    Unauthorized,
    Forbidden,
    NotFound,
    ValidationRejected,
    Network,
    Timeout,
    Server,
    Other,
}

impl ReasonCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ReasonCode::Unauthorized => "unauthorized",
            ReasonCode::Forbidden => "forbidden",
            ReasonCode::NotFound => "not_found",
            ReasonCode::ValidationRejected => "validation_rejected",
            ReasonCode::Network => "network",
            ReasonCode::Timeout => "timeout",
            ReasonCode::Server => "server",
            ReasonCode::Other => "other",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed delivery as surfaced by a [`crate::ports::RemoteStore`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct DeliveryError {
    pub code: ReasonCode,
    pub message: String,
}

impl DeliveryError {
    pub fn new(code: ReasonCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Structured summary of the last failure, persisted with the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureInfo {
    pub class: FailureClass,
    pub code: ReasonCode,
}
