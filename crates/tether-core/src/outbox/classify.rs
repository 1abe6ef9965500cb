//! Delivery classifier: Transient or Fatal.
//!
//! Pure function of the reason code. The attempt count is not an
//! input; the ceiling is applied separately by [`super::RetryPolicy`].

use crate::domain::{DeliveryError, FailureClass, ReasonCode};

/// Classify a failed delivery.
pub fn classify(error: &DeliveryError) -> FailureClass {
    classify_code(error.code)
}

pub fn classify_code(code: ReasonCode) -> FailureClass {
    match code {
        ReasonCode::Unauthorized
        | ReasonCode::Forbidden
        | ReasonCode::NotFound
        | ReasonCode::ValidationRejected => FailureClass::Fatal,
        ReasonCode::Network | ReasonCode::Timeout | ReasonCode::Server | ReasonCode::Other => {
            FailureClass::Transient
        }
    }
}

impl ReasonCode {
    /// Map an HTTP status from a REST-style remote store.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            401 => ReasonCode::Unauthorized,
            403 => ReasonCode::Forbidden,
            404 => ReasonCode::NotFound,
            400 | 422 => ReasonCode::ValidationRejected,
            408 => ReasonCode::Timeout,
            500..=599 => ReasonCode::Server,
            _ => ReasonCode::Other,
        }
    }
}
