//! InMemoryRemoteStore - 開発用・テスト用の RemoteStore
//!
//! 受け取ったレコードを記録します。失敗を台本どおりに返したり、
//! 配送に時間がかかる状況を再現したりできます。

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::domain::{DeliveryError, ReasonCode, Target, VisitorRecord};
use crate::ports::RemoteStore;

/// One `deliver` call as observed by the store.
#[derive(Debug, Clone)]
pub struct DeliveryCall {
    pub target: Target,
    pub record: VisitorRecord,
    pub at: Instant,
    pub accepted: bool,
}

#[derive(Default)]
struct Script {
    /// Consumed one per call before `always` is consulted.
    queued: VecDeque<DeliveryError>,
    always: Option<ReasonCode>,
}

#[derive(Default)]
pub struct InMemoryRemoteStore {
    calls: Mutex<Vec<DeliveryCall>>,
    script: Mutex<Script>,
    latency: Option<Duration>,
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps for `latency` before answering.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    /// Fail the next call with `error` (queued failures are used in order).
    pub async fn fail_next(&self, error: DeliveryError) {
        self.script.lock().await.queued.push_back(error);
    }

    /// Fail every call with `code` until cleared with `None`.
    pub async fn fail_always(&self, code: Option<ReasonCode>) {
        self.script.lock().await.always = code;
    }

    pub async fn calls(&self) -> Vec<DeliveryCall> {
        self.calls.lock().await.clone()
    }

    /// Records accepted so far, in delivery order.
    pub async fn accepted(&self) -> Vec<VisitorRecord> {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|c| c.accepted)
            .map(|c| c.record.clone())
            .collect()
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    async fn deliver(&self, target: &Target, record: &VisitorRecord) -> Result<(), DeliveryError> {
        let at = Instant::now();
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let outcome = {
            let mut script = self.script.lock().await;
            match script.queued.pop_front() {
                Some(err) => Err(err),
                None => match script.always {
                    Some(code) => Err(DeliveryError::new(code, format!("simulated {code}"))),
                    None => Ok(()),
                },
            }
        };

        self.calls.lock().await.push(DeliveryCall {
            target: target.clone(),
            record: record.clone(),
            at,
            accepted: outcome.is_ok(),
        });
        outcome
    }
}
