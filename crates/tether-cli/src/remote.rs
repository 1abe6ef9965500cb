//! JsonlRemoteStore - ローカルファイルを Remote Store に見立てる
//!
//! 配送されたレコードを 1 行 1 JSON で追記します。
//! `--fail-with` を指定すると、すべての配送がそのコードで失敗します。

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use tether_core::domain::{DeliveryError, ReasonCode, Target, VisitorRecord};
use tether_core::ports::RemoteStore;

#[derive(Serialize)]
struct DeliveredLine<'a> {
    target: &'a Target,
    record: &'a VisitorRecord,
    delivered_at: DateTime<Utc>,
}

pub struct JsonlRemoteStore {
    path: PathBuf,
    fail_with: Option<ReasonCode>,
}

impl JsonlRemoteStore {
    pub fn new(path: impl Into<PathBuf>, fail_with: Option<ReasonCode>) -> Self {
        Self {
            path: path.into(),
            fail_with,
        }
    }
}

#[async_trait]
impl RemoteStore for JsonlRemoteStore {
    async fn deliver(&self, target: &Target, record: &VisitorRecord) -> Result<(), DeliveryError> {
        if let Some(code) = self.fail_with {
            return Err(DeliveryError::new(code, "rejected by --fail-with"));
        }

        let line = DeliveredLine {
            target,
            record,
            delivered_at: Utc::now(),
        };
        let mut raw = serde_json::to_string(&line)
            .map_err(|e| DeliveryError::new(ReasonCode::Other, format!("encode: {e}")))?;
        raw.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| DeliveryError::new(ReasonCode::Network, format!("open sink: {e}")))?;
        file.write_all(raw.as_bytes())
            .await
            .map_err(|e| DeliveryError::new(ReasonCode::Network, format!("write sink: {e}")))?;
        file.flush()
            .await
            .map_err(|e| DeliveryError::new(ReasonCode::Network, format!("flush sink: {e}")))?;
        Ok(())
    }
}
