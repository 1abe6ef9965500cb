//! RemoteStore port - 配送先（リモートのデータストア）
//!
//! 中身のスキーマやクエリは関知しません。成功か、分類可能なエラーを返すだけです。

use async_trait::async_trait;

use crate::domain::{DeliveryError, Target, VisitorRecord};

/// Accepts one record for one target collection.
///
/// Implementations must report failures with a structured
/// [`crate::domain::ReasonCode`]; the engine never inspects message text.
/// No timeout is applied by the caller.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn deliver(&self, target: &Target, record: &VisitorRecord) -> Result<(), DeliveryError>;
}
