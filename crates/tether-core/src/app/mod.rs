//! App - アプリケーション層
//!
//! ports を組み合わせて outbox を動かします。
//!
//! # 主要コンポーネント
//! - **OutboxBuilder**: 構築とワイヤリング
//! - **Outbox**: presentation 層向けの API（submit / pending_count / flush）
//! - **SyncEngine**: drain ループ（single-flight, backoff, 失敗で停止）
//! - **OutboxStatus**: UI 向けのスナップショット

pub mod api;
pub mod builder;
pub mod engine;
pub mod status;

pub use self::api::Outbox;
pub use self::builder::{BuildError, OutboxBuilder};
pub use self::engine::{DrainOutcome, DrainReport, EngineSettings, SkipReason, SyncEngine, Trigger};
pub use self::status::OutboxStatus;
