//! tether-core
//!
//! Offline outbox for a capture client: records submitted while disconnected
//! are persisted, then delivered to the remote store in submission order once
//! connectivity returns.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, record, job, errors）
//! - **ports**: 抽象化レイヤー（RemoteStore, ConnectivityMonitor, KeyValueStorage, Clock, IdGenerator）
//! - **outbox**: 永続化・分類・リトライ方針（OutboxStore, classify, RetryPolicy, JobState）
//! - **app**: アプリケーションロジック（OutboxBuilder, Outbox, SyncEngine, OutboxStatus）
//! - **impls**: 参照実装（InMemoryStorage, FileStorage, ManualConnectivity, InMemoryRemoteStore）
//! - **config**: OutboxConfig
//! - **observability**: tracing の初期化

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod outbox;
pub mod ports;

pub use app::{DrainOutcome, DrainReport, Outbox, OutboxBuilder, OutboxStatus, SkipReason};
pub use config::OutboxConfig;
pub use domain::{DeliveryError, Job, JobId, ReasonCode, VisitorRecord};
