//! Impls - 実装（開発用・テスト用・ローカル用）
//!
//! このモジュールには ports の参照実装を含めます。
//!
//! # 含まれる実装
//! - **InMemoryStorage** / **FileStorage**: KeyValueStorage
//! - **ManualConnectivity**: ConnectivityMonitor
//! - **InMemoryRemoteStore**: RemoteStore（記録 + 失敗の台本）

pub mod file_storage;
pub mod inmem_remote;
pub mod inmem_storage;
pub mod manual_connectivity;

pub use self::file_storage::FileStorage;
pub use self::inmem_remote::{DeliveryCall, InMemoryRemoteStore};
pub use self::inmem_storage::InMemoryStorage;
pub use self::manual_connectivity::ManualConnectivity;
