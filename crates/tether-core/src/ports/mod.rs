//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 外部の協力者（リモートストア、接続監視、永続ストレージ）は trait の向こう側にあり、
//! outbox はそれらを注入されて動きます。
//!
//! 参照実装は `impls` にあります。

pub mod clock;
pub mod connectivity;
pub mod id_generator;
pub mod remote_store;
pub mod storage;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::connectivity::ConnectivityMonitor;
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::remote_store::RemoteStore;
pub use self::storage::{KeyValueStorage, StorageError};
