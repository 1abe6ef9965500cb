//! KeyValueStorage port - 永続化（単一キーに文字列を保存）

use async_trait::async_trait;

/// Errors from a storage backend or from encoding the queue.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode outbox: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Durable string storage keyed by name.
///
/// `set` must overwrite the whole value; a reader never sees a partial write.
#[async_trait]
pub trait KeyValueStorage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError>;
}
