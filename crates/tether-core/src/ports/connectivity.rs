//! ConnectivityMonitor port - オンライン / オフライン通知
//!
//! 検出方法は関知しません。`watch` チャネルで状態遷移を受け取ります。

use tokio::sync::watch;

/// Reports binary online/offline state.
///
/// Every value sent on the channel after `subscribe` is treated as a
/// transition. The value current at subscription time is ignored: the
/// outbox assumes it is online until the first signal.
pub trait ConnectivityMonitor: Send + Sync {
    fn subscribe(&self) -> watch::Receiver<bool>;
}
