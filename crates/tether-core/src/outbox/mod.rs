//! Outbox module: persistence, delivery classification, retry policy and job state.

mod classify;
mod retry;
mod state;
mod store;

pub use classify::{classify, classify_code};
pub use retry::RetryPolicy;
pub use state::JobState;
pub use store::{DEFAULT_STORAGE_KEY, OutboxStore};
