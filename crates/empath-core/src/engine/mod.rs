pub mod retry;
pub mod runner;

pub use retry::{retry_with_backoff, BackoffPolicy};
pub use runner::{AssetResolver, ItemOutcome, Orchestrator, RunSummary};
