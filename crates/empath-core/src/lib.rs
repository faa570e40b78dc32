//! Resumable batch inference for empathetic action-plan evaluation.
//!
//! [`engine::Orchestrator`] drives a [`providers::GenerationClient`] over a
//! scenario dataset and appends each response to a
//! [`checkpoint::CheckpointLedger`]; [`export`] turns that ledger into the
//! prediction file the scorer reads.

pub mod auth;
pub mod checkpoint;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod export;
pub mod frames;
pub mod model;
pub mod prompts;
pub mod providers;

pub use checkpoint::CheckpointLedger;
pub use config::{AssetMode, FrameSettings, GenerationConfig, RunConfig};
pub use engine::{AssetResolver, BackoffPolicy, ItemOutcome, Orchestrator, RunSummary};
pub use error::{GenerationError, GenerationResult};
pub use model::{PredictionRow, ScenarioInput, ScenarioRecord, Task};
pub use providers::GenerationClient;
