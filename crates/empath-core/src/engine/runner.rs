//! Sequential, resumable inference over a scenario dataset.
//!
//! Per index: skip if already checkpointed, resolve the asset (missing →
//! skipped), call the client under [`retry_with_backoff`], append the
//! response. Exhausted transient errors skip the item; quota exhaustion
//! and unclassified errors halt the run with every earlier row intact.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use super::retry::{retry_with_backoff, BackoffPolicy};
use crate::checkpoint::CheckpointLedger;
use crate::dataset::CharacterTable;
use crate::error::GenerationError;
use crate::model::{ScenarioInput, ScenarioRecord};
use crate::prompts::PromptTemplate;
use crate::providers::GenerationClient;

/// Where a scenario's visual asset lives.
#[derive(Debug, Clone)]
pub enum AssetResolver {
    /// `<root>/<action_id>` must exist.
    Frames { root: PathBuf },
    /// Prompt-only; nothing to resolve.
    Text,
}

impl AssetResolver {
    pub fn resolve(
        &self,
        data_idx: usize,
        record: &ScenarioRecord,
    ) -> Result<ScenarioInput, GenerationError> {
        match self {
            AssetResolver::Text => Ok(ScenarioInput::text(data_idx)),
            AssetResolver::Frames { root } => {
                let dir = root.join(&record.action_id);
                if dir.exists() {
                    Ok(ScenarioInput::frames(data_idx, dir))
                } else {
                    Err(GenerationError::MissingAsset {
                        path: dir.display().to_string(),
                    })
                }
            }
        }
    }
}

/// Terminal state of one scenario within a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Done,
    AlreadyDone,
    Skipped { reason: String },
    FailedTransient { error: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub already_done: usize,
    pub done: usize,
    pub skipped: usize,
    pub failed_transient: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Done => self.done += 1,
            ItemOutcome::AlreadyDone => self.already_done += 1,
            ItemOutcome::Skipped { .. } => self.skipped += 1,
            ItemOutcome::FailedTransient { .. } => self.failed_transient += 1,
        }
    }

    /// Scenarios still missing from the checkpoint after this run.
    pub fn pending(&self) -> usize {
        self.skipped + self.failed_transient
    }
}

pub struct Orchestrator {
    client: Arc<dyn GenerationClient>,
    template: PromptTemplate,
    characters: CharacterTable,
    assets: AssetResolver,
    backoff: BackoffPolicy,
    pacing: Duration,
}

impl Orchestrator {
    pub fn new(
        client: Arc<dyn GenerationClient>,
        template: PromptTemplate,
        characters: CharacterTable,
        assets: AssetResolver,
    ) -> Self {
        Self {
            client,
            template,
            characters,
            assets,
            backoff: BackoffPolicy::default(),
            pacing: Duration::from_millis(80),
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Drive every pending scenario once. Returns `Err` only for conditions
    /// that must halt the run (fatal generation errors, ledger I/O).
    pub async fn run(
        &self,
        scenarios: &[ScenarioRecord],
        ledger: &mut CheckpointLedger,
    ) -> anyhow::Result<RunSummary> {
        let mut summary = RunSummary {
            total: scenarios.len(),
            ..RunSummary::default()
        };

        info!(
            model = %self.client.model(),
            provider = self.client.provider_name(),
            total = scenarios.len(),
            completed = ledger.len(),
            checkpoint = %ledger.path().display(),
            "starting inference"
        );

        for (data_idx, record) in scenarios.iter().enumerate() {
            let outcome = if ledger.contains(data_idx) {
                ItemOutcome::AlreadyDone
            } else {
                self.run_item(data_idx, record, ledger).await?
            };
            summary.record(&outcome);
        }

        info!(
            done = summary.done,
            already_done = summary.already_done,
            skipped = summary.skipped,
            failed_transient = summary.failed_transient,
            "inference finished"
        );
        Ok(summary)
    }

    async fn run_item(
        &self,
        data_idx: usize,
        record: &ScenarioRecord,
        ledger: &mut CheckpointLedger,
    ) -> anyhow::Result<ItemOutcome> {
        let input = match self.assets.resolve(data_idx, record) {
            Ok(input) => input,
            Err(e) => {
                warn!(data_idx, error = %e, "missing input; skipping");
                return Ok(ItemOutcome::Skipped {
                    reason: e.to_string(),
                });
            }
        };

        let Some(character_info) = self.characters.render(&record.character_id) else {
            warn!(data_idx, character_id = %record.character_id, "unknown character; skipping");
            return Ok(ItemOutcome::Skipped {
                reason: format!("unknown character {}", record.character_id),
            });
        };

        let prompt = self
            .template
            .render(&character_info, &record.dialogue, &record.scenario_context);

        let result = retry_with_backoff(&self.backoff, || self.client.generate(&input, &prompt)).await;

        match result {
            Ok(response) => {
                ledger.append(data_idx, &response)?;
                info!(data_idx, "checkpointed");
                if !self.pacing.is_zero() {
                    tokio::time::sleep(self.pacing).await;
                }
                Ok(ItemOutcome::Done)
            }
            Err(e @ GenerationError::MissingAsset { .. }) => {
                warn!(data_idx, error = %e, "asset unreadable; skipping");
                Ok(ItemOutcome::Skipped {
                    reason: e.to_string(),
                })
            }
            Err(e) if e.is_retryable() => {
                warn!(data_idx, error = %e, "retries exhausted; skipping");
                Ok(ItemOutcome::FailedTransient {
                    error: e.to_string(),
                })
            }
            Err(e) => {
                error!(data_idx, kind = e.kind(), error = %e, "fatal generation error; halting run");
                Err(anyhow::Error::new(e).context(format!("scenario {} halted the run", data_idx)))
            }
        }
    }
}
