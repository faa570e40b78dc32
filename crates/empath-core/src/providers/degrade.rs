//! Payload degradation: retry a transient failure with a smaller frame budget.
//!
//! Rate limits are not retried here; the orchestrator owns that backoff so
//! the two layers never compound.

use std::future::Future;

use tracing::warn;

use crate::error::{GenerationError, GenerationResult};

/// Strictly descending, non-empty list of frame budgets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBudgets(Vec<usize>);

impl FrameBudgets {
    pub fn new(budgets: Vec<usize>) -> GenerationResult<Self> {
        if budgets.is_empty() {
            return Err(GenerationError::InvalidConfig {
                message: "frame budgets must not be empty".into(),
            });
        }
        if budgets.contains(&0) {
            return Err(GenerationError::InvalidConfig {
                message: "frame budgets must be positive".into(),
            });
        }
        if budgets.windows(2).any(|w| w[0] <= w[1]) {
            return Err(GenerationError::InvalidConfig {
                message: format!("frame budgets must be strictly descending: {:?}", budgets),
            });
        }
        Ok(Self(budgets))
    }

    pub fn smallest(&self) -> usize {
        self.0.last().copied().unwrap_or(0)
    }

    /// Run `call` with each budget in turn until it succeeds or fails with
    /// anything other than a transient error. The last transient error is
    /// returned once the smallest budget has failed.
    pub async fn run<F, Fut>(&self, mut call: F) -> GenerationResult<String>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = GenerationResult<String>>,
    {
        let mut last_err = None;
        for (i, &budget) in self.0.iter().enumerate() {
            match call(budget).await {
                Ok(text) => return Ok(text),
                Err(e @ GenerationError::Transient { .. }) => {
                    if let Some(&next) = self.0.get(i + 1) {
                        warn!(
                            error = %e,
                            frames = budget,
                            next_frames = next,
                            "transient error; retrying with fewer frames"
                        );
                    }
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or_else(|| GenerationError::unknown("no frame budget attempted")))
    }
}

impl Default for FrameBudgets {
    fn default() -> Self {
        Self(vec![12, 8, 6, 4])
    }
}
