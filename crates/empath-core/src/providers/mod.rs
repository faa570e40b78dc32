use async_trait::async_trait;

use crate::error::GenerationResult;
use crate::model::ScenarioInput;

/// One call against an external generation service.
///
/// Implementations own their payload handling; the orchestrator only sees
/// the response text or a classified [`crate::error::GenerationError`].
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(&self, input: &ScenarioInput, prompt: &str) -> GenerationResult<String>;
    fn model(&self) -> &str;
    fn provider_name(&self) -> &'static str;
}

pub mod degrade;
pub mod fake;
mod http;
pub mod openai;

pub use degrade::FrameBudgets;
pub use fake::ScriptedClient;
pub use openai::{TextClient, VisionClient};
