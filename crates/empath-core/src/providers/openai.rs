//! Chat-completions clients: text-only and multimodal.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::degrade::FrameBudgets;
use super::http::ChatBackend;
use super::GenerationClient;
use crate::auth::ApiKey;
use crate::config::{FrameSettings, GenerationConfig, TEXT_MODELS, VISION_MODELS};
use crate::error::{GenerationError, GenerationResult};
use crate::frames::{FramePayload, FrameSampler};
use crate::model::ScenarioInput;

fn check_model(model: &str, allowed: &[&str]) -> GenerationResult<()> {
    if allowed.contains(&model) {
        Ok(())
    } else {
        Err(GenerationError::InvalidConfig {
            message: format!("unsupported model '{}'; must be one of {:?}", model, allowed),
        })
    }
}

async fn pace(config: &GenerationConfig) {
    if config.pacing_ms > 0 {
        tokio::time::sleep(Duration::from_millis(config.pacing_ms)).await;
    }
}

/// Prompt-only client.
#[derive(Debug, Clone)]
pub struct TextClient {
    backend: ChatBackend,
}

impl TextClient {
    pub fn new(config: GenerationConfig, api_key: ApiKey) -> GenerationResult<Self> {
        check_model(&config.model, TEXT_MODELS)?;
        Ok(Self {
            backend: ChatBackend::new(config, api_key)?,
        })
    }

    /// Credential from `OPENAI_API_KEY`.
    pub fn from_env(config: GenerationConfig) -> GenerationResult<Self> {
        check_model(&config.model, TEXT_MODELS)?;
        Self::new(config, ApiKey::from_env()?)
    }
}

#[async_trait]
impl GenerationClient for TextClient {
    async fn generate(&self, _input: &ScenarioInput, prompt: &str) -> GenerationResult<String> {
        let text = self.backend.complete(Value::String(prompt.to_string())).await?;
        pace(&self.backend.config).await;
        Ok(text)
    }

    fn model(&self) -> &str {
        &self.backend.config.model
    }

    fn provider_name(&self) -> &'static str {
        "openai-text"
    }
}

/// Text plus sampled frames. Transient failures are retried with fewer
/// frames; see [`FrameBudgets`].
#[derive(Debug, Clone)]
pub struct VisionClient {
    backend: ChatBackend,
    sampler: FrameSampler,
    budgets: FrameBudgets,
}

impl VisionClient {
    pub fn new(
        config: GenerationConfig,
        api_key: ApiKey,
        frames: FrameSettings,
    ) -> GenerationResult<Self> {
        check_model(&config.model, VISION_MODELS)?;
        let budgets = FrameBudgets::new(frames.budgets.clone())?;
        Ok(Self {
            backend: ChatBackend::new(config, api_key)?,
            sampler: FrameSampler::new(frames),
            budgets,
        })
    }

    /// Credential from `OPENAI_API_KEY`.
    pub fn from_env(config: GenerationConfig, frames: FrameSettings) -> GenerationResult<Self> {
        check_model(&config.model, VISION_MODELS)?;
        Self::new(config, ApiKey::from_env()?, frames)
    }

    async fn attempt(
        &self,
        input: &ScenarioInput,
        prompt: &str,
        max_frames: usize,
    ) -> GenerationResult<String> {
        let payload = match &input.asset {
            Some(dir) => self.sampler.build(dir, max_frames)?,
            None => FramePayload::default(),
        };
        debug!(
            data_idx = input.data_idx,
            frames = payload.len(),
            budget = max_frames,
            "built frame payload"
        );
        self.backend.complete(content_parts(prompt, &payload)).await
    }
}

#[async_trait]
impl GenerationClient for VisionClient {
    async fn generate(&self, input: &ScenarioInput, prompt: &str) -> GenerationResult<String> {
        let text = self
            .budgets
            .run(|k| self.attempt(input, prompt, k))
            .await?;
        info!(data_idx = input.data_idx, chars = text.len(), "generation complete");
        pace(&self.backend.config).await;
        Ok(text)
    }

    fn model(&self) -> &str {
        &self.backend.config.model
    }

    fn provider_name(&self) -> &'static str {
        "openai-vision"
    }
}

/// Text part first, then one `image_url` part per frame.
fn content_parts(prompt: &str, payload: &FramePayload) -> Value {
    let mut parts = Vec::with_capacity(payload.len() + 1);
    parts.push(json!({ "type": "text", "text": prompt }));
    for frame in &payload.frames {
        parts.push(json!({
            "type": "image_url",
            "image_url": { "url": frame.data_url() }
        }));
    }
    Value::Array(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::EncodedFrame;

    fn key() -> ApiKey {
        ApiKey::parse("sk-test").unwrap()
    }

    #[test]
    fn vision_rejects_text_only_model() {
        let cfg = GenerationConfig::default().with_model("gpt-3.5-turbo");
        let err = VisionClient::new(cfg, key(), FrameSettings::default()).unwrap_err();
        assert!(matches!(err, GenerationError::InvalidConfig { .. }));
    }

    #[test]
    fn text_accepts_text_only_model() {
        let cfg = GenerationConfig::default().with_model("gpt-3.5-turbo");
        let client = TextClient::new(cfg, key()).unwrap();
        assert_eq!(client.model(), "gpt-3.5-turbo");
    }

    #[test]
    fn unknown_model_rejected_before_credential() {
        let cfg = GenerationConfig::default().with_model("llama-70b");
        let err = TextClient::from_env(cfg).unwrap_err();
        assert!(matches!(err, GenerationError::InvalidConfig { .. }));
    }

    #[test]
    fn content_parts_put_text_first() {
        let payload = FramePayload {
            frames: vec![EncodedFrame {
                file_name: "000.jpg".into(),
                mime: "image/jpeg",
                base64: "AAAA".into(),
            }],
        };
        let parts = content_parts("plan?", &payload);
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["image_url"]["url"], "data:image/jpeg;base64,AAAA");
    }
}
