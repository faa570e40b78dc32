//! Run configuration.
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `OPENAI_API_BASE` | Service base URL (default: `https://api.openai.com/v1`) |
//! | `EMPATH_REQUEST_TIMEOUT` | Request timeout in seconds (default: 60) |
//! | `EMPATH_MAX_TOKENS` | Max tokens per response (default: 300) |
//! | `EMPATH_TEMPERATURE` | Sampling temperature (default: 0) |

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::engine::retry::BackoffPolicy;
use crate::model::Task;

/// Models accepted by the multimodal client.
pub const VISION_MODELS: &[&str] = &["gpt-4o", "gpt-4o-mini", "gpt-4-turbo", "gpt-4-vision-preview"];

/// Models accepted by the text-only client.
pub const TEXT_MODELS: &[&str] = &[
    "gpt-4o",
    "gpt-4o-mini",
    "gpt-4-turbo",
    "gpt-4-vision-preview",
    "gpt-3.5-turbo",
];

/// Settings for a single generation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Transport-level timeout; expiry surfaces as a transient error.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub temperature: f32,

    /// Pause after every successful call.
    #[serde(default = "default_client_pacing")]
    pub pacing_ms: u64,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_max_tokens() -> u32 {
    300
}

fn default_client_pacing() -> u64 {
    100
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            max_tokens: default_max_tokens(),
            temperature: 0.0,
            pacing_ms: default_client_pacing(),
        }
    }
}

impl GenerationConfig {
    /// Create config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            model: defaults.model,
            base_url: std::env::var("OPENAI_API_BASE")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.base_url),
            timeout_secs: env_parse("EMPATH_REQUEST_TIMEOUT").unwrap_or(defaults.timeout_secs),
            max_tokens: env_parse("EMPATH_MAX_TOKENS").unwrap_or(defaults.max_tokens),
            temperature: env_parse("EMPATH_TEMPERATURE").unwrap_or(defaults.temperature),
            pacing_ms: defaults.pacing_ms,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_pacing_ms(mut self, ms: u64) -> Self {
        self.pacing_ms = ms;
        self
    }

    pub fn with_decoding(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// Frame sampling and re-encoding limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameSettings {
    /// Descending frame budgets tried on transient failures.
    #[serde(default = "default_budgets")]
    pub budgets: Vec<usize>,

    /// Frames wider than this are downscaled.
    #[serde(default = "default_target_width")]
    pub target_width: u32,

    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    #[serde(default = "default_true")]
    pub reencode: bool,
}

fn default_budgets() -> Vec<usize> {
    vec![12, 8, 6, 4]
}

fn default_target_width() -> u32 {
    512
}

fn default_jpeg_quality() -> u8 {
    60
}

fn default_true() -> bool {
    true
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            budgets: default_budgets(),
            target_width: default_target_width(),
            jpeg_quality: default_jpeg_quality(),
            reencode: true,
        }
    }
}

/// How scenario assets are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetMode {
    /// `<frames_root>/<action_id>` directory of ordered frame images.
    #[default]
    Frames,
    /// No visual assets; prompt only.
    Text,
}

impl std::str::FromStr for AssetMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "frames" => Ok(AssetMode::Frames),
            "text" => Ok(AssetMode::Text),
            other => Err(format!("unknown mode '{}' (expected frames or text)", other)),
        }
    }
}

/// Optional YAML run file. CLI flags override individual fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    #[serde(default)]
    pub task: Task,
    #[serde(default)]
    pub mode: AssetMode,
    #[serde(default)]
    pub dataset: Option<PathBuf>,
    #[serde(default)]
    pub characters: Option<PathBuf>,
    #[serde(default)]
    pub frames_root: Option<PathBuf>,
    #[serde(default)]
    pub prompt_file: Option<PathBuf>,
    #[serde(default)]
    pub checkpoint: Option<PathBuf>,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub frames: FrameSettings,
    #[serde(default)]
    pub backoff: BackoffPolicy,
    /// Pause between scenarios after a successful append.
    #[serde(default = "default_item_pacing")]
    pub pacing_ms: u64,
}

fn default_item_pacing() -> u64 {
    80
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            task: Task::default(),
            mode: AssetMode::default(),
            dataset: None,
            characters: None,
            frames_root: None,
            prompt_file: None,
            checkpoint: None,
            generation: GenerationConfig::default(),
            frames: FrameSettings::default(),
            backoff: BackoffPolicy::default(),
            pacing_ms: default_item_pacing(),
        }
    }
}

impl RunConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_yaml::from_str(&text)
            .with_context(|| format!("failed to parse yaml config {}", path.display()))
    }

    /// `output/<task>/<model>_inference.csv` unless set explicitly.
    pub fn checkpoint_path(&self) -> PathBuf {
        self.checkpoint.clone().unwrap_or_else(|| {
            PathBuf::from("output")
                .join(self.task.as_str())
                .join(format!("{}_inference.csv", self.generation.model))
        })
    }
}
