//! HTTP layer: the only place that interprets status codes.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use serde_json::{json, Value};
use tracing::debug;

use crate::auth::ApiKey;
use crate::config::GenerationConfig;
use crate::error::{GenerationError, GenerationResult};

const USER_AGENT_VALUE: &str = concat!("empath/", env!("CARGO_PKG_VERSION"));

/// Chat-completions backend (holds reqwest client, credential, config).
#[derive(Debug, Clone)]
pub(crate) struct ChatBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: ApiKey,
    pub(crate) config: GenerationConfig,
}

impl ChatBackend {
    pub(crate) fn new(config: GenerationConfig, api_key: ApiKey) -> GenerationResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(default_headers)
            .build()
            .map_err(|e| GenerationError::InvalidConfig {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        let endpoint = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));

        Ok(Self {
            client,
            endpoint,
            api_key,
            config,
        })
    }

    /// Send a single user message and return the first choice's text.
    pub(crate) async fn complete(&self, content: Value) -> GenerationResult<String> {
        let body = json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
            "messages": [{ "role": "user", "content": content }],
        });

        debug!(endpoint = %self.endpoint, model = %self.config.model, "sending completion request");

        let response = self
            .client
            .post(&self.endpoint)
            .header(
                AUTHORIZATION,
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        match status.as_u16() {
            200..=299 => {
                let json: Value = response.json().await.map_err(|e| {
                    if e.is_decode() {
                        GenerationError::unknown(format!("failed to parse response: {}", e))
                    } else {
                        GenerationError::from(e)
                    }
                })?;
                extract_content(&json)
            }

            401 | 403 => {
                let message = response.text().await.unwrap_or_else(|_| status.to_string());
                Err(GenerationError::InvalidCredential {
                    message: format!("HTTP {}: {}", status.as_u16(), truncate(&message)),
                })
            }

            429 => {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .map(Duration::from_secs);
                let body = response.text().await.unwrap_or_default();

                if is_quota_body(&body) {
                    Err(GenerationError::QuotaExhausted {
                        message: truncate(&body),
                    })
                } else {
                    Err(GenerationError::RateLimited { retry_after })
                }
            }

            408 | 409 | 500 | 502 | 503 | 504 => {
                let message = response.text().await.unwrap_or_else(|_| status.to_string());
                Err(GenerationError::Transient {
                    message: format!("HTTP {}: {}", status.as_u16(), truncate(&message)),
                })
            }

            _ => {
                let message = response.text().await.unwrap_or_else(|_| status.to_string());
                Err(GenerationError::Unknown {
                    message: format!("HTTP {}: {}", status.as_u16(), truncate(&message)),
                })
            }
        }
    }
}

fn extract_content(json: &Value) -> GenerationResult<String> {
    json.pointer("/choices/0/message/content")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| GenerationError::unknown("response missing choices[0].message.content"))
}

/// A 429 whose body talks about quota (not request rate) means billing is
/// exhausted and retrying will not help.
fn is_quota_body(body: &str) -> bool {
    let lower = body.to_lowercase();
    if lower.contains("insufficient_quota")
        || lower.contains("quota exceeded")
        || lower.contains("exceeded your current quota")
    {
        return true;
    }
    lower.contains("quota") && !lower.contains("rate_limit") && !lower.contains("rate limit")
}

fn truncate(s: &str) -> String {
    s.chars().take(300).collect()
}
