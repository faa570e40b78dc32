//! Credential handling for the generation service.
//!
//! The key is read once at client construction and validated there, so a
//! malformed export fails the run before any scenario is touched.

use secrecy::{ExposeSecret, SecretString};

use crate::error::{GenerationError, GenerationResult};

/// Environment variable holding the service credential.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

const KEY_PREFIX: &str = "sk-";

/// A validated API key. `Debug` never prints the value.
#[derive(Clone)]
pub struct ApiKey(SecretString);

impl ApiKey {
    /// Validate a raw credential string.
    ///
    /// Surrounding whitespace and straight quotes are stripped first; the
    /// remainder must be non-empty ASCII carrying the expected prefix.
    pub fn parse(raw: &str) -> GenerationResult<Self> {
        let key = raw.trim().trim_matches('"').trim_matches('\'');

        if key.is_empty() {
            return Err(GenerationError::InvalidCredential {
                message: format!("{} is missing or empty", API_KEY_ENV),
            });
        }
        if !key.is_ascii() {
            return Err(GenerationError::InvalidCredential {
                message: format!(
                    "{} contains non-ASCII characters (re-export it with straight ASCII quotes)",
                    API_KEY_ENV
                ),
            });
        }
        if !key.starts_with(KEY_PREFIX) {
            return Err(GenerationError::InvalidCredential {
                message: format!("{} must start with '{}'", API_KEY_ENV, KEY_PREFIX),
            });
        }

        Ok(Self(SecretString::from(key.to_string())))
    }

    /// Read and validate the key from [`API_KEY_ENV`].
    pub fn from_env() -> GenerationResult<Self> {
        let raw = std::env::var(API_KEY_ENV).unwrap_or_default();
        Self::parse(&raw)
    }

    /// Use only when building the request header.
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ApiKey([REDACTED])")
    }
}
