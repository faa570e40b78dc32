//! Error types for the generation client.

use std::time::Duration;

/// Generation errors.
///
/// Variants are split by what the caller may do about them: configuration
/// and credential errors surface at construction. `Transient` and
/// `RateLimited` are worth retrying; `MissingAsset` skips one scenario.
/// Anything else halts the run.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GenerationError {
    /// Unsupported model identifier or otherwise unusable settings.
    #[error("invalid config: {message}")]
    InvalidConfig { message: String },

    /// Credential missing, malformed, or rejected by the service.
    #[error("invalid credential: {message}")]
    InvalidCredential { message: String },

    /// Account quota exhausted. Never retried.
    #[error("quota exhausted: {message}")]
    QuotaExhausted { message: String },

    /// Rate limit exceeded.
    #[error("rate limited: retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Connection reset, timeout, or a 5xx from the service.
    #[error("transient error: {message}")]
    Transient { message: String },

    /// Required scenario asset is absent on disk.
    #[error("missing asset: {path}")]
    MissingAsset { path: String },

    /// Anything the client cannot classify.
    #[error("unknown error: {message}")]
    Unknown { message: String },
}

impl GenerationError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown {
            message: message.into(),
        }
    }

    /// Whether the orchestrator may retry the call with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. } | Self::RateLimited { .. })
    }

    /// Whether the whole run must halt.
    pub fn is_fatal(&self) -> bool {
        !self.is_retryable() && !matches!(self, Self::MissingAsset { .. })
    }

    /// Stable label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "invalid_config",
            Self::InvalidCredential { .. } => "invalid_credential",
            Self::QuotaExhausted { .. } => "quota_exhausted",
            Self::RateLimited { .. } => "rate_limited",
            Self::Transient { .. } => "transient",
            Self::MissingAsset { .. } => "missing_asset",
            Self::Unknown { .. } => "unknown",
        }
    }

    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidConfig { .. } => 1,
            Self::InvalidCredential { .. } => 1,
            Self::MissingAsset { .. } => 1,

            Self::QuotaExhausted { .. } => 3,

            // Only reachable when retries are exhausted outside the orchestrator
            Self::RateLimited { .. } => 4,
            Self::Transient { .. } => 4,
            Self::Unknown { .. } => 4,
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
            Self::Transient {
                message: err.to_string(),
            }
        } else {
            Self::Unknown {
                message: err.to_string(),
            }
        }
    }
}

/// Result type for generation operations.
pub type GenerationResult<T> = Result<T, GenerationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classes() {
        assert!(GenerationError::transient("reset").is_retryable());
        assert!(GenerationError::RateLimited { retry_after: None }.is_retryable());
        assert!(!GenerationError::QuotaExhausted {
            message: "insufficient_quota".into()
        }
        .is_retryable());
        assert!(!GenerationError::unknown("boom").is_retryable());
    }

    #[test]
    fn missing_asset_is_neither_retryable_nor_fatal() {
        let err = GenerationError::MissingAsset {
            path: "frames/7".into(),
        };
        assert!(!err.is_retryable());
        assert!(!err.is_fatal());
    }

    #[test]
    fn quota_has_dedicated_exit_code() {
        let err = GenerationError::QuotaExhausted {
            message: "out".into(),
        };
        assert!(err.is_fatal());
        assert_eq!(err.exit_code(), 3);
        assert_eq!(err.kind(), "quota_exhausted");
    }
}
