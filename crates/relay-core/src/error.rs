use std::time::Duration;
use thiserror::Error;

/// The error taxonomy shared by every component of the skill session
/// runtime. Every fallible operation across `relay-store`, `relay-host`,
/// `relay-telegram` and `relay-runtime` ultimately returns one of these
/// variants so the lifecycle controller and tool dispatch layer can react
/// uniformly regardless of which component raised it.
#[derive(Debug, Error)]
pub enum SkillError {
    /// Credentials are missing, expired, or rejected by the remote service.
    /// The lifecycle controller routes this to the setup wizard rather
    /// than retrying.
    #[error("authentication error: {0}")]
    Auth(String),

    /// A lookup found nothing — not an error state for the caller, but a
    /// distinct outcome from a transient failure.
    #[error("not found: {0}")]
    NotFound(String),

    /// The remote service asked the caller to back off. `retry_after` is
    /// `None` when the service did not specify a duration, in which case
    /// callers fall back to the rate limiter's own backoff schedule.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// A retryable failure: network hiccup, timeout, 5xx response. Safe to
    /// retry with backoff; not safe to retry indefinitely without a cap.
    #[error("transient error: {0}")]
    Transient(String),

    /// Caller-supplied input failed validation (setup field, tool
    /// argument). Never retried; surfaced back to the caller verbatim.
    #[error("validation error: {0}")]
    Validation(String),

    /// Unrecoverable: something about the skill's own state is broken and
    /// continuing would be unsafe (corrupt config, schema mismatch, a
    /// bug). The lifecycle controller unloads the skill rather than
    /// looping on this.
    #[error("fatal error: {0}")]
    Fatal(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SkillError {
    /// Stable string code surfaced to the host in `status`/tool-result
    /// payloads. Never changes across releases — treat renames as
    /// breaking.
    pub fn code(&self) -> &'static str {
        match self {
            SkillError::Auth(_) => "AUTH_ERROR",
            SkillError::NotFound(_) => "NOT_FOUND",
            SkillError::RateLimited { .. } => "RATE_LIMITED",
            SkillError::Transient(_) => "TRANSIENT",
            SkillError::Validation(_) => "VALIDATION",
            SkillError::Fatal(_) => "FATAL",
            SkillError::Config(_) => "CONFIG_ERROR",
            SkillError::Database(_) => "DATABASE_ERROR",
            SkillError::Serialization(_) => "SERIALIZATION_ERROR",
            SkillError::Io(_) => "IO_ERROR",
        }
    }

    /// Whether the lifecycle controller should retry the operation that
    /// produced this error (with backoff) rather than surface it.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SkillError::RateLimited { .. } | SkillError::Transient(_))
    }
}

pub type Result<T> = std::result::Result<T, SkillError>;
