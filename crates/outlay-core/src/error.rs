//! Error types for Outlay
//!
//! One flat taxonomy for the whole pipeline. Rejected classifications are a
//! normal outcome (`ClassificationOutcome::Failed`), not an error.

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Classification unavailable after {attempts} attempts: {last_error}")]
    ClassificationUnavailable { attempts: u32, last_error: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate entity: {0}")]
    DuplicateEntity(String),

    #[error("Category is referenced by existing expenses: {0}")]
    CategoryInUse(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Session already resolved: {0}")]
    SessionAlreadyResolved(Uuid),

    #[error("Session expired: {0}")]
    SessionExpired(Uuid),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// Pool exhaustion and checkout timeouts are transient; the service retries
// them under the same backoff policy as provider calls.
impl From<r2d2::Error> for Error {
    fn from(e: r2d2::Error) -> Self {
        Error::StorageUnavailable(e.to_string())
    }
}

impl Error {
    /// Whether the service may retry the failed operation.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Provider(e) => e.kind.is_transient(),
            Error::StorageUnavailable(_) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failure cause reported by an LLM provider backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Request exceeded the deadline
    Timeout,
    /// Provider rejected the request for quota reasons (HTTP 429)
    RateLimited,
    /// Provider answered, but the payload was not a usable candidate
    MalformedOutput,
    /// Credentials rejected (HTTP 401/403)
    AuthFailure,
    /// Provider unreachable or failing (connect errors, 5xx)
    Unavailable,
}

impl ProviderErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::RateLimited => "rate_limited",
            Self::MalformedOutput => "malformed_output",
            Self::AuthFailure => "auth_failure",
            Self::Unavailable => "unavailable",
        }
    }

    /// Timeouts, rate limits, and outages are worth retrying; malformed
    /// output and bad credentials are not.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::RateLimited | Self::Unavailable)
    }
}

impl std::fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned by a provider backend
#[derive(Error, Debug)]
#[error("Provider error ({kind}): {message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Timeout, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::RateLimited, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::MalformedOutput, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::AuthFailure, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Unavailable, message)
    }

    /// Classify a transport-level failure from the HTTP client.
    pub fn from_transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return Self::timeout(e.to_string());
        }
        if let Some(status) = e.status() {
            return Self::from_status(status, e.to_string());
        }
        if e.is_decode() {
            return Self::malformed(e.to_string());
        }
        Self::unavailable(e.to_string())
    }

    /// Classify an HTTP status code from a provider response.
    pub fn from_status(status: reqwest::StatusCode, body: impl Into<String>) -> Self {
        let message = format!("HTTP {}: {}", status, body.into());
        match status.as_u16() {
            401 | 403 => Self::auth(message),
            408 => Self::timeout(message),
            429 => Self::rate_limited(message),
            _ => Self::unavailable(message),
        }
    }
}
