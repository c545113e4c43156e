//! Runtime configuration
//!
//! Values consumed by the classification pipeline, read from environment
//! variables into a validated `Settings` struct. Provider host/model
//! variables are read by the individual backends (see `ai`).

use std::time::Duration;

use crate::error::{Error, Result};
use crate::models::Currency;
use crate::policy::Watermarks;

/// Environment variable selecting the provider backend
pub const PROVIDER_ENV: &str = "OUTLAY_PROVIDER";
pub const HIGH_WATERMARK_ENV: &str = "OUTLAY_HIGH_WATERMARK";
pub const LOW_WATERMARK_ENV: &str = "OUTLAY_LOW_WATERMARK";
pub const RETRY_ATTEMPTS_ENV: &str = "OUTLAY_RETRY_ATTEMPTS";
pub const BACKOFF_MS_ENV: &str = "OUTLAY_BACKOFF_MS";
pub const SESSION_TTL_ENV: &str = "OUTLAY_SESSION_TTL_SECS";
pub const CURRENCY_ENV: &str = "OUTLAY_CURRENCY";

/// Validated pipeline settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// Provider backend identifier (ollama, openai_compatible, mock)
    pub provider: String,
    pub watermarks: Watermarks,
    /// Total provider attempts (1 initial + retries)
    pub retry_attempts: u32,
    /// Base delay between retries; doubles per attempt
    pub backoff_base: Duration,
    /// Confirmation session lifetime
    pub session_ttl: Duration,
    /// Currency used when neither the caller nor the provider supplies one
    pub default_currency: Currency,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            watermarks: Watermarks::default(),
            retry_attempts: 3,
            backoff_base: Duration::from_millis(250),
            session_ttl: Duration::from_secs(300),
            default_currency: Currency::Eur,
        }
    }
}

impl Settings {
    /// Read settings from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let provider = std::env::var(PROVIDER_ENV).unwrap_or(defaults.provider);
        let low = parse_env(LOW_WATERMARK_ENV, Watermarks::DEFAULT_LOW)?;
        let high = parse_env(HIGH_WATERMARK_ENV, Watermarks::DEFAULT_HIGH)?;
        let retry_attempts = parse_env(RETRY_ATTEMPTS_ENV, defaults.retry_attempts)?;
        let backoff_ms: u64 = parse_env(BACKOFF_MS_ENV, defaults.backoff_base.as_millis() as u64)?;
        let ttl_secs: u64 = parse_env(SESSION_TTL_ENV, defaults.session_ttl.as_secs())?;
        let currency: Currency = match std::env::var(CURRENCY_ENV) {
            Ok(v) => v
                .parse()
                .map_err(|e: String| Error::Config(format!("{}: {}", CURRENCY_ENV, e)))?,
            Err(_) => defaults.default_currency,
        };

        let settings = Self {
            provider,
            watermarks: Watermarks::new(low, high)?,
            retry_attempts,
            backoff_base: Duration::from_millis(backoff_ms),
            session_ttl: Duration::from_secs(ttl_secs),
            default_currency: currency,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Check invariants the pipeline relies on.
    pub fn validate(&self) -> Result<()> {
        if self.retry_attempts == 0 {
            return Err(Error::Config(
                "Retry attempt bound must be at least 1".into(),
            ));
        }
        Watermarks::new(self.watermarks.low, self.watermarks.high)?;
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(v) => v
            .parse()
            .map_err(|e| Error::Config(format!("{}: invalid value '{}' ({})", key, v, e))),
        Err(_) => Ok(default),
    }
}
