//! Pluggable LLM provider abstraction
//!
//! Backend-agnostic interface for expense classification. Nothing above this
//! layer knows about vendor transport, and backends never touch storage.
//!
//! # Architecture
//!
//! - `Provider` trait: the capability every LLM backend must implement
//! - `ProviderClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `OllamaProvider`, `OpenAiCompatProvider`, `MockProvider`
//!
//! # Configuration
//!
//! Backend selection comes from `Settings::provider` (`OUTLAY_PROVIDER`).
//! Host/model variables per backend:
//! - `OLLAMA_HOST`: Ollama server URL (required for ollama backend)
//! - `OLLAMA_MODEL`: Model name (default: llama3.2)
//! - `OPENAI_COMPATIBLE_HOST`: Server URL (required for openai_compatible backend)
//! - `OPENAI_COMPATIBLE_MODEL`: Model name (default: gpt-3.5-turbo)
//! - `OPENAI_COMPATIBLE_API_KEY`: API key if required (optional)

mod mock;
mod ollama;
mod openai_compatible;
pub mod parsing;
pub mod types;

pub use mock::MockProvider;
pub use ollama::OllamaProvider;
pub use openai_compatible::OpenAiCompatProvider;
pub use types::*;

use async_trait::async_trait;

use crate::config::Settings;
use crate::error::{Error, ProviderError, Result};

/// Capability every LLM backend must implement
///
/// `classify` performs one outbound call and nothing else; implementations
/// validate the returned label against the request's set and always populate
/// confidence. Backends must be Send + Sync for use across async tasks.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Classify an expense description into one of the request's labels
    async fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> std::result::Result<ClassificationCandidate, ProviderError>;

    /// Check if the backend is reachable
    async fn health_check(&self) -> bool;

    /// Model name (for logging and status output)
    fn model(&self) -> &str;

    /// Host URL (for logging and status output)
    fn host(&self) -> &str;
}

/// Concrete provider client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum ProviderClient {
    /// Ollama backend (HTTP API)
    Ollama(OllamaProvider),
    /// OpenAI-compatible backend (vLLM, LocalAI, llama-server, gateways)
    OpenAiCompat(OpenAiCompatProvider),
    /// Mock backend for tests and offline development
    Mock(MockProvider),
}

impl ProviderClient {
    /// Create a provider client from validated settings.
    ///
    /// Fails explicitly on an unknown provider identifier or when the
    /// selected backend's required environment is missing.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        match settings.provider.to_lowercase().as_str() {
            "ollama" => OllamaProvider::from_env()
                .map(ProviderClient::Ollama)
                .ok_or_else(|| Error::Config("OLLAMA_HOST is not set".into())),
            "openai_compatible" | "openai" | "vllm" | "localai" | "llamacpp" => {
                OpenAiCompatProvider::from_env()
                    .map(ProviderClient::OpenAiCompat)
                    .ok_or_else(|| Error::Config("OPENAI_COMPATIBLE_HOST is not set".into()))
            }
            "mock" => Ok(ProviderClient::Mock(MockProvider::new())),
            other => Err(Error::Config(format!("Unknown provider: {}", other))),
        }
    }

    /// Create a mock provider client for testing
    pub fn mock() -> Self {
        ProviderClient::Mock(MockProvider::new())
    }
}

#[async_trait]
impl Provider for ProviderClient {
    async fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> std::result::Result<ClassificationCandidate, ProviderError> {
        match self {
            ProviderClient::Ollama(b) => b.classify(request).await,
            ProviderClient::OpenAiCompat(b) => b.classify(request).await,
            ProviderClient::Mock(b) => b.classify(request).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            ProviderClient::Ollama(b) => b.health_check().await,
            ProviderClient::OpenAiCompat(b) => b.health_check().await,
            ProviderClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            ProviderClient::Ollama(b) => b.model(),
            ProviderClient::OpenAiCompat(b) => b.model(),
            ProviderClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            ProviderClient::Ollama(b) => b.host(),
            ProviderClient::OpenAiCompat(b) => b.host(),
            ProviderClient::Mock(b) => b.host(),
        }
    }
}

/// Build the classification prompt shared by the HTTP backends.
pub(crate) fn build_prompt(request: &ClassificationRequest) -> String {
    let mut prompt = String::from(
        "Classify the expense description below into exactly one of the \
         allowed categories. Respond with a single JSON object with fields: \
         category (string, one of the allowed categories), confidence \
         (number between 0 and 1), amount (decimal number if present in the \
         text), currency (ISO 4217 code if present), rationale (short \
         string).\n\n",
    );

    prompt.push_str("Allowed categories: ");
    prompt.push_str(&request.labels.join(", "));
    prompt.push('\n');

    if !request.corrections.is_empty() {
        prompt.push_str("\nPast corrections from the user:\n");
        for c in &request.corrections {
            prompt.push_str(&format!(
                "- \"{}\" belongs to {}\n",
                c.description, c.corrected_category
            ));
        }
    }

    prompt.push_str("\nExpense description: ");
    prompt.push_str(&request.description);
    prompt
}
