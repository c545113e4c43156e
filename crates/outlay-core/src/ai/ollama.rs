//! Ollama backend implementation
//!
//! HTTP client for the Ollama `/api/generate` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProviderError;

use super::parsing::parse_candidate;
use super::types::{ClassificationCandidate, ClassificationRequest};
use super::{build_prompt, Provider};

/// Per-request deadline; elapsed requests surface as `Timeout`.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Ollama backend
#[derive(Clone)]
pub struct OllamaProvider {
    http_client: Client,
    base_url: String,
    model: String,
}

impl OllamaProvider {
    /// Create a new Ollama backend
    pub fn new(base_url: &str, model: &str) -> Self {
        let http_client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    /// Create a new instance with a different model
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            http_client: self.http_client.clone(),
            base_url: self.base_url.clone(),
            model: model.to_string(),
        }
    }

    /// Create from environment variables
    ///
    /// Required: `OLLAMA_HOST`. Optional: `OLLAMA_MODEL` (default: llama3.2).
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("OLLAMA_HOST").ok()?;
        let model = std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string());
        Some(Self::new(&host, &model))
    }
}

/// Request to Ollama API
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
}

/// Response from Ollama API
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

#[async_trait]
impl Provider for OllamaProvider {
    async fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> Result<ClassificationCandidate, ProviderError> {
        let body = OllamaRequest {
            model: self.model.clone(),
            prompt: build_prompt(request),
            stream: false,
        };

        let response = self
            .http_client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, body));
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .map_err(ProviderError::from_transport)?;
        debug!(raw = %ollama_response.response, "Ollama response");

        parse_candidate(&ollama_response.response, &request.labels)
    }

    async fn health_check(&self) -> bool {
        self.http_client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_trailing_slash() {
        let backend = OllamaProvider::new("http://localhost:11434/", "llama3.2");
        assert_eq!(backend.host(), "http://localhost:11434");
        assert_eq!(backend.model(), "llama3.2");
    }

    #[test]
    fn with_model_overrides() {
        let backend = OllamaProvider::new("http://localhost:11434", "llama3.2");
        assert_eq!(backend.with_model("gemma3").model(), "gemma3");
    }
}
