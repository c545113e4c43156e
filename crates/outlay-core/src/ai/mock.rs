//! Mock backend for testing
//!
//! Deterministic keyword-based classification for unit tests and offline
//! development, with hooks for scripting a fixed candidate or failures.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{ProviderError, ProviderErrorKind};
use crate::models::normalize_name;
use crate::preprocess::detect_amount;

use super::types::{ClassificationCandidate, ClassificationRequest};
use super::Provider;

/// Mock provider backend
///
/// Returns predictable candidates keyed off well-known merchant words.
/// Tests can script a fixed candidate, a permanent failure, or a failure
/// that clears after N attempts (for retry tests).
#[derive(Clone, Default)]
pub struct MockProvider {
    /// Whether health_check should return true
    pub healthy: bool,
    canned: Option<ClassificationCandidate>,
    fail_kind: Option<ProviderErrorKind>,
    /// Remaining scripted failures; `u32::MAX` means fail forever.
    fail_remaining: Arc<AtomicU32>,
}

impl MockProvider {
    /// Create a new mock provider (healthy by default)
    pub fn new() -> Self {
        Self {
            healthy: true,
            ..Self::default()
        }
    }

    /// Create an unhealthy mock provider
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::default()
        }
    }

    /// Always return this candidate, bypassing the keyword table.
    ///
    /// The candidate is returned as scripted, so tests can exercise the
    /// policy's unknown-label gate with an out-of-set category.
    pub fn with_candidate(candidate: ClassificationCandidate) -> Self {
        Self {
            healthy: true,
            canned: Some(candidate),
            ..Self::default()
        }
    }

    /// Always fail with the given error kind.
    pub fn failing(kind: ProviderErrorKind) -> Self {
        Self {
            healthy: false,
            fail_kind: Some(kind),
            fail_remaining: Arc::new(AtomicU32::new(u32::MAX)),
            ..Self::default()
        }
    }

    /// Fail `times` times with the given kind, then succeed.
    pub fn flaky(kind: ProviderErrorKind, times: u32, candidate: ClassificationCandidate) -> Self {
        Self {
            healthy: true,
            canned: Some(candidate),
            fail_kind: Some(kind),
            fail_remaining: Arc::new(AtomicU32::new(times)),
        }
    }

    fn take_failure(&self) -> Option<ProviderErrorKind> {
        let kind = self.fail_kind?;
        let remaining = self.fail_remaining.load(Ordering::SeqCst);
        if remaining == u32::MAX {
            return Some(kind);
        }
        if remaining > 0 {
            self.fail_remaining.fetch_sub(1, Ordering::SeqCst);
            return Some(kind);
        }
        None
    }

    fn keyword_candidate(&self, request: &ClassificationRequest) -> ClassificationCandidate {
        let upper = request.description.to_uppercase();
        let guess = match upper.as_str() {
            d if d.contains("STARBUCKS")
                || d.contains("COFFEE")
                || d.contains("RESTAURANT")
                || d.contains("LUNCH")
                || d.contains("DINNER")
                || d.contains("GROCER") =>
            {
                Some("Food")
            }
            d if d.contains("UBER")
                || d.contains("TAXI")
                || d.contains("FLIGHT")
                || d.contains("TRAIN")
                || d.contains("HOTEL") =>
            {
                Some("Travel")
            }
            d if d.contains("NETFLIX") || d.contains("SPOTIFY") || d.contains("CINEMA") => {
                Some("Entertainment")
            }
            _ => None,
        };

        // Only answer with a label from the request's set
        let matched = guess.and_then(|g| {
            request
                .labels
                .iter()
                .find(|l| normalize_name(l) == normalize_name(g))
        });

        let (category, confidence) = match matched {
            Some(label) => (label.clone(), 0.92),
            None => {
                let fallback = request
                    .labels
                    .iter()
                    .find(|l| normalize_name(l) == "other")
                    .or_else(|| request.labels.first());
                (
                    fallback.cloned().unwrap_or_else(|| "Other".to_string()),
                    0.45,
                )
            }
        };

        let (amount, currency) = detect_amount(&request.description).unwrap_or((None, None));

        ClassificationCandidate {
            category,
            confidence,
            amount,
            currency,
            rationale: Some("mock keyword match".to_string()),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> Result<ClassificationCandidate, ProviderError> {
        if let Some(kind) = self.take_failure() {
            return Err(ProviderError::new(kind, "scripted mock failure"));
        }

        if let Some(ref canned) = self.canned {
            return Ok(canned.clone());
        }

        Ok(self.keyword_candidate(request))
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn request(description: &str) -> ClassificationRequest {
        ClassificationRequest {
            description: description.to_string(),
            labels: vec!["Food".into(), "Travel".into(), "Other".into()],
            corrections: Vec::new(),
        }
    }

    #[tokio::test]
    async fn keyword_match_stays_in_label_set() {
        let mock = MockProvider::new();
        let candidate = mock
            .classify(&request("Coffee at Starbucks for USD 5.50"))
            .await
            .unwrap();
        assert_eq!(candidate.category, "Food");
        assert!(candidate.confidence > 0.9);
        assert_eq!(candidate.amount, Some(Decimal::new(550, 2)));
    }

    #[tokio::test]
    async fn unknown_merchant_falls_back_to_other() {
        let mock = MockProvider::new();
        let candidate = mock.classify(&request("Mystery purchase 12")).await.unwrap();
        assert_eq!(candidate.category, "Other");
        assert!(candidate.confidence < 0.6);
    }

    #[tokio::test]
    async fn scripted_failure() {
        let mock = MockProvider::failing(ProviderErrorKind::RateLimited);
        let err = mock.classify(&request("Lunch 10")).await.unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::RateLimited);
    }

    #[tokio::test]
    async fn flaky_recovers_after_failures() {
        let candidate = ClassificationCandidate {
            category: "Food".into(),
            confidence: 0.9,
            amount: None,
            currency: None,
            rationale: None,
        };
        let mock = MockProvider::flaky(ProviderErrorKind::Timeout, 2, candidate);

        assert!(mock.classify(&request("Lunch 10")).await.is_err());
        assert!(mock.classify(&request("Lunch 10")).await.is_err());
        assert!(mock.classify(&request("Lunch 10")).await.is_ok());
    }
}
