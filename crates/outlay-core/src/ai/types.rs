//! Provider request/response types
//!
//! These types are backend-agnostic and used across all provider
//! implementations. A candidate is never persisted directly; it is the input
//! to the confidence policy.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::Currency;

/// A past human correction, sent to the provider as context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    /// The expense text the human corrected
    pub description: String,
    /// The category the human chose instead
    pub corrected_category: String,
}

/// Request to classify one expense description
#[derive(Debug, Clone)]
pub struct ClassificationRequest {
    /// Cleaned expense text
    pub description: String,
    /// Valid category labels; the returned label must be one of these
    pub labels: Vec<String>,
    /// Recent human corrections, oldest first (may be empty)
    pub corrections: Vec<Correction>,
}

/// Unvalidated, uncommitted classification result from a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationCandidate {
    /// Category label, guaranteed by the backend to be in the request's set
    pub category: String,
    /// Confidence in [0, 1]; backends substitute the lowest-trust default
    /// when the model omits one
    pub confidence: f64,
    /// Amount extracted from the text, if the model found one
    #[serde(default)]
    pub amount: Option<Decimal>,
    /// Currency extracted from the text, if the model found one
    #[serde(default)]
    pub currency: Option<Currency>,
    /// Free-text rationale from the model
    #[serde(default)]
    pub rationale: Option<String>,
}
