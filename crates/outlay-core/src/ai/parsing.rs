//! JSON parsing helpers for provider responses
//!
//! Models often wrap the JSON payload in extra prose; these helpers extract
//! it, then validate the candidate against the request's label set.

use serde::Deserialize;
use tracing::warn;

use crate::error::ProviderError;
use crate::models::normalize_name;

use super::types::ClassificationCandidate;

/// Confidence assigned when the model omits one.
///
/// Lowest-trust band: the policy will reject it rather than the backend
/// fabricating certainty.
pub const DEFAULT_CONFIDENCE: f64 = 0.0;

/// Candidate as the model emits it, before validation
#[derive(Debug, Deserialize)]
struct RawCandidate {
    category: String,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    amount: Option<rust_decimal::Decimal>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    rationale: Option<String>,
}

/// Extract the first JSON object from a model response.
fn extract_json(response: &str) -> Result<&str, ProviderError> {
    let response = response.trim();
    let start = response.find('{');
    let end = response.rfind('}');

    match (start, end) {
        (Some(s), Some(e)) if s < e => Ok(&response[s..=e]),
        _ => Err(ProviderError::malformed(format!(
            "No JSON found in provider response | Raw: {}",
            truncate(response)
        ))),
    }
}

fn truncate(s: &str) -> String {
    if s.len() > 200 {
        format!("{}...", &s[..200])
    } else {
        s.to_string()
    }
}

/// Parse and validate a classification candidate from a model response.
///
/// Fails with `MalformedOutput` when no JSON is present, the JSON does not
/// match the expected shape, or the label is not in `labels`. The returned
/// candidate carries the canonical label spelling from `labels`.
pub fn parse_candidate(
    response: &str,
    labels: &[String],
) -> Result<ClassificationCandidate, ProviderError> {
    let json_str = extract_json(response)?;

    let raw: RawCandidate = serde_json::from_str(json_str).map_err(|e| {
        ProviderError::malformed(format!(
            "Invalid JSON from provider: {} | Raw: {}",
            e,
            truncate(json_str)
        ))
    })?;

    let wanted = normalize_name(&raw.category);
    let canonical = labels
        .iter()
        .find(|l| normalize_name(l) == wanted)
        .ok_or_else(|| {
            ProviderError::malformed(format!(
                "Provider returned label '{}' outside the valid set",
                raw.category
            ))
        })?;

    let confidence = match raw.confidence {
        Some(c) if (0.0..=1.0).contains(&c) => c,
        Some(c) => {
            warn!(confidence = c, "Provider confidence out of range, clamping");
            c.clamp(0.0, 1.0)
        }
        None => {
            warn!("Provider omitted confidence, using lowest-trust default");
            DEFAULT_CONFIDENCE
        }
    };

    let currency = match raw.currency.as_deref() {
        Some(code) => match code.parse() {
            Ok(c) => Some(c),
            Err(_) => {
                warn!(code, "Provider returned unknown currency code, ignoring");
                None
            }
        },
        None => None,
    };

    let amount = match raw.amount {
        Some(a) if a.is_sign_negative() => {
            warn!(amount = %a, "Provider returned negative amount, ignoring");
            None
        }
        other => other,
    };

    Ok(ClassificationCandidate {
        category: canonical.clone(),
        confidence,
        amount,
        currency,
        rationale: raw.rationale,
    })
}
