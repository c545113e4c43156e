//! Confidence policy
//!
//! Pure decision function mapping a classification candidate to an action.
//! No I/O; thresholds come from configuration so operators can tune the
//! precision/recall trade-off without code changes.

use serde::{Deserialize, Serialize};

use crate::ai::ClassificationCandidate;
use crate::error::{Error, Result};
use crate::models::normalize_name;

/// Confidence thresholds
///
/// `high` and above commits automatically; `low` up to `high` asks a human;
/// below `low` rejects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Watermarks {
    pub low: f64,
    pub high: f64,
}

impl Watermarks {
    pub const DEFAULT_LOW: f64 = 0.60;
    pub const DEFAULT_HIGH: f64 = 0.85;

    pub fn new(low: f64, high: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&low) || !(0.0..=1.0).contains(&high) {
            return Err(Error::Config(format!(
                "Watermarks must be in [0, 1], got low={} high={}",
                low, high
            )));
        }
        if low > high {
            return Err(Error::Config(format!(
                "Low watermark {} must not exceed high watermark {}",
                low, high
            )));
        }
        Ok(Self { low, high })
    }
}

impl Default for Watermarks {
    fn default() -> Self {
        Self {
            low: Self::DEFAULT_LOW,
            high: Self::DEFAULT_HIGH,
        }
    }
}

/// Why a candidate was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Label not in the valid category set; rejected regardless of confidence
    UnknownCategory,
    /// Confidence below the low watermark
    LowConfidence,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownCategory => "unknown_category",
            Self::LowConfidence => "low_confidence",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Policy decision for one candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Commit without human review
    AutoAccept,
    /// Open a confirmation session
    NeedsReview,
    /// Surface a classification failure to the caller
    Reject(RejectReason),
}

/// Decide what to do with a candidate.
///
/// An unknown label is a hard validation gate, not a confidence matter.
pub fn decide(
    candidate: &ClassificationCandidate,
    valid_labels: &[String],
    watermarks: &Watermarks,
) -> Decision {
    let wanted = normalize_name(&candidate.category);
    let known = valid_labels.iter().any(|l| normalize_name(l) == wanted);
    if !known {
        return Decision::Reject(RejectReason::UnknownCategory);
    }

    if candidate.confidence >= watermarks.high {
        Decision::AutoAccept
    } else if candidate.confidence >= watermarks.low {
        Decision::NeedsReview
    } else {
        Decision::Reject(RejectReason::LowConfidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(category: &str, confidence: f64) -> ClassificationCandidate {
        ClassificationCandidate {
            category: category.to_string(),
            confidence,
            amount: None,
            currency: None,
            rationale: None,
        }
    }

    fn labels() -> Vec<String> {
        vec!["Food".to_string(), "Travel".to_string(), "Other".to_string()]
    }

    #[test]
    fn watermark_validation() {
        assert!(Watermarks::new(0.6, 0.85).is_ok());
        assert!(Watermarks::new(0.9, 0.5).is_err());
        assert!(Watermarks::new(-0.1, 0.5).is_err());
        assert!(Watermarks::new(0.5, 1.1).is_err());
        // Equal watermarks collapse the review band; still valid
        assert!(Watermarks::new(0.7, 0.7).is_ok());
    }

    #[test]
    fn high_confidence_auto_accepts() {
        let w = Watermarks::default();
        assert_eq!(decide(&candidate("Food", 0.95), &labels(), &w), Decision::AutoAccept);
        // Boundary: exactly at the high watermark
        assert_eq!(decide(&candidate("Food", 0.85), &labels(), &w), Decision::AutoAccept);
    }

    #[test]
    fn mid_confidence_needs_review() {
        let w = Watermarks::default();
        assert_eq!(decide(&candidate("Food", 0.70), &labels(), &w), Decision::NeedsReview);
        // Boundary: exactly at the low watermark
        assert_eq!(decide(&candidate("Food", 0.60), &labels(), &w), Decision::NeedsReview);
    }

    #[test]
    fn low_confidence_rejects() {
        let w = Watermarks::default();
        assert_eq!(
            decide(&candidate("Food", 0.30), &labels(), &w),
            Decision::Reject(RejectReason::LowConfidence)
        );
    }

    #[test]
    fn unknown_label_rejects_regardless_of_confidence() {
        let w = Watermarks::default();
        assert_eq!(
            decide(&candidate("NotARealCategory", 0.99), &labels(), &w),
            Decision::Reject(RejectReason::UnknownCategory)
        );
    }

    #[test]
    fn label_match_is_case_insensitive() {
        let w = Watermarks::default();
        assert_eq!(decide(&candidate("food", 0.95), &labels(), &w), Decision::AutoAccept);
    }
}
