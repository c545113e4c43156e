//! Domain models for Outlay

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Supported currencies
///
/// Closed set; amounts are always tagged with one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    #[default]
    Eur,
    Gbp,
    Jpy,
    Aud,
    Cad,
    Chf,
    Cny,
    Sek,
    Nzd,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
            Self::Jpy => "JPY",
            Self::Aud => "AUD",
            Self::Cad => "CAD",
            Self::Chf => "CHF",
            Self::Cny => "CNY",
            Self::Sek => "SEK",
            Self::Nzd => "NZD",
        }
    }

    pub fn all() -> &'static [Currency] {
        &[
            Self::Usd,
            Self::Eur,
            Self::Gbp,
            Self::Jpy,
            Self::Aud,
            Self::Cad,
            Self::Chf,
            Self::Cny,
            Self::Sek,
            Self::Nzd,
        ]
    }
}

impl std::str::FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "USD" => Ok(Self::Usd),
            "EUR" => Ok(Self::Eur),
            "GBP" => Ok(Self::Gbp),
            "JPY" => Ok(Self::Jpy),
            "AUD" => Ok(Self::Aud),
            "CAD" => Ok(Self::Cad),
            "CHF" => Ok(Self::Chf),
            "CNY" => Ok(Self::Cny),
            "SEK" => Ok(Self::Sek),
            "NZD" => Ok(Self::Nzd),
            _ => Err(format!("Unknown currency: {}", s)),
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status of an expense record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseStatus {
    /// Awaiting human confirmation (only valid while a session owns it)
    Pending,
    /// Committed, trusted record
    Confirmed,
    /// Explicitly rejected by a human
    Rejected,
}

impl ExpenseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for ExpenseStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "rejected" => Ok(Self::Rejected),
            _ => Err(format!("Unknown expense status: {}", s)),
        }
    }
}

impl std::fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An expense category
///
/// Display name is unique case-insensitively. Read-heavy; deletion is
/// rejected while expenses still reference it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseCategory {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Case-normalized form of a category name, used for uniqueness and lookup.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// A classified expense
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    /// Exact decimal amount, always non-negative
    pub amount: Decimal,
    pub currency: Currency,
    pub description: String,
    pub category_id: i64,
    pub status: ExpenseStatus,
    /// Classification confidence in [0, 1]
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}

/// An expense to be persisted (before the repository assigns an id)
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub amount: Decimal,
    pub currency: Currency,
    pub description: String,
    pub category_id: i64,
    pub status: ExpenseStatus,
    pub confidence: f64,
}

impl NewExpense {
    /// Check the record invariants before it reaches a repository.
    pub fn validate(&self) -> Result<()> {
        if self.amount.is_sign_negative() {
            return Err(Error::Validation(format!(
                "Expense amount must be non-negative, got {}",
                self.amount
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(Error::Validation(format!(
                "Confidence must be in [0, 1], got {}",
                self.confidence
            )));
        }
        if self.description.trim().is_empty() {
            return Err(Error::Validation("Expense description is empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn currency_round_trip() {
        for c in Currency::all() {
            assert_eq!(Currency::from_str(c.as_str()).unwrap(), *c);
        }
        assert!(Currency::from_str("XXX").is_err());
        assert_eq!(Currency::from_str("usd").unwrap(), Currency::Usd);
        assert_eq!(Currency::default(), Currency::Eur);
    }

    #[test]
    fn status_round_trip() {
        for s in ["pending", "confirmed", "rejected"] {
            assert_eq!(ExpenseStatus::from_str(s).unwrap().as_str(), s);
        }
        assert!(ExpenseStatus::from_str("draft").is_err());
    }

    #[test]
    fn name_normalization() {
        assert_eq!(normalize_name("  Food "), "food");
        assert_eq!(normalize_name("FOOD"), normalize_name("food"));
    }

    #[test]
    fn new_expense_validation() {
        let good = NewExpense {
            amount: Decimal::new(550, 2),
            currency: Currency::Eur,
            description: "Coffee at Starbucks".into(),
            category_id: 1,
            status: ExpenseStatus::Confirmed,
            confidence: 0.95,
        };
        assert!(good.validate().is_ok());

        let negative = NewExpense {
            amount: Decimal::new(-1, 0),
            ..good.clone()
        };
        assert!(negative.validate().is_err());

        let out_of_range = NewExpense {
            confidence: 1.5,
            ..good.clone()
        };
        assert!(out_of_range.validate().is_err());

        let blank = NewExpense {
            description: "   ".into(),
            ..good
        };
        assert!(blank.validate().is_err());
    }
}
