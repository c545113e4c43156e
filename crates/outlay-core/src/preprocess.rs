//! Input preprocessing for expense descriptions
//!
//! Validates and cleans raw user text before it reaches a provider: length
//! bounds, suspicious-pattern rejection, whitespace collapse, currency
//! symbol normalization, and best-effort amount detection.

use regex::Regex;
use rust_decimal::Decimal;
use tracing::warn;

use crate::error::{Error, Result};
use crate::models::Currency;

pub const MIN_LENGTH: usize = 3;
pub const MAX_LENGTH: usize = 500;

const SUSPICIOUS_PATTERNS: &[&str] = &[r"(?i)<script", r"(?i)javascript:", r"(?i)onerror="];

/// Cleaned, validated input ready for classification
#[derive(Debug, Clone)]
pub struct CleanInput {
    pub text: String,
    /// First monetary amount found in the text, if any
    pub detected_amount: Option<Decimal>,
    /// Currency inferred from a symbol or code adjacent to the amount
    pub detected_currency: Option<Currency>,
}

/// Validate and clean a raw expense description.
///
/// Fails with `Validation` on empty, too short, too long, or suspicious
/// input; no provider call should be made for such text.
pub fn preprocess(text: &str) -> Result<CleanInput> {
    let stripped = text.trim();
    if stripped.is_empty() {
        return Err(Error::Validation("Expense description is empty".into()));
    }

    let len = stripped.chars().count();
    if len < MIN_LENGTH {
        return Err(Error::Validation(format!(
            "Expense description too short (min {} characters)",
            MIN_LENGTH
        )));
    }
    if len > MAX_LENGTH {
        return Err(Error::Validation(format!(
            "Expense description too long (max {} characters)",
            MAX_LENGTH
        )));
    }

    for pattern in SUSPICIOUS_PATTERNS {
        let re = Regex::new(pattern)?;
        if re.is_match(stripped) {
            let head: String = stripped.chars().take(50).collect();
            warn!(input = %head, "Blocked suspicious input");
            return Err(Error::Validation("Suspicious input detected".into()));
        }
    }

    let normalized = normalize_currency_symbols(stripped);
    let cleaned = Regex::new(r"\s+")?
        .replace_all(normalized.trim(), " ")
        .into_owned();

    let (detected_amount, detected_currency) = detect_amount(&cleaned)?;

    Ok(CleanInput {
        text: cleaned,
        detected_amount,
        detected_currency,
    })
}

/// Replace currency symbols with ISO codes so the text reads unambiguously.
fn normalize_currency_symbols(text: &str) -> String {
    let mut out = text.to_string();
    for (symbol, code) in [
        ('\u{20ac}', "EUR"), // €
        ('\u{a3}', "GBP"),   // £
        ('\u{a5}', "JPY"),   // ¥
        ('$', "USD"),
    ] {
        out = out.replace(symbol, &format!(" {} ", code));
    }
    out
}

/// Find the first monetary amount in the text, with an adjacent currency
/// code when one is present.
pub fn detect_amount(text: &str) -> Result<(Option<Decimal>, Option<Currency>)> {
    // Optional ISO code on either side of the number
    let re = Regex::new(r"(?i)(?:([A-Z]{3})\s*)?(\d+(?:[.,]\d{1,2})?)(?:\s*([A-Z]{3}))?")?;

    for caps in re.captures_iter(text) {
        let number = caps.get(2).map(|m| m.as_str().replace(',', "."));
        let amount = match number.as_deref().map(str::parse::<Decimal>) {
            Some(Ok(a)) => a,
            _ => continue,
        };

        // A non-currency word can also match the leading three-letter group,
        // so try both sides and keep whichever parses.
        let currency = [caps.get(1), caps.get(3)]
            .into_iter()
            .flatten()
            .find_map(|m| m.as_str().parse::<Currency>().ok());

        return Ok((Some(amount), currency));
    }

    Ok((None, None))
}
