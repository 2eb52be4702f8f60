//! Currency-amount scanning and formatting
//!
//! Prices stay strings end to end — `"$ 250.00"`, `"USD 175"` — because the
//! storefront renders them that way and downstream consumers want the
//! currency marker preserved. Numeric parsing happens only at comparison and
//! derivation points.

use once_cell::sync::Lazy;
use regex::Regex;

static MONEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[$€£]\s?\d+[\d,.]*").expect("money pattern"));

static CURRENCY_PREFIX_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Z]{3}\s|[$€£])").expect("currency prefix pattern"));

static PERCENT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2})%").expect("percent pattern"));

static SAVE_PERCENT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)save\s*\d+%").expect("save percent pattern"));

/// Returns every currency amount found in `text`, in order of appearance.
pub fn find_amounts(text: &str) -> Vec<String> {
    MONEY_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Parses the numeric value out of a price string, ignoring currency markers
/// and thousands separators.
pub fn parse_amount(price: &str) -> Option<f64> {
    let digits: String = price.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Extracts the currency marker prefix (`$`, `€`, `£`, or `USD `-style code)
/// from a price string, empty when none is present.
pub fn currency_prefix(price: &str) -> String {
    CURRENCY_PREFIX_PATTERN
        .find(price.trim())
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// Formats a derived amount with the given currency marker at two decimals.
pub fn format_amount(currency: &str, amount: f64) -> String {
    if currency.is_empty() {
        format!("{:.2}", amount)
    } else {
        format!("{} {:.2}", currency, amount)
    }
}

/// Finds a percentage figure like `20%` in text.
pub fn find_percent(text: &str) -> Option<u32> {
    PERCENT_PATTERN
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Returns true when the text advertises a "Save N%" style discount.
pub fn mentions_save_percent(text: &str) -> bool {
    SAVE_PERCENT_PATTERN.is_match(text)
}

/// Normalizes a raw embedded-state price into a display string, reusing an
/// existing currency marker or prepending the given currency code.
pub fn to_price_string(value: &serde_json::Value, currency: Option<&str>) -> Option<String> {
    let s = match value {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if s.is_empty() {
        return None;
    }
    if currency_prefix(&s).is_empty() {
        if let Some(code) = currency {
            if !code.is_empty() {
                return Some(format!("{} {}", code, s));
            }
        }
    }
    Some(s)
}
