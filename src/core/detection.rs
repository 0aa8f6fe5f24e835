//! Amount and currency detection over selected text.

pub mod catalog;

use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::config::MAX_INPUT_LENGTH;
use crate::shared::types::{parse_decimal, serialize_decimal, CurrencyCode};

pub use catalog::{PatternCatalog, PatternRule, RuleKind, AMOUNT_PATTERN};

/// Amount extracted from a selection.
///
/// `currency` is `None` when only a bare number was found; `matched` tells
/// whether a catalog rule identified the currency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionResult {
    #[serde(serialize_with = "serialize_decimal")]
    pub amount: Decimal,
    pub currency: Option<CurrencyCode>,
    pub raw_text: String,
    pub matched: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct Detector {
    catalog: &'static PatternCatalog,
}

impl Detector {
    pub fn new() -> Self {
        Self {
            catalog: PatternCatalog::global(),
        }
    }

    pub fn detect(&self, text: &str, auto_detect: bool) -> Option<DetectionResult> {
        let text = truncate(text.trim(), MAX_INPUT_LENGTH);
        if text.is_empty() {
            return None;
        }

        if auto_detect {
            for rule in self.catalog.rules() {
                let Some(hit) = rule.pattern.find(text) else {
                    continue;
                };
                let Some(amount) = first_amount(hit.as_str()).and_then(|a| a.checked_div(rule.divider)) else {
                    continue;
                };
                if amount > Decimal::ZERO {
                    tracing::debug!(currency = %rule.currency, rule = rule.label, %amount, "Auto-detected amount");
                    return Some(DetectionResult {
                        amount,
                        currency: Some(rule.currency),
                        raw_text: text.to_string(),
                        matched: true,
                    });
                }
            }
        }

        match first_amount(text) {
            Some(amount) if amount > Decimal::ZERO => {
                tracing::debug!(%amount, auto_detect, "Bare number detected, currency unknown");
                Some(DetectionResult {
                    amount,
                    currency: None,
                    raw_text: text.to_string(),
                    matched: false,
                })
            }
            _ => {
                tracing::debug!("No valid currency or number detected");
                None
            }
        }
    }
}

impl Default for Detector {
    fn default() -> Self {
        Self::new()
    }
}

/// Detect with the process-wide catalog.
pub fn detect_currency(text: &str, auto_detect: bool) -> Option<DetectionResult> {
    Detector::new().detect(text, auto_detect)
}

/// Parse the first numeric token in `text`. Only the first token is
/// considered; if it does not parse the text has no amount.
fn first_amount(text: &str) -> Option<Decimal> {
    static AMOUNT_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = AMOUNT_REGEX.get_or_init(|| Regex::new(AMOUNT_PATTERN).expect("valid amount regex"));

    let token = re.find(text)?.as_str();
    let cleaned = token.replace(',', "");
    parse_decimal(cleaned.strip_suffix('.').unwrap_or(&cleaned))
}

/// Cut `text` to at most `max_chars` characters without splitting one.
fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
