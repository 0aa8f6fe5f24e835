//! Presentation seam and the views handed across it.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::core::detection::DetectionResult;
use crate::core::format::{age_label, format_amount, rate_label};
use crate::core::rates::{RatePair, Resolution};
use crate::shared::error::AppResult;
use crate::shared::types::{serialize_decimal, CurrencyCode, Provenance};

/// Renders the transient overlay near the selection.
///
/// Implementations report missing render targets with
/// `AppError::RenderTargetMissing`; the session logs it and gives up on the
/// operation. Implementations must not call back into the session
/// synchronously.
pub trait Presenter: Send + Sync {
    fn show_conversion(&self, view: &ConversionView) -> AppResult<()>;

    /// Update an already shown conversion in place after a manual refresh.
    fn update_conversion(&self, view: &ConversionView) -> AppResult<()>;

    fn show_same_currency(&self, view: &SameCurrencyView) -> AppResult<()>;

    /// Ask the user which currency a bare amount is in.
    fn show_currency_selector(&self, prompt: &CurrencyPrompt) -> AppResult<()>;

    fn hide(&self);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionView {
    pub session_id: u64,
    #[serde(serialize_with = "serialize_decimal")]
    pub amount: Decimal,
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    #[serde(serialize_with = "serialize_decimal")]
    pub converted: Decimal,
    #[serde(serialize_with = "serialize_decimal")]
    pub rate: Decimal,
    pub provenance: Option<Provenance>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub original_label: String,
    pub converted_label: String,
    pub rate_label: String,
    pub age_label: String,
}

impl ConversionView {
    /// `None` when `amount × rate` overflows.
    pub fn build(session_id: u64, amount: Decimal, resolution: &Resolution, now: DateTime<Utc>) -> Option<Self> {
        let pair: RatePair = resolution.pair;
        let converted = amount
            .checked_mul(resolution.rate)?
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let entry = resolution.entry.as_ref();

        Some(Self {
            session_id,
            amount,
            from: pair.from,
            to: pair.to,
            converted,
            rate: resolution.rate,
            provenance: entry.map(|e| e.provenance),
            fetched_at: entry.map(|e| e.fetched_at),
            original_label: format_amount(amount, pair.from),
            converted_label: format_amount(converted, pair.to),
            rate_label: rate_label(pair, resolution.rate),
            age_label: entry
                .map(|e| age_label(e.age(now)))
                .unwrap_or_else(|| "unknown".to_string()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SameCurrencyView {
    pub session_id: u64,
    #[serde(serialize_with = "serialize_decimal")]
    pub amount: Decimal,
    pub currency: CurrencyCode,
    pub label: String,
}

impl SameCurrencyView {
    pub fn new(session_id: u64, amount: Decimal, currency: CurrencyCode) -> Self {
        Self {
            session_id,
            amount,
            currency,
            label: format!("Already in {}: {}", currency, format_amount(amount, currency)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyPrompt {
    pub session_id: u64,
    #[serde(serialize_with = "serialize_decimal")]
    pub amount: Decimal,
    pub raw_text: String,
    pub target: CurrencyCode,
    /// Every supported code except the target.
    pub choices: Vec<CurrencyCode>,
}

impl CurrencyPrompt {
    pub fn new(session_id: u64, detection: &DetectionResult, target: CurrencyCode) -> Self {
        Self {
            session_id,
            amount: detection.amount,
            raw_text: detection.raw_text.clone(),
            target,
            choices: CurrencyCode::ALL.iter().copied().filter(|c| *c != target).collect(),
        }
    }
}
