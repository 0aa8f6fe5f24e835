//! Remote rate provider seam and its HTTP implementation.

use async_trait::async_trait;
use reqwest::{header, Client};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::config::HTTP_TIMEOUT;
use crate::shared::error::{AppError, AppResult};
use crate::shared::types::parse_decimal;

use super::cache::RatePair;

/// Fields tried, in order, on an object reply.
const OBJECT_RATE_FIELDS: &[&str] = &["value", "rate", "mid", "price"];
/// Fields tried, in order, on the first element of an array reply.
const ARRAY_RATE_FIELDS: &[&str] = &["value", "rate", "mid"];

/// What the provider answered, when it answered at all.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderReply {
    /// Success status with a JSON body.
    Success(Value),
    /// The provider responded with a non-success status.
    Unsuccessful(u16),
}

/// Remote source of live exchange rates.
///
/// `Err` means the request or body decoding failed outright; a reply that
/// merely carries no usable rate is still `Ok`.
#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn fetch(&self, api_url: &str, pair: RatePair) -> AppResult<ProviderReply>;
}

pub struct HttpRateProvider {
    http: Client,
}

impl HttpRateProvider {
    pub fn new() -> AppResult<Self> {
        let http = Client::builder()
            .user_agent("currency-lens/rates")
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| AppError::Network(e.to_string()))?;
        Ok(Self::with_client(http))
    }

    pub fn with_client(http: Client) -> Self {
        Self { http }
    }

    pub fn request_url(api_url: &str, pair: RatePair) -> String {
        format!(
            "{}?source={}&target={}",
            api_url,
            urlencoding::encode(pair.from.as_str()),
            urlencoding::encode(pair.to.as_str())
        )
    }
}

#[async_trait]
impl RateProvider for HttpRateProvider {
    async fn fetch(&self, api_url: &str, pair: RatePair) -> AppResult<ProviderReply> {
        let url = Self::request_url(api_url, pair);
        tracing::debug!(%pair, %url, "Fetching fresh rate");

        let resp = self
            .http
            .get(&url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Ok(ProviderReply::Unsuccessful(status.as_u16()));
        }

        let body = resp.json::<Value>().await?;
        Ok(ProviderReply::Success(body))
    }
}

/// Pull a positive rate out of a provider body.
///
/// Accepts a non-empty array whose first element carries `value`, `rate` or
/// `mid`, or an object carrying `value`, `rate`, `mid` or `price`. The first
/// field holding a positive number (or numeric string) wins.
pub fn extract_rate(body: &Value) -> Option<Decimal> {
    let (record, fields) = match body {
        Value::Array(items) => (items.first()?, ARRAY_RATE_FIELDS),
        Value::Object(_) => (body, OBJECT_RATE_FIELDS),
        _ => return None,
    };

    fields
        .iter()
        .filter_map(|field| record.get(*field))
        .filter_map(numeric)
        .find(|rate| *rate > Decimal::ZERO)
}

fn numeric(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => parse_decimal(s),
        _ => None,
    }
}
