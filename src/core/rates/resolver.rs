//! Rate resolution: cache, then provider, then the fallback table.
//!
//! `resolve` never fails. Transport errors, unusable replies and offline
//! operation all end in a positive rate, with provenance and timestamp kept
//! on the cache entry so the overlay can show how much to trust it.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::config::error_fallback_backdate;
use crate::core::clock::Clock;
use crate::shared::types::{CurrencyCode, Provenance};

use super::cache::{RateCache, RateEntry, RatePair};
use super::fallback::FallbackTable;
use super::provider::{extract_rate, ProviderReply, RateProvider};

/// How a resolution was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveSource {
    /// `from == to`.
    Identity,
    /// A fresh cache entry was served without a fetch.
    Cache,
    /// The provider returned a usable rate.
    Live,
    /// The provider answered without a usable rate.
    Fallback,
    /// The fetch errored and an existing entry of any age was served.
    CacheAfterError,
    /// The fetch errored with nothing cached; a backdated fallback was stored.
    ErrorFallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub pair: RatePair,
    pub rate: Decimal,
    /// The cache entry backing the rate; `None` only for identity pairs.
    pub entry: Option<RateEntry>,
    pub source: ResolveSource,
}

impl Resolution {
    pub fn provenance(&self) -> Option<Provenance> {
        self.entry.as_ref().map(|e| e.provenance)
    }
}

pub struct RateResolver {
    cache: RateCache,
    fallback: FallbackTable,
    provider: Arc<dyn RateProvider>,
    clock: Arc<dyn Clock>,
    api_url: String,
}

impl RateResolver {
    pub fn new(provider: Arc<dyn RateProvider>, clock: Arc<dyn Clock>, api_url: impl Into<String>) -> Self {
        Self {
            cache: RateCache::new(),
            fallback: FallbackTable,
            provider,
            clock,
            api_url: api_url.into(),
        }
    }

    pub fn cache(&self) -> &RateCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut RateCache {
        &mut self.cache
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn set_api_url(&mut self, api_url: impl Into<String>) {
        self.api_url = api_url.into();
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub async fn resolve(&mut self, from: CurrencyCode, to: CurrencyCode, force_refresh: bool) -> Resolution {
        let pair = RatePair::new(from, to);
        if pair.is_identity() {
            return Resolution {
                pair,
                rate: Decimal::ONE,
                entry: None,
                source: ResolveSource::Identity,
            };
        }

        if !force_refresh {
            if let Some(entry) = self.cache.get(&pair) {
                let now = self.clock.now();
                if self.cache.is_fresh(entry, now) {
                    tracing::debug!(
                        %pair,
                        age_minutes = entry.age(now).num_minutes(),
                        "Using cached rate"
                    );
                    return Resolution {
                        pair,
                        rate: entry.rate,
                        entry: Some(entry.clone()),
                        source: ResolveSource::Cache,
                    };
                }
            }
        }

        match self.provider.fetch(&self.api_url, pair).await {
            Ok(reply) => {
                let live = match &reply {
                    ProviderReply::Success(body) => extract_rate(body),
                    ProviderReply::Unsuccessful(status) => {
                        tracing::warn!(%pair, status, "Rate provider returned an error status");
                        None
                    }
                };

                let (entry, source) = match live {
                    Some(rate) => (RateEntry::new(rate, self.clock.now(), Provenance::Live), ResolveSource::Live),
                    None => {
                        let rate = self.fallback.rate(from, to);
                        tracing::info!(%pair, %rate, "Using fallback rate");
                        (RateEntry::new(rate, self.clock.now(), Provenance::Fallback), ResolveSource::Fallback)
                    }
                };

                tracing::info!(%pair, rate = %entry.rate, provenance = %entry.provenance, "Rate updated");
                self.store(pair, entry, source)
            }
            Err(e) => {
                tracing::warn!(%pair, error = %e, "Error fetching exchange rate");

                if let Some(entry) = self.cache.get(&pair) {
                    tracing::info!(%pair, "Using cached rate due to provider error");
                    return Resolution {
                        pair,
                        rate: entry.rate,
                        entry: Some(entry.clone()),
                        source: ResolveSource::CacheAfterError,
                    };
                }

                let rate = self.fallback.rate(from, to);
                let fetched_at = self.clock.now() - error_fallback_backdate();
                self.store(
                    pair,
                    RateEntry::new(rate, fetched_at, Provenance::Fallback),
                    ResolveSource::ErrorFallback,
                )
            }
        }
    }

    fn store(&mut self, pair: RatePair, entry: RateEntry, source: ResolveSource) -> Resolution {
        self.cache.put(pair, entry.clone());
        Resolution {
            pair,
            rate: entry.rate,
            entry: Some(entry),
            source,
        }
    }
}
