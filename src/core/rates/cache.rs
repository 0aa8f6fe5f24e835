use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::freshness_window;
use crate::shared::types::{deserialize_decimal, serialize_decimal, CurrencyCode, Provenance};

/// Ordered currency pair. Keyed as `"FROM_TO"` when serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RatePair {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
}

impl RatePair {
    pub fn new(from: CurrencyCode, to: CurrencyCode) -> Self {
        Self { from, to }
    }

    pub fn is_identity(&self) -> bool {
        self.from == self.to
    }

    pub fn key(&self) -> String {
        format!("{}_{}", self.from, self.to)
    }

    pub fn from_key(key: &str) -> Option<Self> {
        let (from, to) = key.split_once('_')?;
        Some(Self::new(from.parse().ok()?, to.parse().ok()?))
    }
}

impl fmt::Display for RatePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.from, self.to)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateEntry {
    #[serde(serialize_with = "serialize_decimal", deserialize_with = "deserialize_decimal")]
    pub rate: Decimal,
    pub fetched_at: DateTime<Utc>,
    pub provenance: Provenance,
}

impl RateEntry {
    pub fn new(rate: Decimal, fetched_at: DateTime<Utc>, provenance: Provenance) -> Self {
        Self { rate, fetched_at, provenance }
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.fetched_at
    }
}

/// Serializable copy of the cache contents, keyed by pair key.
pub type CacheSnapshot = BTreeMap<String, RateEntry>;

#[derive(Debug, Clone, PartialEq)]
pub struct CacheSummary {
    pub pairs: usize,
    pub oldest: Duration,
    pub newest: Duration,
}

/// In-memory pair → rate map with a freshness window.
///
/// Entries are never evicted; a stale entry only stops being served without
/// a refresh attempt.
#[derive(Debug, Clone)]
pub struct RateCache {
    entries: HashMap<RatePair, RateEntry>,
    freshness: Duration,
}

impl RateCache {
    pub fn new() -> Self {
        Self::with_freshness(freshness_window())
    }

    pub fn with_freshness(freshness: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            freshness,
        }
    }

    pub fn get(&self, pair: &RatePair) -> Option<&RateEntry> {
        self.entries.get(pair)
    }

    pub fn put(&mut self, pair: RatePair, entry: RateEntry) {
        if pair.is_identity() {
            tracing::debug!(%pair, "Ignoring identity pair");
            return;
        }
        self.entries.insert(pair, entry);
    }

    pub fn is_fresh(&self, entry: &RateEntry, now: DateTime<Utc>) -> bool {
        entry.age(now) < self.freshness
    }

    pub fn all_pairs(&self) -> Vec<RatePair> {
        self.entries.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        self.entries
            .iter()
            .map(|(pair, entry)| (pair.key(), entry.clone()))
            .collect()
    }

    /// Merge a snapshot into the cache, returning how many entries were taken.
    pub fn restore(&mut self, snapshot: CacheSnapshot) -> usize {
        let mut restored = 0;
        for (key, entry) in snapshot {
            match RatePair::from_key(&key) {
                Some(pair) if !pair.is_identity() && entry.rate > Decimal::ZERO => {
                    self.entries.insert(pair, entry);
                    restored += 1;
                }
                _ => tracing::warn!(key = %key, "Skipping unusable cached rate"),
            }
        }
        restored
    }

    pub fn summary(&self, now: DateTime<Utc>) -> Option<CacheSummary> {
        let oldest = self.entries.values().map(|e| e.fetched_at).min()?;
        let newest = self.entries.values().map(|e| e.fetched_at).max()?;
        Some(CacheSummary {
            pairs: self.entries.len(),
            oldest: now - oldest,
            newest: now - newest,
        })
    }
}

impl Default for RateCache {
    fn default() -> Self {
        Self::new()
    }
}
