//! Exchange rate cache, provider and resolver.

pub mod cache;
pub mod fallback;
pub mod provider;
pub mod resolver;
pub mod store;

pub use cache::{CacheSnapshot, CacheSummary, RateCache, RateEntry, RatePair};
pub use fallback::FallbackTable;
pub use provider::{extract_rate, HttpRateProvider, ProviderReply, RateProvider};
pub use resolver::{RateResolver, Resolution, ResolveSource};
pub use store::RateStore;
