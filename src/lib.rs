//! Currency detection and conversion for selected text.
//!
//! A selection is scanned for a price, the rate to the configured target
//! currency is resolved (cache, live provider, then a static fallback table)
//! and the result is handed to a `Presenter` as a transient overlay.

pub mod api;
pub mod config;
pub mod core;
pub mod shared;

pub use crate::core::detection::{detect_currency, DetectionResult};
pub use crate::core::rates::{HttpRateProvider, RateStore};
pub use crate::core::session::{ConversionSession, Presenter, SessionOutcome, SessionPhase};
pub use crate::shared::{AppError, AppResult};
