//! In-crate doubles for the clock, provider and presenter seams.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;
use tokio::sync::Notify;

use crate::core::clock::Clock;
use crate::core::rates::{ProviderReply, RatePair, RateProvider};
use crate::core::session::{ConversionView, CurrencyPrompt, Presenter, SameCurrencyView};
use crate::shared::error::{AppError, AppResult};

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()),
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

#[derive(Debug, Clone)]
enum Behavior {
    Offline,
    Reply(Value),
    Status(u16),
}

/// Provider that answers from a script instead of the network.
pub struct ScriptedProvider {
    behavior: Mutex<Behavior>,
    failing: Mutex<HashSet<RatePair>>,
    gate: Mutex<Option<Arc<Notify>>>,
    calls: AtomicUsize,
    last_url: Mutex<Option<String>>,
}

impl ScriptedProvider {
    fn with(behavior: Behavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            failing: Mutex::new(HashSet::new()),
            gate: Mutex::new(None),
            calls: AtomicUsize::new(0),
            last_url: Mutex::new(None),
        }
    }

    /// Every fetch fails with a network error.
    pub fn offline() -> Self {
        Self::with(Behavior::Offline)
    }

    pub fn live(body: Value) -> Self {
        Self::with(Behavior::Reply(body))
    }

    pub fn status(code: u16) -> Self {
        Self::with(Behavior::Status(code))
    }

    pub fn go_offline(&self) {
        *self.behavior.lock().unwrap() = Behavior::Offline;
    }

    pub fn reply_with(&self, body: Value) {
        *self.behavior.lock().unwrap() = Behavior::Reply(body);
    }

    /// Fail fetches for `pair` only.
    pub fn fail_pair(&self, pair: RatePair) {
        self.failing.lock().unwrap().insert(pair);
    }

    /// Hold every fetch until the returned handle is notified.
    pub fn hold(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_url(&self) -> Option<String> {
        self.last_url.lock().unwrap().clone()
    }
}

#[async_trait]
impl RateProvider for ScriptedProvider {
    async fn fetch(&self, api_url: &str, pair: RatePair) -> AppResult<ProviderReply> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_url.lock().unwrap() = Some(api_url.to_string());

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.failing.lock().unwrap().contains(&pair) {
            return Err(AppError::Network(format!("connection reset for {}", pair)));
        }

        let behavior = self.behavior.lock().unwrap().clone();
        match behavior {
            Behavior::Offline => Err(AppError::Network("offline".to_string())),
            Behavior::Reply(body) => Ok(ProviderReply::Success(body)),
            Behavior::Status(code) => Ok(ProviderReply::Unsuccessful(code)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    Conversion(ConversionView),
    Updated(ConversionView),
    SameCurrency(SameCurrencyView),
    Selector(CurrencyPrompt),
    Hidden,
}

/// Presenter that records every call.
#[derive(Default)]
pub struct RecordingPresenter {
    calls: Mutex<Vec<Rendered>>,
    missing_target: AtomicBool,
}

impl RecordingPresenter {
    pub fn calls(&self) -> Vec<Rendered> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<Rendered> {
        self.calls.lock().unwrap().last().cloned()
    }

    pub fn hidden_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, Rendered::Hidden))
            .count()
    }

    /// Make every show/update report a missing render target.
    pub fn break_target(&self) {
        self.missing_target.store(true, Ordering::SeqCst);
    }

    fn record(&self, call: Rendered) -> AppResult<()> {
        if self.missing_target.load(Ordering::SeqCst) && call != Rendered::Hidden {
            return Err(AppError::RenderTargetMissing("converter body".to_string()));
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

impl Presenter for RecordingPresenter {
    fn show_conversion(&self, view: &ConversionView) -> AppResult<()> {
        self.record(Rendered::Conversion(view.clone()))
    }

    fn update_conversion(&self, view: &ConversionView) -> AppResult<()> {
        self.record(Rendered::Updated(view.clone()))
    }

    fn show_same_currency(&self, view: &SameCurrencyView) -> AppResult<()> {
        self.record(Rendered::SameCurrency(view.clone()))
    }

    fn show_currency_selector(&self, prompt: &CurrencyPrompt) -> AppResult<()> {
        self.record(Rendered::Selector(prompt.clone()))
    }

    fn hide(&self) {
        // Hiding never fails
        let _ = self.record(Rendered::Hidden);
    }
}
