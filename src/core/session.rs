//! Selection-to-overlay state machine.
//!
//! One session is live at a time. Every selection bumps the session id; work
//! that finishes under a stale id is dropped, which is how dismissal and
//! replacement cancel an in-flight rate lookup. The slot mutex is only held
//! for bookkeeping, never across an `.await`.

pub mod presenter;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use ts_rs::TS;

use crate::config::{AUTO_DISMISS_AFTER, BULK_REFRESH_DELAY};
use crate::core::clock::Clock;
use crate::core::detection::{DetectionResult, Detector};
use crate::core::rates::{CacheSnapshot, CacheSummary, RatePair, RateProvider, RateResolver};
use crate::shared::settings::Settings;
use crate::shared::types::CurrencyCode;

pub use presenter::{ConversionView, CurrencyPrompt, Presenter, SameCurrencyView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub enum SessionPhase {
    Idle,
    Detecting,
    AwaitingCurrencyChoice,
    SameCurrency,
    Resolving,
    Displayed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub enum DismissReason {
    Close,
    OutsideClick,
    Escape,
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RefreshReport {
    pub refreshed: usize,
    pub total: usize,
}

/// What a session entry point ended up doing.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// A detection or resolution is already running.
    Busy,
    /// The call does not apply to the current phase.
    Inactive,
    NothingDetected,
    AwaitingCurrencyChoice(CurrencyPrompt),
    SameCurrency(SameCurrencyView),
    Displayed(ConversionView),
    Refreshed(ConversionView),
    /// The session was dismissed or replaced before the result arrived.
    Discarded,
    /// The presenter could not render, or the conversion overflowed.
    Aborted,
}

#[derive(Debug, Clone)]
enum Phase {
    Idle,
    Detecting,
    AwaitingCurrencyChoice { amount: Decimal },
    SameCurrency,
    Resolving { amount: Decimal, pair: RatePair },
    Displayed { amount: Decimal, pair: RatePair },
}

impl Phase {
    fn public(&self) -> SessionPhase {
        match self {
            Phase::Idle => SessionPhase::Idle,
            Phase::Detecting => SessionPhase::Detecting,
            Phase::AwaitingCurrencyChoice { .. } => SessionPhase::AwaitingCurrencyChoice,
            Phase::SameCurrency => SessionPhase::SameCurrency,
            Phase::Resolving { .. } => SessionPhase::Resolving,
            Phase::Displayed { .. } => SessionPhase::Displayed,
        }
    }

    fn in_flight(&self) -> bool {
        matches!(self, Phase::Detecting | Phase::Resolving { .. })
    }
}

struct Slot {
    id: u64,
    phase: Phase,
    /// Something is on screen for the current session.
    shown: bool,
    timer: Option<JoinHandle<()>>,
}

struct SessionInner {
    settings: RwLock<Settings>,
    detector: Detector,
    resolver: AsyncMutex<RateResolver>,
    clock: Arc<dyn Clock>,
    presenter: Arc<dyn Presenter>,
    slot: Mutex<Slot>,
    dismiss_after: Duration,
    refresh_delay: Duration,
}

/// Cloneable handle to the single conversion session.
#[derive(Clone)]
pub struct ConversionSession {
    inner: Arc<SessionInner>,
}

impl ConversionSession {
    pub fn new(
        settings: Settings,
        provider: Arc<dyn RateProvider>,
        clock: Arc<dyn Clock>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        Self::with_timing(settings, provider, clock, presenter, AUTO_DISMISS_AFTER, BULK_REFRESH_DELAY)
    }

    pub fn with_timing(
        settings: Settings,
        provider: Arc<dyn RateProvider>,
        clock: Arc<dyn Clock>,
        presenter: Arc<dyn Presenter>,
        dismiss_after: Duration,
        refresh_delay: Duration,
    ) -> Self {
        let settings = settings.normalized();
        let resolver = RateResolver::new(provider, clock.clone(), settings.api_url.clone());

        Self {
            inner: Arc::new(SessionInner {
                settings: RwLock::new(settings),
                detector: Detector::new(),
                resolver: AsyncMutex::new(resolver),
                clock,
                presenter,
                slot: Mutex::new(Slot {
                    id: 0,
                    phase: Phase::Idle,
                    shown: false,
                    timer: None,
                }),
                dismiss_after,
                refresh_delay,
            }),
        }
    }

    pub fn settings(&self) -> Settings {
        self.inner
            .settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn phase(&self) -> SessionPhase {
        self.lock_slot().phase.public()
    }

    /// Start a new session for `text`, replacing whatever is shown.
    pub async fn handle_selection(&self, text: &str) -> SessionOutcome {
        let id = {
            let mut slot = self.lock_slot();
            if slot.phase.in_flight() {
                tracing::debug!(session = slot.id, "Conversion already in progress, ignoring selection");
                return SessionOutcome::Busy;
            }
            self.retire(&mut slot);
            slot.id += 1;
            slot.phase = Phase::Detecting;
            slot.id
        };

        let settings = self.settings();
        let Some(detection) = self.inner.detector.detect(text, settings.auto_detect_source) else {
            tracing::info!(session = id, "No currency amount detected in selection");
            self.settle(id, Phase::Idle);
            return SessionOutcome::NothingDetected;
        };

        let target = settings.target_currency;
        match detection.currency {
            None => self.ask_for_currency(id, &detection, target),
            Some(currency) if currency == target => self.show_same_currency(id, detection.amount, currency),
            Some(currency) => {
                self.resolve_and_display(id, detection.amount, RatePair::new(currency, target))
                    .await
            }
        }
    }

    /// Continue a session that was waiting for the user to name the currency.
    pub async fn choose_source_currency(&self, currency: CurrencyCode) -> SessionOutcome {
        let target = self.settings().target_currency;
        let (id, amount) = {
            let mut slot = self.lock_slot();
            match slot.phase {
                Phase::AwaitingCurrencyChoice { amount } => {
                    // Claim the prompt so a second pick sees Busy
                    slot.phase = Phase::Resolving {
                        amount,
                        pair: RatePair::new(currency, target),
                    };
                    (slot.id, amount)
                }
                Phase::Detecting | Phase::Resolving { .. } => return SessionOutcome::Busy,
                _ => return SessionOutcome::Inactive,
            }
        };

        if currency == target {
            return self.show_same_currency(id, amount, currency);
        }
        self.resolve_and_display(id, amount, RatePair::new(currency, target))
            .await
    }

    /// Re-fetch the displayed pair and update the overlay in place.
    pub async fn refresh(&self) -> SessionOutcome {
        let (id, amount, pair) = {
            let mut slot = self.lock_slot();
            match slot.phase {
                Phase::Displayed { amount, pair } => {
                    slot.phase = Phase::Resolving { amount, pair };
                    (slot.id, amount, pair)
                }
                Phase::Detecting | Phase::Resolving { .. } => return SessionOutcome::Busy,
                _ => return SessionOutcome::Inactive,
            }
        };

        tracing::info!(session = id, %pair, "Refreshing displayed rate");
        let resolution = self
            .inner
            .resolver
            .lock()
            .await
            .resolve(pair.from, pair.to, true)
            .await;

        let mut slot = self.lock_slot();
        if slot.id != id {
            tracing::debug!(session = id, "Discarding refresh for a dismissed session");
            return SessionOutcome::Discarded;
        }
        slot.phase = Phase::Displayed { amount, pair };

        let Some(view) = ConversionView::build(id, amount, &resolution, self.inner.clock.now()) else {
            tracing::warn!(session = id, %pair, %amount, "Converted amount out of range");
            return SessionOutcome::Aborted;
        };
        match self.inner.presenter.update_conversion(&view) {
            Ok(()) => SessionOutcome::Refreshed(view),
            Err(e) => {
                tracing::warn!(session = id, error = %e, "Failed to update conversion overlay");
                SessionOutcome::Aborted
            }
        }
    }

    /// Close the overlay. Returns `false` when nothing was open.
    pub fn dismiss(&self, reason: DismissReason) -> bool {
        let mut slot = self.lock_slot();
        if matches!(slot.phase, Phase::Idle) {
            return false;
        }
        self.close(&mut slot, reason);
        true
    }

    /// Force-refresh every cached pair, one at a time.
    pub async fn refresh_all(&self) -> RefreshReport {
        let mut pairs = self.inner.resolver.lock().await.cache().all_pairs();
        pairs.sort();
        let total = pairs.len();
        tracing::info!(total, "Refreshing all cached rates");

        let mut refreshed = 0;
        for (i, pair) in pairs.into_iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.inner.refresh_delay).await;
            }
            let resolution = self
                .inner
                .resolver
                .lock()
                .await
                .resolve(pair.from, pair.to, true)
                .await;
            tracing::debug!(%pair, rate = %resolution.rate, source = ?resolution.source, "Refreshed pair");
            refreshed += 1;
        }

        tracing::info!("Refreshed {}/{} exchange rates", refreshed, total);
        RefreshReport { refreshed, total }
    }

    /// Swap in new settings, point the resolver at the new provider URL and
    /// refresh everything cached.
    pub async fn apply_settings(&self, settings: Settings) -> RefreshReport {
        let settings = settings.normalized();
        tracing::info!(
            target_currency = %settings.target_currency,
            auto_detect = settings.auto_detect_source,
            "Settings updated"
        );

        self.inner
            .resolver
            .lock()
            .await
            .set_api_url(settings.api_url.clone());
        *self
            .inner
            .settings
            .write()
            .unwrap_or_else(PoisonError::into_inner) = settings;

        self.refresh_all().await
    }

    pub async fn cache_snapshot(&self) -> CacheSnapshot {
        self.inner.resolver.lock().await.cache().snapshot()
    }

    pub async fn restore_cache(&self, snapshot: CacheSnapshot) -> usize {
        self.inner.resolver.lock().await.cache_mut().restore(snapshot)
    }

    pub async fn cache_summary(&self) -> Option<CacheSummary> {
        let now = self.inner.clock.now();
        self.inner.resolver.lock().await.cache().summary(now)
    }

    pub async fn clear_cache(&self) {
        self.inner.resolver.lock().await.cache_mut().clear();
        tracing::info!("Cleared rate cache");
    }

    fn ask_for_currency(&self, id: u64, detection: &DetectionResult, target: CurrencyCode) -> SessionOutcome {
        let prompt = CurrencyPrompt::new(id, detection, target);
        let next = Phase::AwaitingCurrencyChoice { amount: detection.amount };
        match self.present(id, next, |p| p.show_currency_selector(&prompt)) {
            Ok(()) => SessionOutcome::AwaitingCurrencyChoice(prompt),
            Err(outcome) => outcome,
        }
    }

    fn show_same_currency(&self, id: u64, amount: Decimal, currency: CurrencyCode) -> SessionOutcome {
        let view = SameCurrencyView::new(id, amount, currency);
        match self.present(id, Phase::SameCurrency, |p| p.show_same_currency(&view)) {
            Ok(()) => SessionOutcome::SameCurrency(view),
            Err(outcome) => outcome,
        }
    }

    async fn resolve_and_display(&self, id: u64, amount: Decimal, pair: RatePair) -> SessionOutcome {
        {
            let mut slot = self.lock_slot();
            if slot.id != id {
                return SessionOutcome::Discarded;
            }
            slot.phase = Phase::Resolving { amount, pair };
        }

        let resolution = self
            .inner
            .resolver
            .lock()
            .await
            .resolve(pair.from, pair.to, false)
            .await;

        let Some(view) = ConversionView::build(id, amount, &resolution, self.inner.clock.now()) else {
            tracing::warn!(session = id, %pair, %amount, "Converted amount out of range");
            let mut slot = self.lock_slot();
            if slot.id != id {
                return SessionOutcome::Discarded;
            }
            self.abandon(&mut slot);
            return SessionOutcome::Aborted;
        };

        match self.present(id, Phase::Displayed { amount, pair }, |p| p.show_conversion(&view)) {
            Ok(()) => {
                tracing::info!(
                    session = id,
                    %pair,
                    rate = %view.rate,
                    converted = %view.converted,
                    "Conversion displayed"
                );
                SessionOutcome::Displayed(view)
            }
            Err(outcome) => outcome,
        }
    }

    /// Render for session `id` and move it to `next`, arming the auto-dismiss
    /// timer. Fails with `Discarded` for a stale id and `Aborted` when the
    /// presenter has nowhere to render.
    fn present<F>(&self, id: u64, next: Phase, render: F) -> Result<(), SessionOutcome>
    where
        F: FnOnce(&dyn Presenter) -> crate::shared::AppResult<()>,
    {
        let mut slot = self.lock_slot();
        if slot.id != id {
            tracing::debug!(session = id, "Discarding result for a dismissed session");
            return Err(SessionOutcome::Discarded);
        }

        if let Err(e) = render(self.inner.presenter.as_ref()) {
            tracing::warn!(session = id, error = %e, "Failed to render overlay");
            self.abandon(&mut slot);
            return Err(SessionOutcome::Aborted);
        }

        slot.phase = next;
        slot.shown = true;
        self.arm_timer(&mut slot);
        Ok(())
    }

    fn settle(&self, id: u64, phase: Phase) {
        let mut slot = self.lock_slot();
        if slot.id == id {
            slot.phase = phase;
        }
    }

    /// Cancel the timer and hide whatever the current session shows.
    fn retire(&self, slot: &mut Slot) {
        if let Some(timer) = slot.timer.take() {
            timer.abort();
        }
        if !matches!(slot.phase, Phase::Idle) {
            self.inner.presenter.hide();
            slot.phase = Phase::Idle;
        }
        slot.shown = false;
    }

    /// Give up on the current session after a failed step, taking down
    /// anything it already put on screen.
    fn abandon(&self, slot: &mut Slot) {
        if let Some(timer) = slot.timer.take() {
            timer.abort();
        }
        if slot.shown {
            self.inner.presenter.hide();
            slot.shown = false;
        }
        slot.phase = Phase::Idle;
    }

    fn close(&self, slot: &mut Slot, reason: DismissReason) {
        if let Phase::Resolving { amount, pair } = &slot.phase {
            tracing::debug!(session = slot.id, %pair, %amount, "Dropping in-flight conversion");
        }
        tracing::info!(session = slot.id, ?reason, "Dismissing overlay");
        self.retire(slot);
        // Invalidate the id so late results are discarded
        slot.id += 1;
    }

    fn arm_timer(&self, slot: &mut Slot) {
        if let Some(old) = slot.timer.take() {
            old.abort();
        }

        let id = slot.id;
        let after = self.inner.dismiss_after;
        let weak: Weak<SessionInner> = Arc::downgrade(&self.inner);
        slot.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if let Some(inner) = weak.upgrade() {
                ConversionSession { inner }.expire(id);
            }
        }));
    }

    fn expire(&self, id: u64) {
        let mut slot = self.lock_slot();
        if slot.id != id || matches!(slot.phase, Phase::Idle) {
            return;
        }
        // This runs on the timer task itself
        slot.timer = None;
        self.close(&mut slot, DismissReason::Timeout);
    }

    fn lock_slot(&self) -> MutexGuard<'_, Slot> {
        self.inner.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_API_URL;
    use crate::core::testing::{ManualClock, RecordingPresenter, Rendered, ScriptedProvider};
    use crate::shared::types::Provenance;
    use serde_json::json;

    struct Harness {
        session: ConversionSession,
        provider: Arc<ScriptedProvider>,
        presenter: Arc<RecordingPresenter>,
    }

    fn harness(provider: ScriptedProvider, settings: Settings) -> Harness {
        let provider = Arc::new(provider);
        let presenter = Arc::new(RecordingPresenter::default());
        let session = ConversionSession::new(
            settings,
            provider.clone(),
            Arc::new(ManualClock::default()),
            presenter.clone(),
        );
        Harness { session, provider, presenter }
    }

    fn offline() -> Harness {
        harness(ScriptedProvider::offline(), Settings::default())
    }

    #[tokio::test]
    async fn test_dollar_price_offline_converts_with_fallback() {
        let h = offline();
        let outcome = h.session.handle_selection("$19.99").await;

        let SessionOutcome::Displayed(view) = outcome else {
            panic!("expected a displayed conversion, got {:?}", outcome);
        };
        assert_eq!(view.from, CurrencyCode::Usd);
        assert_eq!(view.to, CurrencyCode::Myr);
        assert_eq!(view.rate, Decimal::new(448, 2));
        assert_eq!(view.converted, Decimal::new(8956, 2));
        assert_eq!(view.provenance, Some(Provenance::Fallback));
        assert_eq!(h.session.phase(), SessionPhase::Displayed);
        assert_eq!(h.presenter.last(), Some(Rendered::Conversion(view)));
    }

    #[tokio::test]
    async fn test_bare_number_asks_for_currency_then_converts() {
        let h = offline();
        let outcome = h.session.handle_selection("42").await;
        let SessionOutcome::AwaitingCurrencyChoice(prompt) = outcome else {
            panic!("expected a currency prompt, got {:?}", outcome);
        };
        assert_eq!(prompt.amount, Decimal::from(42));
        assert!(!prompt.choices.contains(&CurrencyCode::Myr));
        assert_eq!(h.session.phase(), SessionPhase::AwaitingCurrencyChoice);

        let chosen = h.session.choose_source_currency(CurrencyCode::Sgd).await;
        let SessionOutcome::Displayed(view) = chosen else {
            panic!("expected a displayed conversion, got {:?}", chosen);
        };
        assert_eq!(view.from, CurrencyCode::Sgd);
        assert_eq!(view.converted, Decimal::new(13902, 2));
    }

    #[tokio::test]
    async fn test_auto_detect_off_always_prompts() {
        let settings = Settings {
            auto_detect_source: false,
            ..Settings::default()
        };
        let h = harness(ScriptedProvider::offline(), settings);
        assert!(matches!(
            h.session.handle_selection("$5").await,
            SessionOutcome::AwaitingCurrencyChoice(_)
        ));
        assert_eq!(h.provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_choosing_target_currency_shows_same_currency() {
        let h = offline();
        h.session.handle_selection("42").await;
        assert!(matches!(
            h.session.choose_source_currency(CurrencyCode::Myr).await,
            SessionOutcome::SameCurrency(_)
        ));
        assert_eq!(h.session.phase(), SessionPhase::SameCurrency);
    }

    #[tokio::test]
    async fn test_choose_without_prompt_is_inactive() {
        let h = offline();
        assert_eq!(
            h.session.choose_source_currency(CurrencyCode::Usd).await,
            SessionOutcome::Inactive
        );
    }

    #[tokio::test]
    async fn test_target_currency_selection_is_same_currency() {
        let h = offline();
        let outcome = h.session.handle_selection("RM250").await;
        let SessionOutcome::SameCurrency(view) = outcome else {
            panic!("expected same currency, got {:?}", outcome);
        };
        assert_eq!(view.amount, Decimal::from(250));
        assert_eq!(view.currency, CurrencyCode::Myr);
        assert_eq!(h.provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_nothing_detected_replaces_previous_overlay() {
        let h = offline();
        h.session.handle_selection("$5").await;
        assert_eq!(
            h.session.handle_selection("no prices here").await,
            SessionOutcome::NothingDetected
        );
        assert_eq!(h.session.phase(), SessionPhase::Idle);
        assert_eq!(h.presenter.hidden_count(), 1);
    }

    #[tokio::test]
    async fn test_selection_while_resolving_is_busy() {
        let h = offline();
        let gate = h.provider.hold();

        let (first, second) = tokio::join!(h.session.handle_selection("$5"), async {
            assert_eq!(h.session.phase(), SessionPhase::Resolving);
            let busy = h.session.handle_selection("€3").await;
            gate.notify_one();
            busy
        });

        assert!(matches!(first, SessionOutcome::Displayed(_)));
        assert_eq!(second, SessionOutcome::Busy);
        assert_eq!(h.provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_dismiss_while_resolving_discards_result() {
        let h = offline();
        let gate = h.provider.hold();

        let (outcome, dismissed) = tokio::join!(h.session.handle_selection("$5"), async {
            let dismissed = h.session.dismiss(DismissReason::Escape);
            gate.notify_one();
            dismissed
        });

        assert!(dismissed);
        assert_eq!(outcome, SessionOutcome::Discarded);
        assert_eq!(h.session.phase(), SessionPhase::Idle);
        assert_eq!(h.presenter.calls(), vec![Rendered::Hidden]);
    }

    #[tokio::test]
    async fn test_dismiss_when_idle_is_noop() {
        let h = offline();
        assert!(!h.session.dismiss(DismissReason::Close));
        assert_eq!(h.presenter.hidden_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlay_auto_dismisses_after_fifteen_seconds() {
        let h = offline();
        h.session.handle_selection("$5").await;

        tokio::time::sleep(Duration::from_secs(14)).await;
        assert_eq!(h.session.phase(), SessionPhase::Displayed);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(h.session.phase(), SessionPhase::Idle);
        assert_eq!(h.presenter.last(), Some(Rendered::Hidden));
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_selection_cancels_previous_timer() {
        let h = offline();
        h.session.handle_selection("$5").await;
        tokio::time::sleep(Duration::from_secs(10)).await;
        h.session.handle_selection("€3").await;

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(h.session.phase(), SessionPhase::Displayed);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(h.session.phase(), SessionPhase::Idle);
        assert_eq!(h.presenter.hidden_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_dismiss_cancels_timer() {
        let h = offline();
        h.session.handle_selection("$5").await;
        assert!(h.session.dismiss(DismissReason::OutsideClick));

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(h.presenter.hidden_count(), 1);
    }

    #[tokio::test]
    async fn test_refresh_updates_overlay_in_place() {
        let h = harness(ScriptedProvider::live(json!({ "value": 4.47 })), Settings::default());
        h.session.handle_selection("$10").await;

        h.provider.reply_with(json!({ "value": 4.5 }));
        let outcome = h.session.refresh().await;
        let SessionOutcome::Refreshed(view) = outcome else {
            panic!("expected a refreshed conversion, got {:?}", outcome);
        };
        assert_eq!(view.rate, Decimal::new(45, 1));
        assert_eq!(view.converted, Decimal::from(45));
        assert_eq!(view.provenance, Some(Provenance::Live));
        assert_eq!(h.presenter.last(), Some(Rendered::Updated(view)));
        assert_eq!(h.session.phase(), SessionPhase::Displayed);
        assert_eq!(h.provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_refresh_without_conversion_is_inactive() {
        let h = offline();
        assert_eq!(h.session.refresh().await, SessionOutcome::Inactive);
        h.session.handle_selection("42").await;
        assert_eq!(h.session.refresh().await, SessionOutcome::Inactive);
    }

    #[tokio::test]
    async fn test_missing_render_target_aborts() {
        let h = offline();
        h.presenter.break_target();
        assert_eq!(h.session.handle_selection("$5").await, SessionOutcome::Aborted);
        assert_eq!(h.session.phase(), SessionPhase::Idle);
    }

    #[tokio::test]
    async fn test_render_failure_after_prompt_hides_selector() {
        let h = offline();
        h.session.handle_selection("42").await;
        h.presenter.break_target();

        assert_eq!(
            h.session.choose_source_currency(CurrencyCode::Usd).await,
            SessionOutcome::Aborted
        );
        assert_eq!(h.session.phase(), SessionPhase::Idle);
        assert_eq!(h.presenter.hidden_count(), 1);
        assert!(!h.session.dismiss(DismissReason::Close));
    }

    #[tokio::test]
    async fn test_overflowing_conversion_hides_selector() {
        let settings = Settings {
            target_currency: CurrencyCode::Idr,
            ..Settings::default()
        };
        let h = harness(ScriptedProvider::offline(), settings);
        let outcome = h.session.handle_selection("10000000000000000000000000000").await;
        assert!(matches!(outcome, SessionOutcome::AwaitingCurrencyChoice(_)));

        assert_eq!(
            h.session.choose_source_currency(CurrencyCode::Myr).await,
            SessionOutcome::Aborted
        );
        assert_eq!(h.session.phase(), SessionPhase::Idle);
        assert_eq!(h.presenter.hidden_count(), 1);
    }

    #[tokio::test]
    async fn test_second_pick_while_resolving_is_busy() {
        let h = offline();
        h.session.handle_selection("42").await;
        let gate = h.provider.hold();

        let (first, second) = tokio::join!(h.session.choose_source_currency(CurrencyCode::Usd), async {
            let second = h.session.choose_source_currency(CurrencyCode::Eur).await;
            gate.notify_one();
            second
        });

        let SessionOutcome::Displayed(view) = first else {
            panic!("expected a displayed conversion, got {:?}", first);
        };
        assert_eq!(view.from, CurrencyCode::Usd);
        assert_eq!(second, SessionOutcome::Busy);
        assert_eq!(h.provider.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_all_survives_failing_pair() {
        let h = harness(ScriptedProvider::live(json!({ "value": 2.0 })), Settings::default());
        for text in ["$1", "€1", "£1"] {
            h.session.handle_selection(text).await;
        }
        h.provider.fail_pair(RatePair::new(CurrencyCode::Eur, CurrencyCode::Myr));

        let started = tokio::time::Instant::now();
        let report = h.session.refresh_all().await;
        assert_eq!(report, RefreshReport { refreshed: 3, total: 3 });
        assert!(started.elapsed() >= Duration::from_millis(400));
        assert_eq!(h.provider.calls(), 6);
    }

    #[tokio::test]
    async fn test_refresh_all_on_empty_cache() {
        let h = offline();
        assert_eq!(h.session.refresh_all().await, RefreshReport { refreshed: 0, total: 0 });
    }

    #[tokio::test]
    async fn test_apply_settings_switches_target_and_url() {
        let settings = Settings {
            api_url: "https://rates.test/live".to_string(),
            ..Settings::default()
        };
        let h = harness(ScriptedProvider::live(json!({ "value": 1.25 })), settings);
        h.session.handle_selection("$1").await;
        assert_eq!(h.provider.last_url().as_deref(), Some("https://rates.test/live"));

        let report = h
            .session
            .apply_settings(Settings {
                target_currency: CurrencyCode::Sgd,
                auto_detect_source: true,
                api_url: "   ".to_string(),
            })
            .await;
        assert_eq!(report.total, 1);
        assert_eq!(h.session.settings().api_url, DEFAULT_API_URL);
        assert_eq!(h.provider.last_url().as_deref(), Some(DEFAULT_API_URL));

        let outcome = h.session.handle_selection("S$20").await;
        assert!(matches!(outcome, SessionOutcome::SameCurrency(_)));
    }

    #[tokio::test]
    async fn test_cache_snapshot_restore_and_clear() {
        let h = offline();
        h.session.handle_selection("$5").await;
        let snapshot = h.session.cache_snapshot().await;
        assert_eq!(snapshot.len(), 1);

        let other = offline();
        assert_eq!(other.session.restore_cache(snapshot).await, 1);
        assert_eq!(other.session.cache_summary().await.map(|s| s.pairs), Some(1));

        other.session.clear_cache().await;
        assert!(other.session.cache_summary().await.is_none());
    }
}
