use serde::{Serialize, Deserialize};
use ts_rs::TS;

use super::settings::Settings;
use super::types::CurrencyCode;
use crate::core::session::{DismissReason, RefreshReport, SessionPhase};

/// Requests delivered by the surrounding shell (context menu, settings page,
/// overlay buttons).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "action", rename_all = "camelCase")] // Tagged enum for easier frontend parsing
#[ts(export)]
pub enum ExtensionRequest {
    ConvertSelectedText {
        #[serde(rename = "selectedText")]
        selected_text: String,
    },

    SettingsUpdated(Settings),

    RefreshAllRates,

    RefreshRate,

    SelectSourceCurrency {
        currency: CurrencyCode,
    },

    DismissPopup {
        reason: DismissReason,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ExtensionResponse {
    pub success: bool,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub phase: Option<SessionPhase>,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub report: Option<RefreshReport>,
}

impl ExtensionResponse {
    pub fn ok() -> Self {
        Self { success: true, phase: None, report: None }
    }

    pub fn failed() -> Self {
        Self { success: false, phase: None, report: None }
    }

    pub fn with_phase(mut self, phase: SessionPhase) -> Self {
        self.phase = Some(phase);
        self
    }

    pub fn with_report(mut self, report: RefreshReport) -> Self {
        self.report = Some(report);
        self
    }
}
