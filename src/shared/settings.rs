use serde::{Deserialize, Serialize};
use ts_rs::TS;
use tokio::fs;
use std::path::{Path, PathBuf};
use directories::ProjectDirs;

use crate::config::{APP_NAME, APP_ORGANIZATION, APP_QUALIFIER, DEFAULT_API_URL};
use crate::shared::error::{AppError, AppResult};
use crate::shared::types::CurrencyCode;

/// User preferences the converter reads at session start.
///
/// Field names match the camelCase keys the extension shell stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct Settings {
    pub target_currency: CurrencyCode,
    pub auto_detect_source: bool,
    pub api_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            target_currency: CurrencyCode::Myr,
            auto_detect_source: true,
            api_url: DEFAULT_API_URL.to_string(),
        }
    }
}

impl Settings {
    /// Trim the API URL and fall back to the default provider when it is blank.
    pub fn normalized(mut self) -> Self {
        let trimmed = self.api_url.trim();
        self.api_url = if trimmed.is_empty() {
            DEFAULT_API_URL.to_string()
        } else {
            trimmed.to_string()
        };
        self
    }

    pub fn settings_path() -> AppResult<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().join("settings.json"))
            .ok_or_else(|| AppError::Io("Failed to determine config directory".to_string()))
    }

    pub async fn load() -> AppResult<Self> {
        Self::load_from(&Self::settings_path()?).await
    }

    /// Load settings from `path`, writing defaults there if the file is missing.
    pub async fn load_from(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            let settings = Self::default();
            settings.save_to(path).await?;
            return Ok(settings);
        }

        let content = fs::read_to_string(path).await
            .map_err(|e| AppError::Io(format!("Failed to read settings file: {}", e)))?;

        let settings: Settings = serde_json::from_str(&content)
            .map_err(|e| AppError::Validation(format!("Failed to parse settings: {}", e)))?;
        Ok(settings.normalized())
    }

    pub async fn save(&self) -> AppResult<()> {
        self.save_to(&Self::settings_path()?).await
    }

    pub async fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await
                .map_err(|e| AppError::Io(format!("Failed to create config directory: {}", e)))?;
        }

        let content = serde_json::to_string_pretty(self)?;

        fs::write(path, content).await
            .map_err(|e| AppError::Io(format!("Failed to write settings file: {}", e)))
    }
}
