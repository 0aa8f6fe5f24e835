//! Durable copy of the rate cache on redb.
//!
//! One row per pair: key `"FROM_TO"`, value the JSON-encoded entry. The
//! in-memory cache stays authoritative; this only snapshots and restores it.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use redb::{Database, ReadableTable, TableDefinition, TableError};

use crate::config::{APP_NAME, APP_ORGANIZATION, APP_QUALIFIER};
use crate::shared::error::{AppError, AppResult};

use super::cache::{CacheSnapshot, RateEntry};

const RATES_TABLE: TableDefinition<&str, &str> = TableDefinition::new("currency_rates");

pub struct RateStore {
    db: Database,
}

impl RateStore {
    pub fn open(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::Io(format!("Failed to create data directory: {}", e)))?;
        }
        let db = Database::create(path)?;
        Ok(Self { db })
    }

    pub fn open_default() -> AppResult<Self> {
        Self::open(&Self::default_path()?)
    }

    pub fn default_path() -> AppResult<PathBuf> {
        let proj_dirs = ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .ok_or_else(|| AppError::Io("Unable to determine data directory".into()))?;
        Ok(proj_dirs.data_dir().join("currency_rates.redb"))
    }

    pub fn load(&self) -> AppResult<CacheSnapshot> {
        let mut snapshot = CacheSnapshot::new();

        let txn = self.db.begin_read()?;
        let table = match txn.open_table(RATES_TABLE) {
            Ok(table) => table,
            // A fresh database has no table yet
            Err(TableError::TableDoesNotExist(_)) => return Ok(snapshot),
            Err(e) => return Err(e.into()),
        };

        for row in table.iter()? {
            let (key, value) = row?;
            match serde_json::from_str::<RateEntry>(value.value()) {
                Ok(entry) => {
                    snapshot.insert(key.value().to_string(), entry);
                }
                Err(e) => tracing::warn!(key = key.value(), error = %e, "Skipping corrupt stored rate"),
            }
        }

        tracing::debug!(entries = snapshot.len(), "Loaded cached rates from disk");
        Ok(snapshot)
    }

    /// Replace the stored rows with `snapshot`.
    pub fn save(&self, snapshot: &CacheSnapshot) -> AppResult<()> {
        let txn = self.db.begin_write()?;
        txn.delete_table(RATES_TABLE)?;
        {
            let mut table = txn.open_table(RATES_TABLE)?;
            for (key, entry) in snapshot {
                let serialized = serde_json::to_string(entry)?;
                table.insert(key.as_str(), serialized.as_str())?;
            }
        }
        txn.commit()?;

        tracing::debug!(entries = snapshot.len(), "Persisted cached rates");
        Ok(())
    }

    pub fn clear(&self) -> AppResult<()> {
        let txn = self.db.begin_write()?;
        txn.delete_table(RATES_TABLE)?;
        txn.commit()?;
        Ok(())
    }
}
