use chrono::Utc;
use serde_json::{Map, Value};
use tracing::instrument;

use prism_core::errors::ProviderError;
use prism_core::providers::PreferenceStore;

use crate::database::Database;
use crate::error::StoreError;

/// Key-value preference repository. Values are stored as JSON text; the
/// engine reads the whole table once at construction and writes through on
/// individual setting changes.
pub struct PrefsRepo {
    db: Database,
}

impl PrefsRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub fn load_all(&self) -> Result<Map<String, Value>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT key, value FROM preferences")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;

            let mut map = Map::new();
            for row in rows {
                let (key, raw) = row?;
                match serde_json::from_str(&raw) {
                    Ok(value) => {
                        map.insert(key, value);
                    }
                    Err(e) => {
                        tracing::warn!(key, error = %e, "skipping unreadable preference")
                    }
                }
            }
            Ok(map)
        })
    }

    #[instrument(skip(self, value))]
    pub fn set(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value)?;
        let now = Utc::now().to_rfc3339();
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO preferences (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3",
                rusqlite::params![key, raw, now],
            )?;
            Ok(())
        })
    }

    pub fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.db.with_conn(|conn| {
            let raw: Option<String> = conn
                .query_row(
                    "SELECT value FROM preferences WHERE key = ?1",
                    [key],
                    |row| row.get(0),
                )
                .ok();
            match raw {
                Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
                None => Ok(None),
            }
        })
    }

    #[instrument(skip(self))]
    pub fn remove(&self, key: &str) -> Result<bool, StoreError> {
        self.db.with_conn(|conn| {
            let n = conn.execute("DELETE FROM preferences WHERE key = ?1", [key])?;
            Ok(n > 0)
        })
    }
}

impl PreferenceStore for PrefsRepo {
    fn load_all(&self) -> Result<Map<String, Value>, ProviderError> {
        PrefsRepo::load_all(self).map_err(|e| ProviderError::Storage(e.to_string()))
    }

    fn set(&self, key: &str, value: &Value) -> Result<(), ProviderError> {
        PrefsRepo::set(self, key, value).map_err(|e| ProviderError::Storage(e.to_string()))
    }
}
