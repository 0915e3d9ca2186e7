// Database layer - SQLite connection, migrations, settings queries
//
// Everything the app persists (custom taxonomy, presets, history, category
// order, AI config) lives in the `settings` table as JSON strings.

use rusqlite::{params, Connection, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use tracing::warn;

/// Setting keys used across the app.
pub mod keys {
    pub const CUSTOM_TAXONOMY: &str = "custom_taxonomy";
    pub const PRESETS: &str = "presets";
    pub const HISTORY: &str = "history";
    pub const CATEGORY_ORDER: &str = "category_order";
    pub const AI_API_KEY: &str = "ai_api_key";
    pub const AI_CONFIG: &str = "ai_config";
}

/// Where an unparsable value of `key` is kept.
pub fn corrupt_key(key: &str) -> String {
    format!("{}_corrupt", key)
}

/// Database connection wrapper
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Create a new database connection
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Database { conn })
    }

    /// Create an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Database { conn })
    }

    /// Run migrations to set up the database schema (safe to re-run)
    pub fn run_migrations(&self) -> Result<()> {
        let migration_001 = include_str!("migrations/001_init.sql");
        self.conn.execute_batch(migration_001)?;
        Ok(())
    }

    // --- Settings operations ---

    /// Get a setting value by key. Returns None if the key doesn't exist.
    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self.conn.prepare("SELECT value FROM settings WHERE key = ?")?;
        let result = stmt.query_row([key], |row| row.get::<_, Option<String>>(0));

        match result {
            Ok(value) => Ok(value),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Set a setting value (upsert: insert or update if key exists).
    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// Delete a setting by key.
    pub fn delete_setting(&self, key: &str) -> Result<()> {
        self.conn.execute("DELETE FROM settings WHERE key = ?", [key])?;
        Ok(())
    }

    /// Read a JSON setting. A stored value that no longer parses is moved to
    /// `<key>_corrupt` and treated as missing, so the next write to `key`
    /// cannot destroy it.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.get_setting(key)? else {
            return Ok(None);
        };
        if raw.trim().is_empty() {
            return Ok(None);
        }
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                let aside = corrupt_key(key);
                warn!(key, moved_to = %aside, error = %e, "unparsable setting moved aside");
                self.set_setting(&aside, &raw)?;
                self.delete_setting(key)?;
                Ok(None)
            }
        }
    }

    /// Store a value as a JSON setting.
    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        self.set_setting(key, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        let db = Database::new_in_memory().expect("Failed to create in-memory database");
        db.run_migrations().expect("Failed to run migrations");
        db
    }

    #[test]
    fn test_database_creation_and_rerun_migrations() {
        let db = db();
        db.run_migrations().expect("Migrations should be idempotent");
    }

    #[test]
    fn test_on_disk_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("promptdeck.db");
        {
            let db = Database::new(&path).unwrap();
            db.run_migrations().unwrap();
            db.set_setting("theme", "midnight").unwrap();
        }
        let db = Database::new(&path).unwrap();
        assert_eq!(db.get_setting("theme").unwrap(), Some("midnight".to_string()));
    }

    #[test]
    fn test_get_setting_nonexistent() {
        let db = db();
        assert_eq!(db.get_setting("nonexistent_key").unwrap(), None);
    }

    #[test]
    fn test_set_setting_upsert() {
        let db = db();
        db.set_setting(keys::AI_API_KEY, "first").unwrap();
        db.set_setting(keys::AI_API_KEY, "second").unwrap();
        assert_eq!(db.get_setting(keys::AI_API_KEY).unwrap(), Some("second".to_string()));
    }

    #[test]
    fn test_delete_setting() {
        let db = db();
        db.set_setting("theme", "neon").unwrap();
        db.delete_setting("theme").unwrap();
        assert_eq!(db.get_setting("theme").unwrap(), None);
        // Deleting again is fine
        assert!(db.delete_setting("theme").is_ok());
    }

    #[test]
    fn test_json_round_trip() {
        let db = db();
        let order = vec!["mood".to_string(), "genre".to_string()];
        db.set_json(keys::CATEGORY_ORDER, &order).unwrap();
        let loaded: Option<Vec<String>> = db.get_json(keys::CATEGORY_ORDER).unwrap();
        assert_eq!(loaded, Some(order));
    }

    #[test]
    fn test_unparsable_json_moved_aside() {
        let db = db();
        db.set_setting(keys::PRESETS, "{ broken").unwrap();
        let loaded: Option<Vec<String>> = db.get_json(keys::PRESETS).unwrap();
        assert_eq!(loaded, None);
        assert_eq!(db.get_setting(keys::PRESETS).unwrap(), None);
        assert_eq!(
            db.get_setting(&corrupt_key(keys::PRESETS)).unwrap(),
            Some("{ broken".to_string())
        );
    }
}
