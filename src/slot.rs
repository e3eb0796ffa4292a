// Durable key-value slots holding serialized blobs

use crate::store::now_ms;
use eyre::{Context, Result};
use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const CURRENT_VERSION: u32 = 1;

/// A named-slot blob store, read once at startup and rewritten wholesale
pub trait Slot {
    fn read(&self, key: &str) -> Result<Option<String>>;

    fn write(&mut self, key: &str, value: &str) -> Result<()>;
}

/// SQLite-backed slots under a `.taskhub` directory
pub struct SqliteSlot {
    base_path: PathBuf,
    db: Connection,
}

impl SqliteSlot {
    /// Open or create slots at the given path
    ///
    /// The database lives in a `.taskhub` subdirectory of the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base_path = path.as_ref().join(".taskhub");

        // Create directory if missing
        fs::create_dir_all(&base_path).context("Failed to create store directory")?;

        // One database file holds every slot
        let db_path = base_path.join("taskhub.db");
        let db = Connection::open(&db_path).context("Failed to open SQLite database")?;

        let slot = Self { base_path, db };

        // Initialize schema
        slot.create_schema()?;

        // Keep the database out of version control
        slot.create_gitignore()?;

        // Record the on-disk layout version
        slot.write_version()?;

        info!(path = ?slot.base_path, "Opened slot database");
        Ok(slot)
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn create_schema(&self) -> Result<()> {
        debug!("Creating slot schema");

        self.db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS slots (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;

        Ok(())
    }

    fn create_gitignore(&self) -> Result<()> {
        let gitignore_path = self.base_path.join(".gitignore");
        if !gitignore_path.exists() {
            fs::write(gitignore_path, "taskhub.db\ntaskhub.db-shm\ntaskhub.db-wal\n")?;
        }
        Ok(())
    }

    fn write_version(&self) -> Result<()> {
        let version_path = self.base_path.join(".version");
        if !version_path.exists() {
            fs::write(version_path, CURRENT_VERSION.to_string())?;
        }
        Ok(())
    }
}

impl Slot for SqliteSlot {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .db
            .query_row("SELECT value FROM slots WHERE key = ?1", [key], |row| row.get(0))
            .optional()
            .context("Failed to read slot")?;
        Ok(value)
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        // Whole-blob overwrite; the previous value is not kept
        self.db
            .execute(
                "INSERT OR REPLACE INTO slots (key, value, updated_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![key, value, now_ms()],
            )
            .context("Failed to write slot")?;
        debug!(key, bytes = value.len(), "Wrote slot");
        Ok(())
    }
}

/// In-process slots, nothing survives the process
#[derive(Debug, Default, Clone)]
pub struct MemorySlot {
    values: HashMap<String, String>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(key: &str, value: &str) -> Self {
        let mut slot = Self::new();
        slot.values.insert(key.to_string(), value.to_string());
        slot
    }
}

impl Slot for MemorySlot {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
