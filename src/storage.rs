// Key-value storage backing the task list

use eyre::{Context, Result, eyre};
use fs2::FileExt;
use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const CURRENT_VERSION: u32 = 1;
const DB_FILE: &str = "tasklist.db";
const LOCK_FILE: &str = "tasklist.lock";

/// String-keyed storage medium holding serialized blobs
pub trait KeyValueStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Overwrite the value stored under `key`
    fn set_item(&mut self, key: &str, value: &str) -> Result<()>;
}

/// SQLite-backed storage living in a data directory
pub struct SqliteStorage {
    base_path: PathBuf,
    db: Connection,
}

impl SqliteStorage {
    /// Open or create storage in the given directory
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();

        fs::create_dir_all(&base_path).context("Failed to create data directory")?;

        let db_path = base_path.join(DB_FILE);
        let db = Connection::open(&db_path).context("Failed to open SQLite database")?;

        let storage = Self { base_path, db };
        storage.create_schema()?;
        storage.write_version()?;

        info!(path = ?storage.base_path, "Opened task storage");
        Ok(storage)
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Take the exclusive lock for this data directory without blocking
    pub fn lock(&self) -> Result<StorageLock> {
        StorageLock::acquire(&self.base_path)
    }

    fn create_schema(&self) -> Result<()> {
        debug!("Creating database schema");

        self.db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;

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

impl KeyValueStorage for SqliteStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.db
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()
            .context("Failed to read from storage")
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        self.db
            .execute(
                "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
                rusqlite::params![key, value],
            )
            .context("Failed to write to storage")?;
        debug!(key, bytes = value.len(), "Wrote storage item");
        Ok(())
    }
}

/// In-process storage, nothing survives the process
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    items: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Exclusive advisory lock over a data directory, released on drop
#[derive(Debug)]
pub struct StorageLock {
    file: File,
}

impl StorageLock {
    fn acquire(base_path: &Path) -> Result<Self> {
        let lock_path = base_path.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .context("Failed to open lock file")?;

        file.try_lock_exclusive()
            .map_err(|_| eyre!("Task list at {:?} is in use by another tasklist process", base_path))?;

        debug!(path = ?lock_path, "Acquired storage lock");
        Ok(Self { file })
    }
}

impl Drop for StorageLock {
    fn drop(&mut self) {
        // Unlock is best-effort; closing the file releases it anyway
        let _ = FileExt::unlock(&self.file);
    }
}
