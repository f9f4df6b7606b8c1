//! Cache storage backends: SQLite, in-memory and no-op.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

use super::traits::LocalCache;

/// Cache that doesn't store anything.
/// Used when caching is disabled - every read is a miss.
pub struct NoopCache;

impl LocalCache for NoopCache {
  fn get(&self, _slot: &str) -> Option<String> {
    None // Always miss
  }

  fn set(&self, _slot: &str, _value: &str) {
    // Discard
  }
}

/// Process-local cache, lost when the process exits.
#[derive(Default)]
pub struct MemoryCache {
  slots: Mutex<HashMap<String, String>>,
}

impl MemoryCache {
  pub fn new() -> Self {
    Self::default()
  }
}

impl LocalCache for MemoryCache {
  fn get(&self, slot: &str) -> Option<String> {
    match self.slots.lock() {
      Ok(slots) => slots.get(slot).cloned(),
      Err(e) => {
        warn!("Memory cache lock poisoned: {}", e);
        None
      }
    }
  }

  fn set(&self, slot: &str, value: &str) {
    match self.slots.lock() {
      Ok(mut slots) => {
        slots.insert(slot.to_string(), value.to_string());
      }
      Err(e) => warn!("Memory cache lock poisoned: {}", e),
    }
  }
}

/// SQLite-based cache storage implementation.
pub struct SqliteCache {
  conn: Mutex<Connection>,
}

impl SqliteCache {
  /// Open the cache at the default location.
  pub fn open_default() -> Result<Self> {
    Self::open(&Self::default_path()?)
  }

  /// Open or create the cache database at `path`.
  pub fn open(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    let cache = Self {
      conn: Mutex::new(conn),
    };
    cache.run_migrations()?;

    debug!("Opened local cache at {}", path.display());
    Ok(cache)
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("folio").join("cache.db"))
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }

  fn try_get(&self, slot: &str) -> Result<Option<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .query_row(
        "SELECT value FROM cache_slots WHERE slot = ?",
        params![slot],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read cache slot {}: {}", slot, e))
  }

  fn try_set(&self, slot: &str, value: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO cache_slots (slot, value, updated_at)
         VALUES (?, ?, datetime('now'))",
        params![slot, value],
      )
      .map_err(|e| eyre!("Failed to write cache slot {}: {}", slot, e))?;

    Ok(())
  }
}

/// Schema for the slot table.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cache_slots (
    slot TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl LocalCache for SqliteCache {
  fn get(&self, slot: &str) -> Option<String> {
    self.try_get(slot).unwrap_or_else(|e| {
      warn!("{}", e);
      None
    })
  }

  fn set(&self, slot: &str, value: &str) {
    if let Err(e) = self.try_set(slot, value) {
      warn!("{}", e);
    }
  }
}
