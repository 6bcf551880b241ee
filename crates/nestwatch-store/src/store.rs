//! Main store implementation.

use std::path::Path;

use rusqlite::Connection;
use time::OffsetDateTime;
use tracing::{debug, info};

use nestwatch_types::{Reading, TREND_WINDOW};

use crate::error::{Error, Result};
use crate::schema;

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "nest";

const KEY_SUFFIX: &str = "history";

/// SQLite-backed rolling history of thermostat readings.
///
/// Every device owns one list, keyed `"<namespace>:<device_id>:history"`.
/// A push inserts at the head and trims the list to [`TREND_WINDOW`]
/// entries inside a single transaction, so concurrent writers on the same
/// database cannot observe or leave behind an over-long list.
pub struct Store {
    conn: Connection,
    namespace: String,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        info!("Opening history store at {}", path.display());
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;

        schema::initialize(&conn)?;

        Ok(Self {
            conn,
            namespace: DEFAULT_NAMESPACE.to_string(),
        })
    }

    /// Open the default database location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::default_db_path())
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self {
            conn,
            namespace: DEFAULT_NAMESPACE.to_string(),
        })
    }

    /// Use a different key namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Check the database answers a trivial query.
    pub fn ping(&self) -> Result<()> {
        self.conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    /// History key for a device.
    pub fn history_key(&self, device_id: &str) -> Result<String> {
        if device_id.trim().is_empty() {
            return Err(Error::InvalidKey(device_id.to_string()));
        }
        Ok(format!("{}:{}:{}", self.namespace, device_id, KEY_SUFFIX))
    }
}

// History operations
impl Store {
    /// Push a reading onto the head of a device's history and trim the
    /// history to [`TREND_WINDOW`] entries.
    pub fn push(&self, device_id: &str, reading: &Reading) -> Result<()> {
        let key = self.history_key(device_id)?;
        let payload = serde_json::to_string(reading)?;
        let now = OffsetDateTime::now_utc().unix_timestamp();

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO history (history_key, pushed_at, payload) VALUES (?1, ?2, ?3)",
            rusqlite::params![key, now, payload],
        )?;
        let evicted = tx.execute(
            "DELETE FROM history WHERE history_key = ?1 AND id NOT IN (
                SELECT id FROM history WHERE history_key = ?1 ORDER BY id DESC LIMIT ?2
             )",
            rusqlite::params![key, TREND_WINDOW as i64],
        )?;
        tx.commit()?;

        debug!("Pushed sample to {} (evicted {})", key, evicted);
        Ok(())
    }

    /// Current history for a device, newest first, at most
    /// [`TREND_WINDOW`] entries. Unknown devices have an empty history.
    pub fn recent(&self, device_id: &str) -> Result<Vec<Reading>> {
        let key = self.history_key(device_id)?;

        let mut stmt = self.conn.prepare(
            "SELECT payload FROM history WHERE history_key = ?1 ORDER BY id DESC LIMIT ?2",
        )?;
        let payloads = stmt
            .query_map(rusqlite::params![key, TREND_WINDOW as i64], |row| {
                row.get::<_, String>(0)
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        payloads
            .iter()
            .map(|payload| serde_json::from_str(payload).map_err(Error::from))
            .collect()
    }

    /// Number of samples currently held for a device.
    pub fn len(&self, device_id: &str) -> Result<usize> {
        let key = self.history_key(device_id)?;
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM history WHERE history_key = ?",
            [key],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Device IDs that have history in this namespace.
    pub fn devices(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT history_key FROM history ORDER BY history_key")?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let prefix = format!("{}:", self.namespace);
        let suffix = format!(":{}", KEY_SUFFIX);
        Ok(keys
            .iter()
            .filter_map(|key| key.strip_prefix(&prefix)?.strip_suffix(&suffix))
            .map(str::to_string)
            .collect())
    }

    /// Drop a device's history. Returns how many samples were removed.
    pub fn clear(&self, device_id: &str) -> Result<usize> {
        let key = self.history_key(device_id)?;
        let removed = self
            .conn
            .execute("DELETE FROM history WHERE history_key = ?", [&key])?;
        info!("Cleared {} samples from {}", removed, key);
        Ok(removed)
    }
}
