//! [`HistoryStore`] backed by the SQLite store.

use std::sync::Mutex;

use nestwatch_store::Store;
use nestwatch_types::Reading;

use crate::error::{Error, Result};
use crate::traits::HistoryStore;

/// Adapter exposing a [`nestwatch_store::Store`] as a [`HistoryStore`].
///
/// `rusqlite::Connection` is `Send` but not `Sync`, so the store sits behind
/// a mutex. Every call holds the lock for a single short statement batch.
#[derive(Debug)]
pub struct SqliteHistory {
    store: Mutex<Store>,
}

impl SqliteHistory {
    /// Wrap an open store.
    pub fn new(store: Store) -> Self {
        Self {
            store: Mutex::new(store),
        }
    }

    /// Run a closure against the underlying store.
    ///
    /// Errors are reported as [`Error::StoreUnavailable`] for `device_id`.
    pub fn with_store<T>(
        &self,
        device_id: &str,
        f: impl FnOnce(&Store) -> nestwatch_store::Result<T>,
    ) -> Result<T> {
        let store = self
            .store
            .lock()
            .map_err(|_| Error::store_unavailable(device_id, "store lock poisoned"))?;
        f(&store).map_err(|e| Error::store_unavailable(device_id, e))
    }
}

impl From<Store> for SqliteHistory {
    fn from(store: Store) -> Self {
        Self::new(store)
    }
}

impl HistoryStore for SqliteHistory {
    fn push(&self, device_id: &str, reading: &Reading) -> Result<()> {
        self.with_store(device_id, |store| store.push(device_id, reading))
    }

    fn recent(&self, device_id: &str) -> Result<Vec<Reading>> {
        self.with_store(device_id, |store| store.recent(device_id))
    }
}
