//! Rolling per-device reading history for nestwatch.
//!
//! This crate provides the SQLite-backed key-value store that keeps the last
//! [`TREND_WINDOW`](nestwatch_types::TREND_WINDOW) readings for every
//! thermostat. It is a best-effort cache for trend detection, not a system
//! of record: nothing older than the window is kept.
//!
//! # Example
//!
//! ```no_run
//! use nestwatch_store::Store;
//! use nestwatch_types::{HvacState, Reading};
//!
//! let store = Store::open_default()?;
//!
//! store.push("living-room", &Reading::new("living-room", 21.0, HvacState::Heating))?;
//! let recent = store.recent("living-room")?;
//! assert!(recent.len() <= 3);
//! # Ok::<(), nestwatch_store::Error>(())
//! ```

mod error;
mod schema;
mod store;

pub use error::{Error, Result};
pub use schema::SCHEMA_VERSION;
pub use store::{DEFAULT_NAMESPACE, Store};

/// Default database path following platform conventions.
///
/// - Linux: `~/.local/share/nestwatch/history.db`
/// - macOS: `~/Library/Application Support/nestwatch/history.db`
/// - Windows: `C:\Users\<user>\AppData\Local\nestwatch\history.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("nestwatch")
        .join("history.db")
}
