//! Trait abstractions for the pipeline's collaborators.
//!
//! The trend pipeline never talks to a database, an HTTP API or a push
//! service directly. It goes through these traits so the real adapters in
//! `nestwatch-service` and the mocks in [`crate::mock`] are interchangeable.

use async_trait::async_trait;

use nestwatch_types::Reading;

use crate::error::Result;
use crate::notification::Notification;

/// Fixed-depth, per-device reading history.
///
/// Implementations keep at most [`TREND_WINDOW`](nestwatch_types::TREND_WINDOW)
/// readings per device and return them newest first.
///
/// The store is synchronous: the SQLite backend is, and the pipeline never
/// holds a store handle across an await point.
pub trait HistoryStore: Send + Sync {
    /// Prepend a reading to the device's history and trim it to the window.
    ///
    /// Fails with [`Error::StoreUnavailable`](crate::Error::StoreUnavailable)
    /// when the backing store cannot be reached. Never retried here.
    fn push(&self, device_id: &str, reading: &Reading) -> Result<()>;

    /// Current history for a device, newest first, length `0..=TREND_WINDOW`.
    fn recent(&self, device_id: &str) -> Result<Vec<Reading>>;
}

/// Delivers notifications to a human.
///
/// Delivery is fire-and-forget from the pipeline's point of view: callers
/// log a returned error and carry on.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send one notification.
    async fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Issues remote safety commands to a thermostat.
#[async_trait]
pub trait HvacActuator: Send + Sync {
    /// Turn heating and cooling off on a device.
    ///
    /// Returns [`Error::ActuationFailed`](crate::Error::ActuationFailed) when
    /// the command could not be sent or was rejected.
    async fn disable_heating_cooling(&self, device_id: &str) -> Result<()>;
}

/// Produces one batch of normalized readings per poll.
///
/// Unit conversion happens inside the source; readings it returns are
/// already in each device's display unit.
#[async_trait]
pub trait ReadingSource: Send + Sync {
    /// Fetch the current reading of every known device.
    async fn fetch_readings(&self) -> Result<Vec<Reading>>;
}
