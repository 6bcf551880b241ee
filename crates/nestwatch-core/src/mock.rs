//! In-memory collaborators for testing.
//!
//! These types implement the pipeline traits without a database, network or
//! push service, so the trend pipeline can be exercised end to end in unit
//! and integration tests.
//!
//! # Features
//!
//! - **Failure injection**: make any collaborator fail, globally or (for the
//!   store) for selected devices only
//! - **Transient failures**: fail the next N calls, then succeed
//! - **Call recording**: inspect every notification and command afterwards

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use nestwatch_types::{Reading, TREND_WINDOW};

use crate::error::{Error, Result};
use crate::notification::Notification;
use crate::traits::{HistoryStore, HvacActuator, Notifier, ReadingSource};

/// Lock a mutex, recovering the data if a panicking test poisoned it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// [`HistoryStore`] kept in a `HashMap`, with per-device failure injection.
#[derive(Debug, Default)]
pub struct MemoryStore {
    histories: Mutex<HashMap<String, VecDeque<Reading>>>,
    failing_devices: Mutex<HashSet<String>>,
    should_fail: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail.
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::Relaxed);
    }

    /// Make operations for one device fail.
    pub fn fail_device(&self, device_id: &str) {
        lock(&self.failing_devices).insert(device_id.to_string());
    }

    /// Stop failing operations for one device.
    pub fn restore_device(&self, device_id: &str) {
        lock(&self.failing_devices).remove(device_id);
    }

    /// Number of readings currently held for a device.
    pub fn len(&self, device_id: &str) -> usize {
        lock(&self.histories).get(device_id).map_or(0, VecDeque::len)
    }

    /// Whether no device has any history.
    pub fn is_empty(&self) -> bool {
        lock(&self.histories).values().all(VecDeque::is_empty)
    }

    fn check(&self, device_id: &str) -> Result<()> {
        if self.should_fail.load(Ordering::Relaxed)
            || lock(&self.failing_devices).contains(device_id)
        {
            return Err(Error::store_unavailable(device_id, "mock store failure"));
        }
        Ok(())
    }
}

impl HistoryStore for MemoryStore {
    fn push(&self, device_id: &str, reading: &Reading) -> Result<()> {
        self.check(device_id)?;
        let mut histories = lock(&self.histories);
        let history = histories.entry(device_id.to_string()).or_default();
        history.push_front(reading.clone());
        history.truncate(TREND_WINDOW);
        Ok(())
    }

    fn recent(&self, device_id: &str) -> Result<Vec<Reading>> {
        self.check(device_id)?;
        Ok(lock(&self.histories)
            .get(device_id)
            .map(|h| h.iter().cloned().collect())
            .unwrap_or_default())
    }
}

/// [`Notifier`] that records every notification it is asked to send.
#[derive(Debug, Default)]
pub struct MockNotifier {
    sent: Mutex<Vec<Notification>>,
    attempts: AtomicU32,
    should_fail: AtomicBool,
}

impl MockNotifier {
    /// Create a notifier that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make delivery fail. Failed notifications are not recorded.
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::Relaxed);
    }

    /// Notifications delivered so far, in order.
    pub fn sent(&self) -> Vec<Notification> {
        lock(&self.sent).clone()
    }

    /// Delivery attempts, successful or not.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        if self.should_fail.load(Ordering::Relaxed) {
            return Err(Error::NotificationFailed("mock notifier failure".to_string()));
        }
        lock(&self.sent).push(notification.clone());
        Ok(())
    }
}

/// [`HvacActuator`] that records disable commands.
#[derive(Debug)]
pub struct MockActuator {
    calls: Mutex<Vec<String>>,
    disabled: Mutex<Vec<String>>,
    should_fail: AtomicBool,
    fail_message: Mutex<String>,
}

impl Default for MockActuator {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            disabled: Mutex::new(Vec::new()),
            should_fail: AtomicBool::new(false),
            fail_message: Mutex::new("Mock failure".to_string()),
        }
    }
}

impl MockActuator {
    /// Create an actuator whose commands succeed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make commands fail, optionally with a specific reason.
    pub fn set_should_fail(&self, fail: bool, message: Option<&str>) {
        self.should_fail.store(fail, Ordering::Relaxed);
        if let Some(msg) = message {
            *lock(&self.fail_message) = msg.to_string();
        }
    }

    /// Number of commands attempted.
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Devices a command was attempted on, in order.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    /// Devices successfully disabled, in order.
    pub fn disabled(&self) -> Vec<String> {
        lock(&self.disabled).clone()
    }
}

#[async_trait]
impl HvacActuator for MockActuator {
    async fn disable_heating_cooling(&self, device_id: &str) -> Result<()> {
        lock(&self.calls).push(device_id.to_string());
        if self.should_fail.load(Ordering::Relaxed) {
            return Err(Error::actuation_failed(
                device_id,
                lock(&self.fail_message).clone(),
            ));
        }
        lock(&self.disabled).push(device_id.to_string());
        Ok(())
    }
}

/// [`ReadingSource`] returning a configurable batch.
#[derive(Debug, Default)]
pub struct MockSource {
    readings: Mutex<Vec<Reading>>,
    fetch_count: AtomicU32,
    should_fail: AtomicBool,
    remaining_failures: AtomicU32,
}

impl MockSource {
    /// Create a source that returns `readings` on every fetch.
    pub fn new(readings: Vec<Reading>) -> Self {
        Self {
            readings: Mutex::new(readings),
            ..Default::default()
        }
    }

    /// Replace the batch returned by subsequent fetches.
    pub fn set_readings(&self, readings: Vec<Reading>) {
        *lock(&self.readings) = readings;
    }

    /// Make every fetch fail.
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::Relaxed);
    }

    /// Fail the next `count` fetches, then succeed.
    pub fn set_transient_failures(&self, count: u32) {
        self.remaining_failures.store(count, Ordering::Relaxed);
    }

    /// Number of fetches attempted.
    pub fn fetch_count(&self) -> u32 {
        self.fetch_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ReadingSource for MockSource {
    async fn fetch_readings(&self) -> Result<Vec<Reading>> {
        self.fetch_count.fetch_add(1, Ordering::Relaxed);

        if self.remaining_failures.load(Ordering::Relaxed) > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(Error::upstream("device list", "mock transient failure"));
        }
        if self.should_fail.load(Ordering::Relaxed) {
            return Err(Error::upstream("device list", "mock failure"));
        }
        Ok(lock(&self.readings).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::Severity;
    use nestwatch_types::HvacState;

    #[test]
    fn test_memory_store_trims_newest_first() {
        let store = MemoryStore::new();
        for ambient in [1.0, 2.0, 3.0, 4.0] {
            store
                .push("dev", &Reading::new("dev", ambient, HvacState::Off))
                .unwrap();
        }
        let recent = store.recent("dev").unwrap();
        let ambients: Vec<f64> = recent.iter().map(|r| r.ambient).collect();
        assert_eq!(ambients, vec![4.0, 3.0, 2.0]);
        assert_eq!(store.len("dev"), TREND_WINDOW);
    }

    #[test]
    fn test_memory_store_device_failure() {
        let store = MemoryStore::new();
        store.fail_device("bad");

        let reading = Reading::new("bad", 20.0, HvacState::Off);
        assert!(matches!(
            store.push("bad", &reading),
            Err(Error::StoreUnavailable { .. })
        ));
        assert!(store.push("good", &reading).is_ok());

        store.restore_device("bad");
        assert!(store.push("bad", &reading).is_ok());
    }

    #[tokio::test]
    async fn test_mock_notifier_records() {
        let notifier = MockNotifier::new();
        notifier
            .notify(&Notification::new("d", "m", Severity::Elevated))
            .await
            .unwrap();
        assert_eq!(notifier.sent().len(), 1);

        notifier.set_should_fail(true);
        assert!(
            notifier
                .notify(&Notification::new("d", "m", Severity::Elevated))
                .await
                .is_err()
        );
        assert_eq!(notifier.sent().len(), 1);
        assert_eq!(notifier.attempts(), 2);
    }

    #[tokio::test]
    async fn test_mock_actuator_failure_message() {
        let actuator = MockActuator::new();
        actuator.set_should_fail(true, Some("HTTP 403"));

        let err = actuator.disable_heating_cooling("d").await.unwrap_err();
        assert!(err.to_string().contains("HTTP 403"));
        assert_eq!(actuator.calls(), vec!["d".to_string()]);
        assert!(actuator.disabled().is_empty());
    }

    #[tokio::test]
    async fn test_mock_source_transient_failures() {
        let source = MockSource::new(vec![Reading::new("d", 20.0, HvacState::Off)]);
        source.set_transient_failures(2);

        assert!(source.fetch_readings().await.is_err());
        assert!(source.fetch_readings().await.is_err());
        assert_eq!(source.fetch_readings().await.unwrap().len(), 1);
        assert_eq!(source.fetch_count(), 3);
    }
}
