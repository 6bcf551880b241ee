//! Mapping trend verdicts to notifications and safety commands.
//!
//! | Verdict | Reaction |
//! |---------|----------|
//! | `None` | nothing |
//! | `CoolingRising` | elevated notification |
//! | `HeatingFalling` | elevated notification, then disable HVAC |
//!
//! A failed disable produces one informational notification and is never
//! retried. The dispatcher keeps no state between calls, so an ongoing
//! trend alerts again on every cycle.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::context::PipelineContext;
use crate::error::Error;
use crate::notification::{Notification, Severity};
use crate::traits::{HvacActuator, Notifier};
use crate::trend::{AmbientWindow, TrendVerdict};

/// Alert text for a rising ambient while cooling.
pub const COOLING_RISING_MESSAGE: &str = "ambient consistently rising while cooling";
/// Alert text for a falling ambient while heating.
pub const HEATING_FALLING_MESSAGE: &str = "ambient consistently falling while heating";
/// Report text when the safety command fails.
pub const ACTUATION_FAILED_MESSAGE: &str = "failed to disable HVAC";
/// Report text when the safety command succeeds (opt-in).
pub const ACTUATION_CONFIRMED_MESSAGE: &str = "HVAC disabled after heating alert";

/// Dispatcher options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Send an informational notification after a successful disable.
    pub confirm_actuation: bool,
}

impl DispatchOptions {
    /// Enable or disable the actuation confirmation.
    #[must_use]
    pub fn confirm_actuation(mut self, enabled: bool) -> Self {
        self.confirm_actuation = enabled;
        self
    }
}

/// What a single [`ReactionDispatcher::handle`] call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchOutcome {
    /// An elevated alert was attempted.
    pub alerted: bool,
    /// The safety command succeeded.
    pub actuated: bool,
    /// The safety command was attempted and failed.
    pub actuation_failed: bool,
}

/// Turns a [`TrendVerdict`] into side effects.
#[derive(Clone)]
pub struct ReactionDispatcher {
    notifier: Arc<dyn Notifier>,
    actuator: Arc<dyn HvacActuator>,
    options: DispatchOptions,
}

impl std::fmt::Debug for ReactionDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactionDispatcher")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl ReactionDispatcher {
    /// Create a dispatcher using the context's notifier and actuator.
    pub fn new(ctx: &PipelineContext) -> Self {
        Self {
            notifier: Arc::clone(&ctx.notifier),
            actuator: Arc::clone(&ctx.actuator),
            options: DispatchOptions::default(),
        }
    }

    /// Set dispatcher options.
    #[must_use]
    pub fn with_options(mut self, options: DispatchOptions) -> Self {
        self.options = options;
        self
    }

    /// React to a verdict for one device.
    pub async fn handle(&self, device_id: &str, verdict: &TrendVerdict) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();

        match verdict {
            TrendVerdict::None => {
                debug!("No trend for {}", device_id);
            }
            TrendVerdict::CoolingRising(window) => {
                info!("Cooling trend on {}: {}", device_id, window);
                self.send(
                    device_id,
                    trend_message(COOLING_RISING_MESSAGE, window),
                    Severity::Elevated,
                )
                .await;
                outcome.alerted = true;
            }
            TrendVerdict::HeatingFalling(window) => {
                info!("Heating trend on {}: {}", device_id, window);
                self.send(
                    device_id,
                    trend_message(HEATING_FALLING_MESSAGE, window),
                    Severity::Elevated,
                )
                .await;
                outcome.alerted = true;

                match self.actuator.disable_heating_cooling(device_id).await {
                    Ok(()) => {
                        info!("Disabled HVAC on {}", device_id);
                        outcome.actuated = true;
                        if self.options.confirm_actuation {
                            self.send(
                                device_id,
                                ACTUATION_CONFIRMED_MESSAGE.to_string(),
                                Severity::Informational,
                            )
                            .await;
                        }
                    }
                    Err(e) => {
                        warn!("Failed to disable HVAC on {}: {}", device_id, e);
                        outcome.actuation_failed = true;
                        let message =
                            format!("{}: {}", ACTUATION_FAILED_MESSAGE, failure_reason(&e));
                        self.send(device_id, message, Severity::Informational).await;
                    }
                }
            }
        }

        outcome
    }

    /// Best-effort delivery; failures are logged and dropped.
    async fn send(&self, device_id: &str, message: String, severity: Severity) {
        let notification = Notification::new(device_id, message, severity);
        if let Err(e) = self.notifier.notify(&notification).await {
            warn!("Dropped {} notification for {}: {}", severity, device_id, e);
        }
    }
}

fn trend_message(base: &str, window: &AmbientWindow) -> String {
    format!("{} ({})", base, window)
}

fn failure_reason(error: &Error) -> String {
    match error {
        Error::ActuationFailed { reason, .. } => reason.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MemoryStore, MockActuator, MockNotifier};

    struct Harness {
        notifier: Arc<MockNotifier>,
        actuator: Arc<MockActuator>,
        dispatcher: ReactionDispatcher,
    }

    fn harness() -> Harness {
        let notifier = Arc::new(MockNotifier::new());
        let actuator = Arc::new(MockActuator::new());
        let ctx = PipelineContext::new(
            Arc::new(MemoryStore::new()),
            notifier.clone(),
            actuator.clone(),
        );
        Harness {
            notifier,
            actuator,
            dispatcher: ReactionDispatcher::new(&ctx),
        }
    }

    fn window(oldest: f64, middle: f64, newest: f64) -> AmbientWindow {
        AmbientWindow {
            oldest,
            middle,
            newest,
        }
    }

    #[tokio::test]
    async fn test_none_is_noop() {
        let h = harness();
        let outcome = h.dispatcher.handle("dev", &TrendVerdict::None).await;

        assert_eq!(outcome, DispatchOutcome::default());
        assert!(h.notifier.sent().is_empty());
        assert_eq!(h.actuator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cooling_rising_only_alerts() {
        let h = harness();
        let verdict = TrendVerdict::CoolingRising(window(20.0, 21.0, 22.0));
        let outcome = h.dispatcher.handle("dev", &verdict).await;

        assert!(outcome.alerted);
        assert!(!outcome.actuated);
        assert_eq!(h.actuator.call_count(), 0);

        let sent = h.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].device_id, "dev");
        assert_eq!(sent[0].severity, Severity::Elevated);
        assert_eq!(
            sent[0].message,
            "ambient consistently rising while cooling (20.0 → 21.0 → 22.0)"
        );
    }

    #[tokio::test]
    async fn test_heating_falling_alerts_then_actuates() {
        let h = harness();
        let verdict = TrendVerdict::HeatingFalling(window(70.0, 68.0, 65.0));
        let outcome = h.dispatcher.handle("dev", &verdict).await;

        assert!(outcome.alerted);
        assert!(outcome.actuated);
        assert!(!outcome.actuation_failed);
        assert_eq!(h.actuator.disabled(), vec!["dev".to_string()]);

        let sent = h.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].message.starts_with(HEATING_FALLING_MESSAGE));
        assert_eq!(sent[0].severity, Severity::Elevated);
    }

    #[tokio::test]
    async fn test_actuation_failure_sends_exactly_two_notifications() {
        let h = harness();
        h.actuator.set_should_fail(true, Some("HTTP 500"));
        let verdict = TrendVerdict::HeatingFalling(window(70.0, 68.0, 65.0));
        let outcome = h.dispatcher.handle("dev", &verdict).await;

        assert!(outcome.actuation_failed);
        assert!(!outcome.actuated);
        // Never retried
        assert_eq!(h.actuator.call_count(), 1);

        let sent = h.notifier.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].severity, Severity::Elevated);
        assert_eq!(sent[1].severity, Severity::Informational);
        assert_eq!(sent[1].message, "failed to disable HVAC: HTTP 500");
    }

    #[tokio::test]
    async fn test_actuation_attempted_even_if_alert_fails() {
        let h = harness();
        h.notifier.set_should_fail(true);
        let verdict = TrendVerdict::HeatingFalling(window(70.0, 68.0, 65.0));
        let outcome = h.dispatcher.handle("dev", &verdict).await;

        assert!(outcome.alerted);
        assert!(outcome.actuated);
        assert_eq!(h.actuator.call_count(), 1);
    }

    #[tokio::test]
    async fn test_confirmation_is_opt_in() {
        let h = harness();
        let dispatcher = h
            .dispatcher
            .clone()
            .with_options(DispatchOptions::default().confirm_actuation(true));
        let verdict = TrendVerdict::HeatingFalling(window(70.0, 68.0, 65.0));
        dispatcher.handle("dev", &verdict).await;

        let sent = h.notifier.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].message, ACTUATION_CONFIRMED_MESSAGE);
        assert_eq!(sent[1].severity, Severity::Informational);
    }

    #[tokio::test]
    async fn test_repeated_trend_alerts_every_time() {
        let h = harness();
        let verdict = TrendVerdict::CoolingRising(window(20.0, 21.0, 22.0));
        h.dispatcher.handle("dev", &verdict).await;
        h.dispatcher.handle("dev", &verdict).await;

        assert_eq!(h.notifier.sent().len(), 2);
    }
}
