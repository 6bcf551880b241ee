//! One pass of the trend pipeline over a batch of readings.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use nestwatch_types::Reading;

use crate::context::PipelineContext;
use crate::dispatch::{DispatchOptions, DispatchOutcome, ReactionDispatcher};
use crate::error::{Error, Result};
use crate::notification::{Notification, SYSTEM_DEVICE_ID, Severity};
use crate::traits::{HistoryStore, Notifier};
use crate::trend::{TrendKind, evaluate};

/// What happened to one device during a cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeviceStatus {
    /// The reading was stored and the history classified.
    Evaluated {
        /// Classification result.
        verdict: TrendKind,
        /// History length after the push.
        history_len: usize,
        /// Reactions taken.
        outcome: DispatchOutcome,
    },
    /// The device was skipped this cycle.
    Skipped {
        /// Why it was skipped.
        reason: String,
    },
}

/// Per-device entry of a [`PollReport`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceReport {
    /// Device the entry is about.
    pub device_id: String,
    /// Outcome for that device.
    #[serde(flatten)]
    pub status: DeviceStatus,
}

/// Result of [`PollCycle::run`], one entry per reading in batch order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PollReport {
    /// Per-device outcomes.
    pub devices: Vec<DeviceReport>,
}

impl PollReport {
    /// Devices whose history was classified.
    pub fn evaluated(&self) -> usize {
        self.devices
            .iter()
            .filter(|d| matches!(d.status, DeviceStatus::Evaluated { .. }))
            .count()
    }

    /// Devices skipped because of a per-device failure.
    pub fn skipped(&self) -> usize {
        self.devices.len() - self.evaluated()
    }

    /// Elevated alerts raised.
    pub fn alerts(&self) -> usize {
        self.outcomes().filter(|o| o.alerted).count()
    }

    /// Successful safety commands.
    pub fn actuations(&self) -> usize {
        self.outcomes().filter(|o| o.actuated).count()
    }

    /// Failed safety commands.
    pub fn actuation_failures(&self) -> usize {
        self.outcomes().filter(|o| o.actuation_failed).count()
    }

    /// Status of one device, if it was in the batch.
    pub fn device(&self, device_id: &str) -> Option<&DeviceStatus> {
        self.devices
            .iter()
            .find(|d| d.device_id == device_id)
            .map(|d| &d.status)
    }

    fn outcomes(&self) -> impl Iterator<Item = &DispatchOutcome> {
        self.devices.iter().filter_map(|d| match &d.status {
            DeviceStatus::Evaluated { outcome, .. } => Some(outcome),
            DeviceStatus::Skipped { .. } => None,
        })
    }
}

/// Orchestrates push, recent, evaluate and dispatch for every device.
///
/// Devices are processed strictly in batch order, one at a time. A failure
/// on one device is logged, reported at informational severity and skipped;
/// it never aborts the rest of the batch.
#[derive(Clone)]
pub struct PollCycle {
    store: Arc<dyn HistoryStore>,
    notifier: Arc<dyn Notifier>,
    dispatcher: ReactionDispatcher,
}

impl std::fmt::Debug for PollCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollCycle")
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

impl PollCycle {
    /// Create a poll cycle over the context's collaborators.
    pub fn new(ctx: &PipelineContext) -> Self {
        Self {
            store: Arc::clone(&ctx.store),
            notifier: Arc::clone(&ctx.notifier),
            dispatcher: ReactionDispatcher::new(ctx),
        }
    }

    /// Set dispatcher options.
    #[must_use]
    pub fn with_options(mut self, options: DispatchOptions) -> Self {
        self.dispatcher = self.dispatcher.with_options(options);
        self
    }

    /// Process one batch of readings. An empty batch does nothing.
    pub async fn run(&self, readings: &[Reading]) -> PollReport {
        let mut report = PollReport::default();
        if readings.is_empty() {
            debug!("Empty batch, nothing to do");
            return report;
        }

        info!("Poll cycle over {} devices", readings.len());

        for reading in readings {
            let status = match self.process(reading).await {
                Ok(status) => status,
                Err(e) => self.skip(&reading.device_id, e).await,
            };
            report.devices.push(DeviceReport {
                device_id: reading.device_id.clone(),
                status,
            });
        }

        info!(
            "Poll cycle done: {} evaluated, {} skipped, {} alerts, {} actuations",
            report.evaluated(),
            report.skipped(),
            report.alerts(),
            report.actuations()
        );
        report
    }

    async fn process(&self, reading: &Reading) -> Result<DeviceStatus> {
        reading.validate()?;
        let device_id = reading.device_id.as_str();

        self.store.push(device_id, reading)?;
        let history = self.store.recent(device_id)?;
        let verdict = evaluate(&history);
        debug!(
            "{}: {} samples, verdict {}",
            device_id,
            history.len(),
            verdict.kind()
        );

        let outcome = self.dispatcher.handle(device_id, &verdict).await;
        Ok(DeviceStatus::Evaluated {
            verdict: verdict.kind(),
            history_len: history.len(),
            outcome,
        })
    }

    async fn skip(&self, device_id: &str, error: Error) -> DeviceStatus {
        warn!("Skipping {} this cycle: {}", device_id, error);

        let target = if device_id.trim().is_empty() {
            SYSTEM_DEVICE_ID
        } else {
            device_id
        };
        let notification = Notification::new(
            target,
            format!("skipped this cycle: {}", error),
            Severity::Informational,
        );
        if let Err(e) = self.notifier.notify(&notification).await {
            warn!("Dropped skip notification for {}: {}", target, e);
        }

        DeviceStatus::Skipped {
            reason: error.to_string(),
        }
    }
}
