//! Fetch-then-evaluate runs, once or on an interval.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info, warn};

use nestwatch_core::{
    DispatchOptions, Notification, Notifier, PipelineContext, PollCycle, PollReport,
    ReadingSource, Severity, SqliteHistory,
};
use nestwatch_store::Store;

use crate::config::{Config, StorageConfig};
use crate::error::RunError;
use crate::sdm::SdmClient;

/// Counters from a [`Runner::watch`] session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchSummary {
    /// Cycles attempted.
    pub cycles: u64,
    /// Cycles that ended in a [`RunError`].
    pub failures: u64,
}

/// Send a process-level notification about a failed run. Best-effort.
///
/// Usable before a [`Runner`] exists, e.g. when the store fails to open.
pub async fn report_failure(notifier: &dyn Notifier, err: &RunError) {
    let Some(message) = err.alert_message() else {
        return;
    };
    let notification = Notification::system(message, Severity::Informational);
    if let Err(e) = notifier.notify(&notification).await {
        warn!("Could not deliver failure notification: {}", e);
    }
}

/// Open the history store and check it answers.
pub fn open_store(storage: &StorageConfig) -> nestwatch_store::Result<Store> {
    let store = Store::open(&storage.path)?.with_namespace(&storage.namespace);
    store.ping()?;
    Ok(store)
}

/// Drives the poll cycle from a [`ReadingSource`].
pub struct Runner {
    source: Arc<dyn ReadingSource>,
    notifier: Arc<dyn Notifier>,
    cycle: PollCycle,
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("cycle", &self.cycle)
            .finish_non_exhaustive()
    }
}

impl Runner {
    /// Create a runner over the given source and pipeline collaborators.
    pub fn new(
        source: Arc<dyn ReadingSource>,
        ctx: &PipelineContext,
        options: DispatchOptions,
    ) -> Self {
        Self {
            source,
            notifier: Arc::clone(&ctx.notifier),
            cycle: PollCycle::new(ctx).with_options(options),
        }
    }

    /// Wire a runner from configuration: SQLite history, one SDM client as
    /// both reading source and actuator, and the given notifier.
    ///
    /// A store that cannot be opened is reported through `notifier` before
    /// the error is returned. The configuration is not validated here.
    pub async fn from_config(
        config: &Config,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, RunError> {
        let store = match open_store(&config.storage) {
            Ok(store) => store,
            Err(e) => {
                let err = RunError::Store(e);
                report_failure(notifier.as_ref(), &err).await;
                return Err(err);
            }
        };

        let sdm = Arc::new(SdmClient::new(
            config.nest.clone(),
            &config.endpoints,
            &config.poll,
        )?);
        let history = Arc::new(SqliteHistory::new(store));
        let ctx = PipelineContext::new(history, notifier, sdm.clone());
        let options = DispatchOptions::default().confirm_actuation(config.alerts.confirm_actuation);

        Ok(Self::new(sdm, &ctx, options))
    }

    /// Fetch every device's reading and run one poll cycle.
    ///
    /// Upstream failures and an empty inventory end the run with an error;
    /// per-device failures are handled inside the cycle.
    pub async fn run_once(&self) -> Result<PollReport, RunError> {
        let readings = self
            .source
            .fetch_readings()
            .await
            .map_err(RunError::Upstream)?;

        if readings.is_empty() {
            return Err(RunError::NoDevices);
        }

        Ok(self.cycle.run(&readings).await)
    }

    /// Send a process-level notification about a failed run. Best-effort.
    pub async fn report_failure(&self, err: &RunError) {
        report_failure(self.notifier.as_ref(), err).await;
    }

    /// Run a cycle every `period` until `shutdown` completes.
    ///
    /// The first cycle starts immediately. A failed cycle does not stop the
    /// loop: the first failure of a streak is notified, later ones are only
    /// logged until a cycle succeeds again.
    pub async fn watch<S>(&self, period: Duration, shutdown: S) -> WatchSummary
    where
        S: Future<Output = ()>,
    {
        info!("Watching every {:?}", period);

        let mut summary = WatchSummary::default();
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut consecutive_failures = 0u32;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Stopping after {} cycles", summary.cycles);
                    break;
                }
                _ = ticker.tick() => {}
            }

            summary.cycles += 1;
            match self.run_once().await {
                Ok(report) => {
                    if consecutive_failures > 0 {
                        info!("Recovered after {} failed cycles", consecutive_failures);
                    }
                    consecutive_failures = 0;
                    if report.skipped() > 0 {
                        warn!("{} devices skipped this cycle", report.skipped());
                    }
                }
                Err(e) => {
                    summary.failures += 1;
                    consecutive_failures += 1;
                    if consecutive_failures == 1 {
                        error!("Cycle failed: {}", e);
                        self.report_failure(&e).await;
                    } else {
                        warn!("Cycle failed: {} ({} in a row)", e, consecutive_failures);
                    }
                }
            }
        }

        summary
    }
}
