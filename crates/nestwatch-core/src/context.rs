//! Explicit wiring of the pipeline's collaborators.

use std::sync::Arc;

use crate::traits::{HistoryStore, HvacActuator, Notifier};

/// The collaborators a poll cycle works with.
///
/// Built once at startup and handed to [`PollCycle`](crate::PollCycle) and
/// [`ReactionDispatcher`](crate::ReactionDispatcher). Cloning is cheap.
#[derive(Clone)]
pub struct PipelineContext {
    /// Rolling per-device history.
    pub store: Arc<dyn HistoryStore>,
    /// Where alerts go.
    pub notifier: Arc<dyn Notifier>,
    /// Remote safety commands.
    pub actuator: Arc<dyn HvacActuator>,
}

impl PipelineContext {
    /// Create a context from its collaborators.
    pub fn new(
        store: Arc<dyn HistoryStore>,
        notifier: Arc<dyn Notifier>,
        actuator: Arc<dyn HvacActuator>,
    ) -> Self {
        Self {
            store,
            notifier,
            actuator,
        }
    }
}

impl std::fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineContext").finish_non_exhaustive()
    }
}
