//! Trend detection and safety reactions for Nest thermostats.
//!
//! This crate is the core of nestwatch: it keeps a short rolling history of
//! every thermostat's readings, classifies the last three samples, and
//! reacts to an unsafe trend with a notification and, for a heating
//! failure, a remote command that turns the HVAC off.
//!
//! # Pipeline
//!
//! | Step | Component |
//! |------|-----------|
//! | store the reading, read back the window | [`HistoryStore`] |
//! | classify the window | [`evaluate`] |
//! | notify, disable HVAC | [`ReactionDispatcher`] |
//! | run all of the above per device | [`PollCycle`] |
//!
//! | Verdict | Condition (oldest → newest, same state throughout) |
//! |---------|------------------------------------------|
//! | `CoolingRising` | cooling, ambient strictly increasing |
//! | `HeatingFalling` | heating, ambient strictly decreasing |
//!
//! Everything outside the pipeline (credentials, device APIs, push
//! delivery) sits behind the [`Notifier`], [`HvacActuator`] and
//! [`ReadingSource`] traits.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use nestwatch_core::mock::{MemoryStore, MockActuator, MockNotifier};
//! use nestwatch_core::{PipelineContext, PollCycle};
//! use nestwatch_types::{HvacState, Reading};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let notifier = Arc::new(MockNotifier::new());
//! let ctx = PipelineContext::new(
//!     Arc::new(MemoryStore::new()),
//!     notifier.clone(),
//!     Arc::new(MockActuator::new()),
//! );
//! let cycle = PollCycle::new(&ctx);
//!
//! for ambient in [20.0, 21.0, 22.0] {
//!     cycle.run(&[Reading::new("hall", ambient, HvacState::Cooling)]).await;
//! }
//!
//! assert_eq!(notifier.sent().len(), 1);
//! # }
//! ```

pub mod context;
pub mod dispatch;
pub mod error;
pub mod mock;
pub mod notification;
pub mod poll;
pub mod retry;
pub mod sqlite;
pub mod traits;
pub mod trend;

pub use nestwatch_types::{HvacState, Reading, TREND_WINDOW};

pub use context::PipelineContext;
pub use dispatch::{DispatchOptions, DispatchOutcome, ReactionDispatcher};
pub use error::{Error, Result};
pub use notification::{Notification, SYSTEM_DEVICE_ID, Severity};
pub use poll::{DeviceReport, DeviceStatus, PollCycle, PollReport};
pub use retry::{RetryConfig, with_retry, with_retry_if};
pub use sqlite::SqliteHistory;
pub use traits::{HistoryStore, HvacActuator, Notifier, ReadingSource};
pub use trend::{AmbientWindow, TrendKind, TrendVerdict, evaluate};
