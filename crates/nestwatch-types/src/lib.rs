//! Shared types for the nestwatch thermostat monitor.
//!
//! This crate holds the data model that both the history store
//! (nestwatch-store) and the trend pipeline (nestwatch-core) agree on.
//!
//! # Features
//!
//! - [`Reading`]: one normalized thermostat observation
//! - [`HvacState`] and [`TemperatureUnit`] with upstream string parsing
//! - [`TREND_WINDOW`]: the history depth shared by store and classifier
//!
//! # Example
//!
//! ```
//! use nestwatch_types::{HvacState, Reading};
//!
//! let reading = Reading::new("living-room", 21.5, HvacState::Heating).with_setpoints(22.0, 26.0);
//! assert!(reading.validate().is_ok());
//! ```

pub mod error;
pub mod types;

pub use error::{ParseError, ParseResult};
pub use types::{HvacState, Reading, TREND_WINDOW, TemperatureUnit, celsius_to_fahrenheit};
