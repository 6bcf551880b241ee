//! Nest SDM poller and Pushover alerts for nestwatch.
//!
//! This crate connects the trend pipeline in `nestwatch-core` to the
//! outside world:
//! - Refreshes a Google OAuth access token (with retry)
//! - Lists thermostats through the Smart Device Management API and
//!   normalizes their traits into readings
//! - Turns HVAC off with `ThermostatMode.SetMode`
//! - Delivers alerts through Pushover
//! - Runs the pipeline once, or repeatedly in watch mode
//!
//! # Configuration
//!
//! The service reads configuration from `~/.config/nestwatch/config.toml`
//! (or the path in `NESTWATCH_CONFIG`):
//!
//! ```toml
//! [nest]
//! client_id = "123.apps.googleusercontent.com"
//! client_secret = "..."
//! refresh_token = "..."
//! project_id = "your-device-access-project"
//!
//! [pushover]
//! user = "your-user-key"
//! token = "your-app-token"
//!
//! [storage]
//! path = "~/.local/share/nestwatch/history.db"
//! namespace = "nest"
//!
//! [alerts]
//! confirm_actuation = false
//!
//! [poll]
//! interval = 300
//! ```

pub mod config;
pub mod devices;
pub mod error;
pub mod pushover;
pub mod runner;
pub mod sdm;

pub use config::{
    AlertsConfig, CONFIG_ENV_VAR, Config, ConfigError, EndpointsConfig, NestConfig, PollConfig,
    PushoverConfig, StorageConfig, ValidationError, default_config_path,
};
pub use devices::{DeviceList, SdmDevice};
pub use error::{NotifyError, RunError, SdmError};
pub use pushover::PushoverNotifier;
pub use runner::{Runner, WatchSummary, open_store, report_failure};
pub use sdm::SdmClient;
