//! Error types for reading validation in nestwatch-types.

use thiserror::Error;

/// Errors raised when a reading or one of its fields is malformed.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The reading has no device identifier.
    #[error("Reading has an empty device ID")]
    EmptyDeviceId,

    /// A temperature field is NaN or infinite.
    #[error("Reading for {device_id} has a non-finite {field}: {value}")]
    NonFiniteTemperature {
        /// Device the reading belongs to.
        device_id: String,
        /// Which field failed.
        field: &'static str,
        /// The offending value.
        value: f64,
    },

    /// Unrecognized display temperature unit.
    #[error("Unknown temperature unit: {0}")]
    UnknownUnit(String),
}

/// Result type alias using nestwatch-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
