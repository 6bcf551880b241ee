//! Error types for nestwatch-core.
//!
//! # Failure handling
//!
//! | Error | Scope | Handling |
//! |-------|-------|----------|
//! | [`Error::StoreUnavailable`] | one device | skip the device this cycle, notify, continue |
//! | [`Error::InvalidReading`] | one device | skip the device this cycle, notify, continue |
//! | [`Error::ActuationFailed`] | one device | notify, never retried, never fatal |
//! | [`Error::NotificationFailed`] | one message | log only, delivery is best-effort |
//! | [`Error::Upstream`] | whole run | retryable; notify, then the caller ends the process |
//!
//! Fewer than three samples in a device's history is the normal warm-up
//! state and is not represented as an error at all.

use thiserror::Error;

use nestwatch_types::ParseError;

/// Errors produced by the trend pipeline and its collaborators.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The history store could not be reached or read for a device.
    #[error("History store unavailable for {device_id}: {reason}")]
    StoreUnavailable {
        /// Device whose history was being accessed.
        device_id: String,
        /// Underlying store error message.
        reason: String,
    },

    /// A reading failed validation before entering the pipeline.
    #[error("Invalid reading: {0}")]
    InvalidReading(#[from] ParseError),

    /// The remote disable command was rejected or could not be sent.
    #[error("Failed to disable HVAC on {device_id}: {reason}")]
    ActuationFailed {
        /// Device the command targeted.
        device_id: String,
        /// Why the command failed.
        reason: String,
    },

    /// A notification could not be delivered.
    #[error("Notification failed: {0}")]
    NotificationFailed(String),

    /// Credential or inventory retrieval failed.
    #[error("{operation} failed: {reason}")]
    Upstream {
        /// The upstream operation (e.g. "token refresh").
        operation: String,
        /// Why it failed.
        reason: String,
    },
}

impl Error {
    /// Build a [`Error::StoreUnavailable`] from any displayable cause.
    pub fn store_unavailable(device_id: impl Into<String>, reason: impl ToString) -> Self {
        Error::StoreUnavailable {
            device_id: device_id.into(),
            reason: reason.to_string(),
        }
    }

    /// Build an [`Error::ActuationFailed`] from any displayable cause.
    pub fn actuation_failed(device_id: impl Into<String>, reason: impl ToString) -> Self {
        Error::ActuationFailed {
            device_id: device_id.into(),
            reason: reason.to_string(),
        }
    }

    /// Build an [`Error::Upstream`] from any displayable cause.
    pub fn upstream(operation: impl Into<String>, reason: impl ToString) -> Self {
        Error::Upstream {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether retrying the failed call could plausibly succeed.
    ///
    /// Only upstream (credential and inventory) failures qualify. The store
    /// is retried on the next poll cycle and the safety command is never
    /// repeated automatically.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Upstream { .. })
    }
}

/// Result type alias using nestwatch-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
