//! Error types for the service adapters and runner.

use crate::config::ConfigError;

/// Errors talking to Google's OAuth and Smart Device Management APIs.
#[derive(Debug, thiserror::Error)]
pub enum SdmError {
    /// The request could not be sent or no response arrived.
    #[error("{operation} request failed: {source}")]
    Request {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The API answered with a non-success status.
    #[error("{operation} returned HTTP {status}: {message}")]
    Api {
        operation: &'static str,
        status: u16,
        message: String,
    },

    /// The response body was not what the API documents.
    #[error("{operation} returned an unexpected body: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The token endpoint answered without an access token.
    #[error("token response did not contain an access token")]
    MissingToken,

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl SdmError {
    /// Whether a retry could plausibly succeed.
    ///
    /// Transport failures, rate limiting and server errors are transient.
    /// Other client errors (bad credentials, unknown project) are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            SdmError::Request { .. } => true,
            SdmError::Api { status, .. } => *status == 429 || *status >= 500,
            SdmError::Decode { .. } | SdmError::MissingToken | SdmError::Client(_) => false,
        }
    }

    /// HTTP status of an API error.
    pub fn status(&self) -> Option<u16> {
        match self {
            SdmError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors delivering a Pushover notification.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The request could not be sent.
    #[error("Pushover request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Pushover rejected the message.
    #[error("Pushover returned HTTP {status}: {message}")]
    Api { status: u16, message: String },
}

/// Errors that end a run.
///
/// Everything except [`RunError::Config`] is reported through the notifier
/// before the process exits; see [`RunError::alert_message`].
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The history store could not be opened.
    #[error("Failed to open history store: {0}")]
    Store(#[from] nestwatch_store::Error),

    /// Credentials or inventory could not be retrieved.
    #[error(transparent)]
    Upstream(nestwatch_core::Error),

    /// The inventory is empty.
    #[error("No devices found")]
    NoDevices,

    /// An HTTP adapter could not be constructed.
    #[error(transparent)]
    Client(#[from] SdmError),
}

impl RunError {
    /// Notification text for this failure, or `None` when it cannot be sent
    /// (a broken configuration means there are no credentials to send with).
    pub fn alert_message(&self) -> Option<String> {
        match self {
            RunError::Config(_) => None,
            other => Some(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_retryable_by_status() {
        let api = |status| SdmError::Api {
            operation: "device list",
            status,
            message: String::new(),
        };
        assert!(api(500).is_retryable());
        assert!(api(503).is_retryable());
        assert!(api(429).is_retryable());
        assert!(!api(400).is_retryable());
        assert!(!api(401).is_retryable());
        assert!(!SdmError::MissingToken.is_retryable());
    }

    #[test]
    fn test_api_error_display() {
        let err = SdmError::Api {
            operation: "token refresh",
            status: 401,
            message: "invalid_grant".to_string(),
        };
        assert_eq!(err.to_string(), "token refresh returned HTTP 401: invalid_grant");
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn test_alert_messages() {
        assert_eq!(
            RunError::NoDevices.alert_message().as_deref(),
            Some("No devices found")
        );
        let upstream =
            RunError::Upstream(nestwatch_core::Error::upstream("token refresh", "HTTP 401"));
        assert_eq!(
            upstream.alert_message().as_deref(),
            Some("token refresh failed: HTTP 401")
        );
        let config = RunError::Config(ConfigError::Validation(Vec::new()));
        assert!(config.alert_message().is_none());
    }
}
