//! Notification messages and their severity.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Device ID used for notifications that are not about a single device
/// (startup and upstream failures).
pub const SYSTEM_DEVICE_ID: &str = "N/A";

/// How urgently a notification should reach a human.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Status and failure reports.
    Informational,
    /// Trend alerts that need attention.
    Elevated,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Informational => write!(f, "informational"),
            Severity::Elevated => write!(f, "elevated"),
        }
    }
}

/// A message for a human about one device (or the system as a whole).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Device the message is about, or [`SYSTEM_DEVICE_ID`].
    pub device_id: String,
    /// Message body.
    pub message: String,
    /// Delivery urgency.
    pub severity: Severity,
}

impl Notification {
    /// Create a notification.
    pub fn new(device_id: impl Into<String>, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            device_id: device_id.into(),
            message: message.into(),
            severity,
        }
    }

    /// Create a process-level notification (device ID `N/A`).
    pub fn system(message: impl Into<String>, severity: Severity) -> Self {
        Self::new(SYSTEM_DEVICE_ID, message, severity)
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.device_id, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes_device() {
        let n = Notification::new("abc", "hello", Severity::Elevated);
        assert_eq!(n.to_string(), "abc: hello");
    }

    #[test]
    fn test_system_notification() {
        let n = Notification::system("No devices found", Severity::Informational);
        assert_eq!(n.device_id, SYSTEM_DEVICE_ID);
        assert_eq!(n.to_string(), "N/A: No devices found");
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Elevated > Severity::Informational);
    }
}
