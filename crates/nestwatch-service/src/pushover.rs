//! Pushover notification delivery.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use nestwatch_core::{Notification, Notifier, Severity};

use crate::config::{EndpointsConfig, PollConfig, PushoverConfig};
use crate::error::{NotifyError, SdmError};

/// Pushover priority for a severity.
///
/// Elevated alerts are emergencies (2): Pushover repeats them every
/// `retry` seconds until acknowledged or `expire` seconds pass.
pub fn priority(severity: Severity) -> i8 {
    match severity {
        Severity::Informational => 0,
        Severity::Elevated => 2,
    }
}

/// Form fields for one message.
pub fn form_fields(
    config: &PushoverConfig,
    notification: &Notification,
) -> Vec<(&'static str, String)> {
    let priority = priority(notification.severity);
    let mut fields = vec![
        ("token", config.token.clone()),
        ("user", config.user.clone()),
        ("title", config.title.clone()),
        ("message", notification.to_string()),
        ("priority", priority.to_string()),
    ];
    if priority == 2 {
        fields.push(("retry", config.retry.to_string()));
        fields.push(("expire", config.expire.to_string()));
    }
    fields
}

/// [`Notifier`] posting to the Pushover messages API.
pub struct PushoverNotifier {
    http: Client,
    config: PushoverConfig,
    url: String,
}

impl std::fmt::Debug for PushoverNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushoverNotifier")
            .field("url", &self.url)
            .field("title", &self.config.title)
            .finish_non_exhaustive()
    }
}

impl PushoverNotifier {
    /// Create a notifier from configuration.
    pub fn new(
        config: PushoverConfig,
        endpoints: &EndpointsConfig,
        poll: &PollConfig,
    ) -> Result<Self, SdmError> {
        let http = Client::builder()
            .timeout(poll.request_timeout())
            .build()
            .map_err(SdmError::Client)?;
        Ok(Self::with_client(http, config, endpoints))
    }

    /// Create a notifier with a custom reqwest Client.
    pub fn with_client(http: Client, config: PushoverConfig, endpoints: &EndpointsConfig) -> Self {
        Self {
            http,
            config,
            url: endpoints.pushover.clone(),
        }
    }

    /// Send one message.
    pub async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let form = form_fields(&self.config, notification);
        let response = self.http.post(&self.url).form(&form).send().await?;

        let status = response.status();
        if status.is_success() {
            debug!(
                "Delivered {} notification: {}",
                notification.severity, notification
            );
            return Ok(());
        }

        // Pushover explains rejections in an `errors` array
        let message = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|v| {
                let errors: Vec<String> = v
                    .get("errors")?
                    .as_array()?
                    .iter()
                    .filter_map(|e| e.as_str().map(String::from))
                    .collect();
                (!errors.is_empty()).then(|| errors.join("; "))
            })
            .unwrap_or_else(|| status.to_string());

        Err(NotifyError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl Notifier for PushoverNotifier {
    async fn notify(&self, notification: &Notification) -> nestwatch_core::Result<()> {
        self.send(notification)
            .await
            .map_err(|e| nestwatch_core::Error::NotificationFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PushoverConfig {
        PushoverConfig {
            user: "u-key".to_string(),
            token: "a-token".to_string(),
            ..Default::default()
        }
    }

    fn field<'a>(fields: &'a [(&'static str, String)], name: &str) -> Option<&'a str> {
        fields
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_priority_mapping() {
        assert_eq!(priority(Severity::Informational), 0);
        assert_eq!(priority(Severity::Elevated), 2);
    }

    #[test]
    fn test_elevated_form_is_emergency() {
        let n = Notification::new(
            "AVPH",
            "ambient consistently rising while cooling",
            Severity::Elevated,
        );
        let fields = form_fields(&config(), &n);

        assert_eq!(field(&fields, "token"), Some("a-token"));
        assert_eq!(field(&fields, "user"), Some("u-key"));
        assert_eq!(field(&fields, "title"), Some("Nest Alert"));
        assert_eq!(
            field(&fields, "message"),
            Some("AVPH: ambient consistently rising while cooling")
        );
        assert_eq!(field(&fields, "priority"), Some("2"));
        assert_eq!(field(&fields, "retry"), Some("60"));
        assert_eq!(field(&fields, "expire"), Some("3600"));
    }

    #[test]
    fn test_informational_form_has_no_retry() {
        let n = Notification::system("No devices found", Severity::Informational);
        let fields = form_fields(&config(), &n);

        assert_eq!(field(&fields, "message"), Some("N/A: No devices found"));
        assert_eq!(field(&fields, "priority"), Some("0"));
        assert!(field(&fields, "retry").is_none());
        assert!(field(&fields, "expire").is_none());
    }
}
