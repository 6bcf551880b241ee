//! Google Smart Device Management client.
//!
//! Covers the three calls nestwatch needs: refreshing an OAuth access token,
//! listing devices, and sending `ThermostatMode.SetMode OFF`. The client
//! implements [`ReadingSource`] and [`HvacActuator`] so the poll cycle can
//! use it directly.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use nestwatch_core::{HvacActuator, ReadingSource, RetryConfig, with_retry_if};
use nestwatch_types::Reading;

use crate::config::{EndpointsConfig, NestConfig, PollConfig};
use crate::devices::DeviceList;
use crate::error::SdmError;

/// Command that switches a thermostat's HVAC off.
pub const SET_MODE_COMMAND: &str = "sdm.devices.commands.ThermostatMode.SetMode";

/// Tokens are refreshed this long before Google says they expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Lifetime assumed when the token response does not state one.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// HTTP client for the SDM API.
pub struct SdmClient {
    http: Client,
    nest: NestConfig,
    token_url: String,
    sdm_base: String,
    token_retry: RetryConfig,
    inventory_retry: RetryConfig,
    token: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for SdmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SdmClient")
            .field("project_id", &self.nest.project_id)
            .field("sdm_base", &self.sdm_base)
            .finish_non_exhaustive()
    }
}

impl SdmClient {
    /// Create a client from configuration.
    pub fn new(
        nest: NestConfig,
        endpoints: &EndpointsConfig,
        poll: &PollConfig,
    ) -> Result<Self, SdmError> {
        let http = Client::builder()
            .timeout(poll.request_timeout())
            .build()
            .map_err(SdmError::Client)?;
        Ok(Self::with_client(http, nest, endpoints, poll.token_retry()))
    }

    /// Create a client with a custom reqwest Client.
    pub fn with_client(
        http: Client,
        nest: NestConfig,
        endpoints: &EndpointsConfig,
        token_retry: RetryConfig,
    ) -> Self {
        Self {
            http,
            nest,
            token_url: endpoints.oauth_token.clone(),
            sdm_base: endpoints.sdm.trim_end_matches('/').to_string(),
            token_retry,
            inventory_retry: RetryConfig::for_inventory(),
            token: Mutex::new(None),
        }
    }

    /// Set the retry schedule for device listing.
    #[must_use]
    pub fn with_inventory_retry(mut self, retry: RetryConfig) -> Self {
        self.inventory_retry = retry;
        self
    }

    fn devices_url(&self) -> String {
        format!(
            "{}/enterprises/{}/devices",
            self.sdm_base, self.nest.project_id
        )
    }

    fn command_url(&self, device_id: &str) -> String {
        format!(
            "{}/enterprises/{}/devices/{}:executeCommand",
            self.sdm_base, self.nest.project_id, device_id
        )
    }

    /// Exchange the refresh token for an access token. One attempt.
    pub async fn refresh_token(&self) -> Result<(String, Duration), SdmError> {
        const OP: &str = "token refresh";

        let form = [
            ("client_id", self.nest.client_id.as_str()),
            ("client_secret", self.nest.client_secret.as_str()),
            ("refresh_token", self.nest.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];
        let response = self
            .http
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| SdmError::Request {
                operation: OP,
                source: e,
            })?;

        let body: TokenResponse = handle_response(OP, response).await?;
        let token = body
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(SdmError::MissingToken)?;
        let lifetime = body
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME);
        Ok((token, lifetime))
    }

    /// A valid access token, refreshed with retries when missing or stale.
    pub async fn access_token(&self) -> Result<String, SdmError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref()
            && Instant::now() < token.refresh_at
        {
            return Ok(token.value.clone());
        }

        let (value, lifetime) = with_retry_if(
            &self.token_retry,
            "token refresh",
            SdmError::is_retryable,
            || self.refresh_token(),
        )
        .await?;
        info!("Obtained SDM access token (valid for {:?})", lifetime);

        *cached = Some(CachedToken {
            value: value.clone(),
            refresh_at: Instant::now() + lifetime.saturating_sub(TOKEN_EXPIRY_MARGIN),
        });
        Ok(value)
    }

    /// Forget the cached token so the next call refreshes it.
    pub async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    /// List all devices in the project.
    pub async fn list_devices(&self, token: &str) -> Result<DeviceList, SdmError> {
        const OP: &str = "device list";

        let url = self.devices_url();
        let url = url.as_str();
        with_retry_if(&self.inventory_retry, OP, SdmError::is_retryable, || async move {
            let response = self
                .http
                .get(url)
                .bearer_auth(token)
                .send()
                .await
                .map_err(|e| SdmError::Request {
                    operation: OP,
                    source: e,
                })?;
            handle_response(OP, response).await
        })
        .await
    }

    /// Switch a thermostat's HVAC off. Never retried.
    pub async fn set_mode_off(&self, token: &str, device_id: &str) -> Result<(), SdmError> {
        const OP: &str = "SetMode OFF";

        let body = serde_json::json!({
            "command": SET_MODE_COMMAND,
            "params": { "mode": "OFF" },
        });
        let response = self
            .http
            .post(self.command_url(device_id))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| SdmError::Request {
                operation: OP,
                source: e,
            })?;

        // The command answers with an empty JSON object
        let _: serde_json::Value = handle_response(OP, response).await?;
        Ok(())
    }

    /// Token plus listing, refreshing the token once if SDM rejects it.
    async fn list_with_token(&self) -> Result<DeviceList, nestwatch_core::Error> {
        let token = self
            .access_token()
            .await
            .map_err(|e| nestwatch_core::Error::upstream("token refresh", e))?;

        match self.list_devices(&token).await {
            Err(e) if e.status() == Some(401) => {
                warn!("SDM rejected the access token, refreshing");
                self.invalidate_token().await;
                let token = self
                    .access_token()
                    .await
                    .map_err(|e| nestwatch_core::Error::upstream("token refresh", e))?;
                self.list_devices(&token)
                    .await
                    .map_err(|e| nestwatch_core::Error::upstream("device list", e))
            }
            other => other.map_err(|e| nestwatch_core::Error::upstream("device list", e)),
        }
    }
}

#[async_trait]
impl ReadingSource for SdmClient {
    async fn fetch_readings(&self) -> nestwatch_core::Result<Vec<Reading>> {
        let list = self.list_with_token().await?;
        let readings = list.readings(OffsetDateTime::now_utc());
        debug!(
            "Listed {} devices, {} with temperature",
            list.devices.len(),
            readings.len()
        );
        Ok(readings)
    }
}

#[async_trait]
impl HvacActuator for SdmClient {
    async fn disable_heating_cooling(&self, device_id: &str) -> nestwatch_core::Result<()> {
        let token = self
            .access_token()
            .await
            .map_err(|e| nestwatch_core::Error::actuation_failed(device_id, e))?;
        self.set_mode_off(&token, device_id)
            .await
            .map_err(|e| nestwatch_core::Error::actuation_failed(device_id, e))
    }
}

/// Decode a success body, or turn an error status into [`SdmError::Api`].
async fn handle_response<T: serde::de::DeserializeOwned>(
    operation: &'static str,
    response: reqwest::Response,
) -> Result<T, SdmError> {
    let status = response.status();
    if status.is_success() {
        response.json().await.map_err(|e| SdmError::Decode {
            operation,
            source: e,
        })
    } else {
        let message = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|v| error_message(&v))
            .unwrap_or_else(|| status.to_string());

        Err(SdmError::Api {
            operation,
            status: status.as_u16(),
            message,
        })
    }
}

/// Pull a message out of a Google API or OAuth error body.
fn error_message(body: &serde_json::Value) -> Option<String> {
    let error = body.get("error")?;
    if let Some(message) = error.get("message").and_then(|m| m.as_str()) {
        return Some(message.to_string());
    }
    let code = error.as_str()?;
    match body.get("error_description").and_then(|d| d.as_str()) {
        Some(description) => Some(format!("{}: {}", code, description)),
        None => Some(code.to_string()),
    }
}
