//! Service configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use nestwatch_core::RetryConfig;

/// Environment variable that overrides the configuration file path.
pub const CONFIG_ENV_VAR: &str = "NESTWATCH_CONFIG";

/// Service configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Google Smart Device Management credentials.
    pub nest: NestConfig,
    /// Pushover delivery settings.
    pub pushover: PushoverConfig,
    /// History store settings.
    pub storage: StorageConfig,
    /// Reaction settings.
    pub alerts: AlertsConfig,
    /// Polling settings.
    pub poll: PollConfig,
    /// Upstream API base URLs.
    pub endpoints: EndpointsConfig,
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// A missing file yields the default configuration, which does not
    /// validate until credentials are filled in.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return every problem found.
    ///
    /// # Example
    ///
    /// ```
    /// use nestwatch_service::Config;
    ///
    /// // Credentials are required
    /// assert!(Config::default().validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        errors.extend(self.nest.validate());
        errors.extend(self.pushover.validate());
        errors.extend(self.storage.validate());
        errors.extend(self.poll.validate());
        errors.extend(self.endpoints.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load and validate configuration from a file.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }
}

fn require(field: &str, value: &str, errors: &mut Vec<ValidationError>) {
    if value.trim().is_empty() {
        errors.push(ValidationError {
            field: field.to_string(),
            message: "cannot be empty".to_string(),
        });
    }
}

/// Google SDM OAuth client and project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NestConfig {
    /// OAuth client ID.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Long-lived refresh token.
    pub refresh_token: String,
    /// Device Access project ID.
    pub project_id: String,
}

impl NestConfig {
    /// Validate Nest credentials.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        require("nest.client_id", &self.client_id, &mut errors);
        require("nest.client_secret", &self.client_secret, &mut errors);
        require("nest.refresh_token", &self.refresh_token, &mut errors);
        require("nest.project_id", &self.project_id, &mut errors);
        errors
    }
}

/// Minimum emergency retry interval accepted by Pushover, in seconds.
pub const MIN_PUSHOVER_RETRY: u32 = 30;
/// Maximum emergency expiry accepted by Pushover, in seconds (3 hours).
pub const MAX_PUSHOVER_EXPIRE: u32 = 10800;

/// Pushover application and recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushoverConfig {
    /// Recipient user or group key.
    pub user: String,
    /// Application API token.
    pub token: String,
    /// Message title.
    pub title: String,
    /// Seconds between emergency re-notifications.
    pub retry: u32,
    /// Seconds before an unacknowledged emergency stops repeating.
    pub expire: u32,
}

impl Default for PushoverConfig {
    fn default() -> Self {
        Self {
            user: String::new(),
            token: String::new(),
            title: "Nest Alert".to_string(),
            retry: 60,
            expire: 3600,
        }
    }
}

impl PushoverConfig {
    /// Validate Pushover settings.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        require("pushover.user", &self.user, &mut errors);
        require("pushover.token", &self.token, &mut errors);

        if self.retry < MIN_PUSHOVER_RETRY {
            errors.push(ValidationError {
                field: "pushover.retry".to_string(),
                message: format!(
                    "retry {} is too short (minimum {} seconds)",
                    self.retry, MIN_PUSHOVER_RETRY
                ),
            });
        }
        if self.expire == 0 || self.expire > MAX_PUSHOVER_EXPIRE {
            errors.push(ValidationError {
                field: "pushover.expire".to_string(),
                message: format!(
                    "expire {} is out of range (1-{} seconds)",
                    self.expire, MAX_PUSHOVER_EXPIRE
                ),
            });
        }
        errors
    }
}

/// History store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file path.
    pub path: PathBuf,
    /// Key namespace inside the database.
    pub namespace: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: nestwatch_store::default_db_path(),
            namespace: nestwatch_store::DEFAULT_NAMESPACE.to_string(),
        }
    }
}

impl StorageConfig {
    /// Validate storage settings.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.path".to_string(),
                message: "database path cannot be empty".to_string(),
            });
        }

        if self.namespace.is_empty() {
            errors.push(ValidationError {
                field: "storage.namespace".to_string(),
                message: "cannot be empty".to_string(),
            });
        } else if self.namespace.contains(':') {
            errors.push(ValidationError {
                field: "storage.namespace".to_string(),
                message: format!("namespace '{}' cannot contain ':'", self.namespace),
            });
        }

        errors
    }
}

/// Reaction settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    /// Notify after HVAC was successfully disabled.
    pub confirm_actuation: bool,
}

/// Minimum watch interval in seconds.
pub const MIN_POLL_INTERVAL: u64 = 10;
/// Maximum watch interval in seconds (1 day).
pub const MAX_POLL_INTERVAL: u64 = 86400;

/// Polling settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Seconds between cycles in watch mode.
    pub interval: u64,
    /// Token refresh retries after the first attempt.
    pub token_retries: u32,
    /// HTTP request timeout in seconds.
    pub request_timeout: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: 300,
            token_retries: 2,
            request_timeout: 10,
        }
    }
}

impl PollConfig {
    /// Watch interval as a duration.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    /// HTTP request timeout as a duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Retry schedule for token refresh.
    pub fn token_retry(&self) -> RetryConfig {
        RetryConfig::for_token_refresh().max_retries(self.token_retries)
    }

    /// Validate polling settings.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.interval < MIN_POLL_INTERVAL {
            errors.push(ValidationError {
                field: "poll.interval".to_string(),
                message: format!(
                    "poll interval {} is too short (minimum {} seconds)",
                    self.interval, MIN_POLL_INTERVAL
                ),
            });
        } else if self.interval > MAX_POLL_INTERVAL {
            errors.push(ValidationError {
                field: "poll.interval".to_string(),
                message: format!(
                    "poll interval {} is too long (maximum {} seconds / 1 day)",
                    self.interval, MAX_POLL_INTERVAL
                ),
            });
        }

        if self.request_timeout == 0 {
            errors.push(ValidationError {
                field: "poll.request_timeout".to_string(),
                message: "request timeout cannot be 0".to_string(),
            });
        }

        errors
    }
}

/// Upstream API locations. Overridable for proxies and tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    /// OAuth token endpoint.
    pub oauth_token: String,
    /// SDM API base, up to and including the version segment.
    pub sdm: String,
    /// Pushover messages endpoint.
    pub pushover: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            oauth_token: "https://oauth2.googleapis.com/token".to_string(),
            sdm: "https://smartdevicemanagement.googleapis.com/v1".to_string(),
            pushover: "https://api.pushover.net/1/messages.json".to_string(),
        }
    }
}

impl EndpointsConfig {
    /// Point every endpoint at one base URL (for tests and proxies).
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            oauth_token: format!("{}/token", base),
            sdm: format!("{}/v1", base),
            pushover: format!("{}/1/messages.json", base),
        }
    }

    /// Validate endpoint URLs.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        for (field, url) in [
            ("endpoints.oauth_token", &self.oauth_token),
            ("endpoints.sdm", &self.sdm),
            ("endpoints.pushover", &self.pushover),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                errors.push(ValidationError {
                    field: field.to_string(),
                    message: format!("URL must start with http:// or https://, got: {}", url),
                });
            }
        }
        errors
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field path (e.g., `nest.project_id`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("nestwatch")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            nest: NestConfig {
                client_id: "client".to_string(),
                client_secret: "secret".to_string(),
                refresh_token: "refresh".to_string(),
                project_id: "project".to_string(),
            },
            pushover: PushoverConfig {
                user: "user-key".to_string(),
                token: "app-token".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn fields(result: Result<(), ConfigError>) -> Vec<String> {
        match result {
            Err(ConfigError::Validation(errors)) => errors.into_iter().map(|e| e.field).collect(),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.pushover.title, "Nest Alert");
        assert_eq!(config.pushover.retry, 60);
        assert_eq!(config.pushover.expire, 3600);
        assert_eq!(config.storage.namespace, "nest");
        assert!(!config.alerts.confirm_actuation);
        assert_eq!(config.poll.interval(), Duration::from_secs(300));
    }

    #[test]
    fn test_default_config_requires_credentials() {
        let fields = fields(Config::default().validate());
        assert_eq!(
            fields,
            vec![
                "nest.client_id",
                "nest.client_secret",
                "nest.refresh_token",
                "nest.project_id",
                "pushover.user",
                "pushover.token",
            ]
        );
    }

    #[test]
    fn test_valid_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_config_full_toml() {
        let toml = r#"
            [nest]
            client_id = "id"
            client_secret = "secret"
            refresh_token = "refresh"
            project_id = "proj"

            [pushover]
            user = "u"
            token = "t"
            title = "Thermostat"

            [storage]
            path = "/data/nestwatch.db"
            namespace = "lab"

            [alerts]
            confirm_actuation = true

            [poll]
            interval = 60

            [endpoints]
            sdm = "http://127.0.0.1:9000/v1"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.nest.project_id, "proj");
        assert_eq!(config.pushover.title, "Thermostat");
        assert_eq!(config.pushover.retry, 60);
        assert_eq!(config.storage.path, PathBuf::from("/data/nestwatch.db"));
        assert_eq!(config.storage.namespace, "lab");
        assert!(config.alerts.confirm_actuation);
        assert_eq!(config.poll.interval, 60);
        assert_eq!(config.poll.token_retries, 2);
        assert_eq!(config.endpoints.sdm, "http://127.0.0.1:9000/v1");
        assert_eq!(
            config.endpoints.oauth_token,
            "https://oauth2.googleapis.com/token"
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let config = valid_config();
        config.save(&config_path).unwrap();
        let loaded = Config::load_validated(&config_path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("invalid.toml");
        std::fs::write(&config_path, "this is not valid { toml").unwrap();

        let result = Config::load(&config_path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_pushover_limits() {
        let mut config = valid_config();
        config.pushover.retry = 10;
        config.pushover.expire = 20000;
        assert_eq!(
            fields(config.validate()),
            vec!["pushover.retry", "pushover.expire"]
        );
    }

    #[test]
    fn test_storage_validation() {
        let mut config = valid_config();
        config.storage.path = PathBuf::new();
        config.storage.namespace = "a:b".to_string();
        assert_eq!(
            fields(config.validate()),
            vec!["storage.path", "storage.namespace"]
        );
    }

    #[test]
    fn test_poll_interval_bounds() {
        let mut config = valid_config();
        config.poll.interval = 5;
        assert!(fields(config.validate()).contains(&"poll.interval".to_string()));

        config.poll.interval = MAX_POLL_INTERVAL + 1;
        assert!(fields(config.validate()).contains(&"poll.interval".to_string()));
    }

    #[test]
    fn test_endpoint_validation() {
        let mut config = valid_config();
        config.endpoints.pushover = "api.pushover.net".to_string();
        let fields = fields(config.validate());
        assert_eq!(fields, vec!["endpoints.pushover"]);
    }

    #[test]
    fn test_endpoints_with_base() {
        let endpoints = EndpointsConfig::with_base("http://127.0.0.1:8080/");
        assert_eq!(endpoints.oauth_token, "http://127.0.0.1:8080/token");
        assert_eq!(endpoints.sdm, "http://127.0.0.1:8080/v1");
        assert_eq!(endpoints.pushover, "http://127.0.0.1:8080/1/messages.json");
        assert!(endpoints.validate().is_empty());
    }

    #[test]
    fn test_token_retry_schedule() {
        let retry = PollConfig::default().token_retry();
        assert_eq!(retry.attempts(), 3);
        assert_eq!(retry.initial_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        assert!(path.ends_with("nestwatch/config.toml"));
    }

    #[test]
    fn test_config_validation_error_display() {
        let error = ConfigError::Validation(vec![
            ValidationError {
                field: "nest.project_id".to_string(),
                message: "cannot be empty".to_string(),
            },
            ValidationError {
                field: "poll.interval".to_string(),
                message: "too short".to_string(),
            },
        ]);
        let display = error.to_string();
        assert!(display.contains("  - nest.project_id: cannot be empty"));
        assert!(display.contains("poll.interval"));
    }
}
