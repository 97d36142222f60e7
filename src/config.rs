//! Client configuration
//!
//! Loaded from a TOML file; every field has a default so a missing file or a
//! partial file both produce a usable configuration.

use crate::error::ClientError;
use crate::tokens::MAX_TOKEN_LIFETIME_SECS;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

/// Environment variable that overrides the API base URL
pub const API_URL_ENV: &str = "BFRB_API_URL";

/// Host the Android emulator uses to reach the development machine
const ANDROID_EMULATOR_HOST: &str = "10.0.2.2";

/// Deployment environment the client talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Environment::Development => "http://localhost:3000/api",
            Environment::Staging => "https://staging.api.bfrb-tracker.app/api",
            Environment::Production => "https://api.bfrb-tracker.app/api",
        }
    }
}

/// Target platform the client runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
    Web,
    #[default]
    Desktop,
}

impl Platform {
    /// Browser targets keep a mirrored fallback store
    pub fn is_browser(&self) -> bool {
        matches!(self, Platform::Web)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub environment: Environment,
    /// Explicit base URL, wins over the environment variable and defaults
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub platform: Platform,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_expiry_buffer_secs")]
    pub expiry_buffer_secs: i64,
    /// Repeated refresh attempts inside this window are logged as rapid; it
    /// does not hold back or delay refreshes
    #[serde(default = "default_refresh_debounce_ms")]
    pub refresh_debounce_ms: i64,
    #[serde(default = "default_blacklist_retention_days")]
    pub blacklist_retention_days: i64,
    /// Lifetime assumed when the server omits `expiresIn`
    #[serde(default = "default_expires_in_secs")]
    pub default_expires_in_secs: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            expiry_buffer_secs: default_expiry_buffer_secs(),
            refresh_debounce_ms: default_refresh_debounce_ms(),
            blacklist_retention_days: default_blacklist_retention_days(),
            default_expires_in_secs: default_expires_in_secs(),
        }
    }
}

/// Accepted ranges for the `[auth]` settings
const EXPIRY_BUFFER_RANGE: (i64, i64) = (0, 24 * 60 * 60);
const REFRESH_DEBOUNCE_RANGE: (i64, i64) = (0, 60 * 60 * 1000);
const BLACKLIST_RETENTION_RANGE: (i64, i64) = (1, 10 * 365);
const DEFAULT_EXPIRES_IN_RANGE: (i64, i64) = (1, MAX_TOKEN_LIFETIME_SECS);

fn check_range(name: &str, value: i64, (min, max): (i64, i64)) -> Result<(), ClientError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ClientError::Config(format!(
            "auth.{name} = {value} is out of range ({min}..={max})"
        )))
    }
}

impl AuthConfig {
    pub fn validate(&self) -> Result<(), ClientError> {
        check_range("expiry_buffer_secs", self.expiry_buffer_secs, EXPIRY_BUFFER_RANGE)?;
        check_range("refresh_debounce_ms", self.refresh_debounce_ms, REFRESH_DEBOUNCE_RANGE)?;
        check_range(
            "blacklist_retention_days",
            self.blacklist_retention_days,
            BLACKLIST_RETENTION_RANGE,
        )?;
        check_range(
            "default_expires_in_secs",
            self.default_expires_in_secs,
            DEFAULT_EXPIRES_IN_RANGE,
        )
    }

    pub fn expiry_buffer(&self) -> Duration {
        Duration::seconds(self.expiry_buffer_secs)
    }

    pub fn refresh_debounce(&self) -> Duration {
        Duration::milliseconds(self.refresh_debounce_ms)
    }

    pub fn blacklist_retention(&self) -> Duration {
        Duration::days(self.blacklist_retention_days)
    }
}

fn default_expiry_buffer_secs() -> i64 {
    60
}

fn default_refresh_debounce_ms() -> i64 {
    1000
}

fn default_blacklist_retention_days() -> i64 {
    90
}

fn default_expires_in_secs() -> i64 {
    3600
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_dir")]
    pub dir: PathBuf,
    /// Keep a browser-style mirror store next to the native one
    #[serde(default)]
    pub mirror: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
            mirror: false,
        }
    }
}

fn default_storage_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bfrb")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ClientConfig {
    /// Load configuration from a TOML file, falling back to defaults when it
    /// does not exist
    pub fn load(path: &Path) -> Result<Self, ClientError> {
        if !path.exists() {
            debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&contents)?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ClientError> {
        let config: Self =
            toml::from_str(contents).map_err(|e| ClientError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        self.auth.validate()
    }

    /// Resolve the API base URL for the configured environment and platform
    pub fn resolve_base_url(&self) -> Result<String, ClientError> {
        let env_override = std::env::var(API_URL_ENV).ok();
        self.resolve_base_url_with(env_override.as_deref())
    }

    pub(crate) fn resolve_base_url_with(
        &self,
        env_override: Option<&str>,
    ) -> Result<String, ClientError> {
        let raw = self
            .api
            .base_url
            .as_deref()
            .or(env_override.filter(|v| !v.trim().is_empty()))
            .unwrap_or_else(|| self.api.environment.default_base_url());

        let mut url = Url::parse(raw.trim())?;

        if self.api.platform == Platform::Android
            && matches!(url.host_str(), Some("localhost") | Some("127.0.0.1"))
        {
            url.set_host(Some(ANDROID_EMULATOR_HOST))?;
        }

        Ok(url.as_str().trim_end_matches('/').to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_from_empty_toml() {
        let config = ClientConfig::from_toml("").unwrap();
        assert_eq!(config.api.environment, Environment::Development);
        assert_eq!(config.auth.expiry_buffer_secs, 60);
        assert_eq!(config.auth.refresh_debounce_ms, 1000);
        assert_eq!(config.auth.blacklist_retention_days, 90);
        assert_eq!(config.logging.level, "info");
        assert!(!config.storage.mirror);
    }

    #[test]
    fn test_partial_toml() {
        let config = ClientConfig::from_toml(
            r#"
            [api]
            environment = "production"
            platform = "web"

            [auth]
            expiry_buffer_secs = 120
            "#,
        )
        .unwrap();

        assert_eq!(config.api.environment, Environment::Production);
        assert!(config.api.platform.is_browser());
        assert_eq!(config.auth.expiry_buffer_secs, 120);
        assert_eq!(config.auth.refresh_debounce_ms, 1000);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = ClientConfig::from_toml("[api\nenvironment = ");
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[test]
    fn test_out_of_range_auth_values_rejected() {
        for toml in [
            "[auth]\nexpiry_buffer_secs = 10000000000000000",
            "[auth]\nexpiry_buffer_secs = -5",
            "[auth]\nblacklist_retention_days = 100000000",
            "[auth]\nblacklist_retention_days = 0",
            "[auth]\nrefresh_debounce_ms = -1",
            "[auth]\ndefault_expires_in_secs = 9223372036854775807",
        ] {
            let result = ClientConfig::from_toml(toml);
            assert!(
                matches!(result, Err(ClientError::Config(_))),
                "{toml:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(ClientConfig::default().validate().is_ok());
        let config = ClientConfig::from_toml("[auth]\nexpiry_buffer_secs = 0").unwrap();
        assert_eq!(config.auth.expiry_buffer(), Duration::zero());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = ClientConfig::load(Path::new("/nonexistent/bfrb.toml")).unwrap();
        assert_eq!(config.api.environment, Environment::Development);
    }

    #[test]
    fn test_base_url_precedence() {
        let mut config = ClientConfig::default();
        assert_eq!(
            config.resolve_base_url_with(None).unwrap(),
            "http://localhost:3000/api"
        );
        assert_eq!(
            config
                .resolve_base_url_with(Some("https://env.example.com/api/"))
                .unwrap(),
            "https://env.example.com/api"
        );

        config.api.base_url = Some("https://explicit.example.com".to_string());
        assert_eq!(
            config
                .resolve_base_url_with(Some("https://env.example.com"))
                .unwrap(),
            "https://explicit.example.com"
        );
    }

    #[test]
    fn test_android_emulator_rewrites_localhost() {
        let mut config = ClientConfig::default();
        config.api.platform = Platform::Android;
        assert_eq!(
            config.resolve_base_url_with(None).unwrap(),
            "http://10.0.2.2:3000/api"
        );

        config.api.environment = Environment::Production;
        assert_eq!(
            config.resolve_base_url_with(None).unwrap(),
            "https://api.bfrb-tracker.app/api"
        );
    }
}
