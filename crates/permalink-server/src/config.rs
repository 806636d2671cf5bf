use std::path::Path;

use permalink_core::Principal;
use serde::Deserialize;

use crate::service::PermalinkSettings;

/// Upper bound on `permalink.ttl_seconds`, roughly one hundred years.
pub const MAX_TTL_SECONDS: u64 = 100 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub permalink: PermalinkConfig,
    pub access: AccessConfig,
    pub auth: AuthConfig,
    pub log: LogConfig,
    pub tracing: TracingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PermalinkConfig {
    pub base_url: String,
    /// Lifetime of a new permalink. Unset means permalinks never expire.
    pub ttl_seconds: Option<u64>,
    pub purge_interval_seconds: u64,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AccessConfig {
    pub admins: Vec<String>,
    pub grants: Vec<GrantConfig>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct GrantConfig {
    pub principal: String,
    pub dashboards: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// When false, every request runs as `dev_principal`.
    pub require_api_key: bool,
    pub dev_principal: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    pub enabled: bool,
    pub otlp_endpoint: String,
    pub service_name: String,
    pub sample_rate: f64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8088,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost:5432/permalink".to_string(),
            max_connections: 10,
        }
    }
}

impl Default for PermalinkConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8088".to_string(),
            ttl_seconds: None,
            purge_interval_seconds: 300,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            require_api_key: false,
            dev_principal: "admin".to_string(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            level: "info".to_string(),
        }
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            otlp_endpoint: "http://localhost:4317".to_string(),
            service_name: "permalink-server".to_string(),
            sample_rate: 1.0,
        }
    }
}

impl AppConfig {
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e.to_string()))?;
            toml::from_str::<AppConfig>(&contents)
                .map_err(|e| ConfigError::ParseToml(e.to_string()))?
        } else {
            AppConfig::default()
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("PERMALINK_HTTP_HOST") {
            self.http.host = v;
        }
        if let Ok(v) = std::env::var("PERMALINK_HTTP_PORT")
            && let Ok(port) = v.parse()
        {
            self.http.port = port;
        }
        if let Ok(v) = std::env::var("PERMALINK_DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = std::env::var("PERMALINK_DATABASE_MAX_CONNECTIONS")
            && let Ok(n) = v.parse()
        {
            self.database.max_connections = n;
        }
        if let Ok(v) = std::env::var("PERMALINK_STORAGE_BACKEND") {
            match v.as_str() {
                "memory" => self.storage.backend = StorageBackend::Memory,
                "postgres" => self.storage.backend = StorageBackend::Postgres,
                _ => {}
            }
        }
        if let Ok(v) = std::env::var("PERMALINK_BASE_URL") {
            self.permalink.base_url = v;
        }
        if let Ok(v) = std::env::var("PERMALINK_TTL_SECONDS")
            && let Ok(n) = v.parse()
        {
            self.permalink.ttl_seconds = Some(n);
        }
        if let Ok(v) = std::env::var("PERMALINK_REQUIRE_API_KEY")
            && let Ok(b) = v.parse()
        {
            self.auth.require_api_key = b;
        }
        if let Ok(v) = std::env::var("PERMALINK_LOG_LEVEL") {
            self.log.level = v;
        }
        if let Ok(v) = std::env::var("PERMALINK_LOG_FORMAT") {
            match v.as_str() {
                "json" => self.log.format = LogFormat::Json,
                "pretty" => self.log.format = LogFormat::Pretty,
                _ => {}
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.http.port == 0 {
            return Err(ConfigError::Validation(
                "http.port must be non-zero".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Validation(
                "database.max_connections must be non-zero".to_string(),
            ));
        }
        if self.permalink.base_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "permalink.base_url must not be empty".to_string(),
            ));
        }
        if self.permalink.ttl_seconds == Some(0) {
            return Err(ConfigError::Validation(
                "permalink.ttl_seconds must be non-zero when set".to_string(),
            ));
        }
        if self
            .permalink
            .ttl_seconds
            .is_some_and(|secs| secs > MAX_TTL_SECONDS)
        {
            return Err(ConfigError::Validation(format!(
                "permalink.ttl_seconds must not exceed {MAX_TTL_SECONDS}"
            )));
        }
        if self.permalink.purge_interval_seconds == 0 {
            return Err(ConfigError::Validation(
                "permalink.purge_interval_seconds must be non-zero".to_string(),
            ));
        }
        if self.auth.require_api_key && self.storage.backend != StorageBackend::Postgres {
            return Err(ConfigError::Validation(
                "auth.require_api_key needs storage.backend = \"postgres\"".to_string(),
            ));
        }
        if self.auth.dev_principal.trim().is_empty() {
            return Err(ConfigError::Validation(
                "auth.dev_principal must not be empty".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.tracing.sample_rate) {
            return Err(ConfigError::Validation(
                "tracing.sample_rate must be between 0.0 and 1.0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_permalink_settings(&self) -> Result<PermalinkSettings, ConfigError> {
        let ttl = self
            .permalink
            .ttl_seconds
            .map(|secs| {
                i64::try_from(secs).map(time::Duration::seconds).map_err(|_| {
                    ConfigError::Validation("permalink.ttl_seconds is too large".to_string())
                })
            })
            .transpose()?;

        Ok(PermalinkSettings {
            base_url: self.permalink.base_url.clone(),
            ttl,
        })
    }

    pub fn purge_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.permalink.purge_interval_seconds)
    }

    /// Principal used for every request when API keys are not required.
    pub fn dev_principal(&self) -> Principal {
        Principal::admin(self.auth.dev_principal.clone())
    }

    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http.host, self.http.port)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{0}': {1}")]
    ReadFile(String, String),

    #[error("failed to parse TOML config: {0}")]
    ParseToml(String),

    #[error("config validation failed: {0}")]
    Validation(String),
}
