use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub connector: ConnectorConfig,
    pub exporter: ExporterConfig,
    pub logging: LoggingConfig,
}

/// Etherscan connector configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// Etherscan API key. Mandatory, redacted in all diagnostic output.
    #[serde(default)]
    pub api_key: String,
    /// Account addresses to retrieve balances for
    #[serde(default)]
    pub addresses: Vec<String>,
    /// ERC-20 tokens to retrieve balances for, in addition to native ETH
    #[serde(default)]
    pub tokens: Vec<TokenSpec>,
    /// Etherscan API endpoint URL
    #[serde(default = "default_url")]
    pub url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Retry budget per request, including the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

/// An ERC-20 token to track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSpec {
    /// Token contract address
    pub contract: String,
    /// Decimal precision. Defaults to 18 when absent or negative.
    #[serde(default)]
    pub decimals: Option<i64>,
    /// Asset symbol used as the balance table key
    pub symbol: String,
}

/// Exporter process configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// Server host/bind address
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Balance polling interval in seconds
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_url() -> String {
    "https://api.etherscan.io/api".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    crate::etherscan::client::DEFAULT_MAX_RETRIES
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    9188
}

fn default_poll_interval_seconds() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            connector: ConnectorConfig::default(),
            exporter: ExporterConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            addresses: Vec::new(),
            tokens: Vec::new(),
            url: default_url(),
            timeout_seconds: default_timeout_seconds(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            poll_interval_seconds: default_poll_interval_seconds(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// The api_key must never reach a log line through a {:?} of the settings.
impl fmt::Debug for ConnectorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorConfig")
            .field("api_key", &"<redacted>")
            .field("addresses", &self.addresses)
            .field("tokens", &self.tokens)
            .field("url", &self.url)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from file and environment variables
    /// Environment variables take precedence over file values
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file()?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    ///
    /// The path comes from `CONFIG_FILE`, defaulting to `config.toml`.
    /// A missing file yields the defaults so a purely env-driven setup works.
    pub fn load_from_file() -> Result<Self, ConfigError> {
        let config_path = env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());

        if !Path::new(&config_path).exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| ConfigError::FileNotFound(config_path.clone()))?;
        let config: AppConfig =
            toml::from_str(&content).map_err(|e| ConfigError::Parsing(e.to_string()))?;
        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        // Connector configuration
        if let Ok(api_key) = env::var("ETHERSCAN_API_KEY") {
            self.connector.api_key = api_key;
        }
        if let Ok(addresses) = env::var("ETHERSCAN_ADDRESSES") {
            self.connector.addresses = addresses
                .split(',')
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .collect();
        }
        if let Ok(url) = env::var("ETHERSCAN_URL") {
            self.connector.url = url;
        }
        if let Ok(retries) = env::var("ETHERSCAN_MAX_RETRIES") {
            self.connector.max_retries =
                retries.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "ETHERSCAN_MAX_RETRIES".to_string(),
                    value: retries,
                })?;
        }

        // Exporter configuration
        if let Ok(host) = env::var("EXPORTER_HOST") {
            self.exporter.host = host;
        }
        if let Ok(port) = env::var("EXPORTER_PORT") {
            self.exporter.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "EXPORTER_PORT".to_string(),
                value: port,
            })?;
        }
        if let Ok(interval) = env::var("POLL_INTERVAL_SECONDS") {
            self.exporter.poll_interval_seconds =
                interval.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "POLL_INTERVAL_SECONDS".to_string(),
                    value: interval,
                })?;
        }

        // Logging configuration
        if let Ok(level) = env::var("LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connector.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }

        if self.connector.addresses.is_empty() {
            return Err(ConfigError::MissingAddresses);
        }

        if !self.connector.url.starts_with("http://") && !self.connector.url.starts_with("https://")
        {
            return Err(ConfigError::InvalidUrl(self.connector.url.clone()));
        }

        if self.connector.timeout_seconds == 0 || self.connector.timeout_seconds > 300 {
            return Err(ConfigError::InvalidValue {
                key: "connector.timeout_seconds".to_string(),
                value: self.connector.timeout_seconds.to_string(),
            });
        }

        if self.connector.max_retries == 0 || self.connector.max_retries > 20 {
            return Err(ConfigError::InvalidValue {
                key: "connector.max_retries".to_string(),
                value: self.connector.max_retries.to_string(),
            });
        }

        if self.exporter.port == 0 {
            return Err(ConfigError::InvalidValue {
                key: "exporter.port".to_string(),
                value: self.exporter.port.to_string(),
            });
        }

        if self.exporter.poll_interval_seconds == 0 || self.exporter.poll_interval_seconds > 3600 {
            return Err(ConfigError::InvalidValue {
                key: "exporter.poll_interval_seconds".to_string(),
                value: self.exporter.poll_interval_seconds.to_string(),
            });
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.level".to_string(),
                value: self.logging.level.clone(),
            });
        }

        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample_config() -> Result<String, ConfigError> {
        let config = Self::default();
        toml::to_string_pretty(&config).map_err(|e| ConfigError::Parsing(e.to_string()))
    }
}
