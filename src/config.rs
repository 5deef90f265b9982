//! Configuration module for loading and parsing TOML configuration files.

use coincap_client::{ClientConfig, DEFAULT_BASE_URL};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse TOML configuration.
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    /// Invalid configuration value.
    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Market-data service configuration.
    pub upstream: UpstreamConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address; `:PORT` binds all interfaces.
    pub addr: String,
    /// Time allowed to read a request's headers and body.
    pub read_timeout_secs: u64,
    /// Time allowed to produce a response.
    pub write_timeout_secs: u64,
    /// Time a keep-alive connection may sit without a new request.
    pub idle_timeout_secs: u64,
    /// Time in-flight requests get to finish after a shutdown signal.
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: ":8080".to_string(),
            read_timeout_secs: 5,
            write_timeout_secs: 10,
            idle_timeout_secs: 60,
            shutdown_grace_secs: 30,
        }
    }
}

impl ServerConfig {
    /// Address in a form [`tokio::net::TcpListener::bind`] accepts.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        if self.addr.starts_with(':') {
            format!("0.0.0.0{}", self.addr)
        } else {
            self.addr.clone()
        }
    }

    /// Read timeout.
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    /// Write timeout.
    #[must_use]
    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    /// Idle timeout.
    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Shutdown grace period.
    #[must_use]
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

/// Market-data service configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// CoinCap assets endpoint.
    pub base_url: String,
    /// Bearer token for CoinCap's authenticated tier.
    pub api_key: Option<String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
        }
    }
}

impl UpstreamConfig {
    /// Client configuration for this upstream.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file.
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Arguments
    /// * `content` - TOML content as string.
    ///
    /// # Errors
    /// Returns error if content cannot be parsed.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Replaces file values with those given on the command line or in the environment.
    pub fn apply_overrides(
        &mut self,
        addr: Option<String>,
        base_url: Option<String>,
        api_key: Option<String>,
    ) {
        if let Some(addr) = addr {
            self.server.addr = addr;
        }
        if let Some(base_url) = base_url {
            self.upstream.base_url = base_url;
        }
        if let Some(api_key) = api_key {
            self.upstream.api_key = Some(api_key);
        }
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidValue`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.addr.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "server addr cannot be empty".to_string(),
            ));
        }

        let timeouts = [
            ("read_timeout_secs", self.server.read_timeout_secs),
            ("write_timeout_secs", self.server.write_timeout_secs),
            ("idle_timeout_secs", self.server.idle_timeout_secs),
            ("shutdown_grace_secs", self.server.shutdown_grace_secs),
        ];
        for (name, value) in timeouts {
            if value == 0 {
                return Err(ConfigError::InvalidValue(format!(
                    "server {} must be positive",
                    name
                )));
            }
        }

        if self.upstream.base_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "upstream base_url cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
