use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub chargemap: ChargeMapConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8787
}

/// Connection settings for the identity/row-store backend.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub url: String,
    #[serde(default)]
    pub anon_key: String,
    /// Redirect target sent with sign-up requests so the confirmation
    /// e-mail lands the user back in the dashboard.
    pub confirm_redirect_url: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            anon_key: String::new(),
            confirm_redirect_url: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_backend_url() -> String {
    "http://127.0.0.1:54321".to_string()
}

/// Settings for the upstream charging-station directory.
#[derive(Debug, Clone, Deserialize)]
pub struct ChargeMapConfig {
    #[serde(default = "default_chargemap_url")]
    pub base_url: String,
    pub api_key: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ChargeMapConfig {
    fn default() -> Self {
        Self {
            base_url: default_chargemap_url(),
            api_key: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_chargemap_url() -> String {
    "https://api.openchargemap.io/v3/poi".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
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

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| "Failed to parse configuration file")?;
            Ok(config)
        } else {
            info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            backend: BackendConfig::default(),
            chargemap: ChargeMapConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
