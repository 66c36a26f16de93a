use crate::error::ExporterError;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub deconz: DeconzConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DeconzConfig {
    #[serde(default = "default_discovery_url")]
    pub discovery_url: String,
    #[serde(default = "default_device_type")]
    pub device_type: String,
    #[serde(default = "default_api_key_directory")]
    pub api_key_directory: String,
    #[serde(default = "default_pairing_retry")]
    pub pairing_retry_seconds: u64,
    /// Unset means wait for the link button forever
    #[serde(default)]
    pub pairing_timeout_seconds: Option<u64>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default)]
    pub skip_unpaired_gateways: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_discovery_url() -> String {
    "https://phoscon.de/discover".to_string()
}

fn default_device_type() -> String {
    "deconz_exporter".to_string()
}

fn default_api_key_directory() -> String {
    "api_keys".to_string()
}

fn default_pairing_retry() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    10
}

fn default_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9759
}

impl Default for DeconzConfig {
    fn default() -> Self {
        Self {
            discovery_url: default_discovery_url(),
            device_type: default_device_type(),
            api_key_directory: default_api_key_directory(),
            pairing_retry_seconds: default_pairing_retry(),
            pairing_timeout_seconds: None,
            request_timeout_seconds: default_request_timeout(),
            skip_unpaired_gateways: false,
        }
    }
}

impl DeconzConfig {
    pub fn pairing_retry_delay(&self) -> Duration {
        Duration::from_secs(self.pairing_retry_seconds)
    }

    pub fn pairing_timeout(&self) -> Option<Duration> {
        self.pairing_timeout_seconds.map(Duration::from_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            port: default_port(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        // Load environment variables from .env if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("DECONZ_EXPORTER").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Reject settings the gateway or the HTTP client cannot work with
    pub fn validate(&self) -> crate::error::Result<()> {
        let deconz = &self.deconz;

        if !(deconz.discovery_url.starts_with("http://")
            || deconz.discovery_url.starts_with("https://"))
        {
            return Err(ExporterError::Config(format!(
                "discovery_url must be an http(s) URL, got {:?}",
                deconz.discovery_url
            )));
        }
        // deCONZ limits devicetype to 40 characters
        if deconz.device_type.is_empty() || deconz.device_type.chars().count() > 40 {
            return Err(ExporterError::Config(
                "device_type must be 1 to 40 characters".to_string(),
            ));
        }
        if deconz.api_key_directory.is_empty() {
            return Err(ExporterError::Config(
                "api_key_directory must not be empty".to_string(),
            ));
        }
        if deconz.request_timeout_seconds == 0 {
            return Err(ExporterError::Config(
                "request_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
