//! deCONZ REST API Client
//!
//! Thin wrapper around a shared [`reqwest::Client`] covering the three upstream
//! calls the exporter makes:
//!
//! - `GET <discovery_url>` once at startup
//! - `POST http://{gateway}/api` while pairing
//! - `GET http://{gateway}/api/{key}/sensors` on every scrape
//!
//! Every request carries the configured timeout so a slow gateway cannot stall a
//! scrape indefinitely.
//!
//! # Example
//!
//! ```no_run
//! use deconz_exporter::config::DeconzConfig;
//! use deconz_exporter::deconz::DeconzClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = DeconzClient::new(&DeconzConfig::default())?;
//! let gateways = client.discover().await?;
//! # Ok(())
//! # }
//! ```

use crate::collectors::SensorSource;
use crate::config::DeconzConfig;
use crate::deconz::types::*;
use crate::error::{ExporterError, Result};
use crate::pairing::{Credential, PairingApi};
use secrecy::ExposeSecret;
use std::future::Future;
use tracing::{debug, info};

/// HTTP client for the discovery service and deCONZ gateways
///
/// Cloning is cheap; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct DeconzClient {
    http: reqwest::Client,
    discovery_url: String,
}

impl DeconzClient {
    pub fn new(config: &DeconzConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("deconz-exporter/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            discovery_url: config.discovery_url.clone(),
        })
    }

    /// Resolve reachable gateways through the cloud discovery service
    pub async fn discover(&self) -> Result<Vec<Gateway>> {
        info!("Discovering deCONZ gateways via {}", self.discovery_url);

        let response = self.http.get(&self.discovery_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExporterError::Discovery(format!(
                "discovery service answered HTTP {}",
                status.as_u16()
            )));
        }

        let body = response.text().await?;
        let devices: Vec<DiscoveredGateway> = serde_json::from_str(&body)
            .map_err(|e| ExporterError::Discovery(format!("malformed response: {}", e)))?;

        let gateways: Vec<Gateway> = devices.into_iter().map(Gateway::from).collect();
        info!("Discovered {} gateway(s)", gateways.len());
        Ok(gateways)
    }

    async fn post_pairing_request(
        &self,
        gateway: &Gateway,
        device_type: &str,
    ) -> Result<PairingReply> {
        let response = self
            .http
            .post(gateway.api_url())
            .json(&PairingRequest {
                devicetype: device_type,
            })
            .send()
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        let body = serde_json::from_str(&text).unwrap_or(serde_json::Value::Null);
        debug!("Pairing request to {} answered HTTP {}", gateway, status);

        Ok(PairingReply { status, body })
    }

    async fn get_sensors(&self, gateway: &Gateway, credential: &Credential) -> Result<SensorMap> {
        let url = format!(
            "{}/{}/sensors",
            gateway.api_url(),
            credential.api_key().expose_secret()
        );

        // The URL embeds the API key; keep it out of error messages and logs.
        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(reqwest::Error::without_url)?;
        let body = response.text().await.map_err(reqwest::Error::without_url)?;

        Ok(serde_json::from_str(&body)?)
    }
}

impl PairingApi for DeconzClient {
    fn request_key(
        &self,
        gateway: &Gateway,
        device_type: &str,
    ) -> impl Future<Output = Result<PairingReply>> + Send {
        self.post_pairing_request(gateway, device_type)
    }
}

impl SensorSource for DeconzClient {
    fn fetch_sensors(
        &self,
        gateway: &Gateway,
        credential: &Credential,
    ) -> impl Future<Output = Result<SensorMap>> + Send {
        self.get_sensors(gateway, credential)
    }
}
