//! deCONZ REST API Type Definitions
//!
//! Rust structs for the JSON documents exchanged with the Phoscon discovery
//! service and the deCONZ gateway REST API.
//!
//! # API Endpoints Covered
//!
//! - `GET <discovery_url>` → [`DiscoveredGateway`]
//! - `POST /api` → [`PairingReply`]
//! - `GET /api/{key}/sensors` → [`SensorMap`], decoded per record into [`SensorRecord`]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Raw sensor list keyed by the gateway's sensor index ("1", "2", ...)
pub type SensorMap = BTreeMap<String, serde_json::Value>;

/// A reachable gateway, immutable once discovered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gateway {
    pub id: String,
    pub address: String,
    pub port: u16,
}

impl Gateway {
    pub fn new(id: impl Into<String>, address: impl Into<String>, port: u16) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            port,
        }
    }

    /// Base REST path, e.g. `http://192.168.1.10:80/api`
    pub fn api_url(&self) -> String {
        format!("http://{}:{}/api", self.address, self.port)
    }
}

impl fmt::Display for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.id, self.address, self.port)
    }
}

/// Entry of the discovery service response
#[derive(Debug, Deserialize, Clone)]
pub struct DiscoveredGateway {
    pub id: String,
    pub internalipaddress: String,
    pub internalport: u16,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub macaddress: Option<String>,
    #[serde(default)]
    pub publicipaddress: Option<String>,
}

impl From<DiscoveredGateway> for Gateway {
    fn from(device: DiscoveredGateway) -> Self {
        Gateway::new(device.id, device.internalipaddress, device.internalport)
    }
}

/// Body of a pairing request
#[derive(Debug, Serialize)]
pub struct PairingRequest<'a> {
    pub devicetype: &'a str,
}

/// Status and JSON body of a pairing attempt
///
/// `body` is `Value::Null` when the gateway answered with something that is not JSON.
#[derive(Debug, Clone)]
pub struct PairingReply {
    pub status: u16,
    pub body: serde_json::Value,
}

impl PairingReply {
    /// API key at `[0].success.username`
    pub fn username(&self) -> Option<&str> {
        self.body
            .pointer("/0/success/username")
            .and_then(serde_json::Value::as_str)
    }

    /// Human readable reason at `[0].error.description`
    pub fn error_description(&self) -> Option<&str> {
        self.body
            .pointer("/0/error/description")
            .and_then(serde_json::Value::as_str)
    }
}

/// Fields shared by every supported sensor record
#[derive(Debug, Deserialize, Clone)]
pub struct SensorRecord {
    pub uniqueid: String,
    pub name: String,
    pub manufacturername: String,
    pub modelid: String,
    #[serde(default)]
    pub state: SensorState,
}

/// Measurement fields of the `state` object; each sensor type fills one of them
///
/// Values are integers in the gateway's native units (centi-degrees, centi-percent,
/// hectopascal, watt, watt-hours).
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SensorState {
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub pressure: Option<f64>,
    #[serde(default)]
    pub power: Option<f64>,
    #[serde(default)]
    pub consumption: Option<f64>,
}
