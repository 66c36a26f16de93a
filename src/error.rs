use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Discovery failed: {0}")]
    Discovery(String),

    #[error("Pairing with gateway {gateway} failed (HTTP {status}): {description}")]
    Pairing {
        gateway: String,
        status: u16,
        description: String,
    },

    #[error("Pairing with gateway {gateway} timed out after {waited_seconds}s waiting for unlock")]
    PairingTimeout { gateway: String, waited_seconds: u64 },

    #[error("Invalid gateway identifier: {0:?}")]
    InvalidGatewayId(String),

    #[error("Invalid sensor record: {0}")]
    Sensor(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExporterError>;
