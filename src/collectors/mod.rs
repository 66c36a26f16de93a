//! Metrics Collectors
//!
//! This module turns live gateway sensor data into Prometheus metric families.
//!
//! # Architecture
//!
//! - [`sensor`] - translation of deCONZ sensor records and the per-gateway collector
//! - [`registry`] - the set of gateway collectors run on every scrape
//!
//! Nothing is cached: each scrape fetches `/api/{key}/sensors` from every gateway
//! and builds its metric families from scratch.
//!
//! # Error Handling
//!
//! A gateway that cannot be reached, or answers with something other than a JSON
//! sensor map, is non-fatal: it is logged, contributes no samples, and reports
//! `deconz_up 0`. Single malformed sensor records are skipped inside [`sensor`].

use crate::deconz::types::{Gateway, SensorMap};
use crate::error::Result;
use crate::pairing::Credential;
use std::future::Future;
use tracing::{debug, warn};

pub mod registry;
pub mod sensor;

pub use registry::CollectorRegistry;
pub use sensor::{translate, translate_sensors, GatewayCollector, MetricSample, SensorKind};

/// Source of raw sensor lists, implemented by the HTTP client
pub trait SensorSource {
    fn fetch_sensors(
        &self,
        gateway: &Gateway,
        credential: &Credential,
    ) -> impl Future<Output = Result<SensorMap>> + Send;
}

/// Status of a metrics collection operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionStatus {
    /// Metrics were successfully collected and recorded
    Success,
    /// Collection failed but is non-fatal (already logged as warning)
    Failed,
}

/// Apply `process` to a successful collection, log a failed one
///
/// # Examples
///
/// ```
/// use deconz_exporter::collectors::{record_outcome, CollectionStatus};
///
/// let status = record_outcome("gw", Err::<Vec<u8>, _>("timeout"), |_| unreachable!());
/// assert_eq!(status, CollectionStatus::Failed);
/// ```
pub fn record_outcome<T, E, P>(
    name: &str,
    outcome: std::result::Result<T, E>,
    process: P,
) -> CollectionStatus
where
    E: std::fmt::Display,
    P: FnOnce(T),
{
    match outcome {
        Ok(data) => {
            process(data);
            debug!("Updated metrics for {}", name);
            CollectionStatus::Success
        }
        Err(e) => {
            warn!("Failed to collect sensors from {}: {}", name, e);
            CollectionStatus::Failed
        }
    }
}
