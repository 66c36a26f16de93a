//! Sensor Translation
//!
//! Turns raw deCONZ sensor records into Prometheus samples.
//!
//! # Metrics Produced
//! - `deconz_temperature_celsius` - `ZHATemperature`, `state.temperature / 100`
//! - `deconz_humidity_percent` - `ZHAHumidity`, `state.humidity / 100`
//! - `deconz_pressure_pascal` - `ZHAPressure`, `state.pressure * 100`
//! - `deconz_power_watt` - `ZHAPower`, `state.power`
//! - `deconz_power_kWh` - `ZHAConsumption`, `state.consumption / 1000`
//!
//! All families carry the labels `uid`, `name`, `manufacturer`, `model`.
//! Sensors of any other type (switches, presence, light level, ...) are ignored.

use super::SensorSource;
use crate::deconz::types::{Gateway, SensorMap, SensorRecord, SensorState};
use crate::error::{ExporterError, Result};
use crate::pairing::Credential;
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Label names shared by every sensor family, in `label_values` order
pub const LABEL_NAMES: [&str; 4] = ["uid", "name", "manufacturer", "model"];

/// Measurement kinds the exporter understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SensorKind {
    Temperature,
    Humidity,
    Pressure,
    Power,
    Consumption,
}

impl SensorKind {
    pub const ALL: [SensorKind; 5] = [
        SensorKind::Temperature,
        SensorKind::Humidity,
        SensorKind::Pressure,
        SensorKind::Power,
        SensorKind::Consumption,
    ];

    /// Map a deCONZ `type` string to a kind
    pub fn from_type_name(type_name: &str) -> Option<Self> {
        match type_name {
            "ZHATemperature" => Some(SensorKind::Temperature),
            "ZHAHumidity" => Some(SensorKind::Humidity),
            "ZHAPressure" => Some(SensorKind::Pressure),
            "ZHAPower" => Some(SensorKind::Power),
            "ZHAConsumption" => Some(SensorKind::Consumption),
            _ => None,
        }
    }

    pub fn type_name(self) -> &'static str {
        match self {
            SensorKind::Temperature => "ZHATemperature",
            SensorKind::Humidity => "ZHAHumidity",
            SensorKind::Pressure => "ZHAPressure",
            SensorKind::Power => "ZHAPower",
            SensorKind::Consumption => "ZHAConsumption",
        }
    }

    pub fn metric_name(self) -> &'static str {
        match self {
            SensorKind::Temperature => "deconz_temperature_celsius",
            SensorKind::Humidity => "deconz_humidity_percent",
            SensorKind::Pressure => "deconz_pressure_pascal",
            SensorKind::Power => "deconz_power_watt",
            SensorKind::Consumption => "deconz_power_kWh",
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            SensorKind::Temperature => "deCONZ temperature sensor data",
            SensorKind::Humidity => "deCONZ humidity sensor data",
            SensorKind::Pressure => "deCONZ pressure sensor data",
            SensorKind::Power => "deCONZ momentary power",
            SensorKind::Consumption => "deCONZ power consumption",
        }
    }

    /// Name of the `state` field holding the measurement
    pub fn state_field(self) -> &'static str {
        match self {
            SensorKind::Temperature => "temperature",
            SensorKind::Humidity => "humidity",
            SensorKind::Pressure => "pressure",
            SensorKind::Power => "power",
            SensorKind::Consumption => "consumption",
        }
    }

    fn raw_value(self, state: &SensorState) -> Option<f64> {
        match self {
            SensorKind::Temperature => state.temperature,
            SensorKind::Humidity => state.humidity,
            SensorKind::Pressure => state.pressure,
            SensorKind::Power => state.power,
            SensorKind::Consumption => state.consumption,
        }
    }

    /// Convert a raw gateway value to the unit in the metric name
    pub fn convert(self, raw: f64) -> f64 {
        match self {
            SensorKind::Temperature | SensorKind::Humidity => raw / 100.0,
            SensorKind::Pressure => raw * 100.0,
            SensorKind::Power => raw,
            SensorKind::Consumption => raw / 1000.0,
        }
    }
}

/// Label values of a sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleLabels {
    pub uid: String,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
}

/// One converted measurement
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub kind: SensorKind,
    pub labels: SampleLabels,
    pub value: f64,
}

impl MetricSample {
    pub fn metric_name(&self) -> &'static str {
        self.kind.metric_name()
    }

    /// Label values in [`LABEL_NAMES`] order
    pub fn label_values(&self) -> [&str; 4] {
        [
            &self.labels.uid,
            &self.labels.name,
            &self.labels.manufacturer,
            &self.labels.model,
        ]
    }
}

/// Translate a single sensor record
///
/// Returns `Ok(None)` for sensor types without a metric family and an
/// [`ExporterError::Sensor`] for supported types whose record is incomplete.
pub fn translate(sensor: &serde_json::Value) -> Result<Option<MetricSample>> {
    let Some(kind) = sensor
        .get("type")
        .and_then(serde_json::Value::as_str)
        .and_then(SensorKind::from_type_name)
    else {
        return Ok(None);
    };

    let record = SensorRecord::deserialize(sensor)
        .map_err(|e| ExporterError::Sensor(format!("{}: {}", kind.type_name(), e)))?;

    if record.uniqueid.is_empty() {
        return Err(ExporterError::Sensor(format!(
            "{} \"{}\" has an empty uniqueid",
            kind.type_name(),
            record.name
        )));
    }

    let raw = kind.raw_value(&record.state).ok_or_else(|| {
        ExporterError::Sensor(format!(
            "{} {} has no numeric state.{}",
            kind.type_name(),
            record.uniqueid,
            kind.state_field()
        ))
    })?;

    Ok(Some(MetricSample {
        kind,
        labels: SampleLabels {
            uid: record.uniqueid,
            name: record.name,
            manufacturer: record.manufacturername,
            model: record.modelid,
        },
        value: kind.convert(raw),
    }))
}

/// Translate a gateway's whole sensor list, skipping records that cannot be used
///
/// Sensors are visited in numeric index order (`"2"` before `"10"`); a `uid` seen
/// twice for the same metric keeps the sample from the lower index.
pub fn translate_sensors(gateway_id: &str, sensors: &SensorMap) -> Vec<MetricSample> {
    let mut seen = HashSet::new();
    let mut samples = Vec::new();

    for (index, sensor) in by_numeric_index(sensors) {
        match translate(sensor) {
            Ok(Some(sample)) => {
                if seen.insert((sample.kind, sample.labels.uid.clone())) {
                    samples.push(sample);
                } else {
                    warn!(
                        "{}: duplicate {} sample for uid {} (sensor {}), dropped",
                        gateway_id,
                        sample.metric_name(),
                        sample.labels.uid,
                        index
                    );
                }
            }
            Ok(None) => debug!(
                "{}: sensor {} has no supported type, skipped",
                gateway_id, index
            ),
            Err(e) => warn!("{}: skipping sensor {}: {}", gateway_id, index, e),
        }
    }

    samples
}

/// Map entries ordered by numeric index, non-numeric indices last in string order
fn by_numeric_index(sensors: &SensorMap) -> Vec<(&String, &serde_json::Value)> {
    let mut entries: Vec<_> = sensors.iter().collect();
    entries.sort_by_key(|(index, _)| match index.parse::<u64>() {
        Ok(n) => (false, n, index.as_str()),
        Err(_) => (true, 0, index.as_str()),
    });
    entries
}

/// Collector bound to one paired gateway
#[derive(Debug, Clone)]
pub struct GatewayCollector {
    gateway: Gateway,
    credential: Credential,
}

impl GatewayCollector {
    pub fn new(gateway: Gateway, credential: Credential) -> Self {
        Self {
            gateway,
            credential,
        }
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Fetch the live sensor list and translate it
    pub async fn collect<S: SensorSource>(&self, source: &S) -> Result<Vec<MetricSample>> {
        let sensors = source
            .fetch_sensors(&self.gateway, &self.credential)
            .await?;
        Ok(translate_sensors(&self.gateway.id, &sensors))
    }
}
