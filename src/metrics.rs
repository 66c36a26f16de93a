//! Prometheus Metrics Definitions
//!
//! This module defines the metric families exposed by the deCONZ exporter.
//!
//! # Metric Families
//!
//! | Metric | Labels | Source |
//! |---|---|---|
//! | `deconz_temperature_celsius` | uid, name, manufacturer, model | `ZHATemperature` |
//! | `deconz_humidity_percent` | uid, name, manufacturer, model | `ZHAHumidity` |
//! | `deconz_pressure_pascal` | uid, name, manufacturer, model | `ZHAPressure` |
//! | `deconz_power_watt` | uid, name, manufacturer, model | `ZHAPower` |
//! | `deconz_power_kWh` | uid, name, manufacturer, model | `ZHAConsumption` |
//! | `deconz_up` | gateway | 1 if the last sensor fetch succeeded |
//!
//! A [`MetricsCollector`] owns its own [`Registry`] and lives for exactly one
//! scrape, so values never leak from one scrape into the next.

use crate::collectors::sensor::{MetricSample, SensorKind, LABEL_NAMES};
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use std::collections::{BTreeSet, HashSet};
use std::fmt::Write;

/// Metric families for a single scrape
pub struct MetricsCollector {
    registry: Registry,

    // Sensor families
    pub temperature_celsius: GaugeVec,
    pub humidity_percent: GaugeVec,
    pub pressure_pascal: GaugeVec,
    pub power_watt: GaugeVec,
    pub power_kwh: GaugeVec,

    // Gateway reachability
    pub up: GaugeVec,

    populated: BTreeSet<SensorKind>,
    // (family, uid) pairs already recorded in this scrape
    recorded: HashSet<(SensorKind, String)>,
}

impl MetricsCollector {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let sensor_family = |kind: SensorKind| -> anyhow::Result<GaugeVec> {
            let family = GaugeVec::new(Opts::new(kind.metric_name(), kind.help()), &LABEL_NAMES)?;
            registry.register(Box::new(family.clone()))?;
            Ok(family)
        };

        let temperature_celsius = sensor_family(SensorKind::Temperature)?;
        let humidity_percent = sensor_family(SensorKind::Humidity)?;
        let pressure_pascal = sensor_family(SensorKind::Pressure)?;
        let power_watt = sensor_family(SensorKind::Power)?;
        let power_kwh = sensor_family(SensorKind::Consumption)?;

        let up = GaugeVec::new(
            Opts::new(
                "up",
                "Whether the last sensor fetch from the gateway succeeded (1=yes, 0=no)",
            )
            .namespace("deconz"),
            &["gateway"],
        )?;
        registry.register(Box::new(up.clone()))?;

        Ok(Self {
            registry,
            temperature_celsius,
            humidity_percent,
            pressure_pascal,
            power_watt,
            power_kwh,
            up,
            populated: BTreeSet::new(),
            recorded: HashSet::new(),
        })
    }

    /// Gauge family holding samples of `kind`
    pub fn family(&self, kind: SensorKind) -> &GaugeVec {
        match kind {
            SensorKind::Temperature => &self.temperature_celsius,
            SensorKind::Humidity => &self.humidity_percent,
            SensorKind::Pressure => &self.pressure_pascal,
            SensorKind::Power => &self.power_watt,
            SensorKind::Consumption => &self.power_kwh,
        }
    }

    /// Record `sample` unless its family already holds a sample with the same uid
    ///
    /// Returns `false` when the sample was dropped as a duplicate.
    pub fn record(&mut self, sample: &MetricSample) -> bool {
        if !self
            .recorded
            .insert((sample.kind, sample.labels.uid.clone()))
        {
            return false;
        }

        let values = sample.label_values();
        self.family(sample.kind)
            .with_label_values(&values[..])
            .set(sample.value);
        self.populated.insert(sample.kind);
        true
    }

    pub fn set_gateway_up(&self, gateway_id: &str, up: bool) {
        self.up
            .with_label_values(&[gateway_id])
            .set(if up { 1.0 } else { 0.0 });
    }

    /// Number of sensor samples recorded, excluding `deconz_up`
    pub fn sample_count(&self) -> usize {
        self.recorded.len()
    }

    /// Render metrics in Prometheus text format
    ///
    /// The registry drops families without samples, so empty sensor families are
    /// declared with `# HELP`/`# TYPE` lines only.
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        let mut output = String::from_utf8(buffer)?;

        for kind in SensorKind::ALL {
            if !self.populated.contains(&kind) {
                writeln!(output, "# HELP {} {}", kind.metric_name(), kind.help())?;
                writeln!(output, "# TYPE {} gauge", kind.metric_name())?;
            }
        }

        Ok(output)
    }
}
