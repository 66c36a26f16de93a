//! Scrape tests across several gateways
//!
//! A fake sensor source stands in for the gateways so failures can be injected
//! per gateway.

use deconz_exporter::collectors::{CollectorRegistry, GatewayCollector, SensorSource};
use deconz_exporter::deconz::types::{Gateway, SensorMap};
use deconz_exporter::error::{ExporterError, Result};
use deconz_exporter::pairing::Credential;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

/// Serves canned sensor maps; gateways without an entry are unreachable
#[derive(Default)]
struct FakeGateways {
    sensors: HashMap<String, SensorMap>,
    keys_seen: Mutex<Vec<String>>,
}

impl FakeGateways {
    fn with(mut self, gateway_id: &str, sensors: SensorMap) -> Self {
        self.sensors.insert(gateway_id.to_string(), sensors);
        self
    }
}

impl SensorSource for FakeGateways {
    fn fetch_sensors(
        &self,
        gateway: &Gateway,
        credential: &Credential,
    ) -> impl Future<Output = Result<SensorMap>> + Send {
        self.keys_seen
            .lock()
            .unwrap()
            .push(credential.api_key().expose_secret().to_string());
        let result = match self.sensors.get(&gateway.id) {
            Some(sensors) => Ok(sensors.clone()),
            None => Err(ExporterError::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "gateway did not answer",
            ))),
        };
        std::future::ready(result)
    }
}

fn collector(id: &str, key: &str) -> GatewayCollector {
    GatewayCollector::new(
        Gateway::new(id, "192.168.1.10", 80),
        Credential::new(id, SecretString::from(key.to_string())),
    )
}

fn temperature(uid: &str, raw: i64) -> serde_json::Value {
    json!({
        "type": "ZHATemperature",
        "state": { "temperature": raw },
        "uniqueid": uid,
        "name": "Sensor",
        "manufacturername": "LUMI",
        "modelid": "lumi.weather"
    })
}

#[tokio::test]
async fn test_failing_gateway_does_not_hide_other_gateways() {
    // Given: Gateway A is unreachable, gateway B has one temperature sensor
    let mut b_sensors = SensorMap::new();
    b_sensors.insert("1".into(), temperature("b-temp", 2150));
    let source = FakeGateways::default().with("B", b_sensors);

    let mut registry = CollectorRegistry::new();
    registry.register(collector("A", "KEY-A"));
    registry.register(collector("B", "KEY-B"));

    // When: Scraping
    let metrics = registry.scrape(&source).await.expect("scrape failed");
    let rendered = metrics.render().expect("render failed");

    // Then: B's sample is present and only A is reported down
    assert!(rendered.contains("uid=\"b-temp\""));
    assert!(rendered.contains("deconz_up{gateway=\"A\"} 0"));
    assert!(rendered.contains("deconz_up{gateway=\"B\"} 1"));
    assert_eq!(metrics.sample_count(), 1);
}

#[tokio::test]
async fn test_samples_from_all_gateways_are_combined() {
    let mut a_sensors = SensorMap::new();
    a_sensors.insert("1".into(), temperature("a-temp", 1800));
    let mut b_sensors = SensorMap::new();
    b_sensors.insert("1".into(), temperature("b-temp", 2200));
    b_sensors.insert(
        "2".into(),
        json!({
            "type": "ZHAConsumption",
            "state": { "consumption": 12500 },
            "uniqueid": "b-plug",
            "name": "Dryer",
            "manufacturername": "innr",
            "modelid": "SP 120"
        }),
    );
    let source = FakeGateways::default()
        .with("A", a_sensors)
        .with("B", b_sensors);

    let mut registry = CollectorRegistry::new();
    registry.register(collector("A", "KEY-A"));
    registry.register(collector("B", "KEY-B"));

    let metrics = registry.scrape(&source).await.expect("scrape failed");
    let rendered = metrics.render().expect("render failed");

    assert_eq!(metrics.sample_count(), 3);
    assert!(rendered.contains("uid=\"a-temp\""));
    assert!(rendered.contains("uid=\"b-temp\""));
    assert!(rendered.contains("deconz_power_kWh{"));
    assert!(rendered.contains(" 12.5"));
}

#[tokio::test]
async fn test_each_gateway_is_queried_with_its_own_key() {
    let source = FakeGateways::default()
        .with("A", SensorMap::new())
        .with("B", SensorMap::new());

    let mut registry = CollectorRegistry::new();
    registry.register(collector("A", "KEY-A"));
    registry.register(collector("B", "KEY-B"));
    assert_eq!(registry.len(), 2);

    registry.scrape(&source).await.expect("scrape failed");

    let mut keys = source.keys_seen.lock().unwrap().clone();
    keys.sort();
    assert_eq!(keys, vec!["KEY-A".to_string(), "KEY-B".to_string()]);
}

#[tokio::test]
async fn test_every_scrape_fetches_live_data() {
    let mut sensors = SensorMap::new();
    sensors.insert("1".into(), temperature("t", 2000));
    let source = FakeGateways::default().with("A", sensors);

    let mut registry = CollectorRegistry::new();
    registry.register(collector("A", "KEY-A"));

    registry.scrape(&source).await.expect("first scrape");
    registry.scrape(&source).await.expect("second scrape");

    assert_eq!(source.keys_seen.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_empty_registry_still_declares_families() {
    let registry = CollectorRegistry::new();
    assert!(registry.is_empty());

    let metrics = registry
        .scrape(&FakeGateways::default())
        .await
        .expect("scrape failed");
    let rendered = metrics.render().expect("render failed");

    assert!(rendered.contains("# TYPE deconz_temperature_celsius gauge"));
    assert_eq!(metrics.sample_count(), 0);
}

#[tokio::test]
async fn test_uid_reported_by_two_gateways_is_exported_once() {
    // Given: Two gateways both report a temperature sensor with uid "dup"
    let mut a_sensors = SensorMap::new();
    let mut first = temperature("dup", 2000);
    first["name"] = json!("room-A");
    a_sensors.insert("1".into(), first);
    let mut b_sensors = SensorMap::new();
    let mut second = temperature("dup", 2500);
    second["name"] = json!("room-B");
    b_sensors.insert("1".into(), second);
    let source = FakeGateways::default()
        .with("A", a_sensors)
        .with("B", b_sensors);

    let mut registry = CollectorRegistry::new();
    registry.register(collector("A", "KEY-A"));
    registry.register(collector("B", "KEY-B"));

    // When: Scraping
    let metrics = registry.scrape(&source).await.expect("scrape failed");
    let rendered = metrics.render().expect("render failed");

    // Then: One series for the uid, from the first registered gateway
    let lines: Vec<&str> = rendered
        .lines()
        .filter(|l| l.starts_with("deconz_temperature_celsius{"))
        .collect();
    assert_eq!(lines.len(), 1, "got {lines:?}");
    assert!(lines[0].contains("uid=\"dup\""));
    assert!(lines[0].contains("name=\"room-A\""));
    assert!(lines[0].ends_with(" 20"));
    assert_eq!(metrics.sample_count(), 1);

    // And: Both gateways are still up
    assert!(rendered.contains("deconz_up{gateway=\"A\"} 1"));
    assert!(rendered.contains("deconz_up{gateway=\"B\"} 1"));
}
