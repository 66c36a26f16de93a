//! Gateway Collector Registry
//!
//! Holds one [`GatewayCollector`] per paired gateway and runs all of them for each
//! scrape. Collectors are polled concurrently and share nothing, so a failing or
//! slow gateway only affects its own samples and its `deconz_up` value.

use super::sensor::{GatewayCollector, MetricSample};
use super::{record_outcome, CollectionStatus, SensorSource};
use crate::deconz::types::Gateway;
use crate::error::Result;
use crate::metrics::MetricsCollector;
use futures_util::future::join_all;
use tracing::{info, warn};

/// Collectors registered at startup, immutable while serving
#[derive(Debug, Default)]
pub struct CollectorRegistry {
    collectors: Vec<GatewayCollector>,
}

impl CollectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, collector: GatewayCollector) {
        info!("Registered collector for gateway {}", collector.gateway());
        self.collectors.push(collector);
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    /// Collect from every gateway into a fresh set of metric families
    ///
    /// Per-gateway failures are logged and reported through `deconz_up`; only
    /// failures building the metric families themselves are returned. A uid is
    /// kept once per family across all gateways, in registration order.
    pub async fn scrape<S>(&self, source: &S) -> anyhow::Result<MetricsCollector>
    where
        S: SensorSource + Sync,
    {
        let mut metrics = MetricsCollector::new()?;

        let outcomes = join_all(
            self.collectors
                .iter()
                .map(|collector| collect_gateway(collector, source)),
        )
        .await;

        let mut failed = 0;
        for (gateway, outcome) in outcomes {
            let status = record_outcome(&gateway.id, outcome, |samples| {
                for sample in &samples {
                    if !metrics.record(sample) {
                        warn!(
                            "{}: {} uid {} already reported by another gateway, dropped",
                            gateway.id,
                            sample.metric_name(),
                            sample.labels.uid
                        );
                    }
                }
            });
            metrics.set_gateway_up(&gateway.id, status == CollectionStatus::Success);
            if status == CollectionStatus::Failed {
                failed += 1;
            }
        }

        info!(
            "Scraped {} gateway(s), {} failed, {} sample(s)",
            self.collectors.len(),
            failed,
            metrics.sample_count()
        );
        Ok(metrics)
    }
}

async fn collect_gateway<'a, S: SensorSource>(
    collector: &'a GatewayCollector,
    source: &'a S,
) -> (&'a Gateway, Result<Vec<MetricSample>>) {
    (collector.gateway(), collector.collect(source).await)
}
