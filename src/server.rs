//! HTTP Server
//!
//! Axum server exposing the scrape endpoint.
//!
//! # Endpoints
//!
//! - `GET /` - HTML landing page with links to metrics and health
//! - `GET /metrics` - Prometheus metrics in text format
//! - `GET /health` - 200 when at least one gateway is registered, 503 otherwise
//!
//! # Metrics Collection
//!
//! There is no background loop: every `GET /metrics` polls all registered gateways
//! and renders the result, so Prometheus' scrape interval is the polling interval.

use crate::collectors::{CollectorRegistry, SensorSource};
use crate::config::ServerConfig;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use tracing::{error, info};

struct AppState<S> {
    registry: CollectorRegistry,
    source: S,
}

/// Build the router serving `registry` with sensor data from `source`
pub fn router<S>(registry: CollectorRegistry, source: S) -> Router
where
    S: SensorSource + Send + Sync + 'static,
{
    let state = Arc::new(AppState { registry, source });

    Router::new()
        .route("/", get(root_handler))
        .route("/metrics", get(metrics_handler::<S>))
        .route("/health", get(health_handler::<S>))
        .with_state(state)
}

pub async fn start<S>(
    config: &ServerConfig,
    registry: CollectorRegistry,
    source: S,
) -> anyhow::Result<()>
where
    S: SensorSource + Send + Sync + 'static,
{
    let app = router(registry, source);

    let addr = format!("{}:{}", config.addr, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Metrics server listening on {}", addr);
    info!("Metrics available at http://{}/metrics", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn root_handler() -> impl IntoResponse {
    axum::response::Html(
        r#"<html>
<head><title>deCONZ Exporter</title></head>
<body>
<h1>deCONZ Prometheus Exporter</h1>
<p><a href="/metrics">Metrics</a></p>
<p><a href="/health">Health</a></p>
</body>
</html>"#,
    )
}

async fn metrics_handler<S>(State(state): State<Arc<AppState<S>>>) -> Response
where
    S: SensorSource + Send + Sync + 'static,
{
    let rendered = match state.registry.scrape(&state.source).await {
        Ok(metrics) => metrics.render(),
        Err(e) => Err(e),
    };

    match rendered {
        Ok(body) => (
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to render metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error rendering metrics: {}", e),
            )
                .into_response()
        }
    }
}

async fn health_handler<S>(State(state): State<Arc<AppState<S>>>) -> impl IntoResponse
where
    S: SensorSource + Send + Sync + 'static,
{
    if state.registry.is_empty() {
        (StatusCode::SERVICE_UNAVAILABLE, "No paired deCONZ gateways")
    } else {
        (StatusCode::OK, "OK")
    }
}
