//! `/metrics` endpoint in the Prometheus text exposition format.

use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, HeaderName},
    routing::get,
    Router,
};
use feeder_engine::{FeederMetrics, ShutdownSignal};
use prometheus::{Encoder, TextEncoder};
use std::net::SocketAddr;
use std::sync::Arc;

async fn metrics_handler(
    State(metrics): State<Arc<FeederMetrics>>,
) -> ([(HeaderName, String); 1], Vec<u8>) {
    let encoder = TextEncoder::new();
    let mut buf = Vec::new();
    if let Err(e) = encoder.encode(&metrics.registry.gather(), &mut buf) {
        tracing::error!(error = %e, "failed to encode prometheus metrics");
    }
    ([(CONTENT_TYPE, encoder.format_type().to_string())], buf)
}

async fn healthz_handler() -> &'static str {
    "OK"
}

pub fn router(metrics: Arc<FeederMetrics>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(healthz_handler))
        .with_state(metrics)
}

/// Serve metrics on `0.0.0.0:port` until shutdown.
pub async fn serve(port: u16, metrics: Arc<FeederMetrics>, shutdown: ShutdownSignal) {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(%addr, error = %e, "failed to bind metrics server");
            return;
        }
    };
    tracing::info!(%addr, "metrics endpoint listening");

    let graceful = axum::serve(listener, router(metrics).into_make_service())
        .with_graceful_shutdown(async move { shutdown.cancelled().await });
    if let Err(e) = graceful.await {
        tracing::error!(error = %e, "metrics server error");
    }
}
