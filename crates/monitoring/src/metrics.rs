use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use prometheus::{
    Encoder, Gauge, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge,
    Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

use triarb_core::prelude::*;

const LATENCY_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

pub struct MetricsCollector {
    registry: Registry,

    // Scanner metrics
    pub generations_total: IntCounter,
    pub generation_duration: Histogram,
    pub completed_paths_total: IntCounter,
    pub opportunities_total: IntCounter,
    pub best_performance: Gauge,
    pub tree_cycles: IntGauge,
    pub tree_vertices: IntGauge,

    // Venue metrics
    pub quote_requests: IntCounterVec,
    pub quote_errors: IntCounterVec,
    pub quote_latency: HistogramVec,
}

fn internal(e: prometheus::Error) -> TriArbError {
    TriArbError::Internal(e.to_string())
}

impl MetricsCollector {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let generations_total = IntCounter::with_opts(Opts::new(
            "triarb_generations_total",
            "Total number of completed scan generations",
        ))
        .map_err(internal)?;

        let generation_duration = Histogram::with_opts(
            HistogramOpts::new(
                "triarb_generation_duration_seconds",
                "Wall time of one scan generation in seconds",
            )
            .buckets(LATENCY_BUCKETS.to_vec()),
        )
        .map_err(internal)?;

        let completed_paths_total = IntCounter::with_opts(Opts::new(
            "triarb_completed_paths_total",
            "Total number of fully quoted cycles handed to the evaluator",
        ))
        .map_err(internal)?;

        let opportunities_total = IntCounter::with_opts(Opts::new(
            "triarb_arbitrage_opportunities_total",
            "Total number of profitable chains detected",
        ))
        .map_err(internal)?;

        let best_performance = Gauge::with_opts(Opts::new(
            "triarb_best_performance",
            "Best chain performance of the last generation",
        ))
        .map_err(internal)?;

        let tree_cycles = IntGauge::with_opts(Opts::new(
            "triarb_tree_cycles",
            "Number of candidate cycles in the traversal tree",
        ))
        .map_err(internal)?;

        let tree_vertices = IntGauge::with_opts(Opts::new(
            "triarb_tree_vertices",
            "Number of distinct vertices quoted each generation",
        ))
        .map_err(internal)?;

        let quote_requests = IntCounterVec::new(
            Opts::new("triarb_quote_requests_total", "Total number of orderbook requests"),
            &["venue"],
        )
        .map_err(internal)?;

        let quote_errors = IntCounterVec::new(
            Opts::new("triarb_quote_errors_total", "Total number of failed orderbook requests"),
            &["venue", "kind"],
        )
        .map_err(internal)?;

        let quote_latency = HistogramVec::new(
            HistogramOpts::new(
                "triarb_quote_latency_seconds",
                "Orderbook request latency in seconds",
            )
            .buckets(LATENCY_BUCKETS.to_vec()),
            &["venue"],
        )
        .map_err(internal)?;

        registry.register(Box::new(generations_total.clone())).map_err(internal)?;
        registry.register(Box::new(generation_duration.clone())).map_err(internal)?;
        registry.register(Box::new(completed_paths_total.clone())).map_err(internal)?;
        registry.register(Box::new(opportunities_total.clone())).map_err(internal)?;
        registry.register(Box::new(best_performance.clone())).map_err(internal)?;
        registry.register(Box::new(tree_cycles.clone())).map_err(internal)?;
        registry.register(Box::new(tree_vertices.clone())).map_err(internal)?;
        registry.register(Box::new(quote_requests.clone())).map_err(internal)?;
        registry.register(Box::new(quote_errors.clone())).map_err(internal)?;
        registry.register(Box::new(quote_latency.clone())).map_err(internal)?;

        Ok(Self {
            registry,
            generations_total,
            generation_duration,
            completed_paths_total,
            opportunities_total,
            best_performance,
            tree_cycles,
            tree_vertices,
            quote_requests,
            quote_errors,
            quote_latency,
        })
    }

    pub fn record_tree(&self, cycles: usize, vertices: usize) {
        self.tree_cycles.set(cycles as i64);
        self.tree_vertices.set(vertices as i64);
    }

    pub fn record_quote_request(&self, venue: &str, latency_seconds: f64) {
        self.quote_requests.with_label_values(&[venue]).inc();
        self.quote_latency.with_label_values(&[venue]).observe(latency_seconds);
    }

    pub fn record_quote_error(&self, venue: &str, kind: &str) {
        self.quote_errors.with_label_values(&[venue, kind]).inc();
    }

    pub fn record_generation(&self, duration_seconds: f64, completed_paths: usize, opportunities: usize, best_performance: Option<f64>) {
        self.generations_total.inc();
        self.generation_duration.observe(duration_seconds);
        self.completed_paths_total.inc_by(completed_paths as u64);
        self.opportunities_total.inc_by(opportunities as u64);
        self.best_performance.set(best_performance.unwrap_or(0.0));
    }

    pub fn gather_metrics(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).map_err(internal)?;

        String::from_utf8(buffer).map_err(|e| TriArbError::Internal(e.to_string()))
    }
}

pub struct MetricsServer {
    port: u16,
    metrics_collector: Arc<MetricsCollector>,
    handle: Option<JoinHandle<()>>,
}

impl MetricsServer {
    pub fn new(port: u16, metrics_collector: Arc<MetricsCollector>) -> Self {
        Self {
            port,
            metrics_collector,
            handle: None,
        }
    }

    pub fn router(metrics_collector: Arc<MetricsCollector>) -> Router {
        Router::new()
            .route("/metrics", get(metrics_handler))
            .route("/health", get(health_handler))
            .with_state(metrics_collector)
    }

    pub async fn start(&mut self) -> Result<()> {
        let app = Self::router(Arc::clone(&self.metrics_collector));
        let listener = TcpListener::bind(("0.0.0.0", self.port)).await?;

        info!("Metrics server listening on port {}", self.port);

        self.handle = Some(tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("Metrics server error: {}", e);
            }
        }));

        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            info!("Metrics server stopped");
        }
    }
}

impl Drop for MetricsServer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn metrics_handler(
    State(metrics_collector): State<Arc<MetricsCollector>>,
) -> impl IntoResponse {
    match metrics_collector.gather_metrics() {
        Ok(metrics) => (StatusCode::OK, metrics),
        Err(e) => {
            error!("Failed to gather metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to gather metrics".to_string())
        }
    }
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
