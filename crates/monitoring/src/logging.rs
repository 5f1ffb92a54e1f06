use std::path::Path;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use triarb_core::config::MonitoringConfig;
use triarb_core::prelude::*;

/// Keeps the file appender's background writer alive; logs are flushed when dropped.
#[must_use]
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

pub fn setup_logging(config: &MonitoringConfig) -> Result<LoggingGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| TriArbError::Internal(format!("Invalid log level {}: {}", config.log_level, e)))?;

    let mut layers = Vec::new();

    // Console logging layer
    let console_layer = fmt::layer().with_target(true);
    if config.enable_json_logs {
        layers.push(console_layer.json().boxed());
    } else {
        layers.push(console_layer.boxed());
    }

    // File logging layer
    let mut file_guard = None;
    if let Some(log_file) = &config.log_file {
        let log_path = Path::new(log_file);
        let directory = log_path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(directory)?;

        let file_name = log_path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("triarb.log"));
        let (writer, guard) = non_blocking(rolling::daily(directory, file_name));
        file_guard = Some(guard);

        let file_layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);

        if config.enable_json_logs {
            layers.push(file_layer.json().boxed());
        } else {
            layers.push(file_layer.boxed());
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .map_err(|e| TriArbError::Internal(format!("Failed to install subscriber: {}", e)))?;

    info!("Logging initialized with level: {}", config.log_level);

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Emits the scanner's domain events as structured records.
pub struct StructuredLogger {
    component: String,
}

impl StructuredLogger {
    pub fn new(component: &str) -> Self {
        Self {
            component: component.to_string(),
        }
    }

    pub fn log_opportunity(&self, row: &[String], performance: f64, volume_to_engage: f64) {
        info!(
            component = %self.component,
            event = "arbitrage_opportunity",
            performance = %performance,
            volume_to_engage = %volume_to_engage,
            "{}",
            row.join(",")
        );
    }

    pub fn log_generation(&self, generation: u64, fetched: usize, failed: usize, paths: usize, chains: usize, duration_ms: u128) {
        info!(
            component = %self.component,
            event = "generation_completed",
            generation = %generation,
            fetched = %fetched,
            failed = %failed,
            paths = %paths,
            chains = %chains,
            duration_ms = %duration_ms,
            "Generation completed"
        );
    }

    pub fn log_quote_failure(&self, venue: &str, pair: &str, error: &str) {
        warn!(
            component = %self.component,
            event = "quote_failed",
            venue = %venue,
            pair = %pair,
            error = %error,
            "Quote unavailable for this generation"
        );
    }
}
