use std::sync::Arc;
use tracing::info;

use triarb_core::config::MonitoringConfig;
use triarb_core::prelude::*;

pub mod metrics;
pub mod logging;

pub use metrics::{MetricsCollector, MetricsServer};
pub use logging::{setup_logging, LoggingGuard, StructuredLogger};

/// Metrics registry plus the optional `/metrics` endpoint serving it.
pub struct MonitoringSystem {
    config: MonitoringConfig,
    metrics_collector: Arc<MetricsCollector>,
    metrics_server: Option<MetricsServer>,
}

impl MonitoringSystem {
    pub fn new(config: MonitoringConfig) -> Result<Self> {
        Ok(Self {
            config,
            metrics_collector: Arc::new(MetricsCollector::new()?),
            metrics_server: None,
        })
    }

    pub async fn start(&mut self) -> Result<()> {
        if let Some(port) = self.config.metrics_port {
            let mut server = MetricsServer::new(port, Arc::clone(&self.metrics_collector));
            server.start().await?;
            self.metrics_server = Some(server);
        } else {
            info!("Metrics endpoint disabled");
        }
        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(mut server) = self.metrics_server.take() {
            server.stop();
        }
    }

    pub fn get_metrics_collector(&self) -> Arc<MetricsCollector> {
        Arc::clone(&self.metrics_collector)
    }
}

pub mod prelude {
    pub use super::{
        MonitoringSystem, MetricsCollector, MetricsServer, StructuredLogger, LoggingGuard,
        setup_logging,
    };
}
