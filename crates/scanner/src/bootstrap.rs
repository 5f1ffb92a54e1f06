//! Wiring from configuration to a running engine.

use std::sync::Arc;
use tracing::info;

use triarb_core::config::TriArbConfig;
use triarb_core::prelude::*;
use triarb_exchange::{ExchangeManager, SimulatedExchange};
use triarb_graph::{Mashup, PathFinder, Tree};
use triarb_monitoring::MetricsCollector;
use triarb_strategy::ArbitrageEvaluator;

use crate::engine::ScanEngine;
use crate::fetcher::VertexFetcher;

/// Registers one simulated venue per enabled config section.
pub async fn simulated_exchanges(config: &TriArbConfig) -> Result<Arc<ExchangeManager>> {
    let manager = Arc::new(ExchangeManager::new(config.scanner.fetch_timeout()));

    for (venue, venue_config) in config.enabled_venues() {
        let exchange = SimulatedExchange::from_config(venue, venue_config)?;
        manager
            .add_adapter(Arc::new(exchange), venue_config.request_delay())
            .await;
    }

    Ok(manager)
}

/// Loads every venue's settings, merges them into the mashup and enumerates the cycles
/// through the configured base currency.
pub async fn build_tree(config: &TriArbConfig, exchanges: &ExchangeManager) -> Result<Tree> {
    let settings = exchanges.load_all_settings().await?;
    let mashup = Mashup::build(&settings)?;

    info!(
        "Mashup: {} currencies, {} edges across {} venues",
        mashup.currencies().count(),
        mashup.edge_count(),
        settings.len()
    );

    PathFinder::build_tree(&mashup, &config.scanner.base_currency(), config.scanner.depth)
}

pub async fn build_engine(
    config: &TriArbConfig,
    exchanges: Arc<ExchangeManager>,
    metrics: Option<Arc<MetricsCollector>>,
) -> Result<ScanEngine> {
    let tree = build_tree(config, &exchanges).await?;
    let strategy = ArbitrageEvaluator::new(config.scanner.min_performance);

    let mut fetcher = VertexFetcher::new(exchanges);
    if let Some(metrics) = &metrics {
        fetcher = fetcher.with_metrics(Arc::clone(metrics));
    }

    let engine = ScanEngine::new(tree, fetcher, Box::new(strategy), config.scanner.generation_delay());
    Ok(match metrics {
        Some(metrics) => engine.with_metrics(metrics),
        None => engine,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_development_config_bootstraps() {
        let config = TriArbConfig::development();
        let exchanges = simulated_exchanges(&config).await.unwrap();
        assert_eq!(exchanges.venues().await, vec![VenueId::Kraken, VenueId::Liqui]);

        let mut engine = build_engine(&config, exchanges, None).await.unwrap();
        assert!(engine.tree().cycle_count() > 0);

        let report = engine.run_generation().await;
        assert_eq!(report.failed, 0);
        assert!(report.completed_paths > 0);
    }

    #[tokio::test]
    async fn test_unknown_base_currency() {
        let mut config = TriArbConfig::development();
        config.scanner.base_currency = "DOGE".to_string();

        let exchanges = simulated_exchanges(&config).await.unwrap();
        let result = build_tree(&config, &exchanges).await;
        assert!(matches!(result, Err(TriArbError::UnknownCurrency(_))));
    }

    #[tokio::test]
    async fn test_disabled_venue_not_registered() {
        let mut config = TriArbConfig::development();
        if let Some(liqui) = config.venues.get_mut("liqui") {
            liqui.enabled = false;
        }

        let exchanges = simulated_exchanges(&config).await.unwrap();
        assert_eq!(exchanges.venues().await, vec![VenueId::Kraken]);
    }
}
