use rust_decimal::prelude::ToPrimitive;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use triarb_core::prelude::*;
use triarb_graph::Tree;
use triarb_monitoring::{MetricsCollector, StructuredLogger};
use triarb_strategy::{Chain, Strategy};

use crate::fetcher::VertexFetcher;

#[derive(Debug, Clone, Default)]
pub struct GenerationReport {
    pub generation: u64,
    /// Vertices a quote was requested for.
    pub requested: usize,
    pub quoted: usize,
    pub failed: usize,
    /// Level entries left unrequested because every prefix reaching them was unquoted.
    pub skipped: usize,
    pub completed_paths: usize,
    /// Profitable chains, best expected gain first.
    pub chains: Vec<Chain>,
    pub duration: Duration,
}

impl GenerationReport {
    pub fn best(&self) -> Option<&Chain> {
        self.chains.first()
    }
}

#[derive(Debug, Clone)]
pub enum ScanEvent {
    Opportunity(Chain),
    GenerationCompleted(GenerationReport),
}

/// Drives the traversal tree forever: one generation per tick, levels in order, each
/// level's quotes published before the next level is scheduled.
pub struct ScanEngine {
    tree: Tree,
    fetcher: VertexFetcher,
    strategy: Box<dyn Strategy>,
    generation_delay: Duration,
    generation: u64,
    metrics: Option<Arc<MetricsCollector>>,
    events: Option<mpsc::UnboundedSender<ScanEvent>>,
    logger: StructuredLogger,
}

impl ScanEngine {
    pub fn new(tree: Tree, fetcher: VertexFetcher, strategy: Box<dyn Strategy>, generation_delay: Duration) -> Self {
        Self {
            tree,
            fetcher,
            strategy,
            generation_delay,
            generation: 0,
            metrics: None,
            events: None,
            logger: StructuredLogger::new("scanner"),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        metrics.record_tree(self.tree.cycle_count(), self.tree.vertex_count());
        self.metrics = Some(metrics);
        self
    }

    /// Opportunities are streamed on `events` as soon as the level that completes them
    /// has been quoted.
    pub fn with_events(mut self, events: mpsc::UnboundedSender<ScanEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub async fn run_generation(&mut self) -> GenerationReport {
        let started = Instant::now();
        self.generation += 1;
        self.tree.reset_quotes();

        let mut report = GenerationReport {
            generation: self.generation,
            ..GenerationReport::default()
        };
        let mut resolved = HashSet::new();

        // Quotes are published between levels, so the walk works on a snapshot.
        let mut levels = Vec::new();
        self.tree
            .depth_traversing(|_, vertices| levels.push(vertices.to_vec()));

        for (level, vertices) in levels.iter().enumerate() {
            let pending = self.tree.pending_vertices(level, &resolved);
            report.skipped += vertices
                .iter()
                .filter(|vertex| !resolved.contains(*vertex) && !pending.contains(*vertex))
                .count();

            if !pending.is_empty() {
                let quotes = self.fetcher.fetch_vertices(&self.tree, &pending).await;
                report.requested += pending.len();

                for quote in quotes {
                    if quote.is_quoted() {
                        report.quoted += 1;
                    } else {
                        report.failed += 1;
                    }
                    self.tree.set_quote(quote.vertex, quote.order);
                }
                resolved.extend(pending);
            }

            let paths = self.tree.completed_paths(level);
            debug!(
                "Generation {} level {}: {} completed paths",
                self.generation,
                level,
                paths.len()
            );
            report.completed_paths += paths.len();

            for chain in self.strategy.run(&paths) {
                self.logger.log_opportunity(
                    &chain.row(),
                    chain.performance().to_f64().unwrap_or_default(),
                    chain.volume_to_engage().to_f64().unwrap_or_default(),
                );
                self.emit(ScanEvent::Opportunity(chain.clone()));
                report.chains.push(chain);
            }
        }

        report
            .chains
            .sort_by(|a, b| b.expected_gain().cmp(&a.expected_gain()));
        report.duration = started.elapsed();

        if let Some(metrics) = &self.metrics {
            metrics.record_generation(
                report.duration.as_secs_f64(),
                report.completed_paths,
                report.chains.len(),
                report.best().and_then(|chain| chain.performance().to_f64()),
            );
        }
        self.logger.log_generation(
            report.generation,
            report.quoted,
            report.failed,
            report.completed_paths,
            report.chains.len(),
            report.duration.as_millis(),
        );
        self.emit(ScanEvent::GenerationCompleted(report.clone()));

        report
    }

    /// Runs generations until `shutdown` flips to true or its sender goes away. The delay
    /// is measured from the end of one generation to the start of the next.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(
            "Scan engine started: {} cycles over {} vertices, strategy {}, delay {:?}",
            self.tree.cycle_count(),
            self.tree.vertex_count(),
            self.strategy.name(),
            self.generation_delay
        );

        let mut ticker = interval(self.generation_delay.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        warn!("Shutdown channel closed");
                        break;
                    }
                    continue;
                }
                _ = ticker.tick() => {}
            }

            self.run_generation().await;
            ticker.reset();
        }

        info!("Scan engine stopped after {} generations", self.generation);
        Ok(())
    }

    fn emit(&self, event: ScanEvent) {
        if let Some(events) = &self.events {
            if events.send(event).is_err() {
                debug!("Scan event receiver dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use triarb_exchange::{ExchangeManager, SimulatedExchange};
    use triarb_graph::{Mashup, PathFinder, VertexKey};
    use triarb_strategy::ArbitrageEvaluator;

    /// Kraken quotes a profitable BTC -> ETH -> USDT -> BTC triangle; liqui quotes
    /// an ETH/BTC book that closes a cross-venue round trip.
    async fn setup() -> (ScanEngine, Arc<SimulatedExchange>, Arc<SimulatedExchange>) {
        let mut kraken = SimulatedExchange::new(VenueId::Kraken);
        kraken.set_quote(
            CurrencyPair::new("ETH", "BTC"),
            Some((dec!(0.049), dec!(10))),
            Some((dec!(0.05), dec!(10))),
        );
        kraken.set_quote(
            CurrencyPair::new("ETH", "USDT"),
            Some((dec!(2000), dec!(4))),
            Some((dec!(2010), dec!(4))),
        );
        kraken.set_quote(
            CurrencyPair::new("BTC", "USDT"),
            Some((dec!(9400), dec!(1))),
            Some((dec!(9500), dec!(1))),
        );
        let kraken = Arc::new(kraken);

        let mut liqui = SimulatedExchange::new(VenueId::Liqui);
        liqui.set_quote(
            CurrencyPair::new("ETH", "BTC"),
            Some((dec!(0.06), dec!(3))),
            Some((dec!(0.061), dec!(3))),
        );
        let liqui = Arc::new(liqui);

        let manager = Arc::new(ExchangeManager::new(Duration::from_secs(1)));
        manager.add_adapter(kraken.clone(), Duration::ZERO).await;
        manager.add_adapter(liqui.clone(), Duration::ZERO).await;

        let settings = manager.load_all_settings().await.unwrap();
        let mashup = Mashup::build(&settings).unwrap();
        let tree = PathFinder::build_tree(&mashup, &Currency::new("BTC"), 3).unwrap();

        let engine = ScanEngine::new(
            tree,
            VertexFetcher::new(manager),
            Box::new(ArbitrageEvaluator::default()),
            Duration::from_millis(10),
        );
        (engine, kraken, liqui)
    }

    fn touches(chain: &Chain, venue: &VenueId) -> bool {
        chain.path().hops().iter().any(|hop| hop.key.venue == *venue)
    }

    #[tokio::test]
    async fn test_generation_finds_opportunities() {
        let (mut engine, _, _) = setup().await;
        let report = engine.run_generation().await;

        assert_eq!(report.generation, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.requested, engine.tree().vertex_count());
        assert!(report.completed_paths > 0);
        assert!(!report.chains.is_empty());
        assert!(report.chains.iter().all(|chain| chain.performance() > Decimal::ZERO));
        assert!(report.chains.iter().any(|chain| touches(chain, &VenueId::Liqui)));
        assert!(report
            .chains
            .windows(2)
            .all(|pair| pair[0].expected_gain() >= pair[1].expected_gain()));
    }

    #[tokio::test]
    async fn test_failing_venue_drops_only_its_cycles() {
        let (mut healthy, _, _) = setup().await;
        let healthy_report = healthy.run_generation().await;

        let (mut degraded, _, liqui) = setup().await;
        liqui.fail_pair(CurrencyPair::new("ETH", "BTC")).await;
        let report = degraded.run_generation().await;

        assert!(report.failed > 0);
        assert!(report.chains.iter().all(|chain| !touches(chain, &VenueId::Liqui)));

        let expected: HashSet<String> = healthy_report
            .chains
            .iter()
            .filter(|chain| !touches(chain, &VenueId::Liqui))
            .map(|chain| chain.path().to_string())
            .collect();
        let actual: HashSet<String> = report.chains.iter().map(|chain| chain.path().to_string()).collect();
        assert_eq!(actual, expected);
        assert!(!actual.is_empty());
    }

    #[tokio::test]
    async fn test_vertices_below_failed_prefix_are_skipped() {
        let (mut engine, kraken, liqui) = setup().await;
        kraken.fail_pair(CurrencyPair::new("ETH", "BTC")).await;
        liqui.fail_pair(CurrencyPair::new("ETH", "BTC")).await;
        let report = engine.run_generation().await;

        // Both ways into ETH fail at the first level, so the three ETH-origin vertices of
        // the second level are never requested there. The ETH/BTC bids are still reached
        // through USDT at the third level.
        assert_eq!(report.skipped, 3);
        assert_eq!(report.requested, 7);
        assert!(report.chains.is_empty());

        let eth_usdt_bid = VertexKey::new(VenueId::Kraken, CurrencyPair::new("ETH", "USDT"), Side::Bid);
        let id = engine.tree().vertex_id(&eth_usdt_bid).unwrap();
        assert!(!engine.tree().is_quoted(id));
    }

    #[tokio::test]
    async fn test_vertex_fetched_once_per_generation() {
        let (mut engine, _, liqui) = setup().await;

        // Liqui ETH/BTC ask sits on the first level and its bid on the second and third;
        // the bid is not requested again once resolved.
        engine.run_generation().await;
        assert_eq!(liqui.requests().await.len(), 2);

        engine.run_generation().await;
        assert_eq!(liqui.requests().await.len(), 4);
        assert_eq!(engine.generation(), 2);
    }

    #[tokio::test]
    async fn test_quotes_reset_between_generations() {
        let (mut engine, _, liqui) = setup().await;
        let first = engine.run_generation().await;
        assert!(first.chains.iter().any(|chain| touches(chain, &VenueId::Liqui)));

        liqui.fail_pair(CurrencyPair::new("ETH", "BTC")).await;
        let second = engine.run_generation().await;
        assert!(second.chains.iter().all(|chain| !touches(chain, &VenueId::Liqui)));

        liqui.restore_pair(&CurrencyPair::new("ETH", "BTC")).await;
        let third = engine.run_generation().await;
        assert_eq!(third.failed, 0);
        assert!(third.chains.iter().any(|chain| touches(chain, &VenueId::Liqui)));
    }

    #[tokio::test]
    async fn test_events_are_streamed() {
        let (engine, _, _) = setup().await;
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let mut engine = engine.with_events(sender);

        let report = engine.run_generation().await;

        let mut opportunities = 0;
        let mut completed = 0;
        while let Ok(event) = receiver.try_recv() {
            match event {
                ScanEvent::Opportunity(_) => opportunities += 1,
                ScanEvent::GenerationCompleted(summary) => {
                    completed += 1;
                    assert_eq!(summary.generation, report.generation);
                }
            }
        }
        assert_eq!(opportunities, report.chains.len());
        assert_eq!(completed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let (engine, _, _) = setup().await;
        let metrics = Arc::new(MetricsCollector::new().unwrap());
        let mut engine = engine.with_metrics(metrics.clone());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            engine.run(shutdown_rx).await.unwrap();
            engine.generation()
        });

        tokio::time::sleep(Duration::from_millis(35)).await;
        shutdown_tx.send(true).unwrap();

        let generations = handle.await.unwrap();
        assert!(generations >= 2);
        assert_eq!(metrics.generations_total.get(), generations);
    }
}
