//! End-to-end scan test
//!
//! Loads a config file describing two simulated venues, builds the traversal tree and
//! runs the scanner:
//! 1. Venue settings are merged into one currency graph
//! 2. Every candidate cycle is quoted level by level
//! 3. Profitable chains are reported, including cross-venue ones

use std::io::Write;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

use triarb::config::TriArbConfig;
use triarb::*;

const CONFIG: &str = r#"
[scanner]
base_currency = "BTC"
depth = 3
generation_delay_ms = 20
fetch_timeout_ms = 1000

[venues.kraken]
request_delay_ms = 5

[[venues.kraken.markets]]
pair = "ETH/BTC"
bid = 0.049
bid_volume = 10.0
ask = 0.05
ask_volume = 10.0

[[venues.kraken.markets]]
pair = "ETH/USDT"
bid = 2000.0
bid_volume = 4.0
ask = 2010.0
ask_volume = 4.0

[[venues.kraken.markets]]
pair = "BTC/USDT"
bid = 9400.0
bid_volume = 1.0
ask = 9500.0
ask_volume = 1.0

[[venues.kraken.markets]]
pair = "LTC/USDT"
bid = 169.0
bid_volume = 50.0
ask = 170.0
ask_volume = 50.0

# Bittrex lists its markets quote-first.
[venues.bittrex]
request_delay_ms = 5
normalized_pairs = false

[[venues.bittrex.markets]]
pair = "BTC/LTC"
bid = 0.02
bid_volume = 40.0
ask = 0.021
ask_volume = 40.0
decimal_places = 4
"#;

fn load_config() -> TriArbConfig {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    write!(file, "{}", CONFIG).unwrap();
    let config = TriArbConfig::from_file(file.path()).unwrap();
    config.validate().unwrap();
    config
}

fn touches(chain: &Chain, venue: &VenueId) -> bool {
    chain.path().hops().iter().any(|hop| hop.key.venue == *venue)
}

#[tokio::test]
async fn test_end_to_end_generation() {
    let config = load_config();
    let exchanges = simulated_exchanges(&config).await.unwrap();
    assert_eq!(exchanges.venues().await, vec![VenueId::Bittrex, VenueId::Kraken]);

    let tree = build_tree(&config, &exchanges).await.unwrap();
    let description = tree.describe();
    assert!(description.contains("bittrex:LTC/BTC(bid)"));
    assert_eq!(description.lines().count(), tree.cycle_count() + 1);

    let mut engine = build_engine(&config, exchanges, None).await.unwrap();
    let report = engine.run_generation().await;

    assert_eq!(report.failed, 0);
    assert_eq!(report.requested, engine.tree().vertex_count());
    assert!(!report.chains.is_empty());
    assert!(report.chains.iter().all(|chain| chain.performance() > Decimal::ZERO));

    // BTC -> USDT -> LTC on kraken, back to BTC on bittrex.
    let cross_venue = report
        .chains
        .iter()
        .find(|chain| touches(chain, &VenueId::Bittrex))
        .expect("cross-venue chain");
    assert_eq!(cross_venue.path().len(), 3);
    assert!(cross_venue.volume_out() > cross_venue.volume_to_engage());

    let decoded: Chain = serde_json::from_str(&cross_venue.to_json().unwrap()).unwrap();
    assert_eq!(decoded.id(), cross_venue.id());
}

#[tokio::test]
async fn test_engine_runs_until_shutdown() {
    let config = load_config();
    let exchanges = simulated_exchanges(&config).await.unwrap();
    let metrics = std::sync::Arc::new(MetricsCollector::new().unwrap());

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let mut engine = build_engine(&config, exchanges, Some(metrics.clone()))
        .await
        .unwrap()
        .with_events(events_tx);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(async move { engine.run(shutdown_rx).await });

    let mut generations = Vec::new();
    let mut opportunities = 0;
    while generations.len() < 2 {
        match tokio::time::timeout(Duration::from_secs(5), events_rx.recv()).await {
            Ok(Some(ScanEvent::GenerationCompleted(report))) => generations.push(report.generation),
            Ok(Some(ScanEvent::Opportunity(_))) => opportunities += 1,
            other => panic!("unexpected event: {:?}", other.map(|e| e.is_some())),
        }
    }
    shutdown_tx.send(true).unwrap();
    handle.await.unwrap().unwrap();

    assert_eq!(generations, vec![1, 2]);
    assert!(opportunities > 0);
    assert!(metrics.generations_total.get() >= 2);
    assert!(metrics.gather_metrics().unwrap().contains("triarb_quote_requests_total{venue=\"bittrex\"}"));
}
