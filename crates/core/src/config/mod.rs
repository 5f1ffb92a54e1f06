use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, TriArbError};
use crate::types::{Currency, VenueCredentials, VenueId};
use crate::utils::validation::{validate_currency, validate_fee_rate};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriArbConfig {
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub venues: BTreeMap<String, VenueConfig>,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    pub base_currency: String,
    #[serde(default = "default_depth")]
    pub depth: usize,
    #[serde(default = "default_generation_delay_ms")]
    pub generation_delay_ms: u64,
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
    #[serde(default)]
    pub min_performance: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
    pub fee_rate: Option<Decimal>,
    #[serde(default = "default_true")]
    pub normalized_pairs: bool,
    pub credentials: Option<VenueCredentials>,
    /// Markets served by the simulated venue.
    #[serde(default)]
    pub markets: Vec<MarketConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    pub pair: String,
    pub bid: Option<Decimal>,
    #[serde(default)]
    pub bid_volume: Decimal,
    pub ask: Option<Decimal>,
    #[serde(default)]
    pub ask_volume: Decimal,
    pub decimal_places: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub log_level: String,
    pub log_file: Option<String>,
    pub enable_json_logs: bool,
    pub metrics_port: Option<u16>,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: None,
            enable_json_logs: false,
            metrics_port: None,
        }
    }
}

fn default_depth() -> usize {
    3
}

fn default_generation_delay_ms() -> u64 {
    2000
}

fn default_fetch_timeout_ms() -> u64 {
    5000
}

fn default_request_delay_ms() -> u64 {
    100
}

fn default_true() -> bool {
    true
}

impl ScannerConfig {
    pub fn base_currency(&self) -> Currency {
        Currency::new(&self.base_currency)
    }

    pub fn generation_delay(&self) -> Duration {
        Duration::from_millis(self.generation_delay_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

impl VenueConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

impl TriArbConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::result::Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("TRIARB").separator("__"))
            .build()?;

        settings.try_deserialize()
    }

    /// Enabled venues with their identifiers, in a stable order.
    pub fn enabled_venues(&self) -> impl Iterator<Item = (VenueId, &VenueConfig)> {
        self.venues
            .iter()
            .filter(|(_, venue)| venue.enabled)
            .map(|(name, venue)| (VenueId::from(name.as_str()), venue))
    }

    pub fn validate(&self) -> Result<()> {
        validate_currency(&self.scanner.base_currency())?;

        if self.scanner.depth < 2 {
            return Err(TriArbError::InvalidData(format!(
                "Traversal depth must be at least 2, got {}",
                self.scanner.depth
            )));
        }

        for (name, venue) in &self.venues {
            if let Some(fee_rate) = venue.fee_rate {
                validate_fee_rate(fee_rate)
                    .map_err(|e| TriArbError::InvalidData(format!("venue {}: {}", name, e)))?;
            }
        }

        if self.enabled_venues().next().is_none() {
            return Err(TriArbError::InvalidData("No venue enabled".to_string()));
        }

        Ok(())
    }

    /// Two simulated venues quoting a handful of BTC/ETH/USDT/LTC markets.
    pub fn development() -> Self {
        let mut venues = BTreeMap::new();

        venues.insert(
            "kraken".to_string(),
            VenueConfig {
                enabled: true,
                request_delay_ms: 100,
                fee_rate: None,
                normalized_pairs: true,
                credentials: None,
                markets: vec![
                    MarketConfig::quoted("ETH/BTC", 0.0498, 12.0, 0.0500, 10.0),
                    MarketConfig::quoted("ETH/USDT", 2000.0, 8.0, 2004.0, 9.0),
                    MarketConfig::quoted("BTC/USDT", 39900.0, 1.5, 40000.0, 2.0),
                ],
            },
        );

        venues.insert(
            "liqui".to_string(),
            VenueConfig {
                enabled: true,
                request_delay_ms: 100,
                fee_rate: None,
                normalized_pairs: true,
                credentials: None,
                markets: vec![
                    MarketConfig::quoted("LTC/BTC", 0.0041, 150.0, 0.0042, 120.0),
                    MarketConfig::quoted("LTC/USDT", 172.0, 60.0, 173.0, 40.0),
                    MarketConfig::quoted("ETH/BTC", 0.0502, 6.0, 0.0505, 7.0),
                ],
            },
        );

        Self {
            scanner: ScannerConfig {
                base_currency: "BTC".to_string(),
                depth: default_depth(),
                generation_delay_ms: default_generation_delay_ms(),
                fetch_timeout_ms: default_fetch_timeout_ms(),
                min_performance: Decimal::ZERO,
            },
            venues,
            monitoring: MonitoringConfig::default(),
        }
    }
}

impl MarketConfig {
    fn quoted(pair: &str, bid: f64, bid_volume: f64, ask: f64, ask_volume: f64) -> Self {
        let to_decimal = |v: f64| Decimal::try_from(v).unwrap_or_default();
        Self {
            pair: pair.to_string(),
            bid: Some(to_decimal(bid)),
            bid_volume: to_decimal(bid_volume),
            ask: Some(to_decimal(ask)),
            ask_volume: to_decimal(ask_volume),
            decimal_places: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_development_config_is_valid() {
        let config = TriArbConfig::development();
        assert!(config.validate().is_ok());
        assert_eq!(config.enabled_venues().count(), 2);
        assert_eq!(config.scanner.base_currency(), Currency::new("BTC"));
    }

    #[test]
    fn test_shallow_depth_rejected() {
        let mut config = TriArbConfig::development();
        config.scanner.depth = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[scanner]
base_currency = "eth"
depth = 4

[venues.kraken]
request_delay_ms = 250
fee_rate = 0.001

[[venues.kraken.markets]]
pair = "ETH/BTC"
bid = 0.05
bid_volume = 3.0
"#
        )
        .unwrap();

        let config = TriArbConfig::from_file(file.path()).unwrap();
        assert_eq!(config.scanner.base_currency(), Currency::new("ETH"));
        assert_eq!(config.scanner.depth, 4);
        assert_eq!(config.scanner.generation_delay_ms, 2000);

        let (venue_id, venue) = config.enabled_venues().next().unwrap();
        assert_eq!(venue_id, VenueId::Kraken);
        assert_eq!(venue.request_delay(), Duration::from_millis(250));
        assert_eq!(venue.markets.len(), 1);
        assert!(venue.markets[0].ask.is_none());
        assert!(config.validate().is_ok());
    }
}
