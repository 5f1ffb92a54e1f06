use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};
use triarb_core::config::{MarketConfig, VenueConfig};
use triarb_core::{
    CurrencyPair, Order, Orderbook, PairSettings, Result, Side, TriArbError, VenueId,
    VenueSettings, DEFAULT_FEE_RATE,
};

use crate::normalizer::{
    normalize_price_precision, normalize_quantity_precision, DefaultPairNormalizer, PairFormat, PairNormalizer,
};
use crate::traits::ExchangeAdapter;

#[derive(Debug, Clone)]
struct SimulatedMarket {
    bid: Option<(Decimal, Decimal)>,
    ask: Option<(Decimal, Decimal)>,
}

/// Paper venue serving configured top-of-book quotes. Lets the scanner run end to end
/// without network access, and lets tests inject failures per pair.
#[derive(Debug)]
pub struct SimulatedExchange {
    venue: VenueId,
    settings: VenueSettings,
    markets: RwLock<HashMap<CurrencyPair, SimulatedMarket>>,
    failing_pairs: RwLock<HashSet<CurrencyPair>>,
    requests: RwLock<Vec<(CurrencyPair, Instant)>>,
}

impl SimulatedExchange {
    pub fn new(venue: VenueId) -> Self {
        Self {
            settings: VenueSettings::new(venue.clone(), Vec::new()),
            venue,
            markets: RwLock::new(HashMap::new()),
            failing_pairs: RwLock::new(HashSet::new()),
            requests: RwLock::new(Vec::new()),
        }
    }

    /// Builds the venue from its config section. Market names follow the venue's own
    /// orientation; when `normalized_pairs` is false they are listed quote-first.
    pub fn from_config(venue: VenueId, config: &VenueConfig) -> Result<Self> {
        let normalizer = DefaultPairNormalizer::new(PairFormat::Slash).quote_first(!config.normalized_pairs);

        let mut settings = VenueSettings::new(venue.clone(), Vec::new());
        settings.fee_rate = config.fee_rate.unwrap_or(DEFAULT_FEE_RATE);
        settings.normalized_pairs = config.normalized_pairs;
        settings.credentials = config.credentials.clone();

        let mut markets = HashMap::new();
        for market in &config.markets {
            let reported = DefaultPairNormalizer::parse_pair_from_string(&market.pair).map_err(|_| {
                TriArbError::UnknownPair {
                    venue: venue.clone(),
                    pair: market.pair.clone(),
                }
            })?;
            let canonical = normalizer.normalize_pair(&market.pair)?;

            if let Some(decimal_places) = market.decimal_places {
                settings.pair_settings.insert(
                    canonical.clone(),
                    PairSettings {
                        decimal_places,
                        ..PairSettings::default()
                    },
                );
            }

            settings.available_pairs.push(reported);
            markets.insert(canonical, SimulatedMarket::from(market));
        }

        info!(
            "Simulated venue {} serving {} markets",
            venue,
            settings.available_pairs.len()
        );

        Ok(Self {
            venue,
            settings,
            markets: RwLock::new(markets),
            failing_pairs: RwLock::new(HashSet::new()),
            requests: RwLock::new(Vec::new()),
        })
    }

    pub fn with_fee_rate(mut self, fee_rate: Decimal) -> Self {
        self.settings.fee_rate = fee_rate;
        self
    }

    /// Adds or replaces a market, given in canonical orientation.
    pub fn set_quote(
        &mut self,
        pair: CurrencyPair,
        bid: Option<(Decimal, Decimal)>,
        ask: Option<(Decimal, Decimal)>,
    ) {
        if !self.settings.available_pairs.contains(&pair) {
            let reported = if self.settings.normalized_pairs { pair.clone() } else { pair.inverted() };
            self.settings.available_pairs.push(reported);
        }
        self.markets.get_mut().insert(pair, SimulatedMarket { bid, ask });
    }

    pub async fn fail_pair(&self, pair: CurrencyPair) {
        self.failing_pairs.write().await.insert(pair);
    }

    pub async fn restore_pair(&self, pair: &CurrencyPair) {
        self.failing_pairs.write().await.remove(pair);
    }

    /// Every orderbook request received so far with the instant it arrived.
    pub async fn requests(&self) -> Vec<(CurrencyPair, Instant)> {
        self.requests.read().await.clone()
    }

    fn build_order(&self, pair: &CurrencyPair, side: Side, quote: (Decimal, Decimal)) -> Result<Order> {
        let (price, volume) = quote;
        let price = normalize_price_precision(price, self.settings.pair_settings(pair).decimal_places);
        Ok(Order::new(pair.clone(), side, price, volume)?.with_fee_rate(self.settings.fee_rate))
    }
}

impl From<&MarketConfig> for SimulatedMarket {
    fn from(market: &MarketConfig) -> Self {
        Self {
            bid: market.bid.map(|price| (price, market.bid_volume)),
            ask: market.ask.map(|price| (price, market.ask_volume)),
        }
    }
}

#[async_trait]
impl ExchangeAdapter for SimulatedExchange {
    fn venue_id(&self) -> VenueId {
        self.venue.clone()
    }

    async fn get_settings(&self) -> Result<VenueSettings> {
        Ok(self.settings.clone())
    }

    async fn get_orderbook(&self, pair: &CurrencyPair) -> Result<Orderbook> {
        let started_at = Utc::now();
        self.requests.write().await.push((pair.clone(), Instant::now()));

        if self.failing_pairs.read().await.contains(pair) {
            return Err(TriArbError::Exchange(format!("{} unavailable on {}", pair, self.venue)));
        }

        let market = self
            .markets
            .read()
            .await
            .get(pair)
            .cloned()
            .ok_or_else(|| TriArbError::UnknownPair {
                venue: self.venue.clone(),
                pair: pair.to_string(),
            })?;

        let best_bid = market
            .bid
            .map(|quote| self.build_order(pair, Side::Bid, quote))
            .transpose()?;
        let best_ask = market
            .ask
            .map(|quote| self.build_order(pair, Side::Ask, quote))
            .transpose()?;

        debug!("{} served {} (bid: {}, ask: {})", self.venue, pair, best_bid.is_some(), best_ask.is_some());

        Ok(Orderbook::new(pair.clone(), best_bid, best_ask).with_timing(started_at, Utc::now()))
    }

    async fn post_order(&self, order: &Order, settings: &VenueSettings) -> Result<Order> {
        if !self.markets.read().await.contains_key(order.pair()) {
            return Err(TriArbError::UnknownPair {
                venue: self.venue.clone(),
                pair: order.pair().to_string(),
            });
        }

        let pair_settings = settings.pair_settings(order.pair());
        let amount = normalize_quantity_precision(order.base_volume(), pair_settings.decimal_places);
        if amount < pair_settings.min_amount {
            return Err(TriArbError::Exchange(format!(
                "Order amount {} below minimum {} for {}",
                amount, pair_settings.min_amount, order.pair()
            )));
        }

        let mut confirmed = order.clone();
        confirmed.update_base_volume(amount)?;
        info!("{} confirmed paper order {}", self.venue, confirmed);
        Ok(confirmed)
    }
}
