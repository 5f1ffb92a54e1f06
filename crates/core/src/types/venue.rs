use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::{CurrencyPair, DEFAULT_FEE_RATE};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VenueId {
    Binance,
    Bittrex,
    Coinbase,
    Kraken,
    Liqui,
    Custom(String),
}

impl fmt::Display for VenueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VenueId::Binance => write!(f, "binance"),
            VenueId::Bittrex => write!(f, "bittrex"),
            VenueId::Coinbase => write!(f, "coinbase"),
            VenueId::Kraken => write!(f, "kraken"),
            VenueId::Liqui => write!(f, "liqui"),
            VenueId::Custom(name) => write!(f, "{}", name),
        }
    }
}

impl From<&str> for VenueId {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "binance" => VenueId::Binance,
            "bittrex" => VenueId::Bittrex,
            "coinbase" => VenueId::Coinbase,
            "kraken" => VenueId::Kraken,
            "liqui" => VenueId::Liqui,
            name => VenueId::Custom(name.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairSettings {
    pub decimal_places: u32,
    pub min_amount: Decimal,
}

impl Default for PairSettings {
    fn default() -> Self {
        Self {
            decimal_places: 8,
            min_amount: Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueCredentials {
    pub api_key: String,
    pub secret_key: String,
    pub passphrase: Option<String>,
}

/// Static, read-only metadata describing one venue. Passed explicitly to whoever needs it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueSettings {
    pub venue: VenueId,
    /// Pairs exactly as the venue reports them.
    pub available_pairs: Vec<CurrencyPair>,
    pub pair_settings: HashMap<CurrencyPair, PairSettings>,
    pub fee_rate: Decimal,
    /// When false the venue lists markets quote-first and they must be re-ordered.
    pub normalized_pairs: bool,
    pub credentials: Option<VenueCredentials>,
}

impl VenueSettings {
    pub fn new(venue: VenueId, available_pairs: Vec<CurrencyPair>) -> Self {
        Self {
            venue,
            available_pairs,
            pair_settings: HashMap::new(),
            fee_rate: DEFAULT_FEE_RATE,
            normalized_pairs: true,
            credentials: None,
        }
    }

    /// Reported pairs in canonical `BASE/QUOTE` orientation.
    pub fn canonical_pairs(&self) -> impl Iterator<Item = CurrencyPair> + '_ {
        self.available_pairs.iter().map(move |pair| {
            if self.normalized_pairs {
                pair.clone()
            } else {
                pair.inverted()
            }
        })
    }

    pub fn pair_settings(&self, pair: &CurrencyPair) -> PairSettings {
        self.pair_settings.get(pair).cloned().unwrap_or_default()
    }
}
