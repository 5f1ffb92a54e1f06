use rust_decimal::{Decimal, RoundingStrategy};
use triarb_core::{CurrencyPair, Result, TriArbError};

pub trait PairNormalizer: Send + Sync {
    fn normalize_pair(&self, exchange_pair: &str) -> Result<CurrencyPair>;
    fn denormalize_pair(&self, pair: &CurrencyPair) -> String;
}

/// Translates venue market names such as `eth_btc`, `BTC-LTC` or `ETHUSDT` into canonical pairs.
#[derive(Debug, Clone)]
pub struct DefaultPairNormalizer {
    format: PairFormat,
    /// Venue lists markets quote-first (`BTC-LTC` meaning LTC priced in BTC).
    quote_first: bool,
}

impl DefaultPairNormalizer {
    pub fn new(format: PairFormat) -> Self {
        Self {
            format,
            quote_first: false,
        }
    }

    pub fn quote_first(mut self, quote_first: bool) -> Self {
        self.quote_first = quote_first;
        self
    }

    pub fn parse_pair_from_string(pair_str: &str) -> Result<CurrencyPair> {
        for separator in &["/", "-", "_", ""] {
            if separator.is_empty() {
                // Concatenated markets: try common quote currencies
                let upper = pair_str.to_uppercase();
                for quote in &["USDT", "USDC", "USD", "EUR", "BTC", "ETH", "BNB"] {
                    if upper.ends_with(quote) && upper.len() > quote.len() {
                        let base = &upper[..upper.len() - quote.len()];
                        return Ok(CurrencyPair::new(base, *quote));
                    }
                }
            } else if let Some((base, quote)) = pair_str.split_once(separator) {
                if !base.is_empty() && !quote.is_empty() {
                    return Ok(CurrencyPair::new(base, quote));
                }
            }
        }

        Err(TriArbError::InvalidData(format!("Unable to parse pair: {}", pair_str)))
    }

    pub fn format_pair(pair: &CurrencyPair, format: PairFormat) -> String {
        match format {
            PairFormat::Slash => format!("{}/{}", pair.base, pair.quote),
            PairFormat::Dash => format!("{}-{}", pair.base, pair.quote),
            PairFormat::Underscore => format!("{}_{}", pair.base, pair.quote),
            PairFormat::Concatenated => format!("{}{}", pair.base, pair.quote),
            PairFormat::LowerUnderscore => {
                format!("{}_{}", pair.base, pair.quote).to_lowercase()
            }
        }
    }
}

impl Default for DefaultPairNormalizer {
    fn default() -> Self {
        Self::new(PairFormat::Slash)
    }
}

impl PairNormalizer for DefaultPairNormalizer {
    fn normalize_pair(&self, exchange_pair: &str) -> Result<CurrencyPair> {
        let parsed = Self::parse_pair_from_string(exchange_pair)?;
        Ok(if self.quote_first { parsed.inverted() } else { parsed })
    }

    fn denormalize_pair(&self, pair: &CurrencyPair) -> String {
        if self.quote_first {
            Self::format_pair(&pair.inverted(), self.format)
        } else {
            Self::format_pair(pair, self.format)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairFormat {
    Slash,           // ETH/BTC
    Dash,            // ETH-BTC
    Underscore,      // ETH_BTC
    Concatenated,    // ETHBTC
    LowerUnderscore, // eth_btc
}

/// Rounds a quoted price to the venue's tick.
pub fn normalize_price_precision(price: Decimal, decimal_places: u32) -> Decimal {
    price.round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds an order amount up to the venue's precision so the filled size never falls short.
pub fn normalize_quantity_precision(quantity: Decimal, decimal_places: u32) -> Decimal {
    quantity.round_dp_with_strategy(decimal_places, RoundingStrategy::AwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_pair_parsing() {
        let pair = DefaultPairNormalizer::parse_pair_from_string("BTC/USDT").unwrap();
        assert_eq!(pair, CurrencyPair::new("BTC", "USDT"));

        let pair = DefaultPairNormalizer::parse_pair_from_string("eth_btc").unwrap();
        assert_eq!(pair, CurrencyPair::new("ETH", "BTC"));

        let pair = DefaultPairNormalizer::parse_pair_from_string("ADAUSDT").unwrap();
        assert_eq!(pair, CurrencyPair::new("ADA", "USDT"));

        assert!(DefaultPairNormalizer::parse_pair_from_string("XYZ").is_err());
    }

    #[test]
    fn test_quote_first_venue_is_reordered() {
        let normalizer = DefaultPairNormalizer::new(PairFormat::Dash).quote_first(true);
        let pair = normalizer.normalize_pair("BTC-LTC").unwrap();
        assert_eq!(pair, CurrencyPair::new("LTC", "BTC"));
        assert_eq!(normalizer.denormalize_pair(&pair), "BTC-LTC");
    }

    #[test]
    fn test_concatenated_round_trip() {
        let normalizer = DefaultPairNormalizer::new(PairFormat::Concatenated);
        let pair = normalizer.normalize_pair("ETHUSD").unwrap();
        assert_eq!(pair, CurrencyPair::new("ETH", "USD"));
        assert_eq!(normalizer.denormalize_pair(&pair), "ETHUSD");
    }

    #[test]
    fn test_pair_formatting() {
        let pair = CurrencyPair::new("ETH", "BTC");
        assert_eq!(DefaultPairNormalizer::format_pair(&pair, PairFormat::Slash), "ETH/BTC");
        assert_eq!(DefaultPairNormalizer::format_pair(&pair, PairFormat::Underscore), "ETH_BTC");
        assert_eq!(DefaultPairNormalizer::format_pair(&pair, PairFormat::LowerUnderscore), "eth_btc");
    }

    #[test]
    fn test_precision_normalization() {
        assert_eq!(normalize_price_precision(dec!(123.456789), 2), dec!(123.46));
        assert_eq!(normalize_quantity_precision(dec!(123.451), 2), dec!(123.46));
        assert_eq!(normalize_quantity_precision(dec!(123.45), 2), dec!(123.45));
        assert_eq!(normalize_quantity_precision(dec!(0.1), 0), dec!(1));
    }
}
