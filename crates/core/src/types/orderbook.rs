use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CurrencyPair, Order, Side};
use crate::error::{Result, TriArbError};

/// Top-of-book snapshot returned by a venue, already in canonical pair orientation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Orderbook {
    pub pair: CurrencyPair,
    pub best_bid: Option<Order>,
    pub best_ask: Option<Order>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

impl Orderbook {
    pub fn new(pair: CurrencyPair, best_bid: Option<Order>, best_ask: Option<Order>) -> Self {
        let now = Utc::now();
        Self {
            pair,
            best_bid,
            best_ask,
            started_at: now,
            ended_at: now,
        }
    }

    pub fn with_timing(mut self, started_at: DateTime<Utc>, ended_at: DateTime<Utc>) -> Self {
        self.started_at = started_at;
        self.ended_at = ended_at;
        self
    }

    pub fn latency_ms(&self) -> i64 {
        (self.ended_at - self.started_at).num_milliseconds()
    }

    /// The order a hop on `side` trades against. When the book only carries the other
    /// side, the matching order is derived from it.
    pub fn quote_for(&self, side: Side) -> Result<Order> {
        let (direct, other) = match side {
            Side::Bid => (&self.best_bid, &self.best_ask),
            Side::Ask => (&self.best_ask, &self.best_bid),
        };

        if let Some(order) = direct {
            return Ok(order.clone());
        }

        match (side, other) {
            (Side::Bid, Some(ask)) => ask.derive_matching_bid(),
            (Side::Ask, Some(bid)) => bid.derive_matching_ask(),
            _ => Err(TriArbError::InvalidData(format!("Empty orderbook for {}", self.pair))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_quote_for_prefers_direct_side() {
        let pair = CurrencyPair::new("BTC", "USDT");
        let bid = Order::new_bid(pair.clone(), dec!(9400), dec!(1)).unwrap();
        let ask = Order::new_ask(pair.clone(), dec!(9500), dec!(2)).unwrap();
        let book = Orderbook::new(pair, Some(bid), Some(ask));

        assert_eq!(book.quote_for(Side::Bid).unwrap().price(), dec!(9400));
        assert_eq!(book.quote_for(Side::Ask).unwrap().price(), dec!(9500));
    }

    #[test]
    fn test_quote_for_derives_missing_side() {
        let pair = CurrencyPair::new("BTC", "USDT");
        let bid = Order::new_bid(pair.clone(), dec!(9400), dec!(1)).unwrap();
        let book = Orderbook::new(pair.clone(), Some(bid), None);

        let ask = book.quote_for(Side::Ask).unwrap();
        assert_eq!(ask.side(), Side::Ask);
        assert_eq!(ask.price(), dec!(9400));

        let empty = Orderbook::new(pair, None, None);
        assert!(empty.quote_for(Side::Bid).is_err());
    }
}
