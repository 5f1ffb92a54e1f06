use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::CurrencyPair;
use crate::error::{Result, TriArbError};
use crate::utils::validation::{validate_price, validate_volume};

/// Proportional fee charged on the base leg when a venue does not say otherwise (0.25%).
pub const DEFAULT_FEE_RATE: Decimal = Decimal::from_parts(25, 0, 0, false, 4);

/// Which side of the book an order sits on.
///
/// Traversal convention for a pair `BASE/QUOTE`: an `Ask` hop converts QUOTE into BASE
/// by lifting the best ask, a `Bid` hop converts BASE into QUOTE by hitting the best bid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Bid => write!(f, "bid"),
            Side::Ask => write!(f, "ask"),
        }
    }
}

/// A priced trade intent with cascading volume semantics.
///
/// `quote_volume = price * base_volume` always holds; whichever volume was set last is the
/// independent one. `fee = fee_rate * base_volume`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pair: CurrencyPair,
    price: Decimal,
    inverse_price: Decimal,
    base_volume: Decimal,
    quote_volume: Decimal,
    side: Side,
    fee_rate: Decimal,
    fee: Decimal,
}

impl Order {
    pub fn new_bid(pair: CurrencyPair, price: Decimal, base_volume: Decimal) -> Result<Self> {
        Self::new(pair, Side::Bid, price, base_volume)
    }

    pub fn new_ask(pair: CurrencyPair, price: Decimal, base_volume: Decimal) -> Result<Self> {
        Self::new(pair, Side::Ask, price, base_volume)
    }

    pub fn new(pair: CurrencyPair, side: Side, price: Decimal, base_volume: Decimal) -> Result<Self> {
        validate_price(price)?;
        validate_volume(base_volume)?;

        let inverse_price = Decimal::ONE
            .checked_div(price)
            .ok_or_else(|| overflow("inverse price", &pair, price, base_volume))?;

        let mut order = Self {
            pair,
            price,
            inverse_price,
            base_volume: Decimal::ZERO,
            quote_volume: Decimal::ZERO,
            side,
            fee_rate: DEFAULT_FEE_RATE,
            fee: Decimal::ZERO,
        };
        order.update_base_volume(base_volume)?;
        Ok(order)
    }

    /// Replaces the fee rate, clamped to `[0, 1]` so the fee never exceeds the base volume.
    pub fn with_fee_rate(mut self, fee_rate: Decimal) -> Self {
        self.fee_rate = fee_rate.max(Decimal::ZERO).min(Decimal::ONE);
        self.fee = self.fee_rate * self.base_volume;
        self
    }

    pub fn pair(&self) -> &CurrencyPair {
        &self.pair
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn inverse_price(&self) -> Decimal {
        self.inverse_price
    }

    pub fn base_volume(&self) -> Decimal {
        self.base_volume
    }

    pub fn quote_volume(&self) -> Decimal {
        self.quote_volume
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn fee_rate(&self) -> Decimal {
        self.fee_rate
    }

    pub fn fee(&self) -> Decimal {
        self.fee
    }

    /// Forward cascade: base volume drives quote volume and fee. On overflow the order
    /// is left unchanged.
    pub fn update_base_volume(&mut self, base_volume: Decimal) -> Result<()> {
        let quote_volume = self
            .price
            .checked_mul(base_volume)
            .ok_or_else(|| overflow("quote volume", &self.pair, self.price, base_volume))?;

        self.base_volume = base_volume;
        self.quote_volume = quote_volume;
        self.fee = self.fee_rate * base_volume;
        Ok(())
    }

    /// Reverse cascade: quote volume drives base volume and fee. On overflow the order
    /// is left unchanged.
    pub fn update_quote_volume(&mut self, quote_volume: Decimal) -> Result<()> {
        let base_volume = quote_volume
            .checked_div(self.price)
            .ok_or_else(|| overflow("base volume", &self.pair, self.price, quote_volume))?;

        self.quote_volume = quote_volume;
        self.base_volume = base_volume;
        self.fee = self.fee_rate * base_volume;
        Ok(())
    }

    /// Ask crossing the spread of this bid, same pair and price.
    pub fn derive_matching_ask(&self) -> Result<Order> {
        self.derive_matching(Side::Bid)
    }

    /// Bid crossing the spread of this ask, same pair and price.
    pub fn derive_matching_bid(&self) -> Result<Order> {
        self.derive_matching(Side::Ask)
    }

    fn derive_matching(&self, expected: Side) -> Result<Order> {
        if self.side != expected {
            return Err(TriArbError::InvalidSide {
                expected,
                found: self.side,
            });
        }
        let mut matching = self.clone();
        matching.side = expected.opposite();
        Ok(matching)
    }

    /// Units of the destination currency received per unit of the source currency, net of fees.
    pub fn conversion_rate(&self) -> Decimal {
        let net = Decimal::ONE - self.fee_rate;
        match self.side {
            Side::Ask => self.inverse_price * net,
            Side::Bid => self.price * net,
        }
    }

    /// Largest amount of the source currency this order can absorb at its price.
    pub fn input_capacity(&self) -> Decimal {
        match self.side {
            Side::Ask => self.quote_volume,
            Side::Bid => self.base_volume,
        }
    }

    /// Resizes the order to consume `input` of the source currency and returns the net
    /// amount of destination currency it yields.
    pub fn engage(&mut self, input: Decimal) -> Result<Decimal> {
        match self.side {
            Side::Bid => {
                self.update_base_volume(input)?;
                Ok(self.quote_volume - self.fee * self.price)
            }
            Side::Ask => {
                self.update_quote_volume(input)?;
                Ok(self.base_volume - self.fee)
            }
        }
    }
}

fn overflow(what: &str, pair: &CurrencyPair, price: Decimal, volume: Decimal) -> TriArbError {
    TriArbError::InvalidData(format!(
        "{} overflows for {} at price {} and volume {}",
        what, pair, price, volume
    ))
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} @ {}",
            self.side, self.base_volume, self.pair, self.price
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn eth_btc() -> CurrencyPair {
        CurrencyPair::new("ETH", "BTC")
    }

    #[test]
    fn test_new_order_cascades_volumes() {
        let order = Order::new_bid(eth_btc(), dec!(0.05), dec!(10)).unwrap();
        assert_eq!(order.side(), Side::Bid);
        assert_eq!(order.quote_volume(), dec!(0.5));
        assert_eq!(order.inverse_price(), dec!(20));
        assert_eq!(order.fee(), dec!(0.025));
    }

    #[test]
    fn test_non_positive_price_rejected() {
        let err = Order::new_ask(eth_btc(), Decimal::ZERO, dec!(1)).unwrap_err();
        assert!(matches!(err, TriArbError::InvalidPrice(_)));
        assert!(Order::new_bid(eth_btc(), dec!(-1), dec!(1)).is_err());
    }

    #[test]
    fn test_volume_round_trip() {
        let mut order = Order::new_ask(eth_btc(), dec!(0.0731), dec!(1)).unwrap();

        order.update_base_volume(dec!(3.5)).unwrap();
        assert_eq!(order.quote_volume(), dec!(0.0731) * dec!(3.5));
        assert_eq!(order.fee(), DEFAULT_FEE_RATE * dec!(3.5));

        order.update_quote_volume(dec!(2)).unwrap();
        let expected = dec!(2) / dec!(0.0731);
        assert!((order.base_volume() - expected).abs() < dec!(0.000000001));
        assert_eq!(order.fee(), DEFAULT_FEE_RATE * order.base_volume());
    }

    #[test]
    fn test_matching_ask_from_bid() {
        let bid = Order::new_bid(eth_btc(), dec!(0.05), dec!(4)).unwrap();
        let ask = bid.derive_matching_ask().unwrap();
        assert_eq!(ask.side(), Side::Ask);
        assert_eq!(ask.price(), bid.price());
        assert_eq!(ask.pair(), bid.pair());
        // source untouched
        assert_eq!(bid.side(), Side::Bid);

        let err = ask.derive_matching_ask().unwrap_err();
        assert!(matches!(
            err,
            TriArbError::InvalidSide { expected: Side::Bid, found: Side::Ask }
        ));
    }

    #[test]
    fn test_matching_bid_from_ask() {
        let ask = Order::new_ask(eth_btc(), dec!(0.05), dec!(4)).unwrap();
        let bid = ask.derive_matching_bid().unwrap();
        assert_eq!(bid.side(), Side::Bid);
        assert_eq!(bid.price(), ask.price());
        assert!(bid.derive_matching_bid().is_err());
    }

    #[test]
    fn test_conversion_rate_follows_side() {
        let ask = Order::new_ask(eth_btc(), dec!(0.05), dec!(1)).unwrap();
        assert_eq!(ask.conversion_rate(), dec!(20) * dec!(0.9975));

        let bid = Order::new_bid(eth_btc(), dec!(0.05), dec!(1)).unwrap();
        assert_eq!(bid.conversion_rate(), dec!(0.05) * dec!(0.9975));
    }

    #[test]
    fn test_engage_ask_spends_quote() {
        let mut ask = Order::new_ask(eth_btc(), dec!(0.05), dec!(100))
            .unwrap()
            .with_fee_rate(dec!(0.001));
        assert_eq!(ask.input_capacity(), dec!(5));

        let out = ask.engage(dec!(1)).unwrap();
        assert_eq!(ask.base_volume(), dec!(20));
        assert_eq!(out, dec!(20) - dec!(0.02));
    }

    #[test]
    fn test_engage_bid_spends_base() {
        let mut bid = Order::new_bid(eth_btc(), dec!(0.05), dec!(100)).unwrap();
        assert_eq!(bid.input_capacity(), dec!(100));

        let out = bid.engage(dec!(10)).unwrap();
        assert_eq!(bid.quote_volume(), dec!(0.5));
        assert_eq!(out, dec!(0.5) * dec!(0.9975));
    }

    #[test]
    fn test_oversized_quote_rejected() {
        let err = Order::new_bid(eth_btc(), dec!(1e15), dec!(1e14)).unwrap_err();
        assert!(matches!(err, TriArbError::InvalidData(_)));
        assert!(Order::new_ask(eth_btc(), dec!(1e15), dec!(1e14)).is_err());
    }

    #[test]
    fn test_overflowing_cascade_leaves_order_unchanged() {
        let mut bid = Order::new_bid(eth_btc(), dec!(1e15), dec!(1)).unwrap();
        assert!(bid.update_base_volume(dec!(1e14)).is_err());
        assert!(bid.engage(dec!(1e14)).is_err());
        assert_eq!(bid.base_volume(), dec!(1));
        assert_eq!(bid.quote_volume(), dec!(1e15));

        let mut ask = Order::new_ask(eth_btc(), dec!(0.0000000000000001), dec!(1)).unwrap();
        assert!(ask.update_quote_volume(dec!(1e14)).is_err());
        assert_eq!(ask.base_volume(), dec!(1));
    }

    #[test]
    fn test_fee_rate_clamped() {
        let order = Order::new_bid(eth_btc(), dec!(0.05), dec!(2))
            .unwrap()
            .with_fee_rate(dec!(3));
        assert_eq!(order.fee_rate(), Decimal::ONE);
        assert_eq!(order.fee(), dec!(2));
    }
}
