use serde::{Deserialize, Serialize};
use std::fmt;
use triarb_core::{Currency, CurrencyPair, Order, Side, VenueId};

/// Identity of a tradable direction: one side of one pair on one venue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VertexKey {
    pub venue: VenueId,
    pub pair: CurrencyPair,
    pub side: Side,
}

impl VertexKey {
    pub fn new(venue: VenueId, pair: CurrencyPair, side: Side) -> Self {
        Self { venue, pair, side }
    }

    /// Currency spent when traversing this direction.
    pub fn from_currency(&self) -> &Currency {
        match self.side {
            Side::Ask => &self.pair.quote,
            Side::Bid => &self.pair.base,
        }
    }

    /// Currency received when traversing this direction.
    pub fn to_currency(&self) -> &Currency {
        match self.side {
            Side::Ask => &self.pair.base,
            Side::Bid => &self.pair.quote,
        }
    }
}

impl fmt::Display for VertexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}({})", self.venue, self.pair, self.side)
    }
}

/// Handle into the tree's vertex arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VertexId(pub(crate) usize);

impl VertexId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A deduplicated edge of the tree plus the quote attached to it in the current generation.
#[derive(Debug, Clone)]
pub struct Vertex {
    key: VertexKey,
    order: Option<Order>,
}

impl Vertex {
    pub(crate) fn new(key: VertexKey) -> Self {
        Self { key, order: None }
    }

    pub fn key(&self) -> &VertexKey {
        &self.key
    }

    pub fn order(&self) -> Option<&Order> {
        self.order.as_ref()
    }

    pub fn is_quoted(&self) -> bool {
        self.order.is_some()
    }

    pub(crate) fn set_order(&mut self, order: Option<Order>) {
        self.order = order;
    }
}

impl fmt::Display for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.order {
            Some(order) => write!(f, "{} @ {}", self.key, order.price()),
            None => write!(f, "{} unquoted", self.key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_follows_side() {
        let pair = CurrencyPair::new("ETH", "BTC");

        let ask = VertexKey::new(VenueId::Kraken, pair.clone(), Side::Ask);
        assert_eq!(ask.from_currency(), &Currency::new("BTC"));
        assert_eq!(ask.to_currency(), &Currency::new("ETH"));

        let bid = VertexKey::new(VenueId::Kraken, pair, Side::Bid);
        assert_eq!(bid.from_currency(), &Currency::new("ETH"));
        assert_eq!(bid.to_currency(), &Currency::new("BTC"));
        assert_eq!(bid.to_string(), "kraken:ETH/BTC(bid)");
    }
}
