use serde::{Deserialize, Serialize};
use std::fmt;
use triarb_core::{Currency, Order, Result, TriArbError};

use crate::vertex::{VertexId, VertexKey};

/// One quoted step of a cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hop {
    pub vertex: VertexId,
    pub key: VertexKey,
    pub order: Order,
}

impl Hop {
    pub fn from_currency(&self) -> &Currency {
        self.key.from_currency()
    }

    pub fn to_currency(&self) -> &Currency {
        self.key.to_currency()
    }

    pub fn description(&self) -> String {
        format!("{} @ {}", self.key, self.order.price())
    }
}

/// A fully quoted cycle `base -> ... -> base`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    base: Currency,
    hops: Vec<Hop>,
}

impl Path {
    pub fn new(hops: Vec<Hop>) -> Result<Self> {
        let first = hops
            .first()
            .ok_or_else(|| TriArbError::InvalidData("Empty path".to_string()))?;
        let base = first.from_currency().clone();

        for window in hops.windows(2) {
            if window[0].to_currency() != window[1].from_currency() {
                return Err(TriArbError::InvalidData(format!(
                    "Broken path: {} does not lead into {}",
                    window[0].key, window[1].key
                )));
            }
        }

        if hops.len() < 2 || hops[hops.len() - 1].to_currency() != &base {
            return Err(TriArbError::InvalidData(format!(
                "Path does not return to {}",
                base
            )));
        }

        Ok(Self { base, hops })
    }

    pub fn base(&self) -> &Currency {
        &self.base
    }

    pub fn hops(&self) -> &[Hop] {
        &self.hops
    }

    pub fn len(&self) -> usize {
        self.hops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    pub fn vertices(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.hops.iter().map(|hop| hop.vertex)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)?;
        for hop in &self.hops {
            write!(f, " -[{}]-> {}", hop.key, hop.to_currency())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use triarb_core::{CurrencyPair, Side, VenueId};

    fn hop(id: usize, pair: (&str, &str), side: Side) -> Hop {
        let pair = CurrencyPair::new(pair.0, pair.1);
        Hop {
            vertex: VertexId(id),
            key: VertexKey::new(VenueId::Kraken, pair.clone(), side),
            order: Order::new(pair, side, dec!(1), dec!(1)).unwrap(),
        }
    }

    #[test]
    fn test_valid_cycle() {
        let path = Path::new(vec![
            hop(0, ("ETH", "BTC"), Side::Ask),
            hop(1, ("ETH", "USDT"), Side::Bid),
            hop(2, ("BTC", "USDT"), Side::Ask),
        ])
        .unwrap();

        assert_eq!(path.base(), &Currency::new("BTC"));
        assert_eq!(path.len(), 3);
        assert_eq!(path.vertices().collect::<Vec<_>>(), vec![VertexId(0), VertexId(1), VertexId(2)]);
        assert_eq!(
            path.to_string(),
            "BTC -[kraken:ETH/BTC(ask)]-> ETH -[kraken:ETH/USDT(bid)]-> USDT -[kraken:BTC/USDT(ask)]-> BTC"
        );
    }

    #[test]
    fn test_broken_or_open_paths_rejected() {
        assert!(Path::new(vec![]).is_err());
        assert!(Path::new(vec![
            hop(0, ("ETH", "BTC"), Side::Ask),
            hop(1, ("BTC", "USDT"), Side::Bid),
        ])
        .is_err());
        assert!(Path::new(vec![
            hop(0, ("ETH", "BTC"), Side::Ask),
            hop(1, ("ETH", "USDT"), Side::Bid),
        ])
        .is_err());
    }
}
