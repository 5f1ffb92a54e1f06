//! Combined currency graph of every venue.
//!
//! Nodes are currencies, edges are `(venue, pair, side)` directions. Each reported
//! pair contributes an Ask edge `quote -> base` and a Bid edge `base -> quote`.

use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, info};
use triarb_core::utils::validation::validate_pair;
use triarb_core::{Currency, CurrencyPair, Result, Side, TriArbError, VenueId, VenueSettings};

use crate::vertex::VertexKey;

#[derive(Debug, Clone)]
pub struct Mashup {
    venues: Vec<VenueSettings>,
    currencies: BTreeSet<Currency>,
    adjacency: HashMap<Currency, Vec<VertexKey>>,
    edges: HashSet<VertexKey>,
}

impl Mashup {
    pub fn build(venues: &[VenueSettings]) -> Result<Self> {
        let mut mashup = Self {
            venues: Vec::with_capacity(venues.len()),
            currencies: BTreeSet::new(),
            adjacency: HashMap::new(),
            edges: HashSet::new(),
        };

        for settings in venues {
            if mashup.venue_settings(&settings.venue).is_some() {
                return Err(TriArbError::InvalidData(format!(
                    "Venue {} listed twice",
                    settings.venue
                )));
            }

            let mut inserted = 0;
            for pair in settings.canonical_pairs() {
                validate_pair(&pair).map_err(|_| TriArbError::UnknownPair {
                    venue: settings.venue.clone(),
                    pair: pair.to_string(),
                })?;

                if mashup.insert_pair(&settings.venue, pair) {
                    inserted += 1;
                }
            }

            debug!("Mashup: {} contributed {} pairs", settings.venue, inserted);
            mashup.venues.push(settings.clone());
        }

        info!(
            "Mashup built: {} venues, {} currencies, {} edges",
            mashup.venues.len(),
            mashup.currencies.len(),
            mashup.edges.len()
        );

        Ok(mashup)
    }

    /// Inserts both directions of `pair`. Returns false when the venue already reported it.
    fn insert_pair(&mut self, venue: &VenueId, pair: CurrencyPair) -> bool {
        let ask = VertexKey::new(venue.clone(), pair.clone(), Side::Ask);
        if self.edges.contains(&ask) {
            return false;
        }
        let bid = VertexKey::new(venue.clone(), pair.clone(), Side::Bid);

        self.currencies.insert(pair.base.clone());
        self.currencies.insert(pair.quote.clone());

        for key in [ask, bid] {
            self.adjacency
                .entry(key.from_currency().clone())
                .or_default()
                .push(key.clone());
            self.edges.insert(key);
        }
        true
    }

    /// Outgoing edges of `currency` in insertion order.
    pub fn neighbors(&self, currency: &Currency) -> &[VertexKey] {
        self.adjacency
            .get(currency)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn edge(&self, venue: &VenueId, pair: &CurrencyPair, side: Side) -> Option<&VertexKey> {
        self.edges.get(&VertexKey::new(venue.clone(), pair.clone(), side))
    }

    pub fn contains(&self, currency: &Currency) -> bool {
        self.currencies.contains(currency)
    }

    pub fn currencies(&self) -> impl Iterator<Item = &Currency> {
        self.currencies.iter()
    }

    pub fn venues(&self) -> impl Iterator<Item = &VenueId> {
        self.venues.iter().map(|settings| &settings.venue)
    }

    pub fn venue_settings(&self, venue: &VenueId) -> Option<&VenueSettings> {
        self.venues.iter().find(|settings| settings.venue == *venue)
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn venue(venue: VenueId, pairs: &[&str]) -> VenueSettings {
        VenueSettings::new(
            venue,
            pairs
                .iter()
                .filter_map(|pair| CurrencyPair::from_pair(pair))
                .collect(),
        )
    }

    #[test]
    fn test_each_pair_yields_two_directions() {
        let mashup = Mashup::build(&[venue(VenueId::Kraken, &["ETH/BTC"])]).unwrap();

        let btc = Currency::new("BTC");
        let eth = Currency::new("ETH");
        let pair = CurrencyPair::new("ETH", "BTC");

        assert_eq!(mashup.edge_count(), 2);
        assert_eq!(mashup.neighbors(&btc).len(), 1);
        assert_eq!(mashup.neighbors(&btc)[0].side, Side::Ask);
        assert_eq!(mashup.neighbors(&btc)[0].to_currency(), &eth);
        assert_eq!(mashup.neighbors(&eth)[0].side, Side::Bid);
        assert!(mashup.edge(&VenueId::Kraken, &pair, Side::Bid).is_some());
        assert!(mashup.edge(&VenueId::Liqui, &pair, Side::Bid).is_none());
    }

    #[test]
    fn test_duplicate_pairs_inserted_once() {
        let mashup = Mashup::build(&[venue(VenueId::Kraken, &["ETH/BTC", "eth/btc"])]).unwrap();
        assert_eq!(mashup.edge_count(), 2);
    }

    #[test]
    fn test_same_pair_on_two_venues_are_distinct_edges() {
        let mashup = Mashup::build(&[
            venue(VenueId::Kraken, &["ETH/BTC"]),
            venue(VenueId::Liqui, &["ETH/BTC"]),
        ])
        .unwrap();

        assert_eq!(mashup.edge_count(), 4);
        assert_eq!(mashup.neighbors(&Currency::new("BTC")).len(), 2);
        assert_eq!(mashup.venues().count(), 2);
        assert_eq!(mashup.currencies().count(), 2);
    }

    #[test]
    fn test_unnormalized_venue_reordered() {
        let mut settings = venue(VenueId::Bittrex, &["BTC/LTC"]);
        settings.normalized_pairs = false;

        let mashup = Mashup::build(&[settings]).unwrap();
        let pair = CurrencyPair::new("LTC", "BTC");
        assert!(mashup.edge(&VenueId::Bittrex, &pair, Side::Ask).is_some());
    }

    #[test]
    fn test_invalid_pair_rejected() {
        let settings = VenueSettings::new(VenueId::Kraken, vec![CurrencyPair::new("BTC", "BTC")]);
        let err = Mashup::build(&[settings]).unwrap_err();
        assert!(matches!(err, TriArbError::UnknownPair { venue: VenueId::Kraken, .. }));
    }

    #[test]
    fn test_unknown_currency_has_no_neighbors() {
        let mashup = Mashup::build(&[venue(VenueId::Kraken, &["ETH/BTC"])]).unwrap();
        let doge = Currency::new("DOGE");
        assert!(!mashup.contains(&doge));
        assert!(mashup.neighbors(&doge).is_empty());
    }
}
