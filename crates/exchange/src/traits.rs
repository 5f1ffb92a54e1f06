use async_trait::async_trait;
use triarb_core::{CurrencyPair, Order, Orderbook, Result, VenueId, VenueSettings};

/// The two narrow contracts the scanner needs from a venue, plus its static settings.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExchangeAdapter: Send + Sync {
    fn venue_id(&self) -> VenueId;

    /// Tradable pairs, precision and fee metadata, fetched once at startup.
    async fn get_settings(&self) -> Result<VenueSettings>;

    /// Best bid and best ask for `pair`, in canonical orientation.
    async fn get_orderbook(&self, pair: &CurrencyPair) -> Result<Orderbook>;

    /// Submits `order` and returns it as confirmed by the venue.
    async fn post_order(&self, order: &Order, settings: &VenueSettings) -> Result<Order>;
}
