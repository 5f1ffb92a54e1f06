use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::{Currency, CurrencyPair, Side, VenueId};

pub type Result<T> = std::result::Result<T, TriArbError>;

#[derive(Error, Debug)]
pub enum TriArbError {
    #[error("Invalid side: expected {expected}, found {found}")]
    InvalidSide { expected: Side, found: Side },

    #[error("Invalid price: {0} (must be positive)")]
    InvalidPrice(Decimal),

    #[error("Unknown currency: {0}")]
    UnknownCurrency(Currency),

    #[error("Unknown pair {pair} on {venue}")]
    UnknownPair { venue: VenueId, pair: String },

    #[error("Unknown venue: {0}")]
    UnknownVenue(VenueId),

    #[error("Quote fetch failed for {pair} on {venue}: {reason}")]
    QuoteFetchFailed {
        venue: VenueId,
        pair: CurrencyPair,
        reason: String,
    },

    #[error("Network timeout: {0}")]
    Timeout(String),

    #[error("Exchange error: {0}")]
    Exchange(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
