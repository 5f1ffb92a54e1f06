//! Prelude module for triarb-exchange
//!
//! Re-exports commonly used types and traits

pub use crate::traits::ExchangeAdapter;

pub use crate::manager::{ExchangeManager, VenueStatus};
pub use crate::normalizer::{DefaultPairNormalizer, PairFormat, PairNormalizer};
pub use crate::rate_limiter::RateLimiter;
pub use crate::simulated::SimulatedExchange;

// Re-export common types from core
pub use triarb_core::prelude::*;
