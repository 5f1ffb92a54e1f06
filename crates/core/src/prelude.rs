//! Prelude module - re-exports commonly used types for convenience

pub use crate::error::{Result, TriArbError};
pub use crate::types::{
    currency::*,
    order::*,
    orderbook::*,
    venue::*,
};

// Re-export commonly used external types
pub use rust_decimal::Decimal;
pub use chrono::{DateTime, Utc};
