pub mod currency;
pub mod order;
pub mod orderbook;
pub mod venue;

pub use currency::*;
pub use order::*;
pub use orderbook::*;
pub use venue::*;
