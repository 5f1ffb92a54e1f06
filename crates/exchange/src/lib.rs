pub mod traits;
pub mod normalizer;
pub mod manager;
pub mod rate_limiter;
pub mod simulated;
pub mod prelude;

pub use traits::*;
pub use normalizer::*;
pub use manager::*;
pub use rate_limiter::*;
pub use simulated::*;
