use triarb_graph::Path;

pub mod arbitrage;

pub use arbitrage::{ArbitrageEvaluator, Chain};

/// Scores completed cycles. Implementations are pure: no I/O, no shared state.
pub trait Strategy: Send + Sync {
    /// The name of the strategy
    fn name(&self) -> String;

    /// Evaluates `paths` and returns the profitable ones, in no particular order.
    fn run(&self, paths: &[Path]) -> Vec<Chain>;
}

pub mod prelude {
    pub use super::Strategy;
    pub use super::arbitrage::*;
}
