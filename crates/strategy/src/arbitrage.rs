//! Multi-hop Arbitrage Evaluation
//!
//! Scores a quoted cycle by its net conversion rate and the volume it can carry
//! once every hop's fee and top-of-book depth are accounted for.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use triarb_core::{Order, Result};
use triarb_graph::Path;

use crate::Strategy;

/// An evaluated cycle. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chain {
    id: Uuid,
    path: Path,
    performance: Decimal,
    volume_to_engage: Decimal,
    volume_out: Decimal,
    engaged_orders: Vec<Order>,
    evaluated_at: DateTime<Utc>,
}

impl Chain {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Net return per unit of base currency: product of hop rates minus one.
    pub fn performance(&self) -> Decimal {
        self.performance
    }

    /// Largest amount of base currency the cycle can absorb.
    pub fn volume_to_engage(&self) -> Decimal {
        self.volume_to_engage
    }

    /// Base currency received after the last hop's fee.
    pub fn volume_out(&self) -> Decimal {
        self.volume_out
    }

    /// The path's orders resized to `volume_to_engage`.
    pub fn engaged_orders(&self) -> &[Order] {
        &self.engaged_orders
    }

    pub fn evaluated_at(&self) -> DateTime<Utc> {
        self.evaluated_at
    }

    pub fn expected_gain(&self) -> Decimal {
        self.performance * self.volume_to_engage
    }

    /// Flat report row: one cell per hop, then performance, volume to engage, expected
    /// gain, volume out and the evaluation timestamp.
    pub fn row(&self) -> Vec<String> {
        let mut row: Vec<String> = self.path.hops().iter().map(|hop| hop.description()).collect();
        row.push(format!("{:.6}", self.performance));
        row.push(format!("{:.6}", self.volume_to_engage));
        row.push(format!("{:.6}", self.expected_gain()));
        row.push(format!("{:.6}", self.volume_out));
        row.push(self.evaluated_at.format("%Y-%m-%d %H:%M:%S").to_string());
        row
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

pub struct ArbitrageEvaluator {
    min_performance: Decimal,
}

impl ArbitrageEvaluator {
    pub fn new(min_performance: Decimal) -> Self {
        Self {
            min_performance: min_performance.max(Decimal::ZERO),
        }
    }

    pub fn min_performance(&self) -> Decimal {
        self.min_performance
    }

    /// Evaluates every path and keeps those with a strictly positive performance above
    /// the configured floor.
    pub fn run(&self, paths: &[Path]) -> Vec<Chain> {
        paths.iter().filter_map(|path| self.evaluate(path)).collect()
    }

    pub fn evaluate(&self, path: &Path) -> Option<Chain> {
        // Units of the current hop's source currency obtained per unit of base.
        let mut cumulative = Decimal::ONE;
        let mut volume_to_engage: Option<Decimal> = None;

        for hop in path.hops() {
            let order = &hop.order;
            if order.price() <= Decimal::ZERO {
                warn!("Skipping {}: non-positive price on {}", path, hop.key);
                return None;
            }

            let bound = order.input_capacity().checked_div(cumulative)?;
            volume_to_engage = Some(match volume_to_engage {
                Some(volume) => volume.min(bound),
                None => bound,
            });
            cumulative = cumulative.checked_mul(order.conversion_rate())?;
        }

        let performance = cumulative - Decimal::ONE;
        if performance <= self.min_performance {
            return None;
        }

        let volume_to_engage = volume_to_engage?;
        let mut amount = volume_to_engage;
        let mut engaged_orders = Vec::with_capacity(path.len());
        for hop in path.hops() {
            let mut order = hop.order.clone();
            amount = match order.engage(amount) {
                Ok(amount) => amount,
                Err(e) => {
                    warn!("Skipping {}: {}", path, e);
                    return None;
                }
            };
            engaged_orders.push(order);
        }

        debug!(
            "Chain {}: performance {}, volume to engage {}, volume out {}",
            path, performance, volume_to_engage, amount
        );

        Some(Chain {
            id: Uuid::new_v4(),
            path: path.clone(),
            performance,
            volume_to_engage,
            volume_out: amount,
            engaged_orders,
            evaluated_at: Utc::now(),
        })
    }
}

impl Default for ArbitrageEvaluator {
    fn default() -> Self {
        Self::new(Decimal::ZERO)
    }
}

impl Strategy for ArbitrageEvaluator {
    fn name(&self) -> String {
        "multi-hop-arbitrage".to_string()
    }

    fn run(&self, paths: &[Path]) -> Vec<Chain> {
        ArbitrageEvaluator::run(self, paths)
    }
}
