use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use wareledger_core::WarehouseId;

use crate::rate::{RateTable, WarehouseRate};

/// How candidate warehouses are ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitStrategy {
    /// Ship from one warehouse only; never splits.
    Single,
    /// Splitting allowed, ranked like `Balanced`.
    Split,
    Fastest,
    Cheapest,
    Balanced,
    /// Assigned to plans that leave lines backordered.
    Partial,
}

impl SplitStrategy {
    /// Strategies offered side by side to a customer.
    pub const OPTIONS: [SplitStrategy; 4] = [
        SplitStrategy::Single,
        SplitStrategy::Fastest,
        SplitStrategy::Cheapest,
        SplitStrategy::Balanced,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SplitStrategy::Single => "single",
            SplitStrategy::Split => "split",
            SplitStrategy::Fastest => "fastest",
            SplitStrategy::Cheapest => "cheapest",
            SplitStrategy::Balanced => "balanced",
            SplitStrategy::Partial => "partial",
        }
    }

    pub fn allows_split(self) -> bool {
        !matches!(self, SplitStrategy::Single)
    }

    /// Compare two quotes; `Less` means `a` is preferred. Ties go to the lower id.
    pub fn compare(self, a: &WarehouseRate, b: &WarehouseRate) -> Ordering {
        let primary = match self {
            SplitStrategy::Fastest => a.estimated_days.cmp(&b.estimated_days),
            SplitStrategy::Cheapest => a.shipping_cost.cmp(&b.shipping_cost),
            _ => a.balanced_score().cmp(&b.balanced_score()),
        };
        primary.then(a.warehouse_id.cmp(&b.warehouse_id))
    }

    /// Rank warehouses that have a quote, best first. Unquoted ones are dropped.
    pub fn rank<'a>(
        self,
        warehouses: impl IntoIterator<Item = &'a WarehouseId>,
        rates: &'a RateTable,
    ) -> Vec<&'a WarehouseRate> {
        let mut ranked: Vec<&WarehouseRate> =
            warehouses.into_iter().filter_map(|wh| rates.get(wh)).collect();
        ranked.sort_by(|a, b| self.compare(a, b));
        ranked
    }
}

impl core::fmt::Display for SplitStrategy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
