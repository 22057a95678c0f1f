use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use wareledger_core::WarehouseId;

/// Distance and shipping quote from one warehouse to a destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseRate {
    pub warehouse_id: WarehouseId,
    pub warehouse_name: String,
    pub distance_km: f64,
    /// Cost in smallest currency unit (e.g., cents).
    pub shipping_cost: u64,
    pub estimated_days: u32,
}

impl WarehouseRate {
    /// Cost-times-days score used by the balanced strategy.
    pub fn balanced_score(&self) -> u128 {
        u128::from(self.shipping_cost) * u128::from(self.estimated_days)
    }
}

/// Rates keyed by warehouse. Warehouses missing from the table cannot ship.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTable {
    rates: BTreeMap<WarehouseId, WarehouseRate>,
}

impl RateTable {
    pub fn get(&self, warehouse_id: &WarehouseId) -> Option<&WarehouseRate> {
        self.rates.get(warehouse_id)
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

impl FromIterator<WarehouseRate> for RateTable {
    fn from_iter<I: IntoIterator<Item = WarehouseRate>>(iter: I) -> Self {
        Self {
            rates: iter.into_iter().map(|r| (r.warehouse_id, r)).collect(),
        }
    }
}
