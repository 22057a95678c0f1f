//! Demand-availability matrix: warehouse -> product -> available units.

use std::collections::BTreeMap;

use wareledger_core::{ProductId, WarehouseId};
use wareledger_inventory::Stock;

use crate::item::OrderItem;

/// Snapshot of positive availability across warehouses.
///
/// Built from stock rows read before planning; planning never mutates the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailabilityMatrix {
    cells: BTreeMap<WarehouseId, BTreeMap<ProductId, i64>>,
}

impl AvailabilityMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record availability for one cell. Non-positive values are ignored.
    pub fn insert(&mut self, warehouse_id: WarehouseId, product_id: ProductId, available: i64) {
        if available > 0 {
            self.cells
                .entry(warehouse_id)
                .or_default()
                .insert(product_id, available);
        }
    }

    pub fn from_stock<'a>(rows: impl IntoIterator<Item = &'a Stock>) -> Self {
        let mut matrix = Self::new();
        for row in rows {
            matrix.insert(row.warehouse_id, row.product_id, row.available());
        }
        matrix
    }

    pub fn available(&self, warehouse_id: &WarehouseId, product_id: &ProductId) -> i64 {
        self.cells
            .get(warehouse_id)
            .and_then(|products| products.get(product_id))
            .copied()
            .unwrap_or(0)
    }

    /// Warehouses holding anything at all, in id order.
    pub fn warehouses(&self) -> impl Iterator<Item = &WarehouseId> {
        self.cells.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Whether `warehouse_id` alone covers every line in full.
    pub fn covers(&self, warehouse_id: &WarehouseId, items: &[OrderItem]) -> bool {
        items
            .iter()
            .all(|item| self.available(warehouse_id, &item.product_id) >= item.quantity)
    }

    /// Warehouses that can ship the whole order on their own, in id order.
    pub fn covering_warehouses(&self, items: &[OrderItem]) -> Vec<WarehouseId> {
        self.warehouses()
            .filter(|wh| self.covers(wh, items))
            .copied()
            .collect()
    }
}
