//! Single-warehouse allocation policy.

use serde::{Deserialize, Serialize};

use wareledger_core::{DomainResult, ProductId, WarehouseId};

use crate::stock::{Stock, ensure_positive};
use crate::warehouse::Warehouse;

/// Outcome of picking a warehouse for one product line.
///
/// `available == false` is a normal planning outcome, not a fault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationResult {
    pub product_id: ProductId,
    pub warehouse_id: Option<WarehouseId>,
    pub quantity: i64,
    pub available: bool,
}

impl AllocationResult {
    fn unavailable(product_id: ProductId, quantity: i64) -> Self {
        Self {
            product_id,
            warehouse_id: None,
            quantity,
            available: false,
        }
    }
}

/// Stateless FIFO-by-priority picker.
///
/// Only active, order-accepting warehouses are considered. Candidates are
/// ranked by ascending `priority` (ties broken by warehouse id so the choice is
/// deterministic) and the first one whose available stock covers the whole
/// request wins.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllocationPicker;

impl AllocationPicker {
    pub fn pick(
        &self,
        product_id: ProductId,
        quantity: i64,
        stocks: &[Stock],
        warehouses: &[Warehouse],
    ) -> DomainResult<AllocationResult> {
        ensure_positive(quantity)?;

        let mut eligible: Vec<&Warehouse> =
            warehouses.iter().filter(|w| w.can_fulfill_orders()).collect();
        eligible.sort_by_key(|w| (w.priority, w.id));

        let chosen = eligible.into_iter().find(|w| {
            stocks.iter().any(|s| {
                s.warehouse_id == w.id && s.product_id == product_id && s.available() >= quantity
            })
        });

        Ok(match chosen {
            Some(w) => AllocationResult {
                product_id,
                warehouse_id: Some(w.id),
                quantity,
                available: true,
            },
            None => AllocationResult::unavailable(product_id, quantity),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wareledger_core::DomainError;

    fn warehouse(priority: i32) -> Warehouse {
        Warehouse::new(WarehouseId::new(), "WH", "Warehouse", priority, Utc::now())
    }

    fn stock(warehouse: &Warehouse, product_id: ProductId, quantity: i64) -> Stock {
        let mut s = Stock::new(warehouse.id, product_id, "SKU", Utc::now());
        s.receive(quantity, Utc::now()).unwrap();
        s
    }

    #[test]
    fn prefers_lowest_priority_number_that_covers_request() {
        let product = ProductId::new();
        let preferred = warehouse(1);
        let backup = warehouse(5);
        let stocks = vec![stock(&backup, product, 50), stock(&preferred, product, 50)];

        let result = AllocationPicker
            .pick(product, 20, &stocks, &[backup.clone(), preferred.clone()])
            .unwrap();
        assert!(result.available);
        assert_eq!(result.warehouse_id, Some(preferred.id));
    }

    #[test]
    fn skips_preferred_warehouse_without_enough_stock() {
        let product = ProductId::new();
        let preferred = warehouse(1);
        let backup = warehouse(2);
        let stocks = vec![stock(&preferred, product, 5), stock(&backup, product, 50)];

        let result = AllocationPicker
            .pick(product, 20, &stocks, &[preferred, backup.clone()])
            .unwrap();
        assert_eq!(result.warehouse_id, Some(backup.id));
    }

    #[test]
    fn ignores_inactive_and_non_accepting_warehouses() {
        let product = ProductId::new();
        let mut inactive = warehouse(1);
        inactive.is_active = false;
        let mut closed = warehouse(2);
        closed.accepts_orders = false;
        let stocks = vec![stock(&inactive, product, 50), stock(&closed, product, 50)];

        let result = AllocationPicker
            .pick(product, 10, &stocks, &[inactive, closed])
            .unwrap();
        assert!(!result.available);
        assert_eq!(result.warehouse_id, None);
    }

    #[test]
    fn rejects_non_positive_request() {
        let err = AllocationPicker.pick(ProductId::new(), 0, &[], &[]).unwrap_err();
        assert_eq!(err, DomainError::InvalidQuantity(0));
    }
}
