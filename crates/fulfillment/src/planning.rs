//! Shipment planning algorithms.
//!
//! Everything here is synchronous and works on snapshots: an availability
//! matrix and a rate table gathered by the caller. Plans are returned, never
//! stored; persisting them is the caller's job.

use chrono::{DateTime, Utc};

use wareledger_core::{DomainError, DomainResult, OrderId, WarehouseId};

use crate::availability::AvailabilityMatrix;
use crate::config::SplitConfig;
use crate::item::{OrderItem, ShipmentItem, validate_items};
use crate::rate::{RateTable, WarehouseRate};
use crate::shipment::{PlannedShipment, ShipmentPlan};
use crate::strategy::SplitStrategy;

const SPLIT_REASON: &str = "items not available in single warehouse";
const PARTIAL_REASON: &str = "partial fulfillment, some items backordered";

/// Snapshot inputs shared by every planning call.
#[derive(Debug, Clone, Copy)]
pub struct PlanningInput<'a> {
    pub order_id: OrderId,
    pub items: &'a [OrderItem],
    pub availability: &'a AvailabilityMatrix,
    pub rates: &'a RateTable,
    pub now: DateTime<Utc>,
}

/// Result of partial planning: what ships now and what waits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialPlan {
    /// `None` when nothing at all could be allocated.
    pub plan: Option<ShipmentPlan>,
    pub backordered: Vec<OrderItem>,
}

impl PartialPlan {
    pub fn is_fully_backordered(&self) -> bool {
        self.plan.is_none()
    }
}

/// Plan an order: one warehouse if any can cover it, otherwise a split.
///
/// Fails `SplitNotAllowed` when a split is needed but disabled (by config or
/// by the `Single` strategy) and `CannotFulfill` when the split leaves a line
/// short.
pub fn plan_shipment(
    input: PlanningInput<'_>,
    strategy: SplitStrategy,
    config: &SplitConfig,
) -> DomainResult<ShipmentPlan> {
    validate_items(input.items)?;

    if let Some(plan) = plan_single(input, strategy) {
        return Ok(plan);
    }
    if !config.allow_split || !strategy.allows_split() {
        return Err(DomainError::SplitNotAllowed);
    }
    plan_split(input, strategy, config)
}

/// Best-ranked warehouse that covers every line in full, as a one-leg plan.
pub fn plan_single(input: PlanningInput<'_>, strategy: SplitStrategy) -> Option<ShipmentPlan> {
    let candidates = input.availability.covering_warehouses(input.items);
    let best = strategy.rank(candidates.iter(), input.rates).into_iter().next()?;

    let items = input
        .items
        .iter()
        .map(|item| ShipmentItem::from_order_item(item, item.quantity))
        .collect();
    let shipment = PlannedShipment::new(best, items, 1);
    Some(ShipmentPlan::assemble(
        input.order_id,
        strategy,
        vec![shipment],
        None,
        input.now,
    ))
}

/// Greedy multi-warehouse plan that must cover every line.
pub fn plan_split(
    input: PlanningInput<'_>,
    strategy: SplitStrategy,
    config: &SplitConfig,
) -> DomainResult<ShipmentPlan> {
    validate_items(input.items)?;

    let ranked = strategy.rank(input.availability.warehouses(), input.rates);
    let (shipments, remaining) = draw_down(input.items, input.availability, &ranked, config);

    if let Some((item, _)) = input
        .items
        .iter()
        .zip(&remaining)
        .find(|(_, left)| **left > 0)
    {
        return Err(DomainError::CannotFulfill(item.product_id));
    }
    if shipments.is_empty() {
        return Err(DomainError::NoAvailableStock);
    }

    let mut plan = ShipmentPlan::assemble(
        input.order_id,
        strategy,
        shipments,
        Some(SPLIT_REASON.to_string()),
        input.now,
    );
    if plan.is_split {
        plan.total_cost = config.discounted(plan.total_cost);
    }
    Ok(plan)
}

/// Allocate what can be allocated and backorder the rest.
///
/// Never fails on an unfulfillable remainder. When nothing can be allocated
/// the plan is `None` and every line comes back as backordered.
pub fn plan_partial(input: PlanningInput<'_>, config: &SplitConfig) -> DomainResult<PartialPlan> {
    validate_items(input.items)?;

    let ranked = SplitStrategy::Balanced.rank(input.availability.warehouses(), input.rates);
    let (shipments, remaining) = draw_down(input.items, input.availability, &ranked, config);

    if shipments.is_empty() {
        return Ok(PartialPlan {
            plan: None,
            backordered: input.items.to_vec(),
        });
    }

    let backordered: Vec<OrderItem> = input
        .items
        .iter()
        .zip(&remaining)
        .filter(|(_, left)| **left > 0)
        .map(|(item, left)| item.with_quantity(*left))
        .collect();
    let reason = (!backordered.is_empty()).then(|| PARTIAL_REASON.to_string());

    Ok(PartialPlan {
        plan: Some(ShipmentPlan::assemble(
            input.order_id,
            SplitStrategy::Partial,
            shipments,
            reason,
            input.now,
        )),
        backordered,
    })
}

/// First warehouse (in id order) able to ship the whole order alone.
pub fn single_warehouse_for(
    items: &[OrderItem],
    availability: &AvailabilityMatrix,
) -> Option<WarehouseId> {
    availability.covering_warehouses(items).into_iter().next()
}

/// Walk ranked warehouses and draw each line down by what the warehouse holds.
///
/// A warehouse becomes a shipment only if it contributes at least
/// `min_items_per_shipment` distinct lines; otherwise its draws are discarded
/// and the units stay available to later warehouses. Returns the shipments and
/// the per-line remainder (parallel to `items`).
fn draw_down(
    items: &[OrderItem],
    availability: &AvailabilityMatrix,
    ranked: &[&WarehouseRate],
    config: &SplitConfig,
) -> (Vec<PlannedShipment>, Vec<i64>) {
    let mut remaining: Vec<i64> = items.iter().map(|i| i.quantity).collect();
    let mut shipments: Vec<PlannedShipment> = Vec::new();

    for rate in ranked {
        if shipments.len() >= config.max_shipments {
            break;
        }

        let draws: Vec<(usize, i64)> = items
            .iter()
            .enumerate()
            .filter(|(i, _)| remaining[*i] > 0)
            .filter_map(|(i, item)| {
                let held = availability.available(&rate.warehouse_id, &item.product_id);
                (held > 0).then(|| (i, held.min(remaining[i])))
            })
            .collect();

        if draws.is_empty() || draws.len() < config.min_items_per_shipment {
            continue;
        }

        let shipment_items = draws
            .iter()
            .map(|&(i, take)| {
                remaining[i] -= take;
                ShipmentItem::from_order_item(&items[i], take)
            })
            .collect();
        let priority = u32::try_from(shipments.len() + 1).unwrap_or(u32::MAX);
        shipments.push(PlannedShipment::new(rate, shipment_items, priority));
    }

    (shipments, remaining)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;
    use wareledger_core::ProductId;

    fn rate(warehouse_id: WarehouseId, cost: u64, days: u32) -> WarehouseRate {
        WarehouseRate {
            warehouse_id,
            warehouse_name: format!("WH {cost}"),
            distance_km: 100.0,
            shipping_cost: cost,
            estimated_days: days,
        }
    }

    fn input<'a>(
        items: &'a [OrderItem],
        availability: &'a AvailabilityMatrix,
        rates: &'a RateTable,
    ) -> PlanningInput<'a> {
        PlanningInput {
            order_id: OrderId::new(),
            items,
            availability,
            rates,
            now: Utc::now(),
        }
    }

    #[test]
    fn prefers_a_single_covering_warehouse() {
        let product = ProductId::new();
        let near = WarehouseId::new();
        let far = WarehouseId::new();
        let mut matrix = AvailabilityMatrix::new();
        matrix.insert(near, product, 20);
        matrix.insert(far, product, 20);
        let rates: RateTable = vec![rate(near, 500, 1), rate(far, 300, 5)].into_iter().collect();
        let items = vec![OrderItem::new(product, "A", 10)];

        let plan = plan_shipment(input(&items, &matrix, &rates), SplitStrategy::Fastest, &SplitConfig::default())
            .unwrap();
        assert!(!plan.is_split);
        assert_eq!(plan.shipments[0].warehouse_id, near);

        let plan = plan_shipment(input(&items, &matrix, &rates), SplitStrategy::Cheapest, &SplitConfig::default())
            .unwrap();
        assert_eq!(plan.shipments[0].warehouse_id, far);
        assert_eq!(plan.total_cost, 300);
        assert_eq!(plan.estimated_days, 5);
    }

    #[test]
    fn splits_across_two_warehouses_when_neither_covers() {
        let product = ProductId::new();
        let a = WarehouseId::new();
        let b = WarehouseId::new();
        let mut matrix = AvailabilityMatrix::new();
        matrix.insert(a, product, 5);
        matrix.insert(b, product, 5);
        let rates: RateTable = vec![rate(a, 400, 2), rate(b, 600, 3)].into_iter().collect();
        let items = vec![OrderItem::new(product, "A", 10)];

        let plan = plan_shipment(input(&items, &matrix, &rates), SplitStrategy::Balanced, &SplitConfig::default())
            .unwrap();
        assert!(plan.is_split);
        assert_eq!(plan.shipments.len(), 2);
        assert_eq!(plan.total_cost, 1_000);
        assert_eq!(plan.estimated_days, 3);
        assert_eq!(plan.shipments[0].priority, 1);
        assert_eq!(plan.shipments[1].priority, 2);
        assert_eq!(plan.split_reason.as_deref(), Some(SPLIT_REASON));
    }

    #[test]
    fn split_applies_combined_discount() {
        let product = ProductId::new();
        let a = WarehouseId::new();
        let b = WarehouseId::new();
        let mut matrix = AvailabilityMatrix::new();
        matrix.insert(a, product, 5);
        matrix.insert(b, product, 5);
        let rates: RateTable = vec![rate(a, 400, 2), rate(b, 600, 3)].into_iter().collect();
        let items = vec![OrderItem::new(product, "A", 10)];
        let config = SplitConfig {
            combined_shipping_discount_percent: 10,
            ..SplitConfig::default()
        };

        let plan = plan_shipment(input(&items, &matrix, &rates), SplitStrategy::Balanced, &config).unwrap();
        assert_eq!(plan.total_cost, 900);
    }

    #[test]
    fn split_disabled_is_reported() {
        let product = ProductId::new();
        let a = WarehouseId::new();
        let b = WarehouseId::new();
        let mut matrix = AvailabilityMatrix::new();
        matrix.insert(a, product, 5);
        matrix.insert(b, product, 5);
        let rates: RateTable = vec![rate(a, 400, 2), rate(b, 600, 3)].into_iter().collect();
        let items = vec![OrderItem::new(product, "A", 10)];
        let no_split = SplitConfig {
            allow_split: false,
            ..SplitConfig::default()
        };

        let err = plan_shipment(input(&items, &matrix, &rates), SplitStrategy::Balanced, &no_split)
            .unwrap_err();
        assert_eq!(err, DomainError::SplitNotAllowed);

        let err = plan_shipment(input(&items, &matrix, &rates), SplitStrategy::Single, &SplitConfig::default())
            .unwrap_err();
        assert_eq!(err, DomainError::SplitNotAllowed);
    }

    #[test]
    fn split_that_leaves_a_line_short_fails() {
        let product = ProductId::new();
        let a = WarehouseId::new();
        let mut matrix = AvailabilityMatrix::new();
        matrix.insert(a, product, 3);
        let rates: RateTable = std::iter::once(rate(a, 400, 2)).collect();
        let items = vec![OrderItem::new(product, "A", 10)];

        let err = plan_shipment(input(&items, &matrix, &rates), SplitStrategy::Balanced, &SplitConfig::default())
            .unwrap_err();
        assert_eq!(err, DomainError::CannotFulfill(product));
    }

    #[test]
    fn max_shipments_caps_the_split() {
        let product = ProductId::new();
        let mut matrix = AvailabilityMatrix::new();
        let mut rates = Vec::new();
        for cost in [100, 200, 300] {
            let wh = WarehouseId::new();
            matrix.insert(wh, product, 2);
            rates.push(rate(wh, cost, 1));
        }
        let rates: RateTable = rates.into_iter().collect();
        let items = vec![OrderItem::new(product, "A", 6)];
        let config = SplitConfig {
            max_shipments: 2,
            ..SplitConfig::default()
        };

        let err = plan_shipment(input(&items, &matrix, &rates), SplitStrategy::Cheapest, &config).unwrap_err();
        assert_eq!(err, DomainError::CannotFulfill(product));
    }

    #[test]
    fn warehouse_below_min_items_is_skipped_without_consuming_demand() {
        let a = ProductId::new();
        let b = ProductId::new();
        let only_a = WarehouseId::new();
        let both = WarehouseId::new();
        let mut matrix = AvailabilityMatrix::new();
        matrix.insert(only_a, a, 10);
        matrix.insert(both, a, 1);
        matrix.insert(both, b, 10);
        let rates: RateTable = vec![rate(only_a, 100, 1), rate(both, 900, 9)].into_iter().collect();
        let items = vec![OrderItem::new(a, "A", 2), OrderItem::new(b, "B", 2)];
        let config = SplitConfig {
            min_items_per_shipment: 2,
            ..SplitConfig::default()
        };

        let partial = plan_partial(input(&items, &matrix, &rates), &config).unwrap();
        let plan = partial.plan.unwrap();
        assert_eq!(plan.shipments.len(), 1);
        assert_eq!(plan.shipments[0].warehouse_id, both);
        assert_eq!(partial.backordered.len(), 1);
        assert_eq!(partial.backordered[0].product_id, a);
        assert_eq!(partial.backordered[0].quantity, 1);
    }

    #[test]
    fn nothing_in_stock_is_fully_backordered() {
        let product = ProductId::new();
        let matrix = AvailabilityMatrix::new();
        let rates = RateTable::default();
        let items = vec![OrderItem::new(product, "A", 4)];

        let partial = plan_partial(input(&items, &matrix, &rates), &SplitConfig::default()).unwrap();
        assert!(partial.is_fully_backordered());
        assert_eq!(partial.backordered, items);
    }

    #[test]
    fn partial_ships_what_it_can() {
        let a = ProductId::new();
        let b = ProductId::new();
        let wh = WarehouseId::new();
        let mut matrix = AvailabilityMatrix::new();
        matrix.insert(wh, a, 3);
        let rates: RateTable = std::iter::once(rate(wh, 250, 2)).collect();
        let items = vec![OrderItem::new(a, "A", 5), OrderItem::new(b, "B", 1)];

        let partial = plan_partial(input(&items, &matrix, &rates), &SplitConfig::default()).unwrap();
        let plan = partial.plan.unwrap();
        assert_eq!(plan.strategy, SplitStrategy::Partial);
        assert_eq!(plan.shipments[0].units(), 3);
        assert_eq!(plan.split_reason.as_deref(), Some(PARTIAL_REASON));

        let backordered: Vec<(ProductId, i64)> =
            partial.backordered.iter().map(|i| (i.product_id, i.quantity)).collect();
        assert_eq!(backordered, vec![(a, 2), (b, 1)]);
    }

    #[test]
    fn warehouses_without_rates_cannot_ship() {
        let product = ProductId::new();
        let wh = WarehouseId::new();
        let mut matrix = AvailabilityMatrix::new();
        matrix.insert(wh, product, 10);
        let rates = RateTable::default();
        let items = vec![OrderItem::new(product, "A", 1)];

        assert!(plan_single(input(&items, &matrix, &rates), SplitStrategy::Balanced).is_none());
        assert_eq!(single_warehouse_for(&items, &matrix), Some(wh));
    }

    #[test]
    fn empty_order_is_rejected() {
        let matrix = AvailabilityMatrix::new();
        let rates = RateTable::default();
        let err = plan_shipment(input(&[], &matrix, &rates), SplitStrategy::Balanced, &SplitConfig::default())
            .unwrap_err();
        assert_eq!(err, DomainError::NoItems);
    }

    proptest! {
        /// Property: a successful split plan ships exactly the ordered quantity
        /// of every line, never more than a warehouse holds, within the
        /// configured shipment and per-shipment limits.
        #[test]
        fn split_plans_cover_demand_within_limits(
            holdings in prop::collection::vec(prop::collection::vec(0i64..8, 3), 1..6),
            demand in prop::collection::vec(1i64..12, 3),
            max_shipments in 1usize..5,
            min_items in 1usize..3,
        ) {
            let products: Vec<ProductId> = (0..3).map(|_| ProductId::new()).collect();
            let mut matrix = AvailabilityMatrix::new();
            let mut rates = Vec::new();
            for (n, row) in holdings.iter().enumerate() {
                let wh = WarehouseId::new();
                for (p, held) in products.iter().zip(row) {
                    matrix.insert(wh, *p, *held);
                }
                rates.push(rate(wh, 100 + n as u64 * 37, 1 + (n as u32 % 4)));
            }
            let rates: RateTable = rates.into_iter().collect();
            let items: Vec<OrderItem> = products
                .iter()
                .zip(&demand)
                .map(|(p, q)| OrderItem::new(*p, "P", *q))
                .collect();
            let config = SplitConfig {
                max_shipments,
                min_items_per_shipment: min_items,
                ..SplitConfig::default()
            };

            if let Ok(plan) = plan_split(input(&items, &matrix, &rates), SplitStrategy::Balanced, &config) {
                prop_assert!(plan.shipments.len() <= max_shipments);

                let mut shipped: BTreeMap<ProductId, i64> = BTreeMap::new();
                for shipment in &plan.shipments {
                    prop_assert!(shipment.items.len() >= min_items);
                    for item in &shipment.items {
                        prop_assert!(item.quantity > 0);
                        prop_assert!(
                            item.quantity <= matrix.available(&shipment.warehouse_id, &item.product_id)
                        );
                        *shipped.entry(item.product_id).or_default() += item.quantity;
                    }
                }
                for item in &items {
                    prop_assert_eq!(shipped.get(&item.product_id).copied(), Some(item.quantity));
                }
            }
        }
    }
}
