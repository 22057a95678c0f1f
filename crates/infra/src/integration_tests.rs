//! End-to-end tests across the wired services.
//!
//! Flow: receive → plan → reserve per shipment → fulfill → ship, with the
//! movement log observed through a subscriber.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration as StdDuration;

    use chrono::{Duration, Utc};

    use wareledger_core::{Clock, DomainError, FixedClock, OrderId, ProductId, WarehouseId};
    use wareledger_fulfillment::{Destination, OrderItem, SplitStrategy, WarehouseRate};
    use wareledger_inventory::{
        MovementKind, ReceiveBatch, ReceiveStock, ReserveStock, ShipStock, StockKey, Warehouse,
    };

    use crate::bootstrap::InMemoryServices;
    use crate::collaborators::WarehouseDirectory;
    use crate::settings::Settings;

    fn services() -> InMemoryServices<FixedClock> {
        InMemoryServices::with_clock(&Settings::default(), Arc::new(FixedClock::new(Utc::now())))
    }

    fn add_warehouse(s: &InMemoryServices<FixedClock>, code: &str, cost: u64, days: u32) -> WarehouseId {
        let id = WarehouseId::new();
        s.directory
            .register(Warehouse::new(id, code, format!("{code} DC"), 1, s.clock.now()))
            .unwrap();
        s.rates.set_rate(WarehouseRate {
            warehouse_id: id,
            warehouse_name: format!("{code} DC"),
            distance_km: 42.0,
            shipping_cost: cost,
            estimated_days: days,
        });
        id
    }

    #[tokio::test]
    async fn split_order_is_reserved_fulfilled_and_shipped() {
        let s = services();
        let product = ProductId::new();
        let east = add_warehouse(&s, "EAST", 300, 2);
        let west = add_warehouse(&s, "WEST", 500, 4);
        for wh in [east, west] {
            s.ledger
                .receive_stock(ReceiveStock::new(StockKey::new(wh, product), "SKU-42", 6))
                .unwrap();
        }
        let movements = s.ledger.subscribe();

        let order = OrderId::new();
        let items = vec![OrderItem::new(product, "SKU-42", 10)];
        let plan = s
            .planner
            .plan_shipment(order, &items, Destination::new(40.4, -3.7), SplitStrategy::Balanced)
            .await
            .unwrap();
        assert!(plan.is_split);
        assert_eq!(plan.shipments.iter().map(|sh| sh.units()).sum::<i64>(), 10);

        for shipment in &plan.shipments {
            for item in &shipment.items {
                let reservation = s
                    .ledger
                    .reserve_stock(ReserveStock {
                        order_id: order,
                        warehouse_id: shipment.warehouse_id,
                        product_id: item.product_id,
                        quantity: item.quantity,
                        expires_at: s.clock.now() + Duration::hours(2),
                    })
                    .unwrap();
                s.ledger.fulfill_reservation(reservation.id).unwrap();
                s.ledger
                    .ship_stock(ShipStock::new(
                        StockKey::new(shipment.warehouse_id, item.product_id),
                        &item.sku,
                        item.quantity,
                    ))
                    .unwrap();
            }
        }

        assert_eq!(s.ledger.get_total_available(product).unwrap(), 2);
        assert_eq!(s.ledger.get_reservations_by_order(order).unwrap().len(), 2);

        let kinds: Vec<MovementKind> = std::iter::from_fn(|| movements.recv_timeout(StdDuration::from_millis(100)).ok())
            .map(|m| m.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                MovementKind::Reservation,
                MovementKind::Fulfillment,
                MovementKind::Shipment,
                MovementKind::Reservation,
                MovementKind::Fulfillment,
                MovementKind::Shipment,
            ]
        );
    }

    #[tokio::test]
    async fn inactive_warehouses_are_not_planned_from() {
        let s = services();
        let product = ProductId::new();
        let closed = add_warehouse(&s, "CLOSED", 100, 1);
        let open = add_warehouse(&s, "OPEN", 900, 5);
        for wh in [closed, open] {
            s.ledger
                .receive_stock(ReceiveStock::new(StockKey::new(wh, product), "SKU-7", 10))
                .unwrap();
        }
        let mut warehouse = s.directory.require(closed).unwrap();
        warehouse.accepts_orders = false;
        s.directory.register(warehouse).unwrap();

        let items = vec![OrderItem::new(product, "SKU-7", 3)];
        let plan = s
            .planner
            .plan_shipment(OrderId::new(), &items, Destination::new(0.0, 0.0), SplitStrategy::Cheapest)
            .await
            .unwrap();
        assert_eq!(plan.shipments[0].warehouse_id, open);
        assert_eq!(s.ledger.allocate_stock(product, 3).unwrap().warehouse_id, Some(open));
    }

    #[tokio::test]
    async fn partial_plan_backorders_the_remainder() {
        let s = services();
        let have = ProductId::new();
        let missing = ProductId::new();
        let wh = add_warehouse(&s, "MAIN", 250, 2);
        s.ledger
            .receive_stock(ReceiveStock::new(StockKey::new(wh, have), "SKU-H", 4))
            .unwrap();

        let items = vec![
            OrderItem::new(have, "SKU-H", 6),
            OrderItem::new(missing, "SKU-M", 2),
        ];
        let partial = s
            .planner
            .calculate_partial_shipment(OrderId::new(), &items, Destination::new(1.0, 1.0))
            .await
            .unwrap();

        let plan = partial.plan.unwrap();
        assert_eq!(plan.shipments.len(), 1);
        assert_eq!(plan.shipments[0].units(), 4);
        assert_eq!(plan.split_reason.as_deref(), Some("partial fulfillment, some items backordered"));
        let backordered: Vec<(ProductId, i64)> =
            partial.backordered.iter().map(|i| (i.product_id, i.quantity)).collect();
        assert_eq!(backordered, vec![(have, 2), (missing, 2)]);

        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["strategy"], "partial");
        assert_eq!(json["shipments"][0]["status"], "planned");
    }

    #[test]
    fn batch_expiry_follows_the_shared_clock() {
        let s = services();
        let wh = add_warehouse(&s, "COLD", 100, 1);
        let product = ProductId::new();

        s.batches
            .receive_batch_stock(ReceiveBatch {
                warehouse_id: wh,
                product_id: product,
                sku: "SKU-Y".to_string(),
                batch_number: "Y-1".to_string(),
                lot_number: Some("L7".to_string()),
                quantity: 12,
                expiry_date: Some(s.clock.now() + Duration::days(20)),
                cost_price: Some(100),
                location: None,
            })
            .unwrap();
        assert_eq!(s.batches.expiry_dashboard(wh).unwrap().warning_count, 1);

        s.clock.advance(Duration::days(15));
        assert_eq!(s.batches.expiry_dashboard(wh).unwrap().critical_count, 1);

        s.clock.advance(Duration::days(6));
        assert_eq!(s.batches.expiry_dashboard(wh).unwrap().expired_count, 1);
        assert_eq!(
            s.batches.allocate_fefo(wh, product, 1).unwrap_err(),
            DomainError::NoValidStock
        );
    }
}
