//! Planner behaviour around the async rate provider.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use wareledger_core::{DomainError, DomainResult, FixedClock, OrderId, ProductId, WarehouseId};
use wareledger_fulfillment::{
    Destination, OrderItem, ShipmentPlan, SplitConfig, SplitStrategy, WarehouseRate,
};
use wareledger_infra::store::{InMemoryLedgerStore, InMemoryRecordStore, RecordStore};
use wareledger_infra::{
    FulfillmentPlanner, InMemoryWarehouseDirectory, RateProvider, Settings, StockLedger,
};
use wareledger_inventory::{ReceiveStock, StockKey, Warehouse};

/// Quotes every warehouse after a fixed delay, counting calls.
struct SlowRates {
    delay: Duration,
    rates: Vec<WarehouseRate>,
    calls: AtomicUsize,
}

#[async_trait]
impl RateProvider for SlowRates {
    async fn warehouse_rates(&self, _destination: Destination) -> DomainResult<Vec<WarehouseRate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(self.rates.clone())
    }
}

struct Setup {
    planner: FulfillmentPlanner<
        Arc<StockLedger<Arc<InMemoryLedgerStore>, Arc<InMemoryWarehouseDirectory>, Arc<FixedClock>>>,
        Arc<InMemoryWarehouseDirectory>,
        Arc<SlowRates>,
        Arc<InMemoryRecordStore<ShipmentPlan>>,
        Arc<FixedClock>,
    >,
    plans: Arc<InMemoryRecordStore<ShipmentPlan>>,
    rates: Arc<SlowRates>,
    product: ProductId,
}

fn setup(delay: Duration, config: SplitConfig) -> Setup {
    wareledger_observability::init();

    let clock = Arc::new(FixedClock::new(Utc::now()));
    let directory = Arc::new(InMemoryWarehouseDirectory::new());
    let ledger = Arc::new(StockLedger::new(
        Arc::new(InMemoryLedgerStore::new()),
        directory.clone(),
        clock.clone(),
    ));

    let product = ProductId::new();
    let mut rates = Vec::new();
    for (i, (cost, days, held)) in [(200u64, 2u32, 4i64), (350, 3, 4), (500, 1, 4)].into_iter().enumerate() {
        let id = WarehouseId::new();
        directory
            .register(Warehouse::new(id, format!("W{i}"), format!("Depot {i}"), 1, Utc::now()))
            .unwrap();
        ledger
            .receive_stock(ReceiveStock::new(StockKey::new(id, product), "SKU-S", held))
            .unwrap();
        rates.push(WarehouseRate {
            warehouse_id: id,
            warehouse_name: format!("Depot {i}"),
            distance_km: 100.0 * (i as f64 + 1.0),
            shipping_cost: cost,
            estimated_days: days,
        });
    }

    let rates = Arc::new(SlowRates {
        delay,
        rates,
        calls: AtomicUsize::new(0),
    });
    let plans = Arc::new(InMemoryRecordStore::new());
    let planner = FulfillmentPlanner::new(ledger, directory, rates.clone(), plans.clone(), clock, config);
    Setup {
        planner,
        plans,
        rates,
        product,
    }
}

#[tokio::test(start_paused = true)]
async fn slow_provider_hits_the_planning_deadline_and_stores_nothing() {
    let config = SplitConfig {
        planning_timeout_ms: 50,
        ..SplitConfig::default()
    };
    let s = setup(Duration::from_millis(500), config);

    let items = vec![OrderItem::new(s.product, "SKU-S", 2)];
    let err = s
        .planner
        .plan_shipment(OrderId::new(), &items, Destination::new(0.0, 0.0), SplitStrategy::Fastest)
        .await
        .unwrap_err();

    assert_eq!(err, DomainError::DeadlineExceeded);
    assert!(s.plans.list().unwrap().is_empty());
    assert_eq!(s.rates.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn within_the_deadline_the_plan_is_stored() {
    let s = setup(Duration::from_millis(10), SplitConfig::default());

    let items = vec![OrderItem::new(s.product, "SKU-S", 2)];
    let plan = s
        .planner
        .plan_shipment(OrderId::new(), &items, Destination::new(0.0, 0.0), SplitStrategy::Fastest)
        .await
        .unwrap();

    assert_eq!(plan.estimated_days, 1);
    assert_eq!(s.plans.list().unwrap(), vec![plan]);
}

#[tokio::test]
async fn split_respects_max_shipments_and_discount() {
    let settings = Settings {
        split: SplitConfig {
            max_shipments: 2,
            combined_shipping_discount_percent: 10,
            ..SplitConfig::default()
        },
        ..Settings::default()
    };
    let s = setup(Duration::ZERO, settings.split);

    let fits_in_two = vec![OrderItem::new(s.product, "SKU-S", 8)];
    let plan = s
        .planner
        .plan_shipment(OrderId::new(), &fits_in_two, Destination::new(0.0, 0.0), SplitStrategy::Cheapest)
        .await
        .unwrap();
    assert_eq!(plan.shipments.len(), 2);
    assert_eq!(plan.total_cost, (200 + 350) * 9 / 10);
    assert_eq!(plan.estimated_days, 3);

    let needs_three = vec![OrderItem::new(s.product, "SKU-S", 12)];
    let err = s
        .planner
        .plan_shipment(OrderId::new(), &needs_three, Destination::new(0.0, 0.0), SplitStrategy::Cheapest)
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::CannotFulfill(s.product));
}

#[tokio::test]
async fn concurrent_plans_for_different_orders_do_not_block() {
    let s = Arc::new(setup(Duration::from_millis(20), SplitConfig::default()));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let s = s.clone();
            tokio::spawn(async move {
                let items = vec![OrderItem::new(s.product, "SKU-S", 3)];
                s.planner
                    .plan_shipment(OrderId::new(), &items, Destination::new(0.0, 0.0), SplitStrategy::Balanced)
                    .await
            })
        })
        .collect();

    for task in tasks {
        assert!(!task.await.unwrap().unwrap().is_split);
    }
    assert_eq!(s.plans.list().unwrap().len(), 8);
}
