use std::hint::black_box;
use std::sync::Arc;

use chrono::{Duration, Utc};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

use wareledger_core::{BatchId, OrderId, ProductId, SystemClock, WarehouseId};
use wareledger_fulfillment::{
    AvailabilityMatrix, OrderItem, PlanningInput, RateTable, SplitConfig, SplitStrategy,
    WarehouseRate, plan_shipment,
};
use wareledger_infra::StockLedger;
use wareledger_infra::store::InMemoryLedgerStore;
use wareledger_infra::InMemoryWarehouseDirectory;
use wareledger_inventory::{
    BatchStock, ExpiryConfig, ReceiveBatch, ReceiveStock, ReserveStock, StockKey, Warehouse,
    allocate_fefo,
};

fn batches(count: usize) -> Vec<BatchStock> {
    let now = Utc::now();
    let warehouse_id = WarehouseId::new();
    let product_id = ProductId::new();
    (0..count)
        .map(|i| {
            // Spread expiries so ordering has real work to do.
            let days = ((i * 7919) % 365) as i64 + 1;
            BatchStock::receive(
                BatchId::new(),
                ReceiveBatch {
                    warehouse_id,
                    product_id,
                    sku: "SKU-B".to_string(),
                    batch_number: format!("B-{i}"),
                    lot_number: None,
                    quantity: 10,
                    expiry_date: (i % 10 != 0).then(|| now + Duration::days(days)),
                    cost_price: Some(100),
                    location: None,
                },
                now,
            )
            .expect("valid batch")
        })
        .collect()
}

fn bench_fefo_allocation(c: &mut Criterion) {
    let mut group = c.benchmark_group("fefo_allocation");
    let config = ExpiryConfig::default();
    let now = Utc::now();

    for count in [10usize, 100, 1_000] {
        let rows = batches(count);
        let want = (count as i64 * 10) / 2;
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &rows, |b, rows| {
            b.iter(|| allocate_fefo(black_box(rows), black_box(want), &config, now).expect("covered"));
        });
    }
    group.finish();
}

fn bench_split_planning(c: &mut Criterion) {
    let mut group = c.benchmark_group("split_planning");
    let config = SplitConfig {
        max_shipments: 8,
        ..SplitConfig::default()
    };

    for warehouses in [4usize, 16, 64] {
        let products: Vec<ProductId> = (0..5).map(|_| ProductId::new()).collect();
        let mut matrix = AvailabilityMatrix::new();
        let mut rates = Vec::new();
        for w in 0..warehouses {
            let id = WarehouseId::new();
            for (p, product) in products.iter().enumerate() {
                if (w + p) % 3 != 0 {
                    matrix.insert(id, *product, 3);
                }
            }
            rates.push(WarehouseRate {
                warehouse_id: id,
                warehouse_name: format!("W{w}"),
                distance_km: w as f64 * 10.0,
                shipping_cost: 100 + (w as u64 * 37) % 400,
                estimated_days: 1 + (w as u32 % 5),
            });
        }
        let rates: RateTable = rates.into_iter().collect();
        let items: Vec<OrderItem> = products.iter().map(|p| OrderItem::new(*p, "SKU", 5)).collect();

        group.bench_function(BenchmarkId::from_parameter(warehouses), |b| {
            b.iter(|| {
                let input = PlanningInput {
                    order_id: OrderId::new(),
                    items: &items,
                    availability: &matrix,
                    rates: &rates,
                    now: Utc::now(),
                };
                black_box(plan_shipment(input, SplitStrategy::Balanced, &config))
            });
        });
    }
    group.finish();
}

fn bench_reserve_release(c: &mut Criterion) {
    let warehouse_id = WarehouseId::new();
    let product_id = ProductId::new();
    let directory = Arc::new(InMemoryWarehouseDirectory::new());
    directory
        .register(Warehouse::new(warehouse_id, "WH", "Bench", 1, Utc::now()))
        .expect("register");
    let ledger = StockLedger::new(Arc::new(InMemoryLedgerStore::new()), directory, SystemClock);
    ledger
        .receive_stock(ReceiveStock::new(StockKey::new(warehouse_id, product_id), "SKU", 1_000_000))
        .expect("receive");

    c.bench_function("reserve_then_release", |b| {
        b.iter(|| {
            let reservation = ledger
                .reserve_stock(ReserveStock {
                    order_id: OrderId::new(),
                    warehouse_id,
                    product_id,
                    quantity: 1,
                    expires_at: Utc::now() + Duration::minutes(15),
                })
                .expect("reserve");
            ledger.release_reservation(reservation.id).expect("release")
        });
    });
}

criterion_group!(
    benches,
    bench_fefo_allocation,
    bench_split_planning,
    bench_reserve_release
);
criterion_main!(benches);
