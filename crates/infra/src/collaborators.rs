//! Seams to the systems around the ledger: the warehouse directory, the
//! distance/rate provider and the stock-by-product query used for planning.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use wareledger_core::{DomainError, DomainResult, ProductId, WarehouseId};
use wareledger_fulfillment::{Destination, WarehouseRate};
use wareledger_inventory::{Stock, Warehouse};

use crate::store::{InMemoryRecordStore, RecordStore};
use crate::store::record::poisoned;

/// Warehouse ID -> {name, is_active, accepts_orders, priority, ...}.
pub trait WarehouseDirectory: Send + Sync {
    fn warehouse(&self, id: WarehouseId) -> DomainResult<Option<Warehouse>>;
    fn warehouses(&self) -> DomainResult<Vec<Warehouse>>;

    /// The warehouse, or `WarehouseNotFound`.
    fn require(&self, id: WarehouseId) -> DomainResult<Warehouse> {
        self.warehouse(id)?.ok_or(DomainError::WarehouseNotFound(id))
    }
}

impl<D: WarehouseDirectory + ?Sized> WarehouseDirectory for std::sync::Arc<D> {
    fn warehouse(&self, id: WarehouseId) -> DomainResult<Option<Warehouse>> {
        (**self).warehouse(id)
    }

    fn warehouses(&self) -> DomainResult<Vec<Warehouse>> {
        (**self).warehouses()
    }
}

/// In-memory directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryWarehouseDirectory {
    records: InMemoryRecordStore<Warehouse>,
}

impl InMemoryWarehouseDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, warehouse: Warehouse) -> DomainResult<()> {
        self.records.upsert(warehouse)
    }
}

impl WarehouseDirectory for InMemoryWarehouseDirectory {
    fn warehouse(&self, id: WarehouseId) -> DomainResult<Option<Warehouse>> {
        self.records.get(&id)
    }

    fn warehouses(&self) -> DomainResult<Vec<Warehouse>> {
        let mut all = self.records.list()?;
        all.sort_by_key(|w| (w.priority, w.id));
        Ok(all)
    }
}

/// Stock rows for a product across all warehouses.
pub trait StockAvailability: Send + Sync {
    fn stock_by_product(&self, product_id: ProductId) -> DomainResult<Vec<Stock>>;
}

impl<A: StockAvailability + ?Sized> StockAvailability for std::sync::Arc<A> {
    fn stock_by_product(&self, product_id: ProductId) -> DomainResult<Vec<Stock>> {
        (**self).stock_by_product(product_id)
    }
}

/// Distance/rate collaborator: destination -> per-warehouse quotes.
///
/// The only await point of planning besides storage.
#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn warehouse_rates(&self, destination: Destination) -> DomainResult<Vec<WarehouseRate>>;
}

#[async_trait]
impl<R: RateProvider + ?Sized> RateProvider for std::sync::Arc<R> {
    async fn warehouse_rates(&self, destination: Destination) -> DomainResult<Vec<WarehouseRate>> {
        (**self).warehouse_rates(destination).await
    }
}

/// Fixed quotes regardless of destination, for tests/dev.
#[derive(Debug, Default)]
pub struct StaticRateProvider {
    rates: RwLock<HashMap<WarehouseId, WarehouseRate>>,
    failure: RwLock<Option<String>>,
}

impl StaticRateProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rates(rates: impl IntoIterator<Item = WarehouseRate>) -> Self {
        let provider = Self::new();
        for rate in rates {
            provider.set_rate(rate);
        }
        provider
    }

    pub fn set_rate(&self, rate: WarehouseRate) {
        if let Ok(mut rates) = self.rates.write() {
            rates.insert(rate.warehouse_id, rate);
        }
    }

    /// Make every subsequent call fail with `message` (`None` to recover).
    pub fn fail_with(&self, message: Option<String>) {
        if let Ok(mut failure) = self.failure.write() {
            *failure = message;
        }
    }
}

#[async_trait]
impl RateProvider for StaticRateProvider {
    async fn warehouse_rates(&self, _destination: Destination) -> DomainResult<Vec<WarehouseRate>> {
        if let Some(message) = self.failure.read().map_err(poisoned)?.clone() {
            return Err(DomainError::provider(message));
        }
        let rates = self.rates.read().map_err(poisoned)?;
        let mut quotes: Vec<WarehouseRate> = rates.values().cloned().collect();
        quotes.sort_by_key(|r| r.warehouse_id);
        Ok(quotes)
    }
}
