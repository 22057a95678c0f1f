//! In-memory wiring of the three services for tests, demos and embedding.

use std::sync::Arc;

use wareledger_core::{Clock, SystemClock};
use wareledger_fulfillment::ShipmentPlan;
use wareledger_inventory::ExpiryAlert;

use crate::batch_ledger::BatchLedger;
use crate::collaborators::{InMemoryWarehouseDirectory, StaticRateProvider};
use crate::ledger::StockLedger;
use crate::planner::FulfillmentPlanner;
use crate::settings::Settings;
use crate::store::{InMemoryBatchStore, InMemoryLedgerStore, InMemoryRecordStore};

pub type InMemoryStockLedger<C> =
    StockLedger<Arc<InMemoryLedgerStore>, Arc<InMemoryWarehouseDirectory>, Arc<C>>;

pub type InMemoryBatchLedger<C> =
    BatchLedger<Arc<InMemoryBatchStore>, Arc<InMemoryRecordStore<ExpiryAlert>>, Arc<C>>;

pub type InMemoryPlanner<C> = FulfillmentPlanner<
    Arc<InMemoryStockLedger<C>>,
    Arc<InMemoryWarehouseDirectory>,
    Arc<StaticRateProvider>,
    Arc<InMemoryRecordStore<ShipmentPlan>>,
    Arc<C>,
>;

/// Services sharing one clock, one warehouse directory and one stock ledger.
pub struct InMemoryServices<C: Clock = SystemClock> {
    pub clock: Arc<C>,
    pub directory: Arc<InMemoryWarehouseDirectory>,
    pub rates: Arc<StaticRateProvider>,
    pub ledger: Arc<InMemoryStockLedger<C>>,
    pub batches: InMemoryBatchLedger<C>,
    pub planner: InMemoryPlanner<C>,
}

impl InMemoryServices<SystemClock> {
    pub fn new(settings: &Settings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }
}

impl<C: Clock> InMemoryServices<C> {
    pub fn with_clock(settings: &Settings, clock: Arc<C>) -> Self {
        let directory = Arc::new(InMemoryWarehouseDirectory::new());
        let rates = Arc::new(StaticRateProvider::new());
        let ledger = Arc::new(StockLedger::new(
            Arc::new(InMemoryLedgerStore::new()),
            directory.clone(),
            clock.clone(),
        ));
        let batches = BatchLedger::new(
            Arc::new(InMemoryBatchStore::new()),
            Arc::new(InMemoryRecordStore::new()),
            clock.clone(),
            settings.expiry,
        );
        let planner = FulfillmentPlanner::new(
            ledger.clone(),
            directory.clone(),
            rates.clone(),
            Arc::new(InMemoryRecordStore::new()),
            clock.clone(),
            settings.split,
        );

        Self {
            clock,
            directory,
            rates,
            ledger,
            batches,
            planner,
        }
    }
}
