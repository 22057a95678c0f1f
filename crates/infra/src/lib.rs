//! Infrastructure layer: storage, the ledger and planner services, settings
//! and wiring.

pub mod batch_ledger;
pub mod bootstrap;
pub mod collaborators;
pub mod ledger;
pub mod planner;
pub mod settings;
pub mod store;

mod integration_tests;

pub use batch_ledger::BatchLedger;
pub use bootstrap::InMemoryServices;
pub use collaborators::{
    InMemoryWarehouseDirectory, RateProvider, StaticRateProvider, StockAvailability,
    WarehouseDirectory,
};
pub use ledger::StockLedger;
pub use planner::FulfillmentPlanner;
pub use settings::{Settings, SettingsError};
