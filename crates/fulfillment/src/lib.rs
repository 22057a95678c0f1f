//! Multi-warehouse fulfillment planning domain.
//!
//! Decides which warehouse(s) ship which units of an order under a
//! cost/speed/split-count trade-off. Pure logic over snapshots; the async
//! planner service in `wareledger-infra` gathers inputs and stores plans.

pub mod availability;
pub mod config;
pub mod item;
pub mod planning;
pub mod rate;
pub mod shipment;
pub mod strategy;

pub use availability::AvailabilityMatrix;
pub use config::SplitConfig;
pub use item::{Destination, OrderItem, ShipmentItem, validate_items};
pub use planning::{
    PartialPlan, PlanningInput, plan_partial, plan_shipment, plan_single, plan_split,
    single_warehouse_for,
};
pub use rate::{RateTable, WarehouseRate};
pub use shipment::{PlannedShipment, ShipmentPlan, ShipmentStatus};
pub use strategy::SplitStrategy;
