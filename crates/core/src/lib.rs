//! `wareledger-core` : shared building blocks for the ledger and planner.
//!
//! This crate contains **pure domain** primitives (no storage, no locking).

pub mod clock;
pub mod entity;
pub mod error;
pub mod id;

pub use clock::{Clock, FixedClock, SystemClock};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{
    AlertId, BatchId, MovementId, OrderId, PlanId, ProductId, ReservationId, ShipmentId,
    WarehouseId,
};
