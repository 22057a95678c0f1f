//! Inventory ledger domain.
//!
//! Business rules for stock rows, reservations, batches and expiry, implemented
//! as deterministic domain logic (no IO, no locks, no storage). The services in
//! `wareledger-infra` own concurrency and persistence and call into these types.

pub mod allocation;
pub mod batch;
pub mod command;
pub mod expiry;
pub mod fefo;
pub mod movement;
pub mod reservation;
pub mod stock;
pub mod warehouse;

pub use allocation::{AllocationPicker, AllocationResult};
pub use batch::{BatchAllocation, BatchStock, ReceiveBatch};
pub use command::{AdjustStock, ReceiveStock, ReserveStock, ShipStock, TransferStock};
pub use expiry::{AlertStatus, AlertType, ExpiryAlert, ExpiryConfig, ExpiryDashboard};
pub use fefo::{allocate_fefo, eligible_batches, select_fefo};
pub use movement::{DocumentRef, MovementFilter, MovementKind, StockMovement};
pub use reservation::{ReservationStatus, StockReservation};
pub use stock::{Stock, StockKey, ensure_positive};
pub use warehouse::{Warehouse, WarehouseKind};
