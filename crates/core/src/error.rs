//! Domain error model.

use thiserror::Error;

use crate::id::{AlertId, PlanId, ProductId, ReservationId, ShipmentId, WarehouseId};

/// Result type used across the ledger and planner.
pub type DomainResult<T> = Result<T, DomainError>;

/// Ledger / planning failure.
///
/// Stock-and-fit outcomes (`InsufficientStock`, `NoAvailableStock`, ...) are
/// ordinary results a caller branches on; not-found and validation variants
/// indicate a caller bug or a data-integrity problem. Nothing here is retried
/// inside the core.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A requested quantity was zero or negative.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(i64),

    #[error("product {product_id} has no stock row in warehouse {warehouse_id}")]
    ProductNotFound {
        warehouse_id: WarehouseId,
        product_id: ProductId,
    },

    #[error("warehouse not found: {0}")]
    WarehouseNotFound(WarehouseId),

    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i64, available: i64 },

    /// Transfer source equals destination.
    #[error("invalid transfer: source and destination are both {0}")]
    InvalidTransfer(WarehouseId),

    /// An adjustment would leave `reserved > quantity`.
    #[error("stock is reserved: {reserved} units committed, adjustment to {requested}")]
    StockReserved { reserved: i64, requested: i64 },

    #[error("reservation not found: {0}")]
    ReservationNotFound(ReservationId),

    #[error("reservation {0} is not active")]
    ReservationNotActive(ReservationId),

    #[error("expiry date is in the past")]
    ExpiryDateInPast,

    /// No batch is eligible for FEFO selection.
    #[error("no valid stock available")]
    NoValidStock,

    #[error("expiry alert not found: {0}")]
    AlertNotFound(AlertId),

    #[error("invalid alert transition: {from} -> {to}")]
    InvalidAlertTransition { from: String, to: String },

    #[error("no items to ship")]
    NoItems,

    #[error("split shipment not allowed for this order")]
    SplitNotAllowed,

    #[error("no available stock for items")]
    NoAvailableStock,

    /// Split planning left part of a line unallocated.
    #[error("cannot fulfill product: {0}")]
    CannotFulfill(ProductId),

    #[error("shipment plan not found: {0}")]
    PlanNotFound(PlanId),

    #[error("shipment not found: {0}")]
    ShipmentNotFound(ShipmentId),

    #[error("invalid shipment status transition: {from} -> {to}")]
    InvalidStatusTransition { from: String, to: String },

    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The planning decision phase ran past its deadline.
    #[error("planning deadline exceeded")]
    DeadlineExceeded,

    /// The distance/rate collaborator failed.
    #[error("rate provider failed: {0}")]
    Provider(String),

    /// Backing storage failed (including lock poisoning).
    #[error("storage failure: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn insufficient(requested: i64, available: i64) -> Self {
        Self::InsufficientStock {
            requested,
            available,
        }
    }

    /// Whether this is a normal stock/fit outcome rather than a fault.
    ///
    /// Callers are expected to branch on these (offer a backorder, try
    /// another strategy) instead of surfacing them as errors.
    pub fn is_business_outcome(&self) -> bool {
        matches!(
            self,
            DomainError::InsufficientStock { .. }
                | DomainError::NoAvailableStock
                | DomainError::NoValidStock
                | DomainError::SplitNotAllowed
                | DomainError::CannotFulfill(_)
        )
    }
}
