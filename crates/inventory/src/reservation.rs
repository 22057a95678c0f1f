use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wareledger_core::{
    DomainError, DomainResult, Entity, OrderId, ProductId, ReservationId, WarehouseId,
};

use crate::stock::{StockKey, ensure_positive};

/// Reservation lifecycle.
///
/// `Active` has exactly one terminal transition; terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Active,
    Fulfilled,
    Cancelled,
    /// Released by the expiry sweep after `expires_at` passed.
    Expired,
}

impl ReservationStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ReservationStatus::Active)
    }
}

/// A temporary hold against available stock on behalf of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReservation {
    pub id: ReservationId,
    pub order_id: OrderId,
    pub warehouse_id: WarehouseId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub status: ReservationStatus,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// When the reservation reached its terminal status.
    pub closed_at: Option<DateTime<Utc>>,
}

impl StockReservation {
    pub fn new(
        id: ReservationId,
        order_id: OrderId,
        key: StockKey,
        quantity: i64,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        ensure_positive(quantity)?;
        Ok(Self {
            id,
            order_id,
            warehouse_id: key.warehouse_id,
            product_id: key.product_id,
            quantity,
            status: ReservationStatus::Active,
            expires_at,
            created_at: now,
            closed_at: None,
        })
    }

    pub fn key(&self) -> StockKey {
        StockKey::new(self.warehouse_id, self.product_id)
    }

    pub fn is_active(&self) -> bool {
        self.status == ReservationStatus::Active
    }

    /// Active and past its hold window.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && self.expires_at <= now
    }

    /// Move from `Active` to a terminal status.
    pub fn close(&mut self, status: ReservationStatus, now: DateTime<Utc>) -> DomainResult<()> {
        if !self.is_active() {
            return Err(DomainError::ReservationNotActive(self.id));
        }
        if !status.is_terminal() {
            return Err(DomainError::validation("reservation can only close into a terminal status"));
        }
        self.status = status;
        self.closed_at = Some(now);
        Ok(())
    }
}

impl Entity for StockReservation {
    type Id = ReservationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
