use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wareledger_core::{DomainError, DomainResult, ProductId, WarehouseId};

/// Identity of a stock row: one per (warehouse, product) pair.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StockKey {
    pub warehouse_id: WarehouseId,
    pub product_id: ProductId,
}

impl StockKey {
    pub fn new(warehouse_id: WarehouseId, product_id: ProductId) -> Self {
        Self {
            warehouse_id,
            product_id,
        }
    }
}

impl core::fmt::Display for StockKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.warehouse_id, self.product_id)
    }
}

/// Committed vs. available stock for one (warehouse, product) pair.
///
/// Invariant: `available == quantity - reserved` and `0 <= reserved <= quantity`.
/// The counters are private; every change goes through a method that checks
/// the request and recomputes `available`.
///
/// Rows are never deleted. A row drained to zero stays for history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stock {
    pub warehouse_id: WarehouseId,
    pub product_id: ProductId,
    pub sku: String,
    quantity: i64,
    reserved: i64,
    available: i64,
    /// Low-stock threshold; 0 disables the check.
    pub min_stock: i64,
    /// Unit cost in smallest currency unit (e.g., cents).
    pub cost_price: Option<u64>,
    /// Shelf/bin location.
    pub location: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Stock {
    /// Zero baseline row, created on first receipt into a warehouse.
    pub fn new(
        warehouse_id: WarehouseId,
        product_id: ProductId,
        sku: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            warehouse_id,
            product_id,
            sku: sku.into(),
            quantity: 0,
            reserved: 0,
            available: 0,
            min_stock: 0,
            cost_price: None,
            location: None,
            updated_at: now,
        }
    }

    pub fn key(&self) -> StockKey {
        StockKey::new(self.warehouse_id, self.product_id)
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn reserved(&self) -> i64 {
        self.reserved
    }

    pub fn available(&self) -> i64 {
        self.available
    }

    pub fn is_low(&self) -> bool {
        self.min_stock > 0 && self.available <= self.min_stock
    }

    /// Whether the numeric invariants hold.
    pub fn is_consistent(&self) -> bool {
        self.reserved >= 0
            && self.reserved <= self.quantity
            && self.available == self.quantity - self.reserved
    }

    /// Add received units. A receipt the row cannot hold is refused.
    pub fn receive(&mut self, quantity: i64, now: DateTime<Utc>) -> DomainResult<()> {
        ensure_positive(quantity)?;
        self.quantity = self
            .quantity
            .checked_add(quantity)
            .ok_or(DomainError::InvalidQuantity(quantity))?;
        self.touch(now);
        Ok(())
    }

    /// Remove units that physically leave the warehouse.
    ///
    /// Only unreserved units can ship this way; reserved units are owned by
    /// their reservation.
    pub fn ship(&mut self, quantity: i64, now: DateTime<Utc>) -> DomainResult<()> {
        ensure_positive(quantity)?;
        self.ensure_available(quantity)?;
        self.quantity -= quantity;
        self.touch(now);
        Ok(())
    }

    /// Commit units to a reservation.
    pub fn reserve(&mut self, quantity: i64, now: DateTime<Utc>) -> DomainResult<()> {
        ensure_positive(quantity)?;
        self.ensure_available(quantity)?;
        self.reserved += quantity;
        self.touch(now);
        Ok(())
    }

    /// Drop a reservation hold, clamping `reserved` at zero.
    ///
    /// Returns the number of units actually released. The clamp repairs drift
    /// from double-processing instead of letting `reserved` go negative.
    pub fn release(&mut self, quantity: i64, now: DateTime<Utc>) -> i64 {
        let released = quantity.clamp(0, self.reserved);
        self.reserved -= released;
        self.touch(now);
        released
    }

    /// Set the counted quantity (inventory count / correction).
    ///
    /// Returns the signed difference from the previous quantity.
    pub fn set_quantity(&mut self, quantity: i64, now: DateTime<Utc>) -> DomainResult<i64> {
        if quantity < 0 {
            return Err(DomainError::InvalidQuantity(quantity));
        }
        if quantity < self.reserved {
            return Err(DomainError::StockReserved {
                reserved: self.reserved,
                requested: quantity,
            });
        }
        let delta = quantity - self.quantity;
        if delta != 0 {
            self.quantity = quantity;
            self.touch(now);
        }
        Ok(delta)
    }

    fn ensure_available(&self, quantity: i64) -> DomainResult<()> {
        if quantity > self.available {
            return Err(DomainError::insufficient(quantity, self.available));
        }
        Ok(())
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.available = self.quantity - self.reserved;
        self.updated_at = now;
    }
}

/// Reject zero and negative quantities.
pub fn ensure_positive(quantity: i64) -> DomainResult<()> {
    if quantity <= 0 {
        return Err(DomainError::InvalidQuantity(quantity));
    }
    Ok(())
}
