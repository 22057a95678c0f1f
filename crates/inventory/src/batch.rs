use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wareledger_core::{BatchId, DomainError, DomainResult, Entity, ProductId, WarehouseId};

use crate::stock::{StockKey, ensure_positive};

/// Command: receive one batch of a product into a warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveBatch {
    pub warehouse_id: WarehouseId,
    pub product_id: ProductId,
    pub sku: String,
    pub batch_number: String,
    pub lot_number: Option<String>,
    pub quantity: i64,
    /// `None` means the batch does not expire.
    pub expiry_date: Option<DateTime<Utc>>,
    /// Unit cost in smallest currency unit (e.g., cents).
    pub cost_price: Option<u64>,
    pub location: Option<String>,
}

/// Stock of one received batch, with its own quantity/reserved/available.
///
/// Same invariants as `Stock`, scoped per batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStock {
    pub id: BatchId,
    pub warehouse_id: WarehouseId,
    pub product_id: ProductId,
    pub sku: String,
    pub batch_number: String,
    pub lot_number: Option<String>,
    pub expiry_date: Option<DateTime<Utc>>,
    quantity: i64,
    reserved: i64,
    available: i64,
    pub cost_price: Option<u64>,
    pub location: Option<String>,
    pub received_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BatchStock {
    /// Validate a receipt and build the batch row.
    pub fn receive(id: BatchId, cmd: ReceiveBatch, now: DateTime<Utc>) -> DomainResult<Self> {
        ensure_positive(cmd.quantity)?;
        if cmd.expiry_date.is_some_and(|expiry| expiry < now) {
            return Err(DomainError::ExpiryDateInPast);
        }
        if cmd.batch_number.trim().is_empty() {
            return Err(DomainError::validation("batch number cannot be empty"));
        }

        Ok(Self {
            id,
            warehouse_id: cmd.warehouse_id,
            product_id: cmd.product_id,
            sku: cmd.sku,
            batch_number: cmd.batch_number,
            lot_number: cmd.lot_number,
            expiry_date: cmd.expiry_date,
            quantity: cmd.quantity,
            reserved: 0,
            available: cmd.quantity,
            cost_price: cmd.cost_price,
            location: cmd.location,
            received_at: now,
            updated_at: now,
        })
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

    pub fn is_consistent(&self) -> bool {
        self.reserved >= 0
            && self.reserved <= self.quantity
            && self.available == self.quantity - self.reserved
    }

    /// Expiry has been reached.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry_date.is_some_and(|expiry| expiry <= now)
    }

    /// Whole days left before expiry (truncated); negative once expired.
    pub fn days_until_expiry(&self, now: DateTime<Utc>) -> Option<i64> {
        self.expiry_date.map(|expiry| (expiry - now).num_days())
    }

    /// Expiring no later than `before` (and not undated).
    pub fn expires_before(&self, before: DateTime<Utc>) -> bool {
        self.expiry_date.is_some_and(|expiry| expiry <= before)
    }

    /// Cost value of the still-available units.
    pub fn available_value(&self) -> u64 {
        let units = u64::try_from(self.available).unwrap_or(0);
        units.saturating_mul(self.cost_price.unwrap_or(0))
    }

    pub fn reserve(&mut self, quantity: i64, now: DateTime<Utc>) -> DomainResult<()> {
        ensure_positive(quantity)?;
        if quantity > self.available {
            return Err(DomainError::insufficient(quantity, self.available));
        }
        self.reserved += quantity;
        self.touch(now);
        Ok(())
    }

    /// Drop a batch hold, clamping `reserved` at zero. Returns units released.
    pub fn release(&mut self, quantity: i64, now: DateTime<Utc>) -> i64 {
        let released = quantity.clamp(0, self.reserved);
        self.reserved -= released;
        self.touch(now);
        released
    }

    /// Destroy the unreserved units of an expired batch.
    ///
    /// Units already committed to a reservation stay on the books until that
    /// reservation resolves. Returns the number of units written off.
    pub fn write_off(&mut self, now: DateTime<Utc>) -> i64 {
        let destroyed = self.available;
        self.quantity = self.reserved;
        self.touch(now);
        destroyed
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.available = self.quantity - self.reserved;
        self.updated_at = now;
    }
}

impl Entity for BatchStock {
    type Id = BatchId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// One per-batch draw-down produced by FEFO allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchAllocation {
    pub batch_id: BatchId,
    pub batch_number: String,
    pub quantity: i64,
    pub expiry_date: Option<DateTime<Utc>>,
    pub location: Option<String>,
}
