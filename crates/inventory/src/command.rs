//! Ledger commands: the inputs accepted by the stock ledger service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wareledger_core::{OrderId, ProductId, WarehouseId};

use crate::movement::DocumentRef;
use crate::stock::StockKey;

/// Command: ReceiveStock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveStock {
    pub warehouse_id: WarehouseId,
    pub product_id: ProductId,
    pub sku: String,
    pub quantity: i64,
    pub reason: Option<String>,
    /// Purchase order, return, transfer note, ...
    pub document: Option<DocumentRef>,
    pub notes: Option<String>,
}

impl ReceiveStock {
    pub fn new(key: StockKey, sku: impl Into<String>, quantity: i64) -> Self {
        Self {
            warehouse_id: key.warehouse_id,
            product_id: key.product_id,
            sku: sku.into(),
            quantity,
            reason: None,
            document: None,
            notes: None,
        }
    }

    pub fn key(&self) -> StockKey {
        StockKey::new(self.warehouse_id, self.product_id)
    }
}

/// Command: ShipStock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipStock {
    pub warehouse_id: WarehouseId,
    pub product_id: ProductId,
    pub sku: String,
    pub quantity: i64,
    pub document: Option<DocumentRef>,
}

impl ShipStock {
    pub fn new(key: StockKey, sku: impl Into<String>, quantity: i64) -> Self {
        Self {
            warehouse_id: key.warehouse_id,
            product_id: key.product_id,
            sku: sku.into(),
            quantity,
            document: None,
        }
    }

    pub fn key(&self) -> StockKey {
        StockKey::new(self.warehouse_id, self.product_id)
    }
}

/// Command: ReserveStock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveStock {
    pub order_id: OrderId,
    pub warehouse_id: WarehouseId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub expires_at: DateTime<Utc>,
}

impl ReserveStock {
    pub fn key(&self) -> StockKey {
        StockKey::new(self.warehouse_id, self.product_id)
    }
}

/// Command: TransferStock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferStock {
    pub from_warehouse: WarehouseId,
    pub to_warehouse: WarehouseId,
    pub product_id: ProductId,
    pub sku: String,
    pub quantity: i64,
    pub notes: Option<String>,
}

impl TransferStock {
    pub fn source(&self) -> StockKey {
        StockKey::new(self.from_warehouse, self.product_id)
    }

    pub fn destination(&self) -> StockKey {
        StockKey::new(self.to_warehouse, self.product_id)
    }
}

/// Command: AdjustStock (set the counted quantity).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustStock {
    pub warehouse_id: WarehouseId,
    pub product_id: ProductId,
    pub sku: String,
    pub new_quantity: i64,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

impl AdjustStock {
    pub fn key(&self) -> StockKey {
        StockKey::new(self.warehouse_id, self.product_id)
    }
}
