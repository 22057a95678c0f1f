use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wareledger_core::{Entity, MovementId, ProductId, WarehouseId};

/// What a ledger movement records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Receipt,
    Shipment,
    TransferOut,
    TransferIn,
    Adjustment,
    Reservation,
    Release,
    Fulfillment,
    /// A reservation released by the expiry sweep.
    Expiry,
}

impl MovementKind {
    /// Stable event name (e.g. "inventory.stock.received").
    pub fn event_type(self) -> &'static str {
        match self {
            MovementKind::Receipt => "inventory.stock.received",
            MovementKind::Shipment => "inventory.stock.shipped",
            MovementKind::TransferOut => "inventory.stock.transferred_out",
            MovementKind::TransferIn => "inventory.stock.transferred_in",
            MovementKind::Adjustment => "inventory.stock.adjusted",
            MovementKind::Reservation => "inventory.reservation.created",
            MovementKind::Release => "inventory.reservation.released",
            MovementKind::Fulfillment => "inventory.reservation.fulfilled",
            MovementKind::Expiry => "inventory.reservation.expired",
        }
    }
}

/// Business document that caused a movement (order, purchase, transfer, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef {
    pub doc_type: String,
    pub doc_id: String,
}

impl DocumentRef {
    pub fn new(doc_type: impl Into<String>, doc_id: impl Into<String>) -> Self {
        Self {
            doc_type: doc_type.into(),
            doc_id: doc_id.into(),
        }
    }
}

/// Append-only audit record of one ledger-affecting operation.
///
/// Movements are facts: never mutated, never deleted. `quantity` is always
/// positive; direction is given by `from_warehouse` / `to_warehouse`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: MovementId,
    pub kind: MovementKind,
    pub from_warehouse: Option<WarehouseId>,
    pub to_warehouse: Option<WarehouseId>,
    pub product_id: ProductId,
    pub sku: String,
    pub quantity: i64,
    pub document: Option<DocumentRef>,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl StockMovement {
    pub fn new(
        kind: MovementKind,
        product_id: ProductId,
        sku: impl Into<String>,
        quantity: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MovementId::new(),
            kind,
            from_warehouse: None,
            to_warehouse: None,
            product_id,
            sku: sku.into(),
            quantity,
            document: None,
            reason: None,
            notes: None,
            occurred_at,
        }
    }

    pub fn from_warehouse(mut self, warehouse_id: WarehouseId) -> Self {
        self.from_warehouse = Some(warehouse_id);
        self
    }

    pub fn to_warehouse(mut self, warehouse_id: WarehouseId) -> Self {
        self.to_warehouse = Some(warehouse_id);
        self
    }

    pub fn with_document(mut self, document: Option<DocumentRef>) -> Self {
        self.document = document;
        self
    }

    pub fn with_reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }

    /// Whether the movement touches `warehouse_id` on either side.
    pub fn involves(&self, warehouse_id: WarehouseId) -> bool {
        self.from_warehouse == Some(warehouse_id) || self.to_warehouse == Some(warehouse_id)
    }

    pub fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }
}

impl Entity for StockMovement {
    type Id = MovementId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Query over the movement log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovementFilter {
    pub warehouse_id: Option<WarehouseId>,
    pub product_id: Option<ProductId>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Maximum number of movements returned (newest first).
    pub limit: Option<usize>,
}

impl MovementFilter {
    pub fn for_warehouse(warehouse_id: WarehouseId) -> Self {
        Self {
            warehouse_id: Some(warehouse_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, movement: &StockMovement) -> bool {
        if let Some(wh) = self.warehouse_id {
            if !movement.involves(wh) {
                return false;
            }
        }
        if let Some(product_id) = self.product_id {
            if movement.product_id != product_id {
                return false;
            }
        }
        if let Some(from) = self.from {
            if movement.occurred_at < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if movement.occurred_at > to {
                return false;
            }
        }
        true
    }
}
