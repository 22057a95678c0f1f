use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wareledger_core::{Entity, WarehouseId};

/// What a location is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarehouseKind {
    Main,
    Store,
    Dropship,
    Supplier,
}

/// Warehouse directory entry.
///
/// `priority` drives stock allocation: lower numbers are preferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: WarehouseId,
    pub code: String,
    pub name: String,
    pub kind: WarehouseKind,
    pub priority: i32,
    pub is_active: bool,
    pub is_default: bool,
    /// Whether the location may fulfill customer orders.
    pub accepts_orders: bool,
    pub created_at: DateTime<Utc>,
}

impl Warehouse {
    /// An active, order-accepting main warehouse.
    pub fn new(
        id: WarehouseId,
        code: impl Into<String>,
        name: impl Into<String>,
        priority: i32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            code: code.into(),
            name: name.into(),
            kind: WarehouseKind::Main,
            priority,
            is_active: true,
            is_default: false,
            accepts_orders: true,
            created_at,
        }
    }

    /// Eligible to be picked for order fulfillment.
    pub fn can_fulfill_orders(&self) -> bool {
        self.is_active && self.accepts_orders
    }
}

impl Entity for Warehouse {
    type Id = WarehouseId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
