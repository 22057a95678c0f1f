use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wareledger_core::{DomainError, DomainResult, Entity, OrderId, PlanId, ShipmentId, WarehouseId};

use crate::item::ShipmentItem;
use crate::rate::WarehouseRate;
use crate::strategy::SplitStrategy;

/// Shipment lifecycle: `planned -> picking -> packed -> shipped -> delivered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShipmentStatus {
    Planned,
    Picking,
    Packed,
    Shipped,
    Delivered,
}

impl ShipmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ShipmentStatus::Planned => "planned",
            ShipmentStatus::Picking => "picking",
            ShipmentStatus::Packed => "packed",
            ShipmentStatus::Shipped => "shipped",
            ShipmentStatus::Delivered => "delivered",
        }
    }

    /// The single legal forward step, if any.
    pub fn next(self) -> Option<ShipmentStatus> {
        match self {
            ShipmentStatus::Planned => Some(ShipmentStatus::Picking),
            ShipmentStatus::Picking => Some(ShipmentStatus::Packed),
            ShipmentStatus::Packed => Some(ShipmentStatus::Shipped),
            ShipmentStatus::Shipped => Some(ShipmentStatus::Delivered),
            ShipmentStatus::Delivered => None,
        }
    }
}

impl core::str::FromStr for ShipmentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "planned" => Ok(ShipmentStatus::Planned),
            "picking" => Ok(ShipmentStatus::Picking),
            "packed" => Ok(ShipmentStatus::Packed),
            "shipped" => Ok(ShipmentStatus::Shipped),
            "delivered" => Ok(ShipmentStatus::Delivered),
            other => Err(DomainError::validation(format!("unknown shipment status: {other}"))),
        }
    }
}

/// One leg of a plan, shipped from a single warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedShipment {
    pub id: ShipmentId,
    pub warehouse_id: WarehouseId,
    pub warehouse_name: String,
    pub items: Vec<ShipmentItem>,
    pub shipping_method: String,
    pub shipping_cost: u64,
    pub estimated_days: u32,
    /// 1-based position within the plan.
    pub priority: u32,
    pub status: ShipmentStatus,
    pub tracking_number: Option<String>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl PlannedShipment {
    pub fn new(rate: &WarehouseRate, items: Vec<ShipmentItem>, priority: u32) -> Self {
        Self {
            id: ShipmentId::new(),
            warehouse_id: rate.warehouse_id,
            warehouse_name: rate.warehouse_name.clone(),
            items,
            shipping_method: "standard".to_string(),
            shipping_cost: rate.shipping_cost,
            estimated_days: rate.estimated_days,
            priority,
            status: ShipmentStatus::Planned,
            tracking_number: None,
            shipped_at: None,
            delivered_at: None,
        }
    }

    /// Apply a status update.
    ///
    /// Only the next forward step is accepted. Re-applying the current status is
    /// a no-op apart from attaching a tracking number.
    pub fn advance(
        &mut self,
        status: ShipmentStatus,
        tracking_number: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if status != self.status && self.status.next() != Some(status) {
            return Err(DomainError::InvalidStatusTransition {
                from: self.status.as_str().to_string(),
                to: status.as_str().to_string(),
            });
        }

        if let Some(tracking) = tracking_number.filter(|t| !t.is_empty()) {
            self.tracking_number = Some(tracking);
        }
        if status == self.status {
            return Ok(());
        }

        self.status = status;
        match status {
            ShipmentStatus::Shipped => self.shipped_at = Some(now),
            ShipmentStatus::Delivered => self.delivered_at = Some(now),
            _ => {}
        }
        Ok(())
    }

    pub fn units(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

impl Entity for PlannedShipment {
    type Id = ShipmentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// How an order will leave the building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentPlan {
    pub id: PlanId,
    pub order_id: OrderId,
    pub strategy: SplitStrategy,
    pub shipments: Vec<PlannedShipment>,
    /// Sum of shipment costs, after any combined-shipping discount.
    pub total_cost: u64,
    /// Slowest leg; legs ship in parallel.
    pub estimated_days: u32,
    pub is_split: bool,
    pub split_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
}

impl ShipmentPlan {
    /// Assemble a plan from its legs. Totals are derived from the shipments.
    pub fn assemble(
        order_id: OrderId,
        strategy: SplitStrategy,
        shipments: Vec<PlannedShipment>,
        split_reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let total_cost = shipments.iter().map(|s| s.shipping_cost).sum();
        let estimated_days = shipments.iter().map(|s| s.estimated_days).max().unwrap_or(0);
        let is_split = shipments.len() > 1;
        Self {
            id: PlanId::new(),
            order_id,
            strategy,
            shipments,
            total_cost,
            estimated_days,
            is_split,
            split_reason,
            created_at: now,
            approved_at: None,
            approved_by: None,
        }
    }

    pub fn is_approved(&self) -> bool {
        self.approved_at.is_some()
    }

    /// Stamp approval and move every planned shipment to picking.
    ///
    /// Approving twice keeps the first approval.
    pub fn approve(&mut self, approved_by: impl Into<String>, now: DateTime<Utc>) {
        if self.is_approved() {
            return;
        }
        self.approved_at = Some(now);
        self.approved_by = Some(approved_by.into());
        for shipment in &mut self.shipments {
            if shipment.status == ShipmentStatus::Planned {
                shipment.status = ShipmentStatus::Picking;
            }
        }
    }

    pub fn shipment(&self, shipment_id: ShipmentId) -> Option<&PlannedShipment> {
        self.shipments.iter().find(|s| s.id == shipment_id)
    }

    pub fn update_shipment_status(
        &mut self,
        shipment_id: ShipmentId,
        status: ShipmentStatus,
        tracking_number: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        let shipment = self
            .shipments
            .iter_mut()
            .find(|s| s.id == shipment_id)
            .ok_or(DomainError::ShipmentNotFound(shipment_id))?;
        shipment.advance(status, tracking_number, now)
    }

    /// Least advanced shipment status; the plan is only as far along as its slowest leg.
    pub fn status(&self) -> ShipmentStatus {
        self.shipments
            .iter()
            .map(|s| s.status)
            .min()
            .unwrap_or(ShipmentStatus::Planned)
    }

    pub fn warehouses(&self) -> impl Iterator<Item = WarehouseId> + '_ {
        self.shipments.iter().map(|s| s.warehouse_id)
    }
}

impl Entity for ShipmentPlan {
    type Id = PlanId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
