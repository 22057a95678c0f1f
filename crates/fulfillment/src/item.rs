use serde::{Deserialize, Serialize};

use wareledger_core::{DomainError, DomainResult, ProductId};
use wareledger_inventory::ensure_positive;

/// Order line to be shipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub quantity: i64,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: u64,
    pub weight_grams: u32,
}

impl OrderItem {
    pub fn new(product_id: ProductId, sku: impl Into<String>, quantity: i64) -> Self {
        Self {
            product_id,
            sku: sku.into(),
            name: String::new(),
            quantity,
            unit_price: 0,
            weight_grams: 0,
        }
    }

    /// The same line with a different quantity (a shipment slice or a backorder).
    pub fn with_quantity(&self, quantity: i64) -> Self {
        Self {
            quantity,
            ..self.clone()
        }
    }
}

/// Item carried by one planned shipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentItem {
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price: u64,
    pub weight_grams: u32,
    pub location: Option<String>,
    pub batch_number: Option<String>,
}

impl ShipmentItem {
    pub fn from_order_item(item: &OrderItem, quantity: i64) -> Self {
        Self {
            product_id: item.product_id,
            sku: item.sku.clone(),
            name: item.name.clone(),
            quantity,
            unit_price: item.unit_price,
            weight_grams: item.weight_grams,
            location: None,
            batch_number: None,
        }
    }
}

/// Delivery coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    pub lat: f64,
    pub lng: f64,
}

impl Destination {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Check an order's lines before planning.
///
/// Lines must be non-empty, have positive quantities and name each product once.
pub fn validate_items(items: &[OrderItem]) -> DomainResult<()> {
    if items.is_empty() {
        return Err(DomainError::NoItems);
    }
    for (i, item) in items.iter().enumerate() {
        ensure_positive(item.quantity)?;
        if items[..i].iter().any(|prev| prev.product_id == item.product_id) {
            return Err(DomainError::validation(format!(
                "product {} appears on more than one line",
                item.product_id
            )));
        }
    }
    Ok(())
}
