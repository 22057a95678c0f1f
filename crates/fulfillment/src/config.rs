use serde::{Deserialize, Serialize};

/// Split-shipment planning settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    pub allow_split: bool,
    pub max_shipments: usize,
    /// Distinct items a warehouse must contribute to become a shipment.
    pub min_items_per_shipment: usize,
    /// Percent taken off the total cost of a split plan (0-100).
    pub combined_shipping_discount_percent: u32,
    /// When false, plans are approved by "system" as soon as they are created.
    pub require_approval: bool,
    pub notify_customer: bool,
    /// Deadline for the decision phase of one planning call.
    pub planning_timeout_ms: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            allow_split: true,
            max_shipments: 3,
            min_items_per_shipment: 1,
            combined_shipping_discount_percent: 0,
            require_approval: true,
            notify_customer: true,
            planning_timeout_ms: 5_000,
        }
    }
}

impl SplitConfig {
    /// Replace unset (zero) limits with their defaults and cap the discount.
    pub fn normalized(mut self) -> Self {
        let defaults = Self::default();
        if self.max_shipments == 0 {
            self.max_shipments = defaults.max_shipments;
        }
        if self.min_items_per_shipment == 0 {
            self.min_items_per_shipment = defaults.min_items_per_shipment;
        }
        if self.planning_timeout_ms == 0 {
            self.planning_timeout_ms = defaults.planning_timeout_ms;
        }
        self.combined_shipping_discount_percent = self.combined_shipping_discount_percent.min(100);
        self
    }

    /// Apply the combined-shipping discount to a split plan's total.
    pub fn discounted(&self, total_cost: u64) -> u64 {
        let percent = u64::from(self.combined_shipping_discount_percent.min(100));
        total_cost - total_cost.saturating_mul(percent) / 100
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_limits_fall_back_to_defaults() {
        let config = SplitConfig {
            max_shipments: 0,
            min_items_per_shipment: 0,
            planning_timeout_ms: 0,
            combined_shipping_discount_percent: 250,
            ..SplitConfig::default()
        }
        .normalized();

        assert_eq!(config.max_shipments, 3);
        assert_eq!(config.min_items_per_shipment, 1);
        assert_eq!(config.planning_timeout_ms, 5_000);
        assert_eq!(config.combined_shipping_discount_percent, 100);
    }

    #[test]
    fn discount_is_a_percentage_of_total() {
        let config = SplitConfig {
            combined_shipping_discount_percent: 10,
            ..SplitConfig::default()
        };
        assert_eq!(config.discounted(2_000), 1_800);
        assert_eq!(SplitConfig::default().discounted(2_000), 2_000);
    }

    #[test]
    fn missing_fields_deserialize_to_defaults() {
        let config: SplitConfig = serde_json::from_str(r#"{"max_shipments": 2}"#).unwrap();
        assert_eq!(config.max_shipments, 2);
        assert!(config.allow_split);
        assert!(config.require_approval);
    }
}
