//! Expiry thresholds, alert classification and the alert lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wareledger_core::{AlertId, BatchId, DomainError, DomainResult, Entity, ProductId, WarehouseId};

use crate::batch::BatchStock;

/// Expiry management settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpiryConfig {
    /// Days before expiry that count as critical.
    pub critical_days: i64,
    /// Days before expiry that raise a warning.
    pub warning_days: i64,
    /// Informational horizon (dashboard only).
    pub info_days: i64,
    /// First-Expired-First-Out ordering; receipt order (FIFO) when disabled.
    pub fefo_enabled: bool,
    /// Exclude expired batches from selection entirely.
    pub block_expired: bool,
    /// Allow `auto_write_off_expired` to destroy expired stock.
    pub auto_write_off: bool,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            critical_days: 7,
            warning_days: 30,
            info_days: 90,
            fefo_enabled: true,
            block_expired: true,
            auto_write_off: false,
        }
    }
}

impl ExpiryConfig {
    /// Replace unset (zero or negative) thresholds with their defaults.
    pub fn normalized(mut self) -> Self {
        let defaults = Self::default();
        if self.critical_days <= 0 {
            self.critical_days = defaults.critical_days;
        }
        if self.warning_days <= 0 {
            self.warning_days = defaults.warning_days;
        }
        if self.info_days <= 0 {
            self.info_days = defaults.info_days;
        }
        self
    }

    /// Classify a batch by time left before expiry.
    ///
    /// Undated batches never classify.
    pub fn classify(&self, batch: &BatchStock, now: DateTime<Utc>) -> Option<AlertType> {
        let days_left = batch.days_until_expiry(now)?;
        if batch.is_expired_at(now) {
            Some(AlertType::Expired)
        } else if days_left <= self.critical_days {
            Some(AlertType::Critical)
        } else if days_left <= self.warning_days {
            Some(AlertType::Warning)
        } else if days_left <= self.info_days {
            Some(AlertType::Info)
        } else {
            None
        }
    }

    /// Classification that warrants an alert record (info is dashboard-only).
    pub fn alert_for(&self, batch: &BatchStock, now: DateTime<Utc>) -> Option<AlertType> {
        self.classify(batch, now).filter(|t| t.raises_alert())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Expired,
    Critical,
    Warning,
    Info,
}

impl AlertType {
    pub fn raises_alert(self) -> bool {
        !matches!(self, AlertType::Info)
    }
}

/// Alert lifecycle: `pending -> acknowledged -> resolved`, forward only.
///
/// Resolving straight from `pending` is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Pending,
    Acknowledged,
    Resolved,
}

impl AlertStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertStatus::Pending => "pending",
            AlertStatus::Acknowledged => "acknowledged",
            AlertStatus::Resolved => "resolved",
        }
    }

    pub fn is_open(self) -> bool {
        !matches!(self, AlertStatus::Resolved)
    }
}

/// Expiry notification for one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryAlert {
    pub id: AlertId,
    pub warehouse_id: WarehouseId,
    pub product_id: ProductId,
    pub batch_id: BatchId,
    pub sku: String,
    pub batch_number: String,
    pub expiry_date: DateTime<Utc>,
    /// Available units at the time of the scan.
    pub quantity: i64,
    pub days_left: i64,
    pub alert_type: AlertType,
    pub status: AlertStatus,
    pub created_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub acknowledged_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl ExpiryAlert {
    /// Build a pending alert for a dated batch. Returns `None` for undated batches.
    pub fn for_batch(
        batch: &BatchStock,
        alert_type: AlertType,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        let expiry_date = batch.expiry_date?;
        Some(Self {
            id: AlertId::new(),
            warehouse_id: batch.warehouse_id,
            product_id: batch.product_id,
            batch_id: batch.id,
            sku: batch.sku.clone(),
            batch_number: batch.batch_number.clone(),
            expiry_date,
            quantity: batch.available(),
            days_left: (expiry_date - now).num_days(),
            alert_type,
            status: AlertStatus::Pending,
            created_at: now,
            acknowledged_at: None,
            acknowledged_by: None,
            resolved_at: None,
        })
    }

    pub fn acknowledge(&mut self, user: impl Into<String>, now: DateTime<Utc>) -> DomainResult<()> {
        match self.status {
            AlertStatus::Acknowledged => Ok(()),
            AlertStatus::Pending => {
                self.status = AlertStatus::Acknowledged;
                self.acknowledged_at = Some(now);
                self.acknowledged_by = Some(user.into());
                Ok(())
            }
            AlertStatus::Resolved => Err(self.transition_error(AlertStatus::Acknowledged)),
        }
    }

    pub fn resolve(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status != AlertStatus::Resolved {
            self.status = AlertStatus::Resolved;
            self.resolved_at = Some(now);
        }
        Ok(())
    }

    fn transition_error(&self, to: AlertStatus) -> DomainError {
        DomainError::InvalidAlertTransition {
            from: self.status.as_str().to_string(),
            to: to.as_str().to_string(),
        }
    }
}

impl Entity for ExpiryAlert {
    type Id = AlertId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Expiry statistics for one warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExpiryDashboard {
    pub expired_count: usize,
    pub expired_value: u64,
    pub critical_count: usize,
    pub critical_value: u64,
    pub warning_count: usize,
    pub warning_value: u64,
    pub info_count: usize,
    pub info_value: u64,
    pub pending_alerts: usize,
    pub last_checked: Option<DateTime<Utc>>,
}

impl ExpiryDashboard {
    /// Bucket batches by classification. Each batch lands in at most one bucket.
    pub fn compute<'a>(
        config: &ExpiryConfig,
        batches: impl IntoIterator<Item = &'a BatchStock>,
        pending_alerts: usize,
        now: DateTime<Utc>,
    ) -> Self {
        let mut dashboard = Self {
            pending_alerts,
            last_checked: Some(now),
            ..Self::default()
        };

        for batch in batches {
            let value = batch.available_value();
            match config.classify(batch, now) {
                Some(AlertType::Expired) => {
                    dashboard.expired_count += 1;
                    dashboard.expired_value += value;
                }
                Some(AlertType::Critical) => {
                    dashboard.critical_count += 1;
                    dashboard.critical_value += value;
                }
                Some(AlertType::Warning) => {
                    dashboard.warning_count += 1;
                    dashboard.warning_value += value;
                }
                Some(AlertType::Info) => {
                    dashboard.info_count += 1;
                    dashboard.info_value += value;
                }
                None => {}
            }
        }

        dashboard
    }
}
