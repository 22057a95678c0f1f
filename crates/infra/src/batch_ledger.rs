//! Expiry-aware batch ledger: FEFO selection, expiry alerts and write-off.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use wareledger_core::{
    AlertId, BatchId, Clock, DomainError, DomainResult, ProductId, SystemClock, WarehouseId,
};
use wareledger_inventory::{
    AlertStatus, AlertType, BatchAllocation, BatchStock, ExpiryAlert, ExpiryConfig, ExpiryDashboard,
    ReceiveBatch, StockKey, allocate_fefo, select_fefo,
};

use crate::store::{BatchStore, RecordStore};

pub struct BatchLedger<B, A, C = SystemClock> {
    batches: B,
    alerts: A,
    clock: C,
    config: ExpiryConfig,
}

impl<B, A, C> BatchLedger<B, A, C>
where
    B: BatchStore,
    A: RecordStore<ExpiryAlert>,
    C: Clock,
{
    pub fn new(batches: B, alerts: A, clock: C, config: ExpiryConfig) -> Self {
        Self {
            batches,
            alerts,
            clock,
            config: config.normalized(),
        }
    }

    pub fn config(&self) -> &ExpiryConfig {
        &self.config
    }

    /// Record a received batch, raising an alert right away if it is already
    /// inside the critical or warning window.
    pub fn receive_batch_stock(&self, cmd: ReceiveBatch) -> DomainResult<BatchStock> {
        let now = self.clock.now();
        let key = StockKey::new(cmd.warehouse_id, cmd.product_id);
        let batch = BatchStock::receive(BatchId::new(), cmd, now)?;

        let stored = batch.clone();
        self.batches.mutate(&key, move |rows| {
            rows.push(stored);
            Ok(())
        })?;

        debug!(
            batch = %batch.id,
            batch_number = %batch.batch_number,
            warehouse = %batch.warehouse_id,
            product = %batch.product_id,
            quantity = batch.quantity(),
            "batch received"
        );

        if let Some(alert_type) = self.config.alert_for(&batch, now) {
            self.raise_alert(&batch, alert_type)?;
        }
        Ok(batch)
    }

    /// Batches to draw `quantity` from, in FEFO order.
    pub fn get_fefo_stock(
        &self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
        quantity: i64,
    ) -> DomainResult<Vec<BatchStock>> {
        let rows = self.batches.batches(&StockKey::new(warehouse_id, product_id))?;
        let selected = select_fefo(&rows, quantity, &self.config, self.clock.now())?;
        Ok(selected.into_iter().cloned().collect())
    }

    /// Per-batch draw-down covering exactly `quantity`.
    pub fn allocate_fefo(
        &self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
        quantity: i64,
    ) -> DomainResult<Vec<BatchAllocation>> {
        let rows = self.batches.batches(&StockKey::new(warehouse_id, product_id))?;
        allocate_fefo(&rows, quantity, &self.config, self.clock.now())
    }

    /// Allocate with FEFO and reserve every drawn batch in one step.
    pub fn reserve_fefo(
        &self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
        quantity: i64,
    ) -> DomainResult<Vec<BatchAllocation>> {
        let key = StockKey::new(warehouse_id, product_id);
        let now = self.clock.now();
        let allocations = self.batches.mutate(&key, |rows| {
            let allocations = allocate_fefo(rows, quantity, &self.config, now)?;
            for allocation in &allocations {
                let batch = rows
                    .iter_mut()
                    .find(|b| b.id == allocation.batch_id)
                    .ok_or_else(|| batch_missing(allocation.batch_id))?;
                batch.reserve(allocation.quantity, now)?;
            }
            Ok(allocations)
        })?;

        debug!(
            warehouse = %warehouse_id,
            product = %product_id,
            quantity,
            batches = allocations.len(),
            "batch stock reserved"
        );
        Ok(allocations)
    }

    /// Drop a batch hold, clamping `reserved` at zero.
    pub fn release_batch_reservation(&self, batch_id: BatchId, quantity: i64) -> DomainResult<BatchStock> {
        let key = self
            .batches
            .batch(batch_id)?
            .ok_or_else(|| batch_missing(batch_id))?
            .key();
        let now = self.clock.now();
        self.batches.mutate(&key, |rows| {
            let batch = rows
                .iter_mut()
                .find(|b| b.id == batch_id)
                .ok_or_else(|| batch_missing(batch_id))?;
            batch.release(quantity, now);
            Ok(batch.clone())
        })
    }

    /// Dated, not yet expired batches that expire within `within_days`.
    ///
    /// A window too large for the calendar is open-ended; a negative one is empty.
    pub fn get_expiring_stock(&self, warehouse_id: WarehouseId, within_days: i64) -> DomainResult<Vec<BatchStock>> {
        if within_days < 0 {
            return Ok(Vec::new());
        }
        let now = self.clock.now();
        let horizon = Duration::try_days(within_days)
            .and_then(|window| now.checked_add_signed(window))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let mut rows = self.batches.batches_where(&|b| {
            b.warehouse_id == warehouse_id
                && b.quantity() > 0
                && !b.is_expired_at(now)
                && b.expires_before(horizon)
        })?;
        rows.sort_by_key(|b| (b.expiry_date, b.id));
        Ok(rows)
    }

    pub fn get_expired_stock(&self, warehouse_id: WarehouseId) -> DomainResult<Vec<BatchStock>> {
        let now = self.clock.now();
        let mut rows = self
            .batches
            .batches_where(&|b| b.warehouse_id == warehouse_id && b.quantity() > 0 && b.is_expired_at(now))?;
        rows.sort_by_key(|b| (b.expiry_date, b.id));
        Ok(rows)
    }

    /// Classify every dated batch in the warehouse and return the alerts that
    /// apply, reusing an open alert of the same kind for the same batch.
    pub fn check_expiry_alerts(&self, warehouse_id: WarehouseId) -> DomainResult<Vec<ExpiryAlert>> {
        let now = self.clock.now();
        let mut alerts = Vec::new();
        for batch in self.batches.batches_in_warehouse(warehouse_id)? {
            if batch.quantity() == 0 {
                continue;
            }
            if let Some(alert_type) = self.config.alert_for(&batch, now) {
                alerts.push(self.raise_alert(&batch, alert_type)?);
            }
        }

        debug!(warehouse = %warehouse_id, alerts = alerts.len(), "expiry scan finished");
        Ok(alerts)
    }

    pub fn acknowledge_alert(&self, id: AlertId, user: &str) -> DomainResult<ExpiryAlert> {
        let now = self.clock.now();
        self.alerts
            .update(&id, |alert| {
                alert.acknowledge(user, now)?;
                Ok(alert.clone())
            })?
            .ok_or(DomainError::AlertNotFound(id))
    }

    /// Close an alert. Allowed from `pending` as well as `acknowledged`.
    pub fn resolve_alert(&self, id: AlertId) -> DomainResult<ExpiryAlert> {
        let now = self.clock.now();
        self.alerts
            .update(&id, |alert| {
                alert.resolve(now)?;
                Ok(alert.clone())
            })?
            .ok_or(DomainError::AlertNotFound(id))
    }

    /// Destroy the unreserved units of every expired batch in the warehouse.
    ///
    /// Returns the batches after write-off. Does nothing unless
    /// `auto_write_off` is enabled.
    pub fn auto_write_off_expired(&self, warehouse_id: WarehouseId) -> DomainResult<Vec<BatchStock>> {
        if !self.config.auto_write_off {
            return Ok(Vec::new());
        }

        let now = self.clock.now();
        let keys: BTreeSet<StockKey> = self
            .batches
            .batches_where(&|b| b.warehouse_id == warehouse_id && b.is_expired_at(now) && b.available() > 0)?
            .iter()
            .map(BatchStock::key)
            .collect();

        let mut written_off = Vec::new();
        for key in keys {
            let done = self.batches.mutate(&key, |rows| {
                let mut done = Vec::new();
                for batch in rows.iter_mut().filter(|b| b.is_expired_at(now) && b.available() > 0) {
                    let destroyed = batch.write_off(now);
                    info!(
                        batch = %batch.id,
                        batch_number = %batch.batch_number,
                        warehouse = %batch.warehouse_id,
                        product = %batch.product_id,
                        destroyed,
                        still_reserved = batch.reserved(),
                        "expired batch written off"
                    );
                    done.push(batch.clone());
                }
                Ok(done)
            })?;
            written_off.extend(done);
        }
        Ok(written_off)
    }

    pub fn expiry_dashboard(&self, warehouse_id: WarehouseId) -> DomainResult<ExpiryDashboard> {
        let batches = self.batches.batches_in_warehouse(warehouse_id)?;
        let pending = self
            .alerts
            .find(&|a| a.warehouse_id == warehouse_id && a.status == AlertStatus::Pending)?
            .len();
        Ok(ExpiryDashboard::compute(
            &self.config,
            batches.iter().filter(|b| b.quantity() > 0),
            pending,
            self.clock.now(),
        ))
    }

    /// Alerts for a warehouse, optionally narrowed to one status, oldest first.
    pub fn list_alerts(
        &self,
        warehouse_id: WarehouseId,
        status: Option<AlertStatus>,
    ) -> DomainResult<Vec<ExpiryAlert>> {
        let mut alerts = self.alerts.find(&|a| {
            a.warehouse_id == warehouse_id && status.is_none_or(|s| a.status == s)
        })?;
        alerts.sort_by_key(|a| (a.created_at, a.id));
        Ok(alerts)
    }

    fn raise_alert(
        &self,
        batch: &BatchStock,
        alert_type: AlertType,
    ) -> DomainResult<ExpiryAlert> {
        let now = self.clock.now();
        let (alert, raised) = self.alerts.find_or_insert(
            &|a| a.batch_id == batch.id && a.alert_type == alert_type && a.status.is_open(),
            || {
                ExpiryAlert::for_batch(batch, alert_type, now)
                    .ok_or_else(|| DomainError::validation("undated batches do not raise expiry alerts"))
            },
        )?;
        if !raised {
            return Ok(alert);
        }
        info!(
            alert = %alert.id,
            batch_number = %alert.batch_number,
            warehouse = %alert.warehouse_id,
            alert_type = ?alert.alert_type,
            days_left = alert.days_left,
            "expiry alert raised"
        );
        Ok(alert)
    }
}

fn batch_missing(id: BatchId) -> DomainError {
    DomainError::validation(format!("batch not found: {id}"))
}
