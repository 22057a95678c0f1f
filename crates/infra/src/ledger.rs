//! Stock ledger service: the sanctioned path for mutating
//! quantity/reserved/available.
//!
//! Each operation validates its command, runs the domain change inside one
//! per-key `LedgerStore::mutate` call and records one movement per affected
//! leg. Failures are returned as typed `DomainError`s and never retried here.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use wareledger_core::{
    Clock, DomainError, DomainResult, OrderId, ProductId, ReservationId, SystemClock, WarehouseId,
};
use wareledger_inventory::{
    AdjustStock, AllocationPicker, AllocationResult, DocumentRef, MovementFilter, MovementKind,
    ReceiveStock, ReservationStatus, ReserveStock, ShipStock, Stock, StockKey, StockMovement,
    StockReservation, TransferStock, ensure_positive,
};

use crate::collaborators::{StockAvailability, WarehouseDirectory};
use crate::store::{LedgerStore, LedgerTxn, MovementSubscription};

fn log_rejection(operation: &'static str, key: &StockKey, err: &DomainError) {
    if err.is_business_outcome() {
        warn!(
            operation,
            warehouse = %key.warehouse_id,
            product = %key.product_id,
            error = %err,
            "ledger operation rejected"
        );
    }
}

/// Authoritative per-(warehouse, product) stock state.
pub struct StockLedger<S, D, C = SystemClock> {
    store: S,
    directory: D,
    clock: C,
    picker: AllocationPicker,
}

impl<S, D, C> StockLedger<S, D, C>
where
    S: LedgerStore,
    D: WarehouseDirectory,
    C: Clock,
{
    pub fn new(store: S, directory: D, clock: C) -> Self {
        Self {
            store,
            directory,
            clock,
            picker: AllocationPicker,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Add received units, creating the row on first receipt.
    pub fn receive_stock(&self, cmd: ReceiveStock) -> DomainResult<Stock> {
        ensure_positive(cmd.quantity)?;
        self.directory.require(cmd.warehouse_id)?;

        let key = cmd.key();
        let now = self.clock.now();
        let stock = self.store.mutate(&[key], |txn| {
            let stock = txn.stock_or_insert(&key, &cmd.sku, now)?;
            stock.receive(cmd.quantity, now)?;
            let snapshot = stock.clone();
            txn.record(
                StockMovement::new(MovementKind::Receipt, key.product_id, &cmd.sku, cmd.quantity, now)
                    .to_warehouse(key.warehouse_id)
                    .with_document(cmd.document.clone())
                    .with_reason(cmd.reason.clone())
                    .with_notes(cmd.notes.clone()),
            );
            Ok(snapshot)
        })?;

        debug!(
            warehouse = %key.warehouse_id,
            product = %key.product_id,
            quantity = cmd.quantity,
            on_hand = stock.quantity(),
            "stock received"
        );
        Ok(stock)
    }

    /// Remove units that physically leave the warehouse.
    pub fn ship_stock(&self, cmd: ShipStock) -> DomainResult<Stock> {
        let key = cmd.key();
        let now = self.clock.now();
        let result = self.store.mutate(&[key], |txn| {
            let stock = txn.stock(&key)?;
            stock.ship(cmd.quantity, now)?;
            let snapshot = stock.clone();
            txn.record(
                StockMovement::new(MovementKind::Shipment, key.product_id, &cmd.sku, cmd.quantity, now)
                    .from_warehouse(key.warehouse_id)
                    .with_document(cmd.document.clone()),
            );
            Ok(snapshot)
        });

        match &result {
            Ok(stock) => debug!(
                warehouse = %key.warehouse_id,
                product = %key.product_id,
                quantity = cmd.quantity,
                on_hand = stock.quantity(),
                "stock shipped"
            ),
            Err(err) => log_rejection("ship_stock", &key, err),
        }
        result
    }

    /// Hold units for an order.
    pub fn reserve_stock(&self, cmd: ReserveStock) -> DomainResult<StockReservation> {
        ensure_positive(cmd.quantity)?;

        let key = cmd.key();
        let now = self.clock.now();
        let result = self.store.mutate(&[key], |txn| {
            let stock = txn.stock(&key)?;
            stock.reserve(cmd.quantity, now)?;
            let sku = stock.sku.clone();

            let reservation = StockReservation::new(
                ReservationId::new(),
                cmd.order_id,
                key,
                cmd.quantity,
                cmd.expires_at,
                now,
            )?;
            txn.put_reservation(reservation.clone());
            txn.record(
                StockMovement::new(MovementKind::Reservation, key.product_id, sku, cmd.quantity, now)
                    .from_warehouse(key.warehouse_id)
                    .with_document(Some(order_document(cmd.order_id))),
            );
            Ok(reservation)
        });

        match &result {
            Ok(r) => debug!(
                reservation = %r.id,
                order = %r.order_id,
                warehouse = %key.warehouse_id,
                product = %key.product_id,
                quantity = r.quantity,
                "stock reserved"
            ),
            Err(err) => log_rejection("reserve_stock", &key, err),
        }
        result
    }

    /// Cancel an active reservation and return its units to available.
    ///
    /// Releasing a reservation that is no longer active succeeds without
    /// changing anything, so retries are safe.
    pub fn release_reservation(&self, id: ReservationId) -> DomainResult<StockReservation> {
        self.close_reservation(id, ReservationStatus::Cancelled)
    }

    /// Mark an active reservation fulfilled.
    ///
    /// Only `reserved` drops here; units leave `quantity` through a separate
    /// `ship_stock` call. Fulfilling an already fulfilled reservation is a
    /// no-op; fulfilling a cancelled or expired one fails `ReservationNotActive`.
    pub fn fulfill_reservation(&self, id: ReservationId) -> DomainResult<StockReservation> {
        self.close_reservation(id, ReservationStatus::Fulfilled)
    }

    /// Expire every active reservation whose hold window has passed.
    pub fn release_expired_reservations(&self) -> DomainResult<Vec<StockReservation>> {
        let now = self.clock.now();
        let overdue = self.store.reservations_where(&|r| r.is_overdue(now))?;

        let mut expired = Vec::with_capacity(overdue.len());
        for candidate in overdue {
            let key = candidate.key();
            let closed = self.store.mutate(&[key], |txn| {
                match self.store.reservation(candidate.id)? {
                    // Re-checked under the key lock; a concurrent release wins.
                    Some(current) if current.is_overdue(now) => {
                        self.close_in_txn(txn, current, ReservationStatus::Expired, now)
                            .map(Some)
                    }
                    _ => Ok(None),
                }
            })?;
            expired.extend(closed);
        }

        if !expired.is_empty() {
            info!(count = expired.len(), "expired reservations released");
        }
        Ok(expired)
    }

    fn close_reservation(
        &self,
        id: ReservationId,
        target: ReservationStatus,
    ) -> DomainResult<StockReservation> {
        let current = self
            .store
            .reservation(id)?
            .ok_or(DomainError::ReservationNotFound(id))?;
        if !current.is_active() {
            return settled(current, target);
        }

        let key = current.key();
        let now = self.clock.now();
        let closed = self.store.mutate(&[key], |txn| {
            let current = self
                .store
                .reservation(id)?
                .ok_or(DomainError::ReservationNotFound(id))?;
            if !current.is_active() {
                return settled(current, target);
            }
            self.close_in_txn(txn, current, target, now)
        })?;

        debug!(
            reservation = %closed.id,
            status = ?closed.status,
            warehouse = %key.warehouse_id,
            product = %key.product_id,
            "reservation closed"
        );
        Ok(closed)
    }

    fn close_in_txn(
        &self,
        txn: &mut LedgerTxn,
        mut reservation: StockReservation,
        target: ReservationStatus,
        now: DateTime<Utc>,
    ) -> DomainResult<StockReservation> {
        let key = reservation.key();
        let stock = txn.stock(&key)?;
        let released = stock.release(reservation.quantity, now);
        let sku = stock.sku.clone();
        if released < reservation.quantity {
            warn!(
                reservation = %reservation.id,
                expected = reservation.quantity,
                released,
                "reserved count drifted; clamped at zero"
            );
        }

        reservation.close(target, now)?;
        let kind = match target {
            ReservationStatus::Fulfilled => MovementKind::Fulfillment,
            ReservationStatus::Expired => MovementKind::Expiry,
            _ => MovementKind::Release,
        };
        txn.put_reservation(reservation.clone());
        txn.record(
            StockMovement::new(kind, key.product_id, sku, reservation.quantity, now)
                .from_warehouse(key.warehouse_id)
                .with_document(Some(order_document(reservation.order_id))),
        );
        Ok(reservation)
    }

    /// Move units between warehouses as one all-or-nothing change.
    ///
    /// Returns the source and destination rows after the move.
    pub fn transfer_stock(&self, cmd: TransferStock) -> DomainResult<(Stock, Stock)> {
        if cmd.from_warehouse == cmd.to_warehouse {
            return Err(DomainError::InvalidTransfer(cmd.from_warehouse));
        }
        ensure_positive(cmd.quantity)?;
        self.directory.require(cmd.to_warehouse)?;

        let source = cmd.source();
        let destination = cmd.destination();
        let now = self.clock.now();
        let document = DocumentRef::new("transfer", Uuid::now_v7().to_string());

        let result = self.store.mutate(&[source, destination], |txn| {
            let from = txn.stock(&source)?;
            from.ship(cmd.quantity, now)?;
            let from = from.clone();

            let to = txn.stock_or_insert(&destination, &cmd.sku, now)?;
            to.receive(cmd.quantity, now)?;
            let to = to.clone();

            for kind in [MovementKind::TransferOut, MovementKind::TransferIn] {
                txn.record(
                    StockMovement::new(kind, cmd.product_id, &cmd.sku, cmd.quantity, now)
                        .from_warehouse(cmd.from_warehouse)
                        .to_warehouse(cmd.to_warehouse)
                        .with_document(Some(document.clone()))
                        .with_notes(cmd.notes.clone()),
                );
            }
            Ok((from, to))
        });

        match &result {
            Ok(_) => debug!(
                from = %cmd.from_warehouse,
                to = %cmd.to_warehouse,
                product = %cmd.product_id,
                quantity = cmd.quantity,
                "stock transferred"
            ),
            Err(err) => log_rejection("transfer_stock", &source, err),
        }
        result
    }

    /// Set the counted quantity, recording the difference as an adjustment.
    ///
    /// Creates the row if absent. A zero difference records nothing. Fails
    /// `StockReserved` if the new quantity is below what is reserved.
    pub fn adjust_stock(&self, cmd: AdjustStock) -> DomainResult<Stock> {
        if cmd.new_quantity < 0 {
            return Err(DomainError::InvalidQuantity(cmd.new_quantity));
        }
        self.directory.require(cmd.warehouse_id)?;

        let key = cmd.key();
        let now = self.clock.now();
        let result = self.store.mutate(&[key], |txn| {
            let stock = txn.stock_or_insert(&key, &cmd.sku, now)?;
            let delta = stock.set_quantity(cmd.new_quantity, now)?;
            let snapshot = stock.clone();
            if delta != 0 {
                let movement = StockMovement::new(
                    MovementKind::Adjustment,
                    key.product_id,
                    &cmd.sku,
                    delta.abs(),
                    now,
                )
                .with_reason(cmd.reason.clone())
                .with_notes(cmd.notes.clone());
                txn.record(if delta < 0 {
                    movement.from_warehouse(key.warehouse_id)
                } else {
                    movement.to_warehouse(key.warehouse_id)
                });
            }
            Ok((snapshot, delta))
        });

        match &result {
            Ok((_, delta)) if *delta != 0 => info!(
                warehouse = %key.warehouse_id,
                product = %key.product_id,
                delta,
                reason = cmd.reason.as_deref().unwrap_or(""),
                "stock adjusted"
            ),
            Ok(_) => {}
            Err(err) => log_rejection("adjust_stock", &key, err),
        }
        result.map(|(stock, _)| stock)
    }

    /// Pick one warehouse able to cover `quantity` on its own.
    ///
    /// `available == false` is a normal outcome, not an error.
    pub fn allocate_stock(&self, product_id: ProductId, quantity: i64) -> DomainResult<AllocationResult> {
        let rows = self.store.stock_by_product(product_id)?;
        let warehouses = self.directory.warehouses()?;
        self.picker.pick(product_id, quantity, &rows, &warehouses)
    }

    pub fn get_stock(&self, warehouse_id: WarehouseId, product_id: ProductId) -> DomainResult<Stock> {
        let key = StockKey::new(warehouse_id, product_id);
        self.store
            .stock(&key)?
            .ok_or(DomainError::ProductNotFound {
                warehouse_id,
                product_id,
            })
    }

    pub fn get_product_stock(&self, product_id: ProductId) -> DomainResult<Vec<Stock>> {
        self.store.stock_by_product(product_id)
    }

    /// Available units summed across every warehouse.
    pub fn get_total_available(&self, product_id: ProductId) -> DomainResult<i64> {
        Ok(self
            .store
            .stock_by_product(product_id)?
            .iter()
            .map(Stock::available)
            .sum())
    }

    pub fn get_warehouse_stock(&self, warehouse_id: WarehouseId) -> DomainResult<Vec<Stock>> {
        self.store.stock_by_warehouse(warehouse_id)
    }

    /// Rows at or below their minimum stock level.
    pub fn get_low_stock(&self, warehouse_id: WarehouseId) -> DomainResult<Vec<Stock>> {
        self.store
            .stock_where(&|s| s.warehouse_id == warehouse_id && s.is_low())
    }

    /// Movements touching a warehouse, newest first.
    pub fn get_movement_history(
        &self,
        warehouse_id: WarehouseId,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> DomainResult<Vec<StockMovement>> {
        self.store.movements(&MovementFilter {
            warehouse_id: Some(warehouse_id),
            product_id: None,
            from,
            to,
            limit,
        })
    }

    pub fn get_reservation(&self, id: ReservationId) -> DomainResult<StockReservation> {
        self.store
            .reservation(id)?
            .ok_or(DomainError::ReservationNotFound(id))
    }

    pub fn get_reservations_by_order(&self, order_id: OrderId) -> DomainResult<Vec<StockReservation>> {
        self.store.reservations_by_order(order_id)
    }

    /// Committed movements from now on.
    pub fn subscribe(&self) -> MovementSubscription {
        self.store.subscribe()
    }
}

impl<S, D, C> StockAvailability for StockLedger<S, D, C>
where
    S: LedgerStore,
    D: WarehouseDirectory,
    C: Clock,
{
    fn stock_by_product(&self, product_id: ProductId) -> DomainResult<Vec<Stock>> {
        self.store.stock_by_product(product_id)
    }
}

fn order_document(order_id: OrderId) -> DocumentRef {
    DocumentRef::new("order", order_id.to_string())
}

/// Outcome of closing a reservation that is already terminal.
fn settled(current: StockReservation, target: ReservationStatus) -> DomainResult<StockReservation> {
    match (current.status, target) {
        (_, ReservationStatus::Cancelled) | (_, ReservationStatus::Expired) => Ok(current),
        (ReservationStatus::Fulfilled, ReservationStatus::Fulfilled) => Ok(current),
        _ => Err(DomainError::ReservationNotActive(current.id)),
    }
}
