//! Ledger storage boundary with per-key atomic mutation.
//!
//! Every change to quantity/reserved/available goes through
//! [`LedgerStore::mutate`], which serializes callers per (warehouse, product)
//! key. A mutation works on scratch copies of the locked rows and stages
//! reservation writes and movements; nothing becomes visible unless the
//! closure returns `Ok`. Multi-key mutations (transfers) lock their keys in
//! sorted order, so two transfers in opposite directions cannot deadlock.
//!
//! Reservation rows are written only inside `mutate` while their stock key is
//! locked. A reservation read while holding its key is therefore stable.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use chrono::{DateTime, Utc};

use wareledger_core::{DomainError, DomainResult, OrderId, ProductId, ReservationId, WarehouseId};
use wareledger_inventory::{MovementFilter, Stock, StockKey, StockMovement, StockReservation};

use super::movement_log::{MovementLog, MovementSubscription};
use super::record::poisoned;

/// Scratch state of one ledger mutation.
#[derive(Debug)]
pub struct LedgerTxn {
    rows: BTreeMap<StockKey, Option<Stock>>,
    reservations: Vec<StockReservation>,
    movements: Vec<StockMovement>,
}

impl LedgerTxn {
    fn new(rows: BTreeMap<StockKey, Option<Stock>>) -> Self {
        Self {
            rows,
            reservations: Vec::new(),
            movements: Vec::new(),
        }
    }

    fn slot(&mut self, key: &StockKey) -> DomainResult<&mut Option<Stock>> {
        self.rows
            .get_mut(key)
            .ok_or_else(|| DomainError::storage(format!("stock row {key} is not locked")))
    }

    /// The existing row for `key`; `ProductNotFound` if none.
    pub fn stock(&mut self, key: &StockKey) -> DomainResult<&mut Stock> {
        self.slot(key)?
            .as_mut()
            .ok_or(DomainError::ProductNotFound {
                warehouse_id: key.warehouse_id,
                product_id: key.product_id,
            })
    }

    /// The row for `key`, created with a zero baseline if absent.
    pub fn stock_or_insert(
        &mut self,
        key: &StockKey,
        sku: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<&mut Stock> {
        let slot = self.slot(key)?;
        Ok(slot.get_or_insert_with(|| Stock::new(key.warehouse_id, key.product_id, sku, now)))
    }

    /// Stage a reservation insert or update.
    pub fn put_reservation(&mut self, reservation: StockReservation) {
        self.reservations.push(reservation);
    }

    /// Stage a movement for the log.
    pub fn record(&mut self, movement: StockMovement) {
        self.movements.push(movement);
    }
}

/// Storage for stock rows, reservations and the movement log.
pub trait LedgerStore: Send + Sync {
    /// Run `f` with exclusive access to the rows for `keys`.
    ///
    /// Staged rows, reservations and movements are committed together only if
    /// `f` succeeds; an error leaves the store untouched.
    fn mutate<T>(
        &self,
        keys: &[StockKey],
        f: impl FnOnce(&mut LedgerTxn) -> DomainResult<T>,
    ) -> DomainResult<T>;

    fn stock(&self, key: &StockKey) -> DomainResult<Option<Stock>>;

    fn stock_where(&self, predicate: &dyn Fn(&Stock) -> bool) -> DomainResult<Vec<Stock>>;

    fn stock_by_product(&self, product_id: ProductId) -> DomainResult<Vec<Stock>> {
        self.stock_where(&|s| s.product_id == product_id)
    }

    fn stock_by_warehouse(&self, warehouse_id: WarehouseId) -> DomainResult<Vec<Stock>> {
        self.stock_where(&|s| s.warehouse_id == warehouse_id)
    }

    fn reservation(&self, id: ReservationId) -> DomainResult<Option<StockReservation>>;

    fn reservations_where(
        &self,
        predicate: &dyn Fn(&StockReservation) -> bool,
    ) -> DomainResult<Vec<StockReservation>>;

    fn reservations_by_order(&self, order_id: OrderId) -> DomainResult<Vec<StockReservation>> {
        self.reservations_where(&|r| r.order_id == order_id)
    }

    fn movements(&self, filter: &MovementFilter) -> DomainResult<Vec<StockMovement>>;

    fn subscribe(&self) -> MovementSubscription;
}

impl<S: LedgerStore> LedgerStore for Arc<S> {
    fn mutate<T>(
        &self,
        keys: &[StockKey],
        f: impl FnOnce(&mut LedgerTxn) -> DomainResult<T>,
    ) -> DomainResult<T> {
        (**self).mutate(keys, f)
    }

    fn stock(&self, key: &StockKey) -> DomainResult<Option<Stock>> {
        (**self).stock(key)
    }

    fn stock_where(&self, predicate: &dyn Fn(&Stock) -> bool) -> DomainResult<Vec<Stock>> {
        (**self).stock_where(predicate)
    }

    fn reservation(&self, id: ReservationId) -> DomainResult<Option<StockReservation>> {
        (**self).reservation(id)
    }

    fn reservations_where(
        &self,
        predicate: &dyn Fn(&StockReservation) -> bool,
    ) -> DomainResult<Vec<StockReservation>> {
        (**self).reservations_where(predicate)
    }

    fn movements(&self, filter: &MovementFilter) -> DomainResult<Vec<StockMovement>> {
        (**self).movements(filter)
    }

    fn subscribe(&self) -> MovementSubscription {
        (**self).subscribe()
    }
}

type Cell = Arc<Mutex<Option<Stock>>>;

/// In-memory ledger store with one mutex per (warehouse, product) key.
///
/// Mutations on different keys proceed in parallel; the map lock is only held
/// long enough to find or create a key's cell.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    cells: RwLock<HashMap<StockKey, Cell>>,
    reservations: RwLock<HashMap<ReservationId, StockReservation>>,
    log: MovementLog,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> &MovementLog {
        &self.log
    }

    fn cell(&self, key: &StockKey) -> DomainResult<Cell> {
        if let Some(cell) = self.cells.read().map_err(poisoned)?.get(key) {
            return Ok(cell.clone());
        }
        let mut cells = self.cells.write().map_err(poisoned)?;
        Ok(cells.entry(*key).or_default().clone())
    }

    fn snapshot_cells(&self) -> DomainResult<Vec<Cell>> {
        Ok(self.cells.read().map_err(poisoned)?.values().cloned().collect())
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn mutate<T>(
        &self,
        keys: &[StockKey],
        f: impl FnOnce(&mut LedgerTxn) -> DomainResult<T>,
    ) -> DomainResult<T> {
        let mut keys = keys.to_vec();
        keys.sort();
        keys.dedup();

        let cells = keys
            .iter()
            .map(|k| self.cell(k))
            .collect::<DomainResult<Vec<_>>>()?;
        let mut guards: Vec<MutexGuard<'_, Option<Stock>>> = cells
            .iter()
            .map(|c| c.lock().map_err(poisoned))
            .collect::<DomainResult<_>>()?;

        let scratch = keys
            .iter()
            .copied()
            .zip(guards.iter().map(|g| (**g).clone()))
            .collect();
        let mut txn = LedgerTxn::new(scratch);
        let out = f(&mut txn)?;
        let LedgerTxn {
            mut rows,
            reservations,
            movements,
        } = txn;

        // Take every lock the commit needs before writing anything.
        let mut reservation_rows = if reservations.is_empty() {
            None
        } else {
            Some(self.reservations.write().map_err(poisoned)?)
        };
        let mut log = self.log.writer()?;

        for (key, guard) in keys.iter().zip(guards.iter_mut()) {
            if let Some(row) = rows.remove(key) {
                **guard = row;
            }
        }
        if let Some(map) = reservation_rows.as_mut() {
            for r in reservations {
                map.insert(r.id, r);
            }
        }
        log.extend(movements.iter().cloned());
        drop(log);
        drop(reservation_rows);

        // Publish while the keys are still held so per-key order is preserved.
        self.log.publish(&movements);
        Ok(out)
    }

    fn stock(&self, key: &StockKey) -> DomainResult<Option<Stock>> {
        let cell = match self.cells.read().map_err(poisoned)?.get(key) {
            Some(cell) => cell.clone(),
            None => return Ok(None),
        };
        let row = cell.lock().map_err(poisoned)?;
        Ok(row.clone())
    }

    fn stock_where(&self, predicate: &dyn Fn(&Stock) -> bool) -> DomainResult<Vec<Stock>> {
        let mut rows = Vec::new();
        for cell in self.snapshot_cells()? {
            let row = cell.lock().map_err(poisoned)?;
            if let Some(stock) = row.as_ref().filter(|s| predicate(s)) {
                rows.push(stock.clone());
            }
        }
        rows.sort_by_key(|s| s.key());
        Ok(rows)
    }

    fn reservation(&self, id: ReservationId) -> DomainResult<Option<StockReservation>> {
        let map = self.reservations.read().map_err(poisoned)?;
        Ok(map.get(&id).cloned())
    }

    fn reservations_where(
        &self,
        predicate: &dyn Fn(&StockReservation) -> bool,
    ) -> DomainResult<Vec<StockReservation>> {
        let map = self.reservations.read().map_err(poisoned)?;
        let mut found: Vec<StockReservation> =
            map.values().filter(|r| predicate(r)).cloned().collect();
        found.sort_by_key(|r| (r.created_at, r.id));
        Ok(found)
    }

    fn movements(&self, filter: &MovementFilter) -> DomainResult<Vec<StockMovement>> {
        self.log.query(filter)
    }

    fn subscribe(&self) -> MovementSubscription {
        self.log.subscribe()
    }
}
