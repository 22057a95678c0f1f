use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use wareledger_core::{BatchId, DomainResult, WarehouseId};
use wareledger_inventory::{BatchStock, StockKey};

use super::record::poisoned;

/// Storage for batch rows, serialized per (warehouse, product) key like the
/// stock ledger.
pub trait BatchStore: Send + Sync {
    /// Run `f` with exclusive access to every batch of `key`.
    ///
    /// `f` works on a copy; changes are committed only if it returns `Ok`.
    fn mutate<T>(
        &self,
        key: &StockKey,
        f: impl FnOnce(&mut Vec<BatchStock>) -> DomainResult<T>,
    ) -> DomainResult<T>;

    fn batches(&self, key: &StockKey) -> DomainResult<Vec<BatchStock>>;

    fn batch(&self, id: BatchId) -> DomainResult<Option<BatchStock>>;

    fn batches_where(&self, predicate: &dyn Fn(&BatchStock) -> bool) -> DomainResult<Vec<BatchStock>>;

    fn batches_in_warehouse(&self, warehouse_id: WarehouseId) -> DomainResult<Vec<BatchStock>> {
        self.batches_where(&|b| b.warehouse_id == warehouse_id)
    }
}

impl<S: BatchStore> BatchStore for Arc<S> {
    fn mutate<T>(
        &self,
        key: &StockKey,
        f: impl FnOnce(&mut Vec<BatchStock>) -> DomainResult<T>,
    ) -> DomainResult<T> {
        (**self).mutate(key, f)
    }

    fn batches(&self, key: &StockKey) -> DomainResult<Vec<BatchStock>> {
        (**self).batches(key)
    }

    fn batch(&self, id: BatchId) -> DomainResult<Option<BatchStock>> {
        (**self).batch(id)
    }

    fn batches_where(&self, predicate: &dyn Fn(&BatchStock) -> bool) -> DomainResult<Vec<BatchStock>> {
        (**self).batches_where(predicate)
    }
}

type Cell = Arc<Mutex<Vec<BatchStock>>>;

/// In-memory batch store with one mutex per (warehouse, product) key.
#[derive(Debug, Default)]
pub struct InMemoryBatchStore {
    cells: RwLock<HashMap<StockKey, Cell>>,
    index: RwLock<HashMap<BatchId, StockKey>>,
}

impl InMemoryBatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn cell(&self, key: &StockKey) -> DomainResult<Cell> {
        if let Some(cell) = self.cells.read().map_err(poisoned)?.get(key) {
            return Ok(cell.clone());
        }
        let mut cells = self.cells.write().map_err(poisoned)?;
        Ok(cells.entry(*key).or_default().clone())
    }
}

impl BatchStore for InMemoryBatchStore {
    fn mutate<T>(
        &self,
        key: &StockKey,
        f: impl FnOnce(&mut Vec<BatchStock>) -> DomainResult<T>,
    ) -> DomainResult<T> {
        let cell = self.cell(key)?;
        let mut guard = cell.lock().map_err(poisoned)?;

        let mut scratch = guard.clone();
        let out = f(&mut scratch)?;

        let mut index = self.index.write().map_err(poisoned)?;
        for batch in &scratch {
            index.insert(batch.id, *key);
        }
        *guard = scratch;
        Ok(out)
    }

    fn batches(&self, key: &StockKey) -> DomainResult<Vec<BatchStock>> {
        let cell = match self.cells.read().map_err(poisoned)?.get(key) {
            Some(cell) => cell.clone(),
            None => return Ok(Vec::new()),
        };
        let rows = cell.lock().map_err(poisoned)?;
        Ok(rows.clone())
    }

    fn batch(&self, id: BatchId) -> DomainResult<Option<BatchStock>> {
        let key = match self.index.read().map_err(poisoned)?.get(&id) {
            Some(key) => *key,
            None => return Ok(None),
        };
        Ok(self.batches(&key)?.into_iter().find(|b| b.id == id))
    }

    fn batches_where(&self, predicate: &dyn Fn(&BatchStock) -> bool) -> DomainResult<Vec<BatchStock>> {
        let cells: Vec<Cell> = self.cells.read().map_err(poisoned)?.values().cloned().collect();
        let mut found = Vec::new();
        for cell in cells {
            let rows = cell.lock().map_err(poisoned)?;
            found.extend(rows.iter().filter(|b| predicate(b)).cloned());
        }
        found.sort_by_key(|b| (b.received_at, b.id));
        Ok(found)
    }
}
