use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};

use wareledger_core::{DomainError, DomainResult, Entity};

/// Keyed record store for entities that are not ledger rows
/// (warehouses, expiry alerts, shipment plans).
pub trait RecordStore<E: Entity>: Send + Sync {
    fn get(&self, id: &E::Id) -> DomainResult<Option<E>>;
    fn upsert(&self, record: E) -> DomainResult<()>;
    fn list(&self) -> DomainResult<Vec<E>>;

    /// Records matching `predicate`.
    fn find(&self, predicate: &dyn Fn(&E) -> bool) -> DomainResult<Vec<E>> {
        Ok(self.list()?.into_iter().filter(|r| predicate(r)).collect())
    }

    /// Read-modify-write one record under the store's write lock.
    ///
    /// The record is only written back if `f` succeeds.
    fn update<T>(
        &self,
        id: &E::Id,
        f: impl FnOnce(&mut E) -> DomainResult<T>,
    ) -> DomainResult<Option<T>>;

    /// A record matching `predicate`, or the one built by `make`, inserted
    /// under the same write lock. The flag is `true` when `make` ran.
    fn find_or_insert(
        &self,
        predicate: &dyn Fn(&E) -> bool,
        make: impl FnOnce() -> DomainResult<E>,
    ) -> DomainResult<(E, bool)>;
}

impl<E, S> RecordStore<E> for Arc<S>
where
    E: Entity,
    S: RecordStore<E>,
{
    fn get(&self, id: &E::Id) -> DomainResult<Option<E>> {
        (**self).get(id)
    }

    fn upsert(&self, record: E) -> DomainResult<()> {
        (**self).upsert(record)
    }

    fn list(&self) -> DomainResult<Vec<E>> {
        (**self).list()
    }

    fn find(&self, predicate: &dyn Fn(&E) -> bool) -> DomainResult<Vec<E>> {
        (**self).find(predicate)
    }

    fn update<T>(
        &self,
        id: &E::Id,
        f: impl FnOnce(&mut E) -> DomainResult<T>,
    ) -> DomainResult<Option<T>> {
        (**self).update(id, f)
    }

    fn find_or_insert(
        &self,
        predicate: &dyn Fn(&E) -> bool,
        make: impl FnOnce() -> DomainResult<E>,
    ) -> DomainResult<(E, bool)> {
        (**self).find_or_insert(predicate, make)
    }
}

/// In-memory record store for tests/dev.
#[derive(Debug)]
pub struct InMemoryRecordStore<E: Entity> {
    inner: RwLock<HashMap<E::Id, E>>,
}

impl<E: Entity> InMemoryRecordStore<E> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<E: Entity> Default for InMemoryRecordStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn poisoned<T>(_: T) -> DomainError {
    DomainError::storage("lock poisoned")
}

impl<E> RecordStore<E> for InMemoryRecordStore<E>
where
    E: Entity + Clone + Send + Sync + 'static,
    E::Id: Clone + Eq + Hash + Send + Sync + 'static,
{
    fn get(&self, id: &E::Id) -> DomainResult<Option<E>> {
        let map = self.inner.read().map_err(poisoned)?;
        Ok(map.get(id).cloned())
    }

    fn upsert(&self, record: E) -> DomainResult<()> {
        let mut map = self.inner.write().map_err(poisoned)?;
        map.insert(record.id().clone(), record);
        Ok(())
    }

    fn list(&self) -> DomainResult<Vec<E>> {
        let map = self.inner.read().map_err(poisoned)?;
        Ok(map.values().cloned().collect())
    }

    fn find(&self, predicate: &dyn Fn(&E) -> bool) -> DomainResult<Vec<E>> {
        let map = self.inner.read().map_err(poisoned)?;
        Ok(map.values().filter(|r| predicate(r)).cloned().collect())
    }

    fn update<T>(
        &self,
        id: &E::Id,
        f: impl FnOnce(&mut E) -> DomainResult<T>,
    ) -> DomainResult<Option<T>> {
        let mut map = self.inner.write().map_err(poisoned)?;
        let Some(current) = map.get(id) else {
            return Ok(None);
        };
        let mut scratch = current.clone();
        let out = f(&mut scratch)?;
        map.insert(id.clone(), scratch);
        Ok(Some(out))
    }

    fn find_or_insert(
        &self,
        predicate: &dyn Fn(&E) -> bool,
        make: impl FnOnce() -> DomainResult<E>,
    ) -> DomainResult<(E, bool)> {
        let mut map = self.inner.write().map_err(poisoned)?;
        if let Some(existing) = map.values().find(|r| predicate(r)) {
            return Ok((existing.clone(), false));
        }
        let record = make()?;
        map.insert(record.id().clone(), record.clone());
        Ok((record, true))
    }
}
