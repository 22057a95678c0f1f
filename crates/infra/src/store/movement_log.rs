//! Append-only movement log with subscriber fan-out.
//!
//! Movements are appended by the ledger store after a mutation commits and are
//! then pushed to every live subscriber. Delivery is at-least-once from the
//! subscriber's point of view: consumers that replay the log and also listen
//! may see a movement twice and must be idempotent.
//!
//! Each subscriber buffers at most `subscriber_buffer` undelivered movements.
//! A subscriber that falls further behind is disconnected: it drains what it
//! already holds, then sees a disconnect and must catch up from the log.

use std::sync::mpsc::{self, Receiver, RecvError, RecvTimeoutError, SyncSender, TryRecvError, TrySendError};
use std::sync::{Mutex, RwLock, RwLockWriteGuard};
use std::time::Duration;

use tracing::warn;

use wareledger_core::DomainResult;
use wareledger_inventory::{MovementFilter, StockMovement};

use super::record::poisoned;

/// A subscription to committed movements.
///
/// Intended for a single consuming thread.
#[derive(Debug)]
pub struct MovementSubscription {
    receiver: Receiver<StockMovement>,
}

impl MovementSubscription {
    pub fn recv(&self) -> Result<StockMovement, RecvError> {
        self.receiver.recv()
    }

    pub fn try_recv(&self) -> Result<StockMovement, TryRecvError> {
        self.receiver.try_recv()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<StockMovement, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Everything already delivered, without blocking.
    pub fn drain(&self) -> Vec<StockMovement> {
        self.receiver.try_iter().collect()
    }
}

/// Undelivered movements a subscriber may hold before it is cut off.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 4096;

/// In-memory movement log.
#[derive(Debug)]
pub struct MovementLog {
    entries: RwLock<Vec<StockMovement>>,
    subscribers: Mutex<Vec<SyncSender<StockMovement>>>,
    subscriber_buffer: usize,
}

impl Default for MovementLog {
    fn default() -> Self {
        Self::with_subscriber_buffer(DEFAULT_SUBSCRIBER_BUFFER)
    }
}

impl MovementLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subscriber_buffer(subscriber_buffer: usize) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            subscribers: Mutex::new(Vec::new()),
            subscriber_buffer: subscriber_buffer.max(1),
        }
    }

    /// Lock the log for an append that must not fail half-way.
    pub(crate) fn writer(&self) -> DomainResult<RwLockWriteGuard<'_, Vec<StockMovement>>> {
        self.entries.write().map_err(poisoned)
    }

    /// Fan committed movements out to subscribers, dropping dead and lagging ones.
    pub(crate) fn publish(&self, movements: &[StockMovement]) {
        if movements.is_empty() {
            return;
        }
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.retain(|tx| {
                movements.iter().all(|m| match tx.try_send(m.clone()) {
                    Ok(()) => true,
                    Err(TrySendError::Full(_)) => {
                        warn!(movement = %m.id, "movement subscriber lagging, disconnected");
                        false
                    }
                    Err(TrySendError::Disconnected(_)) => false,
                })
            });
        }
    }

    pub fn append(&self, movements: Vec<StockMovement>) -> DomainResult<()> {
        self.writer()?.extend(movements.iter().cloned());
        self.publish(&movements);
        Ok(())
    }

    /// Matching movements, newest first, capped by `filter.limit`.
    pub fn query(&self, filter: &MovementFilter) -> DomainResult<Vec<StockMovement>> {
        let entries = self.entries.read().map_err(poisoned)?;
        let matching = entries.iter().rev().filter(|m| filter.matches(m)).cloned();
        Ok(match filter.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Subscribe to movements committed from now on.
    ///
    /// The subscription buffers up to the log's subscriber bound; past that it
    /// is disconnected rather than growing without limit.
    pub fn subscribe(&self) -> MovementSubscription {
        let (tx, rx) = mpsc::sync_channel(self.subscriber_buffer);
        // A poisoned lock still yields a subscription; it just never receives.
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
        }
        MovementSubscription { receiver: rx }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use wareledger_core::{ProductId, WarehouseId};
    use wareledger_inventory::MovementKind;

    fn receipt(wh: WarehouseId, at: chrono::DateTime<Utc>) -> StockMovement {
        StockMovement::new(MovementKind::Receipt, ProductId::new(), "S", 1, at).to_warehouse(wh)
    }

    #[test]
    fn query_returns_newest_first_with_limit() {
        let log = MovementLog::new();
        let wh = WarehouseId::new();
        let t0 = Utc::now();
        let first = receipt(wh, t0);
        let second = receipt(wh, t0 + ChronoDuration::seconds(1));
        let third = receipt(wh, t0 + ChronoDuration::seconds(2));
        log.append(vec![first, second.clone(), third.clone()]).unwrap();

        let filter = MovementFilter {
            limit: Some(2),
            ..MovementFilter::for_warehouse(wh)
        };
        let ids: Vec<_> = log.query(&filter).unwrap().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![third.id, second.id]);
    }

    #[test]
    fn subscribers_receive_appended_movements() {
        let log = MovementLog::new();
        let sub = log.subscribe();
        let m = receipt(WarehouseId::new(), Utc::now());
        log.append(vec![m.clone()]).unwrap();

        assert_eq!(sub.try_recv().unwrap(), m);
        assert!(sub.try_recv().is_err());
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let log = MovementLog::new();
        drop(log.subscribe());
        log.append(vec![receipt(WarehouseId::new(), Utc::now())]).unwrap();
        assert_eq!(log.subscribers.lock().unwrap().len(), 0);
    }

    #[test]
    fn lagging_subscriber_is_cut_off_after_its_buffer() {
        let log = MovementLog::with_subscriber_buffer(2);
        let slow = log.subscribe();
        let wh = WarehouseId::new();
        let now = Utc::now();
        let movements: Vec<_> = (0..3).map(|i| receipt(wh, now + ChronoDuration::seconds(i))).collect();
        log.append(movements.clone()).unwrap();

        assert_eq!(slow.drain(), movements[..2].to_vec());
        assert!(matches!(slow.try_recv(), Err(TryRecvError::Disconnected)));
        assert_eq!(log.subscribers.lock().unwrap().len(), 0);
        assert_eq!(log.len(), 3);

        let fresh = log.subscribe();
        log.append(vec![receipt(wh, now)]).unwrap();
        assert_eq!(fresh.drain().len(), 1);
    }
}
