//! Storage boundaries and their in-memory implementations.

pub mod batch;
pub mod ledger;
pub mod movement_log;
pub mod record;

pub use batch::{BatchStore, InMemoryBatchStore};
pub use ledger::{InMemoryLedgerStore, LedgerStore, LedgerTxn};
pub use movement_log::{MovementLog, MovementSubscription};
pub use record::{InMemoryRecordStore, RecordStore};
