//! First-Expired-First-Out batch selection.
//!
//! Pure functions over a slice of batches for one (warehouse, product) pair.
//! Callers hold whatever lock protects the batches while these run.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use wareledger_core::{DomainError, DomainResult};

use crate::batch::{BatchAllocation, BatchStock};
use crate::expiry::ExpiryConfig;
use crate::stock::ensure_positive;

/// Batches that may be drawn from, in draw order.
///
/// Empty batches never qualify. With `block_expired`, batches past expiry are
/// excluded outright. Ordering is by expiry date with undated batches last, or
/// by receipt time when FEFO is disabled.
pub fn eligible_batches<'a>(
    batches: &'a [BatchStock],
    config: &ExpiryConfig,
    now: DateTime<Utc>,
) -> Vec<&'a BatchStock> {
    let mut eligible: Vec<&BatchStock> = batches
        .iter()
        .filter(|b| b.available() > 0)
        .filter(|b| !(config.block_expired && b.is_expired_at(now)))
        .collect();

    if config.fefo_enabled {
        eligible.sort_by(|a, b| fefo_order(a, b));
    } else {
        eligible.sort_by_key(|b| (b.received_at, b.id));
    }
    eligible
}

fn fefo_order(a: &BatchStock, b: &BatchStock) -> Ordering {
    let by_expiry = match (a.expiry_date, b.expiry_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_expiry
        .then(a.received_at.cmp(&b.received_at))
        .then(a.id.cmp(&b.id))
}

/// The shortest prefix of eligible batches whose availability covers `quantity`.
///
/// Fails `NoValidStock` when nothing is eligible and `InsufficientStock` when
/// the eligible batches together fall short.
pub fn select_fefo<'a>(
    batches: &'a [BatchStock],
    quantity: i64,
    config: &ExpiryConfig,
    now: DateTime<Utc>,
) -> DomainResult<Vec<&'a BatchStock>> {
    ensure_positive(quantity)?;

    let eligible = eligible_batches(batches, config, now);
    if eligible.is_empty() {
        return Err(DomainError::NoValidStock);
    }

    let mut selected = Vec::new();
    let mut covered = 0;
    for batch in eligible.iter().copied() {
        if covered >= quantity {
            break;
        }
        covered += batch.available();
        selected.push(batch);
    }

    if covered < quantity {
        let total: i64 = eligible.iter().map(|b| b.available()).sum();
        return Err(DomainError::insufficient(quantity, total));
    }
    Ok(selected)
}

/// Split `quantity` across the selected batches, draining each before the next.
pub fn allocate_fefo(
    batches: &[BatchStock],
    quantity: i64,
    config: &ExpiryConfig,
    now: DateTime<Utc>,
) -> DomainResult<Vec<BatchAllocation>> {
    let selected = select_fefo(batches, quantity, config, now)?;

    let mut remaining = quantity;
    let mut allocations = Vec::with_capacity(selected.len());
    for batch in selected {
        if remaining <= 0 {
            break;
        }
        let take = batch.available().min(remaining);
        allocations.push(BatchAllocation {
            batch_id: batch.id,
            batch_number: batch.batch_number.clone(),
            quantity: take,
            expiry_date: batch.expiry_date,
            location: batch.location.clone(),
        });
        remaining -= take;
    }
    Ok(allocations)
}
