//! The Aggregator trait defines the interface shared by every aggregation
//! strategy.
//!
//! Having one interface enables:
//! - Conformance testing with a shared test suite
//! - Benchmarking the strategies against each other
//! - Swapping strategies in the CLI
//!
//! Aggregation is commutative and associative per key, so the order in which
//! records arrive never changes any total.
//!
//! Totals saturate at `u64::MAX` instead of wrapping; a warning is logged
//! when that happens.

pub mod linear_list;
pub mod rb_map;

use crate::error::{Result, TallyError};
use crate::record::Record;

/// A strategy for folding `(key, count)` records into per-key totals.
pub trait Aggregator: Default {
    /// Short label used in reports and benchmark ids.
    fn name(&self) -> &'static str;

    /// Add `count` to the total for `key`.
    ///
    /// Never fails. A bounded strategy may discard the record once full.
    fn insert(&mut self, key: &str, count: u64);

    /// The aggregated total for `key`, or `None` if no record for `key` was
    /// ever accepted.
    fn total(&self, key: &str) -> Option<u64>;

    /// Sum of every count accepted so far.
    fn grand_total(&self) -> u64;

    /// Like `total`, but absence is reported as `KeyNotFound`.
    fn lookup(&self, key: &str) -> Result<u64> {
        return self
            .total(key)
            .ok_or_else(|| TallyError::KeyNotFound(key.to_string()));
    }

    /// Like `total`, treating an absent key as zero.
    fn total_or_zero(&self, key: &str) -> u64 {
        return self.total(key).unwrap_or(0);
    }

    /// Insert every record in iteration order.
    fn extend_records<I: IntoIterator<Item = Record>>(&mut self, records: I) {
        for record in records {
            self.insert(&record.key, record.count);
        }
    }
}

/// Add `count` into `acc`, saturating at `u64::MAX`.
///
/// Returns false if the sum was clamped.
pub(crate) fn add_count(acc: &mut u64, count: u64, what: &str) -> bool {
    match acc.checked_add(count) {
        Some(sum) => {
            *acc = sum;
            return true;
        }
        None => {
            log::warn!("{} overflowed u64, saturating at {}", what, u64::MAX);
            *acc = u64::MAX;
            return false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_count_saturates() {
        let mut acc = u64::MAX - 1;
        assert!(add_count(&mut acc, 1, "test"));
        assert_eq!(acc, u64::MAX);
        assert!(!add_count(&mut acc, 1, "test"));
        assert_eq!(acc, u64::MAX);
    }
}
