//! Linear-scan aggregation baseline.
//!
//! Records are appended as they arrive and never merged. Any per-key total is
//! a full scan over every stored record. This is deliberately the slow
//! strategy: it exists to be compared against `AggregationMap`, so it must not
//! grow an index.
//!
//! The list is bounded. Appends past the ceiling are dropped and counted,
//! never propagated as an error.

use crate::aggregate::{Aggregator, add_count};
use crate::record::Record;

/// Default ceiling on stored records.
pub const DEFAULT_CAPACITY: usize = 712_000;

/// An append-only, bounded list of records.
#[derive(Clone, Debug)]
pub struct LinearList {
    records: Vec<Record>,
    capacity_limit: usize,
    /// Sum of every accepted count. Popping does not reduce it.
    grand_total: u64,
    dropped: usize,
}

impl LinearList {
    /// Create an empty list with the default ceiling.
    pub fn new() -> LinearList {
        return LinearList::with_capacity_limit(DEFAULT_CAPACITY);
    }

    /// Create an empty list that stores at most `limit` records.
    pub fn with_capacity_limit(limit: usize) -> LinearList {
        return LinearList {
            records: Vec::new(),
            capacity_limit: limit,
            grand_total: 0,
            dropped: 0,
        };
    }

    pub fn len(&self) -> usize {
        return self.records.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.records.is_empty();
    }

    pub fn capacity_limit(&self) -> usize {
        return self.capacity_limit;
    }

    pub fn is_full(&self) -> bool {
        return self.records.len() >= self.capacity_limit;
    }

    /// Number of appends discarded because the list was full.
    pub fn dropped(&self) -> usize {
        return self.dropped;
    }

    pub fn grand_total(&self) -> u64 {
        return self.grand_total;
    }

    /// Append a record to the top. Returns false if it was dropped.
    pub fn append(&mut self, key: &str, count: u64) -> bool {
        if self.is_full() {
            if self.dropped == 0 {
                log::warn!(
                    "linear list full at {} records, dropping further appends",
                    self.capacity_limit
                );
            }
            self.dropped += 1;
            return false;
        }

        self.records.push(Record::new(key, count));
        add_count(&mut self.grand_total, count, "grand total");
        return true;
    }

    /// The most recently appended record.
    pub fn top(&self) -> Option<&Record> {
        return self.records.last();
    }

    /// Remove and return the most recently appended record.
    pub fn pop_top(&mut self) -> Option<Record> {
        return self.records.pop();
    }

    /// Sum the counts of every stored record matching `key`.
    ///
    /// Always walks the whole list. Returns `None` if nothing matched.
    pub fn total_for(&self, key: &str) -> Option<u64> {
        let mut found = false;
        let mut total = 0u64;
        for record in &self.records {
            if record.key == key {
                found = true;
                total = total.saturating_add(record.count);
            }
        }
        if !found {
            return None;
        }
        return Some(total);
    }

    /// Pop every record and tally it against `keys`.
    ///
    /// Each popped record is matched to its slot by a linear search over
    /// `keys`; records with unlisted keys are discarded. Slot `i` of the
    /// result is the total for `keys[i]`. A key listed twice only gets its
    /// first slot filled, so callers pass distinct keys. The list is empty
    /// afterwards.
    pub fn drain_tally(&mut self, keys: &[&str]) -> Vec<u64> {
        let mut totals = vec![0u64; keys.len()];
        while let Some(record) = self.pop_top() {
            if let Some(slot) = keys.iter().position(|key| *key == record.key) {
                totals[slot] = totals[slot].saturating_add(record.count);
            }
        }
        return totals;
    }
}

impl Default for LinearList {
    fn default() -> Self {
        return Self::new();
    }
}

impl Aggregator for LinearList {
    fn name(&self) -> &'static str {
        return "list";
    }

    fn insert(&mut self, key: &str, count: u64) {
        self.append(key, count);
    }

    fn total(&self, key: &str) -> Option<u64> {
        return self.total_for(key);
    }

    fn grand_total(&self) -> u64 {
        return self.grand_total;
    }
}

impl Extend<Record> for LinearList {
    fn extend<I: IntoIterator<Item = Record>>(&mut self, iter: I) {
        self.extend_records(iter);
    }
}

impl FromIterator<Record> for LinearList {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        let mut list = LinearList::new();
        list.extend(iter);
        return list;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list() {
        let mut list = LinearList::new();
        assert_eq!(list.len(), 0);
        assert_eq!(list.grand_total(), 0);
        assert_eq!(list.capacity_limit(), DEFAULT_CAPACITY);
        assert!(list.top().is_none());
        assert!(list.pop_top().is_none());
    }

    #[test]
    fn append_tracks_grand_total() {
        let mut list = LinearList::new();
        assert!(list.append("Texas", 100));
        assert!(list.append("Texas", 50));
        assert!(list.append("Alabama", 10));

        assert_eq!(list.len(), 3);
        assert_eq!(list.grand_total(), 160);
        assert_eq!(list.total_for("Texas"), Some(150));
        assert_eq!(list.total_for("Alabama"), Some(10));
        assert_eq!(list.total_for("Wyoming"), None);
    }

    #[test]
    fn zero_count_still_found() {
        let mut list = LinearList::new();
        list.append("Maine", 0);
        assert_eq!(list.total_for("Maine"), Some(0));
    }

    #[test]
    fn pop_returns_most_recent() {
        let mut list = LinearList::new();
        list.append("a", 1);
        list.append("b", 2);

        assert_eq!(list.top(), Some(&Record::new("b", 2)));
        assert_eq!(list.pop_top(), Some(Record::new("b", 2)));
        assert_eq!(list.pop_top(), Some(Record::new("a", 1)));
        assert_eq!(list.pop_top(), None);
        // Grand total is "ever inserted", not "currently stored".
        assert_eq!(list.grand_total(), 3);
    }

    #[test]
    fn overflow_is_dropped() {
        let mut list = LinearList::with_capacity_limit(2);
        assert!(list.append("a", 1));
        assert!(list.append("b", 2));
        assert!(list.is_full());
        assert!(!list.append("c", 4));
        assert!(!list.append("a", 8));

        assert_eq!(list.len(), 2);
        assert_eq!(list.dropped(), 2);
        assert_eq!(list.grand_total(), 3);
        assert_eq!(list.total_for("a"), Some(1));
        assert_eq!(list.total_for("c"), None);
    }

    #[test]
    fn zero_capacity_drops_everything() {
        let mut list = LinearList::with_capacity_limit(0);
        assert!(!list.append("a", 1));
        assert!(list.is_empty());
        assert_eq!(list.grand_total(), 0);
    }

    #[test]
    fn totals_saturate_instead_of_overflowing() {
        let mut list = LinearList::new();
        list.append("Texas", u64::MAX);
        list.append("Ohio", 1);
        list.append("Texas", 5);

        assert_eq!(list.grand_total(), u64::MAX);
        assert_eq!(list.total_for("Texas"), Some(u64::MAX));
        assert_eq!(list.drain_tally(&["Texas", "Ohio"]), vec![u64::MAX, 1]);
    }

    #[test]
    fn drain_tally_matches_scan() {
        let mut list = LinearList::new();
        for (key, count) in [("b", 2), ("a", 1), ("c", 7), ("b", 3), ("z", 100)] {
            list.append(key, count);
        }
        let keys = ["a", "b", "c"];
        let expected: Vec<u64> = keys.iter().map(|k| list.total_for(k).unwrap()).collect();

        let totals = list.drain_tally(&keys);
        assert_eq!(totals, expected);
        assert_eq!(totals, vec![1, 5, 7]);
        assert!(list.is_empty());
    }
}
