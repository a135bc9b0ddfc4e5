//! Tally - per-key count aggregation.
//!
//! A stream of `(key, count)` records is folded into per-key totals plus a
//! grand total. Two strategies implement the same [`Aggregator`] interface:
//!
//! | Strategy | Insert | Lookup | Notes |
//! |----------|--------|--------|-------|
//! | [`AggregationMap`] | O(log n) | O(log n) | Red-black tree, one node per key |
//! | [`LinearList`] | O(1) | O(n) | Append-only, bounded, full scan per query |
//!
//! Both produce identical totals; they differ only in cost.
//!
//! # Quick Start
//!
//! ```
//! use tally::{Aggregator, AggregationMap};
//!
//! let mut map = AggregationMap::new();
//! map.insert("Texas", 100);
//! map.insert("Texas", 50);
//! map.insert("Alabama", 10);
//!
//! assert_eq!(map.lookup("Texas").unwrap(), 150);
//! assert_eq!(map.grand_total(), 160);
//! assert!(map.lookup("Wyoming").is_err());
//! ```

pub mod aggregate;
pub mod error;
pub mod ingest;
pub mod record;

pub use aggregate::Aggregator;
pub use aggregate::linear_list::LinearList;
pub use aggregate::rb_map::AggregationMap;
pub use error::{Result, TallyError};
pub use record::Record;
