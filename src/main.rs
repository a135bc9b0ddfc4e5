//! Tally CLI - aggregate a delimited file and report per-key totals.
//!
//! Runs the red-black map, the linear baseline, or both over the same input,
//! times each strategy's query phase, and prints every key's total and share
//! of the grand total.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release -- cases.csv
//! cargo run --release -- cases.csv --strategy map --keys Texas,Ohio
//! cargo run --release -- counts.tsv --delimiter '\t' --key-column 0 --count-column 1 --no-header
//! ```
//!
//! ## Environment Variables
//!
//! - RUST_LOG - Logging level (optional, default: info)

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use rustc_hash::FxHashSet;

use tally::aggregate::linear_list::DEFAULT_CAPACITY;
use tally::ingest::{self, Layout};
use tally::{AggregationMap, Aggregator, LinearList, Record};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Strategy {
    Map,
    List,
    Both,
}

#[derive(Debug, Parser)]
#[command(name = "tally", version, about = "Aggregate per-key counts from a delimited file")]
struct Args {
    /// Delimited input file.
    input: PathBuf,

    /// Which aggregation strategy to run.
    #[arg(long, value_enum, default_value_t = Strategy::Both)]
    strategy: Strategy,

    /// Field delimiter.
    #[arg(long, default_value_t = ',')]
    delimiter: char,

    /// Zero-based column holding the key.
    #[arg(long, default_value_t = 2)]
    key_column: usize,

    /// Zero-based column holding the count.
    #[arg(long, default_value_t = 4)]
    count_column: usize,

    /// The first line is data, not a header.
    #[arg(long)]
    no_header: bool,

    /// Record ceiling for the linear list.
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    capacity: usize,

    /// Keys to report, comma-separated (default: every key, first-seen order).
    #[arg(long, value_delimiter = ',')]
    keys: Vec<String>,
}

impl Args {
    fn layout(&self) -> Layout {
        return Layout {
            delimiter: self.delimiter,
            key_column: self.key_column,
            count_column: self.count_column,
            has_header: !self.no_header,
        };
    }
}

/// Result of one aggregation pass.
#[derive(Debug)]
struct Report {
    name: &'static str,
    totals: Vec<u64>,
    grand_total: u64,
    query_time: Duration,
    /// Records the strategy refused (list capacity).
    dropped: usize,
}

/// Percentage of `grand_total` that `total` represents.
fn share(total: u64, grand_total: u64) -> f64 {
    if grand_total == 0 {
        return 0.0;
    }
    return total as f64 / grand_total as f64 * 100.0;
}

/// Every distinct key, in the order it first appears.
fn distinct_keys<'a>(keys: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = FxHashSet::default();
    let mut distinct = Vec::new();
    for key in keys {
        if seen.insert(key) {
            distinct.push(key.to_string());
        }
    }
    return distinct;
}

fn run_map(records: &[Record], keys: &[&str]) -> Report {
    let mut map = AggregationMap::new();
    for record in records {
        map.insert(&record.key, record.count);
    }
    log::info!(
        "map: {} distinct keys, height {}",
        map.len(),
        map.height()
    );

    let start = Instant::now();
    let totals: Vec<u64> = keys
        .iter()
        .map(|key| match map.lookup(key) {
            Ok(total) => total,
            Err(e) => {
                log::warn!("{}, reporting 0", e);
                0
            }
        })
        .collect();
    let query_time = start.elapsed();

    return Report {
        name: map.name(),
        totals,
        grand_total: map.grand_total(),
        query_time,
        dropped: 0,
    };
}

fn run_list(records: &[Record], keys: &[&str], capacity: usize) -> Report {
    let mut list = LinearList::with_capacity_limit(capacity);
    for record in records {
        list.append(&record.key, record.count);
    }
    if list.dropped() > 0 {
        log::warn!("list: dropped {} records past capacity {}", list.dropped(), capacity);
    }
    log::info!("list: {} records stored", list.len());

    let name = list.name();
    let grand_total = list.grand_total();
    let dropped = list.dropped();
    let start = Instant::now();
    let totals = list.drain_tally(keys);
    let query_time = start.elapsed();

    return Report {
        name,
        totals,
        grand_total,
        query_time,
        dropped,
    };
}

fn print_report(report: &Report, keys: &[&str]) {
    println!("=== {} ===", report.name);
    for (key, total) in keys.iter().zip(&report.totals) {
        println!(
            "  {:<24} {:>12} {:>8.3}%",
            key,
            total,
            share(*total, report.grand_total)
        );
    }
    println!("  grand total: {}", report.grand_total);
    println!("  query time: {} us", report.query_time.as_micros());
}

/// Compare the map and list reports. Returns false if the comparison was
/// skipped because the list dropped records at capacity.
fn cross_check(map: &Report, list: &Report) -> anyhow::Result<bool> {
    if list.dropped > 0 {
        log::warn!(
            "{} dropped {} records at capacity, skipping cross-check",
            list.name,
            list.dropped
        );
        return Ok(false);
    }
    if map.totals != list.totals || map.grand_total != list.grand_total {
        bail!(
            "strategies disagree: {} grand total {}, {} grand total {}",
            map.name,
            map.grand_total,
            list.name,
            list.grand_total
        );
    }
    return Ok(true);
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let args = Args::parse();
    let layout = args.layout();
    log::info!("input: {}", args.input.display());
    log::info!("strategy: {:?}, layout: {:?}", args.strategy, layout);

    let reader = ingest::open(&args.input, &layout)
        .with_context(|| format!("failed to open {}", args.input.display()))?;
    let records = reader
        .collect::<tally::Result<Vec<Record>>>()
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    log::info!("read {} records", records.len());

    let keys = if args.keys.is_empty() {
        distinct_keys(records.iter().map(|record| record.key.as_str()))
    } else {
        distinct_keys(args.keys.iter().map(String::as_str))
    };
    let keys: Vec<&str> = keys.iter().map(String::as_str).collect();

    let mut reports = Vec::new();
    if args.strategy != Strategy::List {
        reports.push(run_map(&records, &keys));
    }
    if args.strategy != Strategy::Map {
        reports.push(run_list(&records, &keys, args.capacity));
    }

    for report in &reports {
        print_report(report, &keys);
    }

    if let [map, list] = reports.as_slice() {
        if cross_check(map, list)? {
            log::info!("strategies agree on {} keys", keys.len());
        }
    }

    return Ok(());
}
