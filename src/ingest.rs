//! Delimited-text ingestion.
//!
//! Turns lines such as
//!
//! ```text
//! date,county,state,fips,cases,deaths
//! 2020-01-21,Snohomish,Washington,53061,1,0
//! ```
//!
//! into [`Record`]s by picking a key column and a count column. The default
//! [`Layout`] matches that shape: comma-separated, one header line, key in
//! column 2, count in column 4.
//!
//! Fields are split naively on the delimiter; quoted fields are not
//! supported.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use crate::error::{Result, TallyError};
use crate::record::Record;

/// Where to find the key and count in each line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    pub delimiter: char,
    /// Zero-based column holding the key.
    pub key_column: usize,
    /// Zero-based column holding the count.
    pub count_column: usize,
    /// Skip the first line.
    pub has_header: bool,
}

impl Default for Layout {
    fn default() -> Self {
        return Layout {
            delimiter: ',',
            key_column: 2,
            count_column: 4,
            has_header: true,
        };
    }
}

/// Parse one data line. `line_number` is one-based and only used in errors.
pub fn parse_line(line: &str, line_number: usize, layout: &Layout) -> Result<Record> {
    let malformed = |reason: String| TallyError::MalformedInput {
        line: line_number,
        reason,
    };

    let mut key = None;
    let mut count = None;
    for (column, field) in line.split(layout.delimiter).enumerate() {
        if column == layout.key_column {
            key = Some(field.trim());
        }
        if column == layout.count_column {
            count = Some(field.trim());
        }
    }

    let key = key.ok_or_else(|| malformed(format!("missing key column {}", layout.key_column)))?;
    if key.is_empty() {
        return Err(malformed("empty key".to_string()));
    }

    let count = count.ok_or_else(|| malformed(format!("missing count column {}", layout.count_column)))?;
    let count = count
        .parse::<u64>()
        .map_err(|e| malformed(format!("count {:?} is not a non-negative integer: {}", count, e)))?;

    return Ok(Record::new(key, count));
}

/// Iterator of records over any buffered reader.
pub struct RecordReader<R: BufRead> {
    lines: Lines<R>,
    layout: Layout,
    line_number: usize,
    records: usize,
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(reader: R, layout: Layout) -> RecordReader<R> {
        return RecordReader {
            lines: reader.lines(),
            layout,
            line_number: 0,
            records: 0,
        };
    }

    /// Records yielded so far.
    pub fn records_read(&self) -> usize {
        return self.records;
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(TallyError::Io(e))),
            };
            self.line_number += 1;

            if self.line_number == 1 && self.layout.has_header {
                log::debug!("skipping header: {:?}", line);
                continue;
            }
            if line.trim().is_empty() {
                continue;
            }

            let record = parse_line(&line, self.line_number, &self.layout);
            if record.is_ok() {
                self.records += 1;
            }
            return Some(record);
        }
    }
}

/// Read every record, stopping at the first malformed line or I/O error.
pub fn read_records<R: BufRead>(reader: R, layout: &Layout) -> Result<Vec<Record>> {
    let mut reader = RecordReader::new(reader, layout.clone());
    let records = reader.by_ref().collect::<Result<Vec<_>>>()?;
    log::debug!("read {} records over {} lines", records.len(), reader.line_number);
    return Ok(records);
}

/// Open a file for record-by-record reading.
pub fn open(path: impl AsRef<Path>, layout: &Layout) -> Result<RecordReader<BufReader<File>>> {
    let file = File::open(path.as_ref())?;
    return Ok(RecordReader::new(BufReader::new(file), layout.clone()));
}
