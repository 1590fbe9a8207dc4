//! Measurement Feeds
//!
//! Loads the seven measurement feeds, normalizes their columns onto the
//! canonical fields and deduplicates each feed to one row per (key, day).
//!
//! ## Dedup rule
//!
//! Rows are stably sorted by (key, timestamp). For every (key, day) and every
//! value field the last non-null value wins; a later null never erases an
//! earlier reading. Timestamps only order rows and are then truncated to the
//! calendar day.

pub(crate) mod csv;
mod schema;

pub use schema::{ColumnMap, FeedKind, ValueSource};
pub(crate) use schema::key_aliases;

use crate::config::defaults::MAX_LOGGED_ROW_ERRORS;
use chrono::{NaiveDate, NaiveDateTime};
use self::csv::CsvTable;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{feed} feed is missing required column '{column}'")]
    MissingColumn { feed: String, column: &'static str },
}

// ============================================================================
// Rows and Tables
// ============================================================================

/// One normalized source row before dedup.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedRow {
    pub key: String,
    pub timestamp: NaiveDateTime,
    /// Aligned with `FeedKind::fields()`
    pub values: Vec<Option<f64>>,
}

impl FeedRow {
    pub fn new(key: impl Into<String>, timestamp: NaiveDateTime, values: Vec<Option<f64>>) -> Self {
        Self {
            key: key.into().trim().to_string(),
            timestamp,
            values,
        }
    }

    /// A row stamped at midnight of `date`.
    pub fn on_day(key: impl Into<String>, date: NaiveDate, values: Vec<Option<f64>>) -> Self {
        Self::new(key, date.and_time(chrono::NaiveTime::MIN), values)
    }

    fn has_measurement(&self) -> bool {
        self.values.iter().any(Option::is_some)
    }
}

/// A deduplicated feed: key -> day -> values.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedTable {
    kind: FeedKind,
    rows: BTreeMap<String, BTreeMap<NaiveDate, Vec<Option<f64>>>>,
}

impl FeedTable {
    pub fn empty(kind: FeedKind) -> Self {
        Self {
            kind,
            rows: BTreeMap::new(),
        }
    }

    /// Deduplicate raw rows. Returns the table and the number of rows folded
    /// into an existing (key, day).
    pub fn from_rows(kind: FeedKind, mut rows: Vec<FeedRow>) -> (Self, usize) {
        let width = kind.fields().len();
        let incoming = rows.len();

        // sort_by is stable; equal timestamps keep source order
        rows.sort_by(|a, b| a.key.cmp(&b.key).then(a.timestamp.cmp(&b.timestamp)));

        let mut table = Self::empty(kind);
        for mut row in rows {
            row.values.resize(width, None);
            let slot = table
                .rows
                .entry(row.key)
                .or_default()
                .entry(row.timestamp.date())
                .or_insert_with(|| vec![None; width]);
            for (current, incoming) in slot.iter_mut().zip(row.values) {
                if incoming.is_some() {
                    *current = incoming;
                }
            }
        }

        let duplicates = incoming - table.len();
        (table, duplicates)
    }

    pub fn kind(&self) -> FeedKind {
        self.kind
    }

    /// Number of distinct (key, day) rows.
    pub fn len(&self) -> usize {
        self.rows.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    /// Day series for one key, ascending by date.
    pub fn series(&self, key: &str) -> Option<&BTreeMap<NaiveDate, Vec<Option<f64>>>> {
        self.rows.get(key)
    }

    pub fn values(&self, key: &str, date: NaiveDate) -> Option<&[Option<f64>]> {
        self.rows.get(key)?.get(&date).map(Vec::as_slice)
    }

    /// Earliest day on which `key` has at least one non-null value.
    pub fn first_measurement(&self, key: &str) -> Option<NaiveDate> {
        self.rows
            .get(key)?
            .iter()
            .find(|(_, values)| values.iter().any(Option::is_some))
            .map(|(date, _)| *date)
    }
}

// ============================================================================
// Feed Set
// ============================================================================

/// All seven feeds for a run. Feeds never loaded are empty.
#[derive(Debug, Clone, Default)]
pub struct FeedSet {
    tables: BTreeMap<FeedKind, FeedTable>,
}

impl FeedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: FeedTable) {
        self.tables.insert(table.kind(), table);
    }

    /// Deduplicate `rows` into the `kind` feed, replacing what was there.
    #[must_use]
    pub fn with_rows(mut self, kind: FeedKind, rows: Vec<FeedRow>) -> Self {
        self.insert(FeedTable::from_rows(kind, rows).0);
        self
    }

    pub fn table(&self, kind: FeedKind) -> Option<&FeedTable> {
        self.tables.get(&kind)
    }

    pub fn tables(&self) -> impl Iterator<Item = &FeedTable> {
        self.tables.values()
    }

    /// Load every feed file from a run input directory.
    ///
    /// A missing file is an empty feed; a file missing a required column
    /// fails the whole load.
    pub fn load_dir(dir: &Path) -> Result<(Self, Vec<FeedLoadSummary>), FeedError> {
        let mut set = Self::new();
        let mut summaries = Vec::with_capacity(FeedKind::ALL.len());

        for kind in FeedKind::ALL {
            let path = dir.join(kind.file_name());
            if !path.exists() {
                info!(feed = %kind, path = %path.display(), "Feed file not present, treating as empty");
                set.insert(FeedTable::empty(kind));
                continue;
            }
            let (table, summary) = load_feed(kind, &path)?;
            set.insert(table);
            summaries.push(summary);
        }

        Ok((set, summaries))
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Counts from loading one feed file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedLoadSummary {
    pub feed: String,
    pub source: String,
    pub rows_read: usize,
    /// Rows dropped for an unreadable key or date
    pub error_rows: usize,
    /// Rows with no value in any field
    pub null_rows: usize,
    /// Rows folded into an earlier (key, day)
    pub duplicates: usize,
    pub unique_rows: usize,
}

impl std::fmt::Display for FeedLoadSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} rows read, {} kept, {} duplicates, {} empty, {} dropped",
            self.feed, self.rows_read, self.unique_rows, self.duplicates, self.null_rows, self.error_rows
        )
    }
}

/// Load one feed CSV file.
pub fn load_feed(kind: FeedKind, path: &Path) -> Result<(FeedTable, FeedLoadSummary), FeedError> {
    let file = File::open(path).map_err(|source| FeedError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_feed(kind, BufReader::new(file), &path.display().to_string())
}

/// Parse a feed from any buffered reader. `source` labels log lines.
pub fn read_feed<R: BufRead>(
    kind: FeedKind,
    reader: R,
    source: &str,
) -> Result<(FeedTable, FeedLoadSummary), FeedError> {
    let table = CsvTable::read(reader).map_err(|e| FeedError::Io {
        path: PathBuf::from(source),
        source: e,
    })?;

    let mut summary = FeedLoadSummary {
        feed: kind.name().to_string(),
        source: source.to_string(),
        ..FeedLoadSummary::default()
    };

    if table.header.is_empty() {
        warn!(feed = %kind, source, "Feed file is empty");
        return Ok((FeedTable::empty(kind), summary));
    }

    let columns = ColumnMap::from_header(kind, &table)?;
    info!(feed = %kind, source, "{}", columns.summary());

    let mut rows = Vec::with_capacity(table.records.len());
    for record in &table.records {
        summary.rows_read += 1;

        let key = record.get(columns.key).unwrap_or("").trim_matches('"');
        let timestamp = record.get(columns.date).and_then(csv::parse_timestamp);
        let Some(timestamp) = timestamp.filter(|_| !key.is_empty()) else {
            if summary.error_rows < MAX_LOGGED_ROW_ERRORS {
                warn!(feed = %kind, line = record.line, "Row has no usable key or date, dropped");
            }
            summary.error_rows += 1;
            continue;
        };

        let row = FeedRow::new(key, timestamp, columns.read_values(record));
        if !row.has_measurement() {
            summary.null_rows += 1;
        }
        rows.push(row);
    }

    let (feed, duplicates) = FeedTable::from_rows(kind, rows);
    summary.duplicates = duplicates;
    summary.unique_rows = feed.len();

    info!(
        feed = %kind,
        rows = summary.rows_read,
        unique = summary.unique_rows,
        duplicates = summary.duplicates,
        null_rows = summary.null_rows,
        errors = summary.error_rows,
        "Feed loaded"
    );

    Ok((feed, summary))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn at(d: u32, h: u32) -> NaiveDateTime {
        day(d).and_hms_opt(h, 0, 0).unwrap()
    }

    // === Dedup ===

    #[test]
    fn test_duplicate_key_date_keeps_later_row() {
        let rows = vec![
            FeedRow::new("C1", at(1, 6), vec![Some(0.5)]),
            FeedRow::new("C1", at(1, 18), vec![Some(0.7)]),
            FeedRow::new("C1", at(2, 0), vec![Some(0.9)]),
        ];
        let (table, duplicates) = FeedTable::from_rows(FeedKind::Cgr, rows);
        assert_eq!(duplicates, 1);
        assert_eq!(table.len(), 2);
        assert_eq!(table.values("C1", day(1)), Some(&[Some(0.7)][..]));
    }

    #[test]
    fn test_dedup_orders_by_timestamp_not_input_order() {
        let rows = vec![
            FeedRow::new("C1", at(1, 18), vec![Some(0.7)]),
            FeedRow::new("C1", at(1, 6), vec![Some(0.5)]),
        ];
        let (table, _) = FeedTable::from_rows(FeedKind::Cgr, rows);
        assert_eq!(table.values("C1", day(1)), Some(&[Some(0.7)][..]));
    }

    #[test]
    fn test_dedup_later_null_does_not_erase() {
        let rows = vec![
            FeedRow::on_day("F1", day(1), vec![Some(100.0), Some(24.0)]),
            FeedRow::new("F1", at(1, 12), vec![None, Some(12.0)]),
        ];
        let (table, _) = FeedTable::from_rows(FeedKind::GasWellhead, rows);
        assert_eq!(
            table.values("F1", day(1)),
            Some(&[Some(100.0), Some(12.0)][..])
        );
    }

    #[test]
    fn test_dedup_equal_timestamps_keep_source_order() {
        let rows = vec![
            FeedRow::on_day("F1", day(3), vec![Some(1.0)]),
            FeedRow::on_day("F1", day(3), vec![Some(2.0)]),
        ];
        let (table, _) = FeedTable::from_rows(FeedKind::Ecf, rows);
        assert_eq!(table.values("F1", day(3)), Some(&[Some(2.0)][..]));
    }

    #[test]
    fn test_first_measurement_ignores_all_null_rows() {
        let rows = vec![
            FeedRow::on_day("F1", day(1), vec![None, None]),
            FeedRow::on_day("F1", day(4), vec![Some(0.0), None]),
        ];
        let (table, _) = FeedTable::from_rows(FeedKind::GasWellhead, rows);
        assert_eq!(table.first_measurement("F1"), Some(day(4)));
        assert_eq!(table.first_measurement("F2"), None);
    }

    // === Loading ===

    #[test]
    fn test_read_feed_counts_errors_and_nulls() {
        let csv = "IDRECPARENT,DTTM,VOLENTERGAS,DURONOR\n\
                   F1,2024-01-01,10,24\n\
                   F1,2024-01-01 12:00:00,11,\n\
                   ,2024-01-02,5,24\n\
                   F1,not-a-date,5,24\n\
                   F1,2024-01-03,,\n";
        let (table, summary) = read_feed(FeedKind::GasWellhead, csv.as_bytes(), "test").unwrap();
        assert_eq!(summary.rows_read, 5);
        assert_eq!(summary.error_rows, 2);
        assert_eq!(summary.null_rows, 1);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.unique_rows, 2);
        assert_eq!(table.values("F1", day(1)), Some(&[Some(11.0), Some(24.0)][..]));
    }

    #[test]
    fn test_read_feed_unparsable_value_is_null() {
        let csv = "compression_id,date,wgr_ratio\nC1,2024-01-01,n/a\n";
        let (table, summary) = read_feed(FeedKind::Wgr, csv.as_bytes(), "test").unwrap();
        assert_eq!(summary.error_rows, 0);
        assert_eq!(table.values("C1", day(1)), Some(&[None][..]));
    }

    #[test]
    fn test_load_dir_missing_file_is_empty_feed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("ecf.csv"),
            "flow_id,date,ecf_ratio\nF1,2024-01-01,0.98\n",
        )
        .unwrap();

        let (set, summaries) = FeedSet::load_dir(dir.path()).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(
            summaries[0].to_string(),
            "ecf: 1 rows read, 1 kept, 0 duplicates, 0 empty, 0 dropped"
        );
        assert_eq!(set.table(FeedKind::Ecf).map(FeedTable::len), Some(1));
        assert!(set.table(FeedKind::Gathered).is_some_and(FeedTable::is_empty));
    }

    #[test]
    fn test_load_dir_missing_column_names_feed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("wgr.csv"), "compression_id,date,value\n").unwrap();

        let err = FeedSet::load_dir(dir.path()).unwrap_err();
        assert!(err.to_string().contains("wgr"), "error should name the feed: {err}");
    }
}
