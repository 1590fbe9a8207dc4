//! Output Store
//!
//! Sled-backed persistence for engine output. One tree per output table:
//!
//! - `daily`: `{well}\x1f{YYYY-MM-DD}` → `DailyProductionRecord`
//! - `production`: `{well}\x1f{YYYY-MM-DD}` → `ProductionRow`
//! - `factors`: `{well}\x1f{YYYY-MM}` → `MonthlyAllocationFactor`
//!
//! Values are JSON. ISO dates sort lexicographically, so a well's rows come
//! back in date order and a run window maps onto a key range. The unit
//! separator keeps `A` from prefix-matching `A-1`.

use crate::config::defaults::{DAILY_TREE, FACTOR_TREE, PRODUCTION_TREE};
use crate::sequence;
use crate::types::{
    DailyProductionRecord, MonthlyAllocationFactor, ProductionMonth, ProductionRow, RunWindow,
    WellOutput,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

const KEY_SEPARATOR: char = '\x1f';

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("export write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Destination for a run's output.
pub trait OutputWriter {
    /// Replace every stored row of each output's well inside `window` with
    /// the output's rows.
    fn replace_window(
        &self,
        outputs: &[WellOutput],
        window: RunWindow,
    ) -> Result<WriteReport, StorageError>;
}

/// Row counts from one write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteReport {
    pub deleted: usize,
    pub written: usize,
    /// Rows that failed both the batch and the row-by-row retry
    pub skipped: usize,
}

impl std::fmt::Display for WriteReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} rows written, {} skipped, {} replaced",
            self.written, self.skipped, self.deleted
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResequenceReport {
    pub wells: usize,
    /// Wells left alone because the store does not hold their whole timeline
    pub wells_skipped: usize,
    pub rows_changed: usize,
}

// ============================================================================
// Tree writes
// ============================================================================

/// Write side of one output tree.
trait KvTree {
    fn label(&self) -> String;
    fn write_batch(&self, entries: &[(Vec<u8>, Vec<u8>)]) -> sled::Result<()>;
    fn write_row(&self, key: &[u8], value: &[u8]) -> sled::Result<()>;
}

impl KvTree for sled::Tree {
    fn label(&self) -> String {
        String::from_utf8_lossy(&self.name()).into_owned()
    }

    fn write_batch(&self, entries: &[(Vec<u8>, Vec<u8>)]) -> sled::Result<()> {
        let mut batch = sled::Batch::default();
        for (key, value) in entries {
            batch.insert(key.as_slice(), value.as_slice());
        }
        self.apply_batch(batch)
    }

    fn write_row(&self, key: &[u8], value: &[u8]) -> sled::Result<()> {
        self.insert(key, value).map(|_| ())
    }
}

/// Batched inserts, retrying a failed batch one row at a time.
fn write_entries<T: KvTree>(
    tree: &T,
    batch_size: usize,
    entries: &[(Vec<u8>, Vec<u8>)],
    report: &mut WriteReport,
) {
    for chunk in entries.chunks(batch_size.max(1)) {
        match tree.write_batch(chunk) {
            Ok(()) => report.written += chunk.len(),
            Err(e) => {
                let tree_name = tree.label();
                warn!(tree = %tree_name, rows = chunk.len(), error = %e, "Batch write failed, retrying row by row");
                for (key, value) in chunk {
                    match tree.write_row(key, value) {
                        Ok(()) => report.written += 1,
                        Err(e) => {
                            warn!(
                                tree = %tree_name,
                                key = %String::from_utf8_lossy(key),
                                error = %e,
                                "Row write failed, skipping"
                            );
                            report.skipped += 1;
                        }
                    }
                }
            }
        }
    }
}

// ============================================================================
// Keys
// ============================================================================

fn well_prefix(well: &str) -> String {
    format!("{well}{KEY_SEPARATOR}")
}

fn day_key(well: &str, date: chrono::NaiveDate) -> Vec<u8> {
    format!("{well}{KEY_SEPARATOR}{date}").into_bytes()
}

fn month_key(well: &str, month: ProductionMonth) -> Vec<u8> {
    format!("{well}{KEY_SEPARATOR}{month}").into_bytes()
}

/// Inclusive key bounds of `window` for a day-keyed tree.
fn day_range(well: &str, window: RunWindow) -> (Vec<u8>, Vec<u8>) {
    let lo = match window.start {
        Some(start) => day_key(well, start),
        None => well_prefix(well).into_bytes(),
    };
    (lo, day_key(well, window.cutoff))
}

fn month_range(well: &str, window: RunWindow) -> (Vec<u8>, Vec<u8>) {
    let lo = match window.start {
        Some(start) => month_key(well, ProductionMonth::of(start)),
        None => well_prefix(well).into_bytes(),
    };
    (lo, month_key(well, ProductionMonth::of(window.cutoff)))
}

// ============================================================================
// Store
// ============================================================================

pub struct ProductionStore {
    db: sled::Db,
    daily: sled::Tree,
    production: sled::Tree,
    factors: sled::Tree,
    batch_size: usize,
}

impl ProductionStore {
    /// Open or create the store at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Open a throwaway in-memory store
    pub fn open_temp() -> Result<Self, StorageError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self, StorageError> {
        Ok(Self {
            daily: db.open_tree(DAILY_TREE)?,
            production: db.open_tree(PRODUCTION_TREE)?,
            factors: db.open_tree(FACTOR_TREE)?,
            db,
            batch_size: 1000,
        })
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Stored production rows per well, each in date order.
    pub fn production_rows(&self) -> Result<BTreeMap<String, Vec<ProductionRow>>, StorageError> {
        let mut wells: BTreeMap<String, Vec<ProductionRow>> = BTreeMap::new();
        for item in self.production.iter() {
            let (_, value) = item?;
            let row: ProductionRow = serde_json::from_slice(&value)?;
            wells.entry(row.record.well.clone()).or_default().push(row);
        }
        Ok(wells)
    }

    pub fn daily_rows(&self, well: &str) -> Result<Vec<DailyProductionRecord>, StorageError> {
        self.daily
            .scan_prefix(well_prefix(well))
            .map(|item| -> Result<DailyProductionRecord, StorageError> {
                let (_, value) = item?;
                Ok(serde_json::from_slice(&value)?)
            })
            .collect()
    }

    pub fn factors(&self) -> Result<Vec<MonthlyAllocationFactor>, StorageError> {
        self.factors
            .iter()
            .map(|item| -> Result<MonthlyAllocationFactor, StorageError> {
                let (_, value) = item?;
                Ok(serde_json::from_slice(&value)?)
            })
            .collect()
    }

    /// Overwrite stored production rows in place.
    pub fn save_production(&self, rows: &[ProductionRow]) -> Result<WriteReport, StorageError> {
        let mut report = WriteReport::default();
        let entries = encode(rows, |r| day_key(&r.record.well, r.date()), &mut report);
        write_entries(&self.production, self.batch_size, &entries, &mut report);
        self.db.flush()?;
        Ok(report)
    }

    /// Recompute "Day Seq UPRT" for every stored well and save the wells
    /// that changed.
    ///
    /// The counter depends on every day since first production, so a well
    /// is only resequenced when the store holds its whole timeline (stored
    /// "Days Seq" runs 1, 2, 3, ... without gaps). Other wells are skipped
    /// with a warning and need a full `run` instead.
    pub fn resequence(&self, threshold: f64) -> Result<ResequenceReport, StorageError> {
        let mut report = ResequenceReport::default();
        for (well, mut rows) in self.production_rows()? {
            report.wells += 1;
            if let Some(gap) = first_timeline_gap(&rows) {
                warn!(
                    well = %well,
                    date = %rows[gap].date(),
                    days_seq = rows[gap].sequence.days_seq,
                    "Stored timeline incomplete, skipping resequence"
                );
                report.wells_skipped += 1;
                continue;
            }
            let changed = sequence::resequence(&mut rows, threshold);
            if changed > 0 {
                debug!(well = %well, rows = changed, "Resequenced");
                self.save_production(&rows)?;
                report.rows_changed += changed;
            }
        }
        info!(
            wells = report.wells,
            skipped = report.wells_skipped,
            rows_changed = report.rows_changed,
            "Resequence complete"
        );
        Ok(report)
    }

    /// Write every production row as one JSON object per line.
    ///
    /// Stored bytes are written as-is, so repeated exports are identical.
    pub fn export_production<W: Write>(&self, out: &mut W) -> Result<usize, StorageError> {
        let mut lines = 0;
        for item in self.production.iter() {
            let (_, value) = item?;
            out.write_all(&value)?;
            out.write_all(b"\n")?;
            lines += 1;
        }
        out.flush()?;
        Ok(lines)
    }

    pub fn raw_production_value(&self, well: &str, date: chrono::NaiveDate) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.production.get(day_key(well, date))?.map(|v| v.to_vec()))
    }

    fn delete_range(&self, tree: &sled::Tree, (lo, hi): (Vec<u8>, Vec<u8>)) -> Result<usize, StorageError> {
        let mut batch = sled::Batch::default();
        let mut removed = 0;
        for item in tree.range(lo..=hi) {
            let (key, _) = item?;
            batch.remove(key);
            removed += 1;
        }
        tree.apply_batch(batch)?;
        Ok(removed)
    }
}

/// Index of the first stored row whose "Days Seq" is not its position in a
/// timeline that starts at first production.
fn first_timeline_gap(rows: &[ProductionRow]) -> Option<usize> {
    rows.iter()
        .zip(1u32..)
        .position(|(row, expected)| row.sequence.days_seq != expected)
}

/// Serialize rows to key/value pairs, counting rows that fail as skipped.
fn encode<T: Serialize>(
    rows: &[T],
    key: impl Fn(&T) -> Vec<u8>,
    report: &mut WriteReport,
) -> Vec<(Vec<u8>, Vec<u8>)> {
    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        match serde_json::to_vec(row) {
            Ok(value) => entries.push((key(row), value)),
            Err(e) => {
                warn!(error = %e, "Row serialization failed, skipping");
                report.skipped += 1;
            }
        }
    }
    entries
}

impl OutputWriter for ProductionStore {
    fn replace_window(
        &self,
        outputs: &[WellOutput],
        window: RunWindow,
    ) -> Result<WriteReport, StorageError> {
        let mut report = WriteReport::default();

        for output in outputs {
            let well = output.well.name.as_str();
            report.deleted += self.delete_range(&self.daily, day_range(well, window))?;
            report.deleted += self.delete_range(&self.production, day_range(well, window))?;
            report.deleted += self.delete_range(&self.factors, month_range(well, window))?;

            let daily = encode(&output.daily, |r| day_key(well, r.date), &mut report);
            write_entries(&self.daily, self.batch_size, &daily, &mut report);
            let production = encode(&output.production, |r| day_key(well, r.date()), &mut report);
            write_entries(&self.production, self.batch_size, &production, &mut report);
            let factors = encode(&output.factors, |f| month_key(well, f.month), &mut report);
            write_entries(&self.factors, self.batch_size, &factors, &mut report);
        }

        self.db.flush()?;
        info!(
            wells = outputs.len(),
            written = report.written,
            skipped = report.skipped,
            deleted = report.deleted,
            "Store window replaced"
        );
        Ok(report)
    }
}
