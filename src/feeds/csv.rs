//! Minimal CSV reading shared by the feed, registry and monthly-volume loaders
//!
//! Inputs are exported tables with a single header row and no embedded
//! newlines, so a quote-aware line splitter is all that is needed.

use chrono::{NaiveDate, NaiveDateTime};
use std::io::BufRead;

// ============================================================================
// CSV Quote-Aware Parsing
// ============================================================================

/// Split a CSV line respecting quoted fields (handles commas inside quotes).
/// Returns owned strings because quoted fields need unquoting.
pub(crate) fn csv_split(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes {
                    // Escaped quote ("")
                    if chars.peek() == Some(&'"') {
                        current.push('"');
                        chars.next();
                    } else {
                        in_quotes = false;
                    }
                } else {
                    in_quotes = true;
                }
            }
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    fields.push(current);
    fields
}

// ============================================================================
// Records
// ============================================================================

/// One data line, with its 1-based line number for diagnostics.
#[derive(Debug, Clone)]
pub(crate) struct CsvRecord {
    pub line: usize,
    pub fields: Vec<String>,
}

impl CsvRecord {
    pub fn get(&self, idx: usize) -> Option<&str> {
        self.fields.get(idx).map(|s| s.trim())
    }
}

/// Header plus data lines of a CSV file. Blank lines are skipped.
#[derive(Debug, Clone, Default)]
pub(crate) struct CsvTable {
    pub header: Vec<String>,
    pub records: Vec<CsvRecord>,
}

impl CsvTable {
    /// Read a whole table. A zero-byte input yields an empty table with no header.
    pub fn read<R: BufRead>(reader: R) -> std::io::Result<Self> {
        let mut table = Self::default();
        let mut saw_header = false;

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            if saw_header {
                table.records.push(CsvRecord {
                    line: idx + 1,
                    fields: csv_split(line),
                });
            } else {
                // Strip a UTF-8 BOM left by spreadsheet exports
                table.header = csv_split(line.trim_start_matches('\u{feff}'));
                saw_header = true;
            }
        }
        Ok(table)
    }

    /// Index of the first header matching any alias, case-insensitively.
    ///
    /// Alias order is priority order: an earlier alias wins over a later one
    /// even if the later one appears first in the header.
    pub fn find_column(&self, aliases: &[&str]) -> Option<usize> {
        aliases.iter().find_map(|alias| {
            self.header
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(alias))
        })
    }
}

// ============================================================================
// Cell Parsing
// ============================================================================

/// Parse a numeric cell. Blank, NaN-like and unparsable cells are absent,
/// never zero.
pub(crate) fn parse_value(cell: &str) -> Option<f64> {
    let s = cell.trim().trim_matches('"');
    if s.is_empty()
        || s.eq_ignore_ascii_case("nan")
        || s.eq_ignore_ascii_case("null")
        || s.eq_ignore_ascii_case("none")
        || s == "-"
    {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a date or timestamp cell.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` and `YYYY-MM-DDTHH:MM:SS`,
/// each with optional fractional seconds. A bare date is midnight.
pub(crate) fn parse_timestamp(cell: &str) -> Option<NaiveDateTime> {
    let s = cell.trim().trim_matches('"');
    if s.is_empty() {
        return None;
    }

    for fmt in &[
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
