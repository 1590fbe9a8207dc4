//! External monthly volumes (S2 gas, sales gas, sales condensate)

use crate::feeds::csv::{parse_timestamp, parse_value, CsvTable};
use crate::feeds::FeedError;
use crate::types::{ExternalVolumes, ProductionMonth};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// External-system volumes keyed by (well name, month).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExternalVolumeTable {
    rows: BTreeMap<(String, ProductionMonth), ExternalVolumes>,
}

impl ExternalVolumeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the volumes for a well-month.
    pub fn insert(&mut self, well: impl Into<String>, month: ProductionMonth, volumes: ExternalVolumes) {
        self.rows.insert((well.into(), month), volumes);
    }

    #[must_use]
    pub fn with(mut self, well: impl Into<String>, month: ProductionMonth, volumes: ExternalVolumes) -> Self {
        self.insert(well, month, volumes);
        self
    }

    pub fn get(&self, well: &str, month: ProductionMonth) -> Option<&ExternalVolumes> {
        self.rows.get(&(well.to_string(), month))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Load the monthly volumes CSV. A missing file is an empty table.
    pub fn load(path: &Path) -> Result<Self, FeedError> {
        if !path.exists() {
            info!(path = %path.display(), "No monthly volumes file, allocation will be skipped");
            return Ok(Self::new());
        }
        let file = File::open(path).map_err(|source| FeedError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::read(BufReader::new(file), path)?;
        info!(path = %path.display(), well_months = table.len(), "Monthly volumes loaded");
        Ok(table)
    }

    /// Parse volumes from a reader.
    ///
    /// Empty volume cells are zero volume. Rows without a well name or a
    /// readable month are dropped; a repeated well-month keeps the last row.
    pub fn read<R: BufRead>(reader: R, source: &Path) -> Result<Self, FeedError> {
        let csv = CsvTable::read(reader).map_err(|e| FeedError::Io {
            path: PathBuf::from(source),
            source: e,
        })?;
        let mut table = Self::new();
        if csv.header.is_empty() {
            return Ok(table);
        }

        let required = |aliases: &[&'static str]| {
            csv.find_column(aliases).ok_or(FeedError::MissingColumn {
                feed: "monthly_volumes".to_string(),
                column: aliases[0],
            })
        };
        let well = required(&["well_name", "Well Name"])?;
        let month = required(&["month", "MonthStartDate"])?;
        let s2 = required(&["s2_gas", "S2_Gas"])?;
        let sales_gas = required(&["sales_gas", "Sales_Gas"])?;
        let sales_cond = required(&["sales_condensate", "Sales_Condensate", "Sales_Cond"])?;

        let mut dropped = 0usize;
        for record in &csv.records {
            let name = record.get(well).unwrap_or("");
            let parsed_month = record.get(month).and_then(|raw| {
                ProductionMonth::parse(raw)
                    .or_else(|| parse_timestamp(raw).map(|ts| ProductionMonth::of(ts.date())))
            });
            let Some(parsed_month) = parsed_month.filter(|_| !name.is_empty()) else {
                dropped += 1;
                continue;
            };

            let volume = |idx: usize| record.get(idx).and_then(parse_value).unwrap_or(0.0);
            let volumes = ExternalVolumes {
                s2_gas: volume(s2),
                sales_gas: volume(sales_gas),
                sales_condensate: volume(sales_cond),
            };

            if table.get(name, parsed_month).is_some() {
                warn!(well = name, month = %parsed_month, line = record.line, "Repeated well-month in monthly volumes, keeping last");
            }
            table.insert(name, parsed_month, volumes);
        }

        if dropped > 0 {
            warn!(source = %source.display(), dropped, "Monthly volume rows without well or month dropped");
        }
        Ok(table)
    }
}
