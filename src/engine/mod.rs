//! Reconciliation Engine
//!
//! Runs the per-well pipeline:
//!
//! ```text
//! Registry → Spine → Merge → Allocation → Sequence/Cumulative → Monthly averages
//! ```
//!
//! Each well is computed over its whole history up to the cutoff, because
//! counters, running sums and monthly factors depend on every earlier day.
//! Only rows inside the run window are emitted. A failing well is recorded
//! in the `RunReport` and the run carries on with the next one.

use crate::allocation::{self, ExternalVolumeTable};
use crate::config::defaults::WELL_PROGRESS_INTERVAL;
use crate::config::EngineConfig;
use crate::feeds::FeedSet;
use crate::merge::{self, UnresolvedIdentities};
use crate::registry::WellRegistry;
use crate::types::{ProductionRow, RunWindow, TrackedMetric, WellIdentity, WellOutput};
use crate::{monthly, sequence, spine};
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("run window start {start} is after cutoff {cutoff}")]
    InvalidWindow { start: NaiveDate, cutoff: NaiveDate },

    #[error("registry well has no name (flow identity {flow_id})")]
    UnnamedWell { flow_id: String },

    #[error("well {well}: non-finite {field} on {date}")]
    NonFinite {
        well: String,
        field: &'static str,
        date: NaiveDate,
    },
}

// ============================================================================
// Run Report
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WellFailure {
    pub well: String,
    pub message: String,
}

/// Summary of a run, in well order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub wells_processed: usize,
    pub wells_failed: Vec<WellFailure>,
    /// Wells that never produced inside their history
    pub wells_empty: Vec<String>,
    pub daily_rows: usize,
    pub production_rows: usize,
    pub factor_rows: usize,
    /// Well days joined from the feeds, over full histories
    pub feed_days_matched: usize,
    /// Feed rows whose key matched no registry well
    pub unresolved_rows: usize,
}

impl RunReport {
    fn record(&mut self, output: &WellOutput) {
        self.wells_processed += 1;
        self.daily_rows += output.daily.len();
        self.production_rows += output.production.len();
        self.factor_rows += output.factors.len();
        self.feed_days_matched += output.feed_days_matched;
        if output.production.is_empty() {
            self.wells_empty.push(output.well.name.clone());
        }
    }
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Run Report ===")?;
        writeln!(f, "  Wells:       {} processed, {} failed, {} without production",
            self.wells_processed, self.wells_failed.len(), self.wells_empty.len())?;
        writeln!(f, "  Daily rows:  {}", self.daily_rows)?;
        writeln!(f, "  Production:  {}", self.production_rows)?;
        writeln!(f, "  Factors:     {}", self.factor_rows)?;
        writeln!(f, "  Matched:     {} feed days", self.feed_days_matched)?;
        writeln!(f, "  Unresolved:  {} feed rows", self.unresolved_rows)?;
        for failure in &self.wells_failed {
            writeln!(f, "  FAILED {}: {}", failure.well, failure.message)?;
        }
        Ok(())
    }
}

/// Everything a run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    pub window: RunWindow,
    pub wells: Vec<WellOutput>,
    pub unresolved: Vec<UnresolvedIdentities>,
    pub report: RunReport,
}

// ============================================================================
// Engine
// ============================================================================

pub struct ReconciliationEngine {
    config: EngineConfig,
}

impl ReconciliationEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compute one well's full output through `cutoff`.
    pub fn process_well(
        &self,
        well: &WellIdentity,
        feeds: &FeedSet,
        volumes: &ExternalVolumeTable,
        cutoff: NaiveDate,
    ) -> Result<WellOutput, EngineError> {
        if well.name.trim().is_empty() {
            return Err(EngineError::UnnamedWell {
                flow_id: well.flow_id.clone(),
            });
        }

        let alloc = &self.config.allocation;
        let spine = spine::build(well, feeds, &self.config.spine, cutoff);
        let mut daily = spine.rows;

        let merged = merge::merge_well(&mut daily, well, feeds);
        let factors = allocation::allocate_well(&well.name, &mut daily, volumes, alloc);

        let mut production = sequence::build_timeline(
            &daily,
            alloc.low_flow_threshold,
            self.config.sequence.uprt_threshold,
        );
        monthly::apply_monthly_averages(&mut production);
        check_finite(&well.name, &production)?;

        Ok(WellOutput {
            well: well.clone(),
            first_measurement: spine.first_measurement,
            feed_days_matched: merged.total(),
            daily,
            factors,
            production,
        })
    }

    /// Run every registry well and keep the rows inside `window`.
    pub fn run(
        &self,
        registry: &dyn WellRegistry,
        feeds: &FeedSet,
        volumes: &ExternalVolumeTable,
        window: RunWindow,
    ) -> Result<RunOutput, EngineError> {
        if let Some(start) = window.start {
            if start > window.cutoff {
                return Err(EngineError::InvalidWindow {
                    start,
                    cutoff: window.cutoff,
                });
            }
        }

        let wells = registry.wells();
        let unresolved = merge::find_unresolved(feeds, registry);
        info!(
            wells = wells.len(),
            cutoff = %window.cutoff,
            start = ?window.start,
            parallel = self.config.run.parallel,
            "Starting reconciliation run"
        );

        let compute = |well: &&WellIdentity| {
            self.process_well(well, feeds, volumes, window.cutoff)
                .map(|output| restrict_to_window(output, window))
        };

        // par_iter over a Vec is indexed, so results come back in well order
        let results: Vec<Result<WellOutput, EngineError>> = if self.config.run.parallel {
            wells.par_iter().map(compute).collect()
        } else {
            wells
                .iter()
                .enumerate()
                .map(|(idx, well)| {
                    if (idx + 1) % WELL_PROGRESS_INTERVAL == 0 {
                        info!(done = idx + 1, total = wells.len(), "Progress");
                    }
                    compute(well)
                })
                .collect()
        };

        let mut report = RunReport {
            unresolved_rows: unresolved.iter().map(|u| u.rows).sum(),
            ..RunReport::default()
        };
        let mut outputs = Vec::with_capacity(results.len());
        for (well, result) in wells.iter().zip(results) {
            match result {
                Ok(output) => {
                    report.record(&output);
                    outputs.push(output);
                }
                Err(e) => {
                    warn!(well = %well.name, error = %e, "Well failed, continuing");
                    report.wells_failed.push(WellFailure {
                        well: well.name.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            processed = report.wells_processed,
            failed = report.wells_failed.len(),
            empty = report.wells_empty.len(),
            daily_rows = report.daily_rows,
            production_rows = report.production_rows,
            feed_days_matched = report.feed_days_matched,
            unresolved_rows = report.unresolved_rows,
            "Reconciliation run complete"
        );

        Ok(RunOutput {
            window,
            wells: outputs,
            unresolved,
            report,
        })
    }
}

/// Keep only the rows and factor months that touch `window`.
fn restrict_to_window(mut output: WellOutput, window: RunWindow) -> WellOutput {
    output.daily.retain(|r| window.contains(r.date));
    output.production.retain(|r| window.contains(r.date()));
    output.factors.retain(|f| {
        f.month.first_day() <= window.cutoff
            && window.start.map_or(true, |start| f.month.last_day() >= start)
    });
    output
}

fn check_finite(well: &str, rows: &[ProductionRow]) -> Result<(), EngineError> {
    for row in rows {
        for metric in TrackedMetric::CUMULATIVE {
            if !row.cumulative.get(metric).is_finite() {
                return Err(EngineError::NonFinite {
                    well: well.to_string(),
                    field: metric.name(),
                    date: row.date(),
                });
            }
        }
    }
    Ok(())
}
