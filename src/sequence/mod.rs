//! Sequence & Cumulative Deriver
//!
//! Turns a well's merged, allocated spine into its production timeline:
//!
//! 1. Drop leading days before the first positive effective gas. Effective
//!    gas is the baseline-substituted wellhead gas.
//! 2. Number the remaining days ("Days Seq", 1-based, every day).
//! 3. Number producing days ("Day Seq UPRT"): advances only on days with
//!    effective gas ≥ `uprt_threshold`, otherwise repeats the last value
//!    assigned before the low run began.
//! 4. Running sums of the tracked metrics, absent values adding 0.
//!
//! All state is local to one well and discarded afterwards.

use crate::allocation::baseline_gas;
use crate::types::{
    Cumulatives, DailyProductionRecord, MonthlyAverages, ProductionRow, SequenceState,
    TrackedMetric,
};
use chrono::Datelike;

/// Index of the first day whose effective gas is positive.
pub fn first_production_index(rows: &[DailyProductionRecord], low_flow_threshold: f64) -> Option<usize> {
    rows.iter()
        .position(|r| baseline_gas(r, low_flow_threshold).is_some_and(|g| g > 0.0))
}

/// 1-based ordinal for `len` consecutive days.
pub fn days_seq(len: usize) -> Vec<u32> {
    (1..=len).map(|n| u32::try_from(n).unwrap_or(u32::MAX)).collect()
}

/// "Day Seq UPRT" over one well's effective production, in date order.
///
/// Counter starts at 1. A qualifying day emits the counter and increments
/// it; any other day emits counter − 1 and leaves it alone. Leading
/// non-qualifying days therefore emit 0.
pub fn day_seq_uprt(values: &[Option<f64>], threshold: f64) -> Vec<u32> {
    let mut counter: u32 = 1;
    values
        .iter()
        .map(|v| {
            if v.unwrap_or(0.0) >= threshold {
                let emitted = counter;
                counter += 1;
                emitted
            } else {
                counter - 1
            }
        })
        .collect()
}

/// Build the production timeline for one well.
///
/// `rows` is the well's full spine in date order with feeds merged and
/// allocation applied. Monthly averages are left at zero for the monthly
/// aggregator to fill. An empty result means the well never produced.
pub fn build_timeline(
    rows: &[DailyProductionRecord],
    low_flow_threshold: f64,
    uprt_threshold: f64,
) -> Vec<ProductionRow> {
    let Some(first) = first_production_index(rows, low_flow_threshold) else {
        return Vec::new();
    };
    let producing = &rows[first..];

    let effective: Vec<Option<f64>> = producing
        .iter()
        .map(|r| baseline_gas(r, low_flow_threshold))
        .collect();
    let days = days_seq(producing.len());
    let uprt = day_seq_uprt(&effective, uprt_threshold);
    let on_production_year = producing[0].date.year();

    let mut timeline: Vec<ProductionRow> = producing
        .iter()
        .zip(effective)
        .zip(days.into_iter().zip(uprt))
        .map(|((record, effective_gas), (days_seq, day_seq_uprt))| ProductionRow {
            record: record.clone(),
            effective_gas,
            sequence: SequenceState {
                days_seq,
                day_seq_uprt,
            },
            cumulative: Cumulatives::default(),
            monthly_average: MonthlyAverages::default(),
            on_production_year,
        })
        .collect();

    accumulate(&mut timeline);
    timeline
}

/// Fill the running sums of every tracked metric.
pub fn accumulate(rows: &mut [ProductionRow]) {
    let mut running = Cumulatives::default();
    for row in rows.iter_mut() {
        for metric in TrackedMetric::CUMULATIVE {
            *running.slot_mut(metric) += row.metric(metric).unwrap_or(0.0);
        }
        row.cumulative = running;
    }
}

/// Recompute only "Day Seq UPRT" over an existing timeline in date order.
///
/// Returns how many rows changed. Every other field is untouched.
pub fn resequence(rows: &mut [ProductionRow], threshold: f64) -> usize {
    let effective: Vec<Option<f64>> = rows.iter().map(|r| r.effective_gas).collect();
    let mut changed = 0;
    for (row, uprt) in rows.iter_mut().zip(day_seq_uprt(&effective, threshold)) {
        if row.sequence.day_seq_uprt != uprt {
            row.sequence.day_seq_uprt = uprt;
            changed += 1;
        }
    }
    changed
}
