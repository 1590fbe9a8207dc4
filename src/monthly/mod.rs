//! Monthly Average Aggregator
//!
//! Mean of each averaged metric over a well-month's production rows, written
//! identically to every row of that month. Absent values count as zero and
//! stay in the denominator, so a month with gaps averages lower than its
//! measured days alone would.

use crate::types::{MonthlyAverages, ProductionMonth, ProductionRow, TrackedMetric};
use std::collections::BTreeMap;

/// Zero-filled means per month over one well's timeline.
pub fn monthly_means(rows: &[ProductionRow]) -> BTreeMap<ProductionMonth, MonthlyAverages> {
    let mut sums: BTreeMap<ProductionMonth, (MonthlyAverages, u32)> = BTreeMap::new();
    for row in rows {
        let (sum, count) = sums.entry(ProductionMonth::of(row.date())).or_default();
        for metric in TrackedMetric::MONTHLY_AVERAGE {
            if let Some(slot) = sum.slot_mut(metric) {
                *slot += row.metric(metric).unwrap_or(0.0);
            }
        }
        *count += 1;
    }

    sums.into_iter()
        .map(|(month, (mut avg, count))| {
            let n = f64::from(count.max(1));
            for metric in TrackedMetric::MONTHLY_AVERAGE {
                if let Some(slot) = avg.slot_mut(metric) {
                    *slot /= n;
                }
            }
            (month, avg)
        })
        .collect()
}

/// Broadcast each month's means onto its rows.
pub fn apply_monthly_averages(rows: &mut [ProductionRow]) {
    let means = monthly_means(rows);
    for row in rows.iter_mut() {
        if let Some(avg) = means.get(&ProductionMonth::of(row.date())) {
            row.monthly_average = *avg;
        }
    }
}
