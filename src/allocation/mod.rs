//! Allocation Factor Calculator
//!
//! Per well per accounting month:
//!
//! 1. Sum the daily baselines into `BaselineTotals` (absent days add 0).
//! 2. Divide the month's external volumes by those totals into six factors.
//!    A factor whose denominator is ≤ 0 is 1.0.
//! 3. Project the factors back onto every day of the month.
//!
//! ## Baseline substitution
//!
//! Wellhead meters read unreliably at low rates. Wherever a daily baseline
//! is read, a wellhead value at or below `low_flow_threshold` (or absent) is
//! replaced by the gathered value for that day.
//!
//! ## Daily projection
//!
//! | Field            | Value                                                     |
//! |------------------|-----------------------------------------------------------|
//! | S2 gas           | WH→S2 × baseline gas                                      |
//! | Sales gas        | WH→Sales × baseline gas, or monthly sales ÷ days in month  |
//! |                  | when the month's sales gas is not positive                |
//! | Sales condensate | WH→Sales-condensate × baseline condensate                 |
//! | Sales CGR        | sales condensate ÷ sales gas, 0 when sales gas is not > 0 |

mod exceptions;
mod volumes;

pub use exceptions::{ratio_exceptions, RatioException, RatioExceptionGroup};
pub use volumes::ExternalVolumeTable;

use crate::config::AllocationConfig;
use crate::types::{
    AllocatedVolumes, BaselineTotals, DailyProductionRecord, ExternalVolumes,
    MonthlyAllocationFactor, ProductionMonth,
};
use std::collections::BTreeMap;
use tracing::debug;

// ============================================================================
// Baseline Substitution
// ============================================================================

/// Wellhead value if it is above the dead-band, otherwise the gathered value.
pub fn substitute(wellhead: Option<f64>, gathered: Option<f64>, low_flow_threshold: f64) -> Option<f64> {
    match wellhead {
        Some(v) if v > low_flow_threshold => Some(v),
        _ => gathered,
    }
}

/// Baseline gas for a day.
pub fn baseline_gas(record: &DailyProductionRecord, low_flow_threshold: f64) -> Option<f64> {
    substitute(record.gas_wh, record.gathered_gas, low_flow_threshold)
}

/// Baseline condensate for a day.
pub fn baseline_condensate(record: &DailyProductionRecord, low_flow_threshold: f64) -> Option<f64> {
    substitute(record.condensate_wh, record.gathered_condensate, low_flow_threshold)
}

// ============================================================================
// Factors
// ============================================================================

/// `numerator / denominator`, or 1.0 when the denominator is not positive.
pub fn guarded_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        1.0
    }
}

/// Raw monthly sums of the baseline fields, absent values counting as 0.
pub fn monthly_totals(rows: &[DailyProductionRecord]) -> BTreeMap<ProductionMonth, BaselineTotals> {
    let mut totals: BTreeMap<ProductionMonth, BaselineTotals> = BTreeMap::new();
    for row in rows {
        let t = totals.entry(ProductionMonth::of(row.date)).or_default();
        t.gas_wh += row.gas_wh.unwrap_or(0.0);
        t.condensate_wh += row.condensate_wh.unwrap_or(0.0);
        t.gathered_gas += row.gathered_gas.unwrap_or(0.0);
        t.gathered_condensate += row.gathered_condensate.unwrap_or(0.0);
    }
    totals
}

pub fn compute_factor(
    well: &str,
    month: ProductionMonth,
    baseline: BaselineTotals,
    external: ExternalVolumes,
) -> MonthlyAllocationFactor {
    MonthlyAllocationFactor {
        well: well.to_string(),
        month,
        baseline,
        external,
        wh_to_s2: guarded_ratio(external.s2_gas, baseline.gas_wh),
        wh_to_sales_gas: guarded_ratio(external.sales_gas, baseline.gas_wh),
        wh_to_sales_condensate: guarded_ratio(external.sales_condensate, baseline.condensate_wh),
        gathered_to_s2: guarded_ratio(external.s2_gas, baseline.gathered_gas),
        gathered_to_sales_gas: guarded_ratio(external.sales_gas, baseline.gathered_gas),
        gathered_to_sales_condensate: guarded_ratio(
            external.sales_condensate,
            baseline.gathered_condensate,
        ),
    }
}

// ============================================================================
// Projection
// ============================================================================

/// Allocated volumes for one day of `factor`'s month.
pub fn project_day(
    record: &DailyProductionRecord,
    factor: &MonthlyAllocationFactor,
    low_flow_threshold: f64,
) -> AllocatedVolumes {
    let gas = baseline_gas(record, low_flow_threshold);
    let condensate = baseline_condensate(record, low_flow_threshold);

    let s2_gas = gas.map(|g| factor.wh_to_s2 * g);
    let sales_gas = if factor.external.sales_gas > 0.0 {
        gas.map(|g| factor.wh_to_sales_gas * g)
    } else {
        Some(factor.external.sales_gas / f64::from(factor.month.days()))
    };
    let sales_condensate = condensate.map(|c| factor.wh_to_sales_condensate * c);
    let sales_cgr = match sales_gas {
        Some(g) if g > 0.0 => sales_condensate.map(|c| c / g),
        _ => Some(0.0),
    };

    AllocatedVolumes {
        s2_gas,
        sales_gas,
        sales_condensate,
        sales_cgr,
    }
}

/// Compute factors for every month of `rows` that has external volumes and
/// project them onto those months' days.
///
/// `rows` is one well's spine in date order. Months without external
/// volumes get no factor and their allocated fields stay `None`.
pub fn allocate_well(
    well: &str,
    rows: &mut [DailyProductionRecord],
    volumes: &ExternalVolumeTable,
    config: &AllocationConfig,
) -> Vec<MonthlyAllocationFactor> {
    let factors: Vec<MonthlyAllocationFactor> = monthly_totals(rows)
        .into_iter()
        .filter_map(|(month, baseline)| {
            volumes
                .get(well, month)
                .map(|external| compute_factor(well, month, baseline, *external))
        })
        .collect();

    if factors.is_empty() {
        return factors;
    }

    let by_month: BTreeMap<ProductionMonth, &MonthlyAllocationFactor> =
        factors.iter().map(|f| (f.month, f)).collect();
    for row in rows.iter_mut() {
        if let Some(factor) = by_month.get(&ProductionMonth::of(row.date)) {
            row.allocated = project_day(row, factor, config.low_flow_threshold);
        }
    }

    debug!(well, months = factors.len(), "Allocation factors applied");
    factors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WellIdentity;
    use chrono::NaiveDate;

    fn month(raw: &str) -> ProductionMonth {
        ProductionMonth::parse(raw).unwrap()
    }

    fn days_of(m: ProductionMonth) -> Vec<DailyProductionRecord> {
        let well = WellIdentity::new("A-1", "F1", "P1");
        m.first_day()
            .iter_days()
            .take_while(|d| m.contains(*d))
            .map(|d| DailyProductionRecord::spine(&well, d))
            .collect()
    }

    fn external(s2: f64, sales_gas: f64, sales_condensate: f64) -> ExternalVolumes {
        ExternalVolumes {
            s2_gas: s2,
            sales_gas,
            sales_condensate,
        }
    }

    // === Baseline substitution ===

    #[test]
    fn test_substitute_uses_gathered_inside_dead_band() {
        assert_eq!(substitute(Some(10.0), Some(7.0), 2.0), Some(10.0));
        assert_eq!(substitute(Some(2.0), Some(7.0), 2.0), Some(7.0));
        assert_eq!(substitute(Some(0.5), Some(7.0), 2.0), Some(7.0));
        assert_eq!(substitute(Some(0.0), Some(7.0), 2.0), Some(7.0));
        assert_eq!(substitute(None, Some(7.0), 2.0), Some(7.0));
        assert_eq!(substitute(Some(1.0), None, 2.0), None);
    }

    // === Factors ===

    #[test]
    fn test_factor_defaults_to_one_when_denominator_not_positive() {
        let f = compute_factor(
            "A-1",
            month("2024-01"),
            BaselineTotals {
                gas_wh: 0.0,
                condensate_wh: -3.0,
                gathered_gas: 0.0,
                gathered_condensate: 0.0,
            },
            external(10.0, 20.0, 5.0),
        );
        assert_eq!(f.wh_to_s2, 1.0);
        assert_eq!(f.wh_to_sales_gas, 1.0);
        assert_eq!(f.wh_to_sales_condensate, 1.0);
        assert_eq!(f.gathered_to_s2, 1.0);
        assert_eq!(f.gathered_to_sales_gas, 1.0);
        assert_eq!(f.gathered_to_sales_condensate, 1.0);
    }

    #[test]
    fn test_scenario_b_zero_wellhead_total_guards_s2_factor() {
        let mut rows = days_of(month("2024-04"));
        for row in &mut rows {
            row.gas_wh = Some(0.0);
        }
        let volumes = ExternalVolumeTable::new().with("A-1", month("2024-04"), external(10.0, 0.0, 0.0));

        let factors = allocate_well("A-1", &mut rows, &volumes, &AllocationConfig::default());
        assert_eq!(factors.len(), 1);
        assert_eq!(factors[0].baseline.gas_wh, 0.0);
        assert_eq!(factors[0].wh_to_s2, 1.0, "guard must apply, not 10/0");
    }

    #[test]
    fn test_monthly_totals_use_raw_wellhead_and_skip_nulls() {
        let mut rows = days_of(month("2024-02"));
        rows[0].gas_wh = Some(1.0);
        rows[1].gas_wh = Some(100.0);
        rows[2].gathered_gas = Some(40.0);
        let totals = monthly_totals(&rows);
        let t = totals[&month("2024-02")];
        assert_eq!(t.gas_wh, 101.0);
        assert_eq!(t.gathered_gas, 40.0);
        assert_eq!(t.condensate_wh, 0.0);
    }

    // === Projection ===

    #[test]
    fn test_projection_scales_substituted_baseline() {
        let m = month("2024-01");
        let mut rows = days_of(m);
        rows[0].gas_wh = Some(100.0);
        rows[0].cgr_ratio = Some(0.1);
        rows[0].derive_condensate_wh();
        rows[1].gas_wh = Some(1.0);
        rows[1].gathered_gas = Some(50.0);

        // wh total = 101, s2 = 202 -> factor 2
        let volumes = ExternalVolumeTable::new().with("A-1", m, external(202.0, 101.0, 20.0));
        allocate_well("A-1", &mut rows, &volumes, &AllocationConfig::default());

        assert_eq!(rows[0].allocated.s2_gas, Some(200.0));
        assert_eq!(rows[0].allocated.sales_gas, Some(100.0));
        // condensate_wh total = 10, factor 2
        assert_eq!(rows[0].allocated.sales_condensate, Some(20.0));
        assert_eq!(rows[0].allocated.sales_cgr, Some(0.2));

        // Day 2 is inside the dead-band: gathered 50 is the basis
        assert_eq!(rows[1].allocated.s2_gas, Some(100.0));
        assert_eq!(rows[1].allocated.sales_gas, Some(50.0));
        assert_eq!(rows[1].allocated.sales_condensate, None);
        assert_eq!(rows[1].allocated.sales_cgr, None);

        // No basis at all
        assert_eq!(rows[2].allocated.s2_gas, None);
        assert_eq!(rows[2].allocated.sales_cgr, Some(0.0));
    }

    #[test]
    fn test_scenario_c_zero_sales_gas_flat_spreads_to_zero() {
        let m = month("2024-06");
        let mut rows = days_of(m);
        assert_eq!(rows.len(), 30);
        for row in &mut rows {
            row.gas_wh = Some(25.0);
        }
        let volumes = ExternalVolumeTable::new().with("A-1", m, external(750.0, 0.0, 0.0));
        allocate_well("A-1", &mut rows, &volumes, &AllocationConfig::default());

        for row in &rows {
            assert_eq!(row.allocated.sales_gas, Some(0.0 / 30.0));
            assert_eq!(row.allocated.sales_cgr, Some(0.0), "sales CGR defaults to 0");
            assert_eq!(row.allocated.s2_gas, Some(25.0));
        }
    }

    #[test]
    fn test_negative_sales_gas_spreads_over_calendar_days() {
        let m = month("2024-02");
        let factor = compute_factor("A-1", m, BaselineTotals::default(), external(0.0, -29.0, 0.0));
        let record = days_of(m).remove(0);
        let allocated = project_day(&record, &factor, 2.0);
        assert_eq!(allocated.sales_gas, Some(-1.0));
        assert_eq!(allocated.sales_cgr, Some(0.0));
    }

    #[test]
    fn test_month_without_volumes_stays_null() {
        let mut rows = days_of(month("2024-01"));
        rows.extend(days_of(month("2024-02")));
        for row in &mut rows {
            row.gas_wh = Some(10.0);
        }
        let volumes =
            ExternalVolumeTable::new().with("A-1", month("2024-02"), external(1.0, 1.0, 1.0));
        let factors = allocate_well("A-1", &mut rows, &volumes, &AllocationConfig::default());

        assert_eq!(factors.len(), 1);
        let jan = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let row = rows.iter().find(|r| r.date == jan).unwrap();
        assert_eq!(row.allocated, AllocatedVolumes::default());
    }

    #[test]
    fn test_other_wells_volumes_ignored() {
        let mut rows = days_of(month("2024-01"));
        let volumes =
            ExternalVolumeTable::new().with("B-2", month("2024-01"), external(1.0, 1.0, 1.0));
        assert!(allocate_well("A-1", &mut rows, &volumes, &AllocationConfig::default()).is_empty());
    }
}
