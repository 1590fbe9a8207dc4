//! Monthly allocation factor types

use super::window::ProductionMonth;
use serde::{Deserialize, Serialize};

/// Monthly volumes reported by external systems for one well-month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalVolumes {
    /// Secondary ("S2") gas measurement
    pub s2_gas: f64,
    /// Sales-metered gas
    pub sales_gas: f64,
    /// Sales-metered condensate
    pub sales_condensate: f64,
}

/// Monthly totals of the daily baselines, nulls summed as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BaselineTotals {
    pub gas_wh: f64,
    pub condensate_wh: f64,
    pub gathered_gas: f64,
    pub gathered_condensate: f64,
}

/// The six monthly ratios converting a baseline into a reported volume.
///
/// Every ratio defaults to 1.0 when its denominator is non-positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyAllocationFactor {
    pub well: String,
    pub month: ProductionMonth,
    pub baseline: BaselineTotals,
    pub external: ExternalVolumes,
    pub wh_to_s2: f64,
    pub wh_to_sales_gas: f64,
    pub wh_to_sales_condensate: f64,
    pub gathered_to_s2: f64,
    pub gathered_to_sales_gas: f64,
    pub gathered_to_sales_condensate: f64,
}

/// Names the six ratios so reports can iterate over them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RatioKind {
    WhToS2,
    WhToSalesGas,
    WhToSalesCondensate,
    GatheredToS2,
    GatheredToSalesGas,
    GatheredToSalesCondensate,
}

impl RatioKind {
    pub const ALL: [Self; 6] = [
        Self::WhToS2,
        Self::WhToSalesGas,
        Self::WhToSalesCondensate,
        Self::GatheredToS2,
        Self::GatheredToSalesGas,
        Self::GatheredToSalesCondensate,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::WhToS2 => "WH to S2",
            Self::WhToSalesGas => "WH to Sales Gas",
            Self::WhToSalesCondensate => "WH to Sales Condensate",
            Self::GatheredToS2 => "Gathered to S2",
            Self::GatheredToSalesGas => "Gathered to Sales Gas",
            Self::GatheredToSalesCondensate => "Gathered to Sales Condensate",
        }
    }

    pub fn value(self, factor: &MonthlyAllocationFactor) -> f64 {
        match self {
            Self::WhToS2 => factor.wh_to_s2,
            Self::WhToSalesGas => factor.wh_to_sales_gas,
            Self::WhToSalesCondensate => factor.wh_to_sales_condensate,
            Self::GatheredToS2 => factor.gathered_to_s2,
            Self::GatheredToSalesGas => factor.gathered_to_sales_gas,
            Self::GatheredToSalesCondensate => factor.gathered_to_sales_condensate,
        }
    }

    /// (numerator, denominator) the ratio was computed from.
    pub fn operands(self, factor: &MonthlyAllocationFactor) -> (f64, f64) {
        let b = &factor.baseline;
        let e = &factor.external;
        match self {
            Self::WhToS2 => (e.s2_gas, b.gas_wh),
            Self::WhToSalesGas => (e.sales_gas, b.gas_wh),
            Self::WhToSalesCondensate => (e.sales_condensate, b.condensate_wh),
            Self::GatheredToS2 => (e.s2_gas, b.gathered_gas),
            Self::GatheredToSalesGas => (e.sales_gas, b.gathered_gas),
            Self::GatheredToSalesCondensate => (e.sales_condensate, b.gathered_condensate),
        }
    }
}

impl std::fmt::Display for RatioKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
