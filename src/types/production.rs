//! Production timeline: the filtered, sequenced view of a well's history

use super::allocation::MonthlyAllocationFactor;
use super::daily::DailyProductionRecord;
use super::well::WellIdentity;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Metrics carried into cumulative sums and monthly averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TrackedMetric {
    /// Wellhead gas after low-flow baseline substitution
    EffectiveGasWh,
    S2Gas,
    SalesGas,
    SalesCondensate,
    CondensateWh,
    GatheredGas,
    GatheredCondensate,
}

impl TrackedMetric {
    /// Metrics with a running total.
    pub const CUMULATIVE: [Self; 7] = [
        Self::EffectiveGasWh,
        Self::S2Gas,
        Self::SalesGas,
        Self::SalesCondensate,
        Self::CondensateWh,
        Self::GatheredGas,
        Self::GatheredCondensate,
    ];

    /// Metrics with a per-month mean.
    pub const MONTHLY_AVERAGE: [Self; 4] = [
        Self::EffectiveGasWh,
        Self::S2Gas,
        Self::GatheredGas,
        Self::GatheredCondensate,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::EffectiveGasWh => "gas_wh",
            Self::S2Gas => "s2_gas",
            Self::SalesGas => "sales_gas",
            Self::SalesCondensate => "sales_condensate",
            Self::CondensateWh => "condensate_wh",
            Self::GatheredGas => "gathered_gas",
            Self::GatheredCondensate => "gathered_condensate",
        }
    }
}

/// The two ordinal counters for a production day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceState {
    /// 1-based day ordinal, advances every day
    pub days_seq: u32,
    /// Uprate ordinal, frozen through sub-threshold runs
    pub day_seq_uprt: u32,
}

/// Running totals from the well's first production day through this day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Cumulatives {
    pub gas_wh: f64,
    pub s2_gas: f64,
    pub sales_gas: f64,
    pub sales_condensate: f64,
    pub condensate_wh: f64,
    pub gathered_gas: f64,
    pub gathered_condensate: f64,
}

impl Cumulatives {
    pub fn get(&self, metric: TrackedMetric) -> f64 {
        match metric {
            TrackedMetric::EffectiveGasWh => self.gas_wh,
            TrackedMetric::S2Gas => self.s2_gas,
            TrackedMetric::SalesGas => self.sales_gas,
            TrackedMetric::SalesCondensate => self.sales_condensate,
            TrackedMetric::CondensateWh => self.condensate_wh,
            TrackedMetric::GatheredGas => self.gathered_gas,
            TrackedMetric::GatheredCondensate => self.gathered_condensate,
        }
    }

    pub(crate) fn slot_mut(&mut self, metric: TrackedMetric) -> &mut f64 {
        match metric {
            TrackedMetric::EffectiveGasWh => &mut self.gas_wh,
            TrackedMetric::S2Gas => &mut self.s2_gas,
            TrackedMetric::SalesGas => &mut self.sales_gas,
            TrackedMetric::SalesCondensate => &mut self.sales_condensate,
            TrackedMetric::CondensateWh => &mut self.condensate_wh,
            TrackedMetric::GatheredGas => &mut self.gathered_gas,
            TrackedMetric::GatheredCondensate => &mut self.gathered_condensate,
        }
    }
}

/// Per well-month means, replicated onto every day of the month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthlyAverages {
    pub gas_wh: f64,
    pub s2_gas: f64,
    pub gathered_gas: f64,
    pub gathered_condensate: f64,
}

impl MonthlyAverages {
    /// `None` for metrics that are not averaged.
    pub fn get(&self, metric: TrackedMetric) -> Option<f64> {
        match metric {
            TrackedMetric::EffectiveGasWh => Some(self.gas_wh),
            TrackedMetric::S2Gas => Some(self.s2_gas),
            TrackedMetric::GatheredGas => Some(self.gathered_gas),
            TrackedMetric::GatheredCondensate => Some(self.gathered_condensate),
            _ => None,
        }
    }

    pub(crate) fn slot_mut(&mut self, metric: TrackedMetric) -> Option<&mut f64> {
        match metric {
            TrackedMetric::EffectiveGasWh => Some(&mut self.gas_wh),
            TrackedMetric::S2Gas => Some(&mut self.s2_gas),
            TrackedMetric::GatheredGas => Some(&mut self.gathered_gas),
            TrackedMetric::GatheredCondensate => Some(&mut self.gathered_condensate),
            _ => None,
        }
    }
}

/// A day on the production timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionRow {
    pub record: DailyProductionRecord,
    /// Wellhead gas with the gathered value substituted in the meter dead-band
    pub effective_gas: Option<f64>,
    pub sequence: SequenceState,
    pub cumulative: Cumulatives,
    pub monthly_average: MonthlyAverages,
    /// Calendar year of the well's first production row
    pub on_production_year: i32,
}

impl ProductionRow {
    pub fn date(&self) -> NaiveDate {
        self.record.date
    }

    /// Daily value of a tracked metric.
    pub fn metric(&self, metric: TrackedMetric) -> Option<f64> {
        let r = &self.record;
        match metric {
            TrackedMetric::EffectiveGasWh => self.effective_gas,
            TrackedMetric::S2Gas => r.allocated.s2_gas,
            TrackedMetric::SalesGas => r.allocated.sales_gas,
            TrackedMetric::SalesCondensate => r.allocated.sales_condensate,
            TrackedMetric::CondensateWh => r.condensate_wh,
            TrackedMetric::GatheredGas => r.gathered_gas,
            TrackedMetric::GatheredCondensate => r.gathered_condensate,
        }
    }
}

/// Everything the engine produces for one well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellOutput {
    pub well: WellIdentity,
    /// First date with any non-null measurement, `None` when the spine fell
    /// back to the configured default start
    pub first_measurement: Option<NaiveDate>,
    /// Spine days that picked up a feed row, summed over the feeds
    pub feed_days_matched: usize,
    /// Full spine with merged and allocated fields
    pub daily: Vec<DailyProductionRecord>,
    pub factors: Vec<MonthlyAllocationFactor>,
    /// Timeline from first non-zero effective production
    pub production: Vec<ProductionRow>,
}
