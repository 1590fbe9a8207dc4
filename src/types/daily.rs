//! Wide daily record: one row per (well, calendar day)

use super::well::{WellAttributes, WellIdentity};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Canonical measurement fields a feed can populate.
///
/// Feed column names vary by source; the schema adapter maps them onto these
/// before the merge ever sees a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MeasurementField {
    EffluentCorrection,
    GasWellhead,
    HoursOn,
    CondensateGasRatio,
    WaterGasRatio,
    TubingPressure,
    CasingPressure,
    ChokeSize,
    GatheredGas,
    GatheredCondensate,
    Ngl,
    AllocatedWater,
}

impl MeasurementField {
    pub const fn canonical_name(self) -> &'static str {
        match self {
            Self::EffluentCorrection => "ecf_ratio",
            Self::GasWellhead => "gas_wh_production",
            Self::HoursOn => "on_prod_hours",
            Self::CondensateGasRatio => "cgr_ratio",
            Self::WaterGasRatio => "wgr_ratio",
            Self::TubingPressure => "tubing_pressure",
            Self::CasingPressure => "casing_pressure",
            Self::ChokeSize => "choke_size",
            Self::GatheredGas => "gathered_gas_production",
            Self::GatheredCondensate => "gathered_condensate_production",
            Self::Ngl => "ngl_production",
            Self::AllocatedWater => "allocated_water_rate",
        }
    }
}

/// Externally reported volumes projected onto a day from the month's factors.
///
/// All `None` until the allocation stage runs for a month with external
/// volumes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AllocatedVolumes {
    pub s2_gas: Option<f64>,
    pub sales_gas: Option<f64>,
    pub sales_condensate: Option<f64>,
    pub sales_cgr: Option<f64>,
}

/// One merged well-day.
///
/// Absent measurements stay `None` through every stage until a stage applies
/// an explicit default; nothing is coerced to zero on the way in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyProductionRecord {
    pub well: String,
    pub flow_id: String,
    pub compression_id: String,
    pub date: NaiveDate,
    pub attributes: WellAttributes,

    // Flow-identity feeds
    pub ecf_ratio: Option<f64>,
    pub gas_wh: Option<f64>,
    pub hours_on: Option<f64>,

    // Compression-identity feeds
    pub cgr_ratio: Option<f64>,
    pub wgr_ratio: Option<f64>,
    pub tubing_pressure: Option<f64>,
    pub casing_pressure: Option<f64>,
    pub choke_size: Option<f64>,
    pub gathered_gas: Option<f64>,
    pub gathered_condensate: Option<f64>,
    pub ngl: Option<f64>,
    pub allocated_water: Option<f64>,

    /// gas_wh × cgr_ratio, `None` when either operand is `None`
    pub condensate_wh: Option<f64>,

    pub allocated: AllocatedVolumes,
}

impl DailyProductionRecord {
    /// An empty spine row for `well` on `date`.
    pub fn spine(well: &WellIdentity, date: NaiveDate) -> Self {
        Self {
            well: well.name.clone(),
            flow_id: well.flow_id.clone(),
            compression_id: well.compression_id.clone(),
            date,
            attributes: well.attributes.clone(),
            ecf_ratio: None,
            gas_wh: None,
            hours_on: None,
            cgr_ratio: None,
            wgr_ratio: None,
            tubing_pressure: None,
            casing_pressure: None,
            choke_size: None,
            gathered_gas: None,
            gathered_condensate: None,
            ngl: None,
            allocated_water: None,
            condensate_wh: None,
            allocated: AllocatedVolumes::default(),
        }
    }

    pub fn get(&self, field: MeasurementField) -> Option<f64> {
        match field {
            MeasurementField::EffluentCorrection => self.ecf_ratio,
            MeasurementField::GasWellhead => self.gas_wh,
            MeasurementField::HoursOn => self.hours_on,
            MeasurementField::CondensateGasRatio => self.cgr_ratio,
            MeasurementField::WaterGasRatio => self.wgr_ratio,
            MeasurementField::TubingPressure => self.tubing_pressure,
            MeasurementField::CasingPressure => self.casing_pressure,
            MeasurementField::ChokeSize => self.choke_size,
            MeasurementField::GatheredGas => self.gathered_gas,
            MeasurementField::GatheredCondensate => self.gathered_condensate,
            MeasurementField::Ngl => self.ngl,
            MeasurementField::AllocatedWater => self.allocated_water,
        }
    }

    pub fn set(&mut self, field: MeasurementField, value: Option<f64>) {
        let slot = match field {
            MeasurementField::EffluentCorrection => &mut self.ecf_ratio,
            MeasurementField::GasWellhead => &mut self.gas_wh,
            MeasurementField::HoursOn => &mut self.hours_on,
            MeasurementField::CondensateGasRatio => &mut self.cgr_ratio,
            MeasurementField::WaterGasRatio => &mut self.wgr_ratio,
            MeasurementField::TubingPressure => &mut self.tubing_pressure,
            MeasurementField::CasingPressure => &mut self.casing_pressure,
            MeasurementField::ChokeSize => &mut self.choke_size,
            MeasurementField::GatheredGas => &mut self.gathered_gas,
            MeasurementField::GatheredCondensate => &mut self.gathered_condensate,
            MeasurementField::Ngl => &mut self.ngl,
            MeasurementField::AllocatedWater => &mut self.allocated_water,
        };
        *slot = value;
    }

    /// Recompute the derived wellhead condensate volume.
    pub fn derive_condensate_wh(&mut self) {
        self.condensate_wh = match (self.gas_wh, self.cgr_ratio) {
            (Some(gas), Some(cgr)) => Some(gas * cgr),
            _ => None,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> DailyProductionRecord {
        let well = WellIdentity::new("A-1", "F1", "C1");
        DailyProductionRecord::spine(&well, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
    }

    #[test]
    fn test_condensate_null_when_either_operand_missing() {
        let mut r = record();
        r.gas_wh = Some(12.0);
        r.derive_condensate_wh();
        assert_eq!(r.condensate_wh, None);

        r.gas_wh = None;
        r.cgr_ratio = Some(0.5);
        r.derive_condensate_wh();
        assert_eq!(r.condensate_wh, None);
    }

    #[test]
    fn test_condensate_is_exact_product() {
        let mut r = record();
        r.gas_wh = Some(12.5);
        r.cgr_ratio = Some(0.04);
        r.derive_condensate_wh();
        assert_eq!(r.condensate_wh, Some(12.5 * 0.04));

        // Zero gas is a measurement, not an absence
        r.gas_wh = Some(0.0);
        r.derive_condensate_wh();
        assert_eq!(r.condensate_wh, Some(0.0));
    }
}
