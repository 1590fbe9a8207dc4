//! Schema normalization at the feed boundary
//!
//! Every source names its columns differently (canonical snake_case exports,
//! mixed-case report aliases, raw source-system mnemonics). `ColumnMap`
//! resolves a header row onto the canonical `MeasurementField`s once, so the
//! merge and allocation stages never see source column names.

use super::csv::{parse_value, CsvRecord, CsvTable};
use super::FeedError;
use crate::types::{IdentityKind, MeasurementField};
use serde::{Deserialize, Serialize};

// ============================================================================
// Feed Kinds
// ============================================================================

/// The seven measurement feeds merged onto the daily spine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FeedKind {
    /// Effluent-correction ratio
    Ecf,
    /// Wellhead gas volume and on-production hours
    GasWellhead,
    /// Condensate-gas ratio
    Cgr,
    /// Water-gas ratio
    Wgr,
    /// Tubing/casing pressure and choke size
    Pressures,
    /// Gathered gas, gathered condensate and NGL
    Gathered,
    /// Allocated water rate
    AllocatedWater,
}

impl FeedKind {
    pub const ALL: [Self; 7] = [
        Self::Ecf,
        Self::GasWellhead,
        Self::Cgr,
        Self::Wgr,
        Self::Pressures,
        Self::Gathered,
        Self::AllocatedWater,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Ecf => "ecf",
            Self::GasWellhead => "gas_wh",
            Self::Cgr => "cgr",
            Self::Wgr => "wgr",
            Self::Pressures => "pressures",
            Self::Gathered => "gathered",
            Self::AllocatedWater => "allocated_water",
        }
    }

    /// File name of this feed inside a run input directory.
    pub fn file_name(self) -> String {
        format!("{}.csv", self.name())
    }

    /// Which registry identity the feed's key column refers to.
    pub const fn identity_kind(self) -> IdentityKind {
        match self {
            Self::Ecf | Self::GasWellhead => IdentityKind::Flow,
            _ => IdentityKind::Compression,
        }
    }

    /// Value fields carried by the feed, in column order of `FeedRow::values`.
    pub const fn fields(self) -> &'static [MeasurementField] {
        use MeasurementField as F;
        match self {
            Self::Ecf => &[F::EffluentCorrection],
            Self::GasWellhead => &[F::GasWellhead, F::HoursOn],
            Self::Cgr => &[F::CondensateGasRatio],
            Self::Wgr => &[F::WaterGasRatio],
            Self::Pressures => &[F::TubingPressure, F::CasingPressure, F::ChokeSize],
            Self::Gathered => &[F::GatheredGas, F::GatheredCondensate, F::Ngl],
            Self::AllocatedWater => &[F::AllocatedWater],
        }
    }
}

impl std::fmt::Display for FeedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Column Aliases
// ============================================================================

const FLOW_KEY_ALIASES: &[&str] = &["flow_id", "GasIDREC", "IDRECPARENT"];
const COMPRESSION_KEY_ALIASES: &[&str] = &["compression_id", "PressuresIDREC", "IDRECCOMP"];
const DATE_ALIASES: &[&str] = &["date", "ProdDate", "DTTM"];

const CGR_LIQUID_ALIASES: &[&str] = &["liquid_rate", "RATEHCLIQ"];
const CGR_GAS_ALIASES: &[&str] = &["gas_rate", "RATEGAS"];

/// Accepted header names for a field, canonical name first.
fn field_aliases(field: MeasurementField) -> &'static [&'static str] {
    use MeasurementField as F;
    match field {
        F::EffluentCorrection => &["ecf_ratio", "ECF_Ratio", "EFFLUENTFACTOR"],
        F::GasWellhead => &["gas_wh_production", "GasWH_Production", "VOLENTERGAS"],
        F::HoursOn => &["on_prod_hours", "OnProdHours", "DURONOR"],
        F::CondensateGasRatio => &["cgr_ratio", "CGR_Ratio", "CGR"],
        F::WaterGasRatio => &["wgr_ratio", "WGR_Ratio", "WGR"],
        F::TubingPressure => &["tubing_pressure", "Tubing_Pressure", "PRESTUB"],
        F::CasingPressure => &["casing_pressure", "Casing_Pressure", "PRESCAS"],
        F::ChokeSize => &["choke_size", "Choke_Size", "SZCHOKE"],
        F::GatheredGas => &["gathered_gas_production", "Gathered_Gas_Production", "VOLPRODGATHGAS"],
        F::GatheredCondensate => &[
            "gathered_condensate_production",
            "Gathered_Condensate_Production",
            "VOLPRODGATHHCLIQ",
        ],
        F::Ngl => &["ngl_production", "NGL_Production", "VOLNEWPRODALLOCNGL"],
        F::AllocatedWater => &["allocated_water_rate", "AllocatedWater_Rate", "VOLWATER"],
    }
}

/// The primary measurement of each feed must be present; secondary columns
/// may be missing and read as absent.
const fn is_required(field: MeasurementField) -> bool {
    !matches!(
        field,
        MeasurementField::HoursOn
            | MeasurementField::CasingPressure
            | MeasurementField::ChokeSize
            | MeasurementField::GatheredCondensate
            | MeasurementField::Ngl
    )
}

pub(crate) fn key_aliases(kind: IdentityKind) -> &'static [&'static str] {
    match kind {
        IdentityKind::Flow => FLOW_KEY_ALIASES,
        IdentityKind::Compression => COMPRESSION_KEY_ALIASES,
    }
}

// ============================================================================
// Column Mapping
// ============================================================================

/// Where a canonical value comes from in a source row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Column(usize),
    /// numerator / denominator, absent when the denominator is absent or zero
    Ratio { numerator: usize, denominator: usize },
    Missing,
}

impl ValueSource {
    fn read(self, record: &CsvRecord) -> Option<f64> {
        match self {
            Self::Column(idx) => record.get(idx).and_then(parse_value),
            Self::Ratio { numerator, denominator } => {
                let den = record.get(denominator).and_then(parse_value)?;
                if den == 0.0 {
                    return None;
                }
                let num = record.get(numerator).and_then(parse_value)?;
                Some(num / den)
            }
            Self::Missing => None,
        }
    }
}

/// Resolved header layout for one feed file.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    pub kind: FeedKind,
    pub key: usize,
    pub date: usize,
    pub values: Vec<ValueSource>,
}

impl ColumnMap {
    /// Resolve a header row, failing if the key, date or a required value
    /// column cannot be found.
    pub(crate) fn from_header(kind: FeedKind, table: &CsvTable) -> Result<Self, FeedError> {
        let missing = |column: &'static str| FeedError::MissingColumn {
            feed: kind.name().to_string(),
            column,
        };

        let key_aliases = key_aliases(kind.identity_kind());
        let key = table
            .find_column(key_aliases)
            .ok_or_else(|| missing(key_aliases[0]))?;
        let date = table
            .find_column(DATE_ALIASES)
            .ok_or_else(|| missing(DATE_ALIASES[0]))?;

        let mut values = Vec::with_capacity(kind.fields().len());
        for &field in kind.fields() {
            let source = match table.find_column(field_aliases(field)) {
                Some(idx) => ValueSource::Column(idx),
                None if field == MeasurementField::CondensateGasRatio => {
                    match (
                        table.find_column(CGR_LIQUID_ALIASES),
                        table.find_column(CGR_GAS_ALIASES),
                    ) {
                        (Some(numerator), Some(denominator)) => ValueSource::Ratio {
                            numerator,
                            denominator,
                        },
                        _ => return Err(missing(field.canonical_name())),
                    }
                }
                None if is_required(field) => return Err(missing(field.canonical_name())),
                None => ValueSource::Missing,
            };
            values.push(source);
        }

        Ok(Self {
            kind,
            key,
            date,
            values,
        })
    }

    /// Read the canonical value cells of a row, in `FeedKind::fields()` order.
    pub(crate) fn read_values(&self, record: &CsvRecord) -> Vec<Option<f64>> {
        self.values.iter().map(|source| source.read(record)).collect()
    }

    /// Report which value columns were found
    pub fn summary(&self) -> String {
        let mut found: Vec<String> = Vec::new();
        let mut missing: Vec<&str> = Vec::new();

        for (field, source) in self.kind.fields().iter().zip(&self.values) {
            match source {
                ValueSource::Column(_) => found.push(field.canonical_name().to_string()),
                ValueSource::Ratio { .. } => {
                    found.push(format!("{} (derived)", field.canonical_name()));
                }
                ValueSource::Missing => missing.push(field.canonical_name()),
            }
        }

        format!(
            "[{}] Found {}/{} value columns. Present: [{}]. Missing: [{}]",
            self.kind,
            found.len(),
            found.len() + missing.len(),
            found.join(", "),
            missing.join(", "),
        )
    }
}
