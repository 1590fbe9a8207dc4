//! Ratio-exception report: allocation factors above a limit
//!
//! A factor above 1.0 means the external system reported more than the
//! baseline measured, which is usually a metering or mapping problem worth a
//! look.

use crate::types::{MonthlyAllocationFactor, ProductionMonth, RatioKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioException {
    pub kind: RatioKind,
    pub well: String,
    pub month: ProductionMonth,
    pub value: f64,
    pub numerator: f64,
    pub denominator: f64,
}

/// All exceptions for one ratio kind, highest value first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioExceptionGroup {
    pub kind: RatioKind,
    pub exceptions: Vec<RatioException>,
}

/// Every factor value strictly above `limit`, grouped per ratio kind in
/// `RatioKind::ALL` order. Kinds with no exceptions are omitted.
pub fn ratio_exceptions(factors: &[MonthlyAllocationFactor], limit: f64) -> Vec<RatioExceptionGroup> {
    RatioKind::ALL
        .iter()
        .filter_map(|&kind| {
            let mut exceptions: Vec<RatioException> = factors
                .iter()
                .filter(|f| kind.value(f) > limit)
                .map(|f| {
                    let (numerator, denominator) = kind.operands(f);
                    RatioException {
                        kind,
                        well: f.well.clone(),
                        month: f.month,
                        value: kind.value(f),
                        numerator,
                        denominator,
                    }
                })
                .collect();

            if exceptions.is_empty() {
                return None;
            }
            exceptions.sort_by(|a, b| {
                b.value
                    .total_cmp(&a.value)
                    .then(a.month.cmp(&b.month))
                    .then_with(|| a.well.cmp(&b.well))
            });
            Some(RatioExceptionGroup { kind, exceptions })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::compute_factor;
    use crate::types::{BaselineTotals, ExternalVolumes};

    fn factor(well: &str, month: &str, wh_gas: f64, s2: f64) -> MonthlyAllocationFactor {
        compute_factor(
            well,
            ProductionMonth::parse(month).unwrap(),
            BaselineTotals {
                gas_wh: wh_gas,
                condensate_wh: 10.0,
                gathered_gas: 100.0,
                gathered_condensate: 10.0,
            },
            ExternalVolumes {
                s2_gas: s2,
                sales_gas: 50.0,
                sales_condensate: 5.0,
            },
        )
    }

    #[test]
    fn test_exceptions_sorted_desc_then_month_then_well() {
        let factors = vec![
            factor("B-2", "2024-02", 100.0, 120.0),
            factor("A-1", "2024-02", 100.0, 150.0),
            factor("C-3", "2024-01", 100.0, 120.0),
            factor("A-1", "2024-01", 100.0, 90.0),
        ];
        let groups = ratio_exceptions(&factors, 1.0);

        let wh_s2 = groups.iter().find(|g| g.kind == RatioKind::WhToS2).unwrap();
        let order: Vec<_> = wh_s2
            .exceptions
            .iter()
            .map(|e| (e.well.as_str(), e.month.to_string()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("A-1", "2024-02".to_string()),
                ("C-3", "2024-01".to_string()),
                ("B-2", "2024-02".to_string()),
            ]
        );
        assert_eq!(wh_s2.exceptions[0].numerator, 150.0);
        assert_eq!(wh_s2.exceptions[0].denominator, 100.0);
    }

    #[test]
    fn test_guarded_default_is_not_an_exception() {
        // wh_gas 0 -> guard gives exactly 1.0, which is not above the limit
        let groups = ratio_exceptions(&[factor("A-1", "2024-01", 0.0, 500.0)], 1.0);
        assert!(groups.iter().all(|g| g.kind != RatioKind::WhToS2));
    }

    #[test]
    fn test_groups_follow_ratio_kind_order() {
        // gathered_to_s2 = 150/100 and wh_to_s2 = 150/100 both exceed 1
        let groups = ratio_exceptions(&[factor("A-1", "2024-01", 100.0, 150.0)], 1.0);
        let kinds: Vec<_> = groups.iter().map(|g| g.kind).collect();
        assert_eq!(kinds, vec![RatioKind::WhToS2, RatioKind::GatheredToS2]);
    }
}
