//! Multi-Source Merge Engine
//!
//! Left-joins the seven deduplicated feeds onto a well's spine. Flow-identity
//! feeds match on the well's flow identity, the rest on its compression
//! identity. Days a feed does not cover keep `None` in that feed's fields.
//!
//! Feed keys that resolve to no registry well are never joined. They are
//! reported, never fatal.

use crate::feeds::{FeedKind, FeedSet};
use crate::registry::WellRegistry;
use crate::types::{DailyProductionRecord, WellIdentity};
use tracing::{debug, warn};

/// Feed keys with no registry well. The left join never reads them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedIdentities {
    pub feed: FeedKind,
    pub keys: Vec<String>,
    /// Deduplicated (key, day) rows dropped with those keys
    pub rows: usize,
}

/// Report feed keys that resolve to no registry well.
pub fn find_unresolved(feeds: &FeedSet, registry: &dyn WellRegistry) -> Vec<UnresolvedIdentities> {
    let mut report = Vec::new();

    for table in feeds.tables() {
        let kind = table.kind();
        let identity = kind.identity_kind();
        let keys: Vec<String> = table
            .keys()
            .filter(|key| !registry.knows(identity, key))
            .map(str::to_string)
            .collect();
        if keys.is_empty() {
            continue;
        }

        let rows = keys
            .iter()
            .filter_map(|key| table.series(key))
            .map(|series| series.len())
            .sum();
        warn!(
            feed = %kind,
            identity = %identity,
            keys = keys.len(),
            rows,
            "Dropped rows for identities not in the registry"
        );
        report.push(UnresolvedIdentities { feed: kind, keys, rows });
    }

    report
}

/// Days matched per feed for one well, in `FeedKind::ALL` order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub matched: [usize; 7],
}

impl MergeStats {
    pub fn matched(&self, kind: FeedKind) -> usize {
        FeedKind::ALL
            .iter()
            .position(|&k| k == kind)
            .map_or(0, |idx| self.matched[idx])
    }

    pub fn total(&self) -> usize {
        self.matched.iter().sum()
    }
}

/// Join every feed onto `rows` (one well's spine) and derive wellhead
/// condensate.
pub fn merge_well(
    rows: &mut [DailyProductionRecord],
    well: &WellIdentity,
    feeds: &FeedSet,
) -> MergeStats {
    let mut stats = MergeStats::default();

    for (slot, kind) in FeedKind::ALL.iter().enumerate() {
        let key = well.identity(kind.identity_kind());
        if key.is_empty() {
            continue;
        }
        let Some(series) = feeds.table(*kind).and_then(|t| t.series(key)) else {
            continue;
        };

        for row in rows.iter_mut() {
            if let Some(values) = series.get(&row.date) {
                for (&field, &value) in kind.fields().iter().zip(values) {
                    row.set(field, value);
                }
                stats.matched[slot] += 1;
            }
        }
    }

    for row in rows.iter_mut() {
        row.derive_condensate_wh();
    }

    debug!(well = %well.name, days = rows.len(), matched = ?stats.matched, "Feeds merged");
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feeds::FeedRow;
    use crate::registry::InMemoryRegistry;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn spine(well: &WellIdentity, days: std::ops::RangeInclusive<u32>) -> Vec<DailyProductionRecord> {
        days.map(|d| DailyProductionRecord::spine(well, day(d))).collect()
    }

    #[test]
    fn test_flow_and_compression_feeds_join_on_their_identity() {
        let well = WellIdentity::new("A-1", "F1", "P1");
        let feeds = FeedSet::new()
            .with_rows(
                FeedKind::GasWellhead,
                vec![FeedRow::on_day("F1", day(1), vec![Some(100.0), Some(24.0)])],
            )
            .with_rows(
                FeedKind::Cgr,
                vec![
                    FeedRow::on_day("P1", day(1), vec![Some(0.02)]),
                    FeedRow::on_day("F1", day(2), vec![Some(9.9)]),
                ],
            );

        let mut rows = spine(&well, 1..=2);
        let stats = merge_well(&mut rows, &well, &feeds);

        assert_eq!(rows[0].gas_wh, Some(100.0));
        assert_eq!(rows[0].hours_on, Some(24.0));
        assert_eq!(rows[0].cgr_ratio, Some(0.02));
        assert_eq!(rows[0].condensate_wh, Some(100.0 * 0.02));
        // "F1" in the CGR feed is a compression key, not this well's
        assert_eq!(rows[1].cgr_ratio, None);
        assert_eq!(stats.matched(FeedKind::Cgr), 1);
    }

    #[test]
    fn test_uncovered_days_stay_null() {
        let well = WellIdentity::new("A-1", "F1", "P1");
        let feeds = FeedSet::new().with_rows(
            FeedKind::Gathered,
            vec![FeedRow::on_day("P1", day(2), vec![Some(50.0), None, Some(1.5)])],
        );

        let mut rows = spine(&well, 1..=3);
        merge_well(&mut rows, &well, &feeds);

        assert_eq!(rows[0].gathered_gas, None);
        assert_eq!(rows[1].gathered_gas, Some(50.0));
        assert_eq!(rows[1].gathered_condensate, None);
        assert_eq!(rows[1].ngl, Some(1.5));
        assert_eq!(rows[2].gathered_gas, None);
        assert!(rows.iter().all(|r| r.condensate_wh.is_none()));
    }

    #[test]
    fn test_inconsistent_identity_gives_partial_data() {
        // Registry says P1, pressures feed only knows P7
        let well = WellIdentity::new("A-1", "F1", "P1");
        let feeds = FeedSet::new()
            .with_rows(
                FeedKind::Ecf,
                vec![FeedRow::on_day("F1", day(1), vec![Some(0.97)])],
            )
            .with_rows(
                FeedKind::Pressures,
                vec![FeedRow::on_day("P7", day(1), vec![Some(900.0), Some(1000.0), Some(32.0)])],
            );

        let mut rows = spine(&well, 1..=1);
        merge_well(&mut rows, &well, &feeds);
        assert_eq!(rows[0].ecf_ratio, Some(0.97));
        assert_eq!(rows[0].tubing_pressure, None);
    }

    #[test]
    fn test_unknown_identities_dropped_and_counted() {
        let registry = InMemoryRegistry::new(vec![WellIdentity::new("A-1", "F1", "P1")]);
        let feeds = FeedSet::new()
            .with_rows(
                FeedKind::Ecf,
                vec![
                    FeedRow::on_day("F1", day(1), vec![Some(1.0)]),
                    FeedRow::on_day("F9", day(1), vec![Some(1.0)]),
                    FeedRow::on_day("F9", day(2), vec![Some(1.0)]),
                ],
            )
            .with_rows(
                FeedKind::Wgr,
                vec![FeedRow::on_day("P1", day(1), vec![Some(0.3)])],
            );

        let report = find_unresolved(&feeds, &registry);
        assert_eq!(
            report,
            vec![UnresolvedIdentities {
                feed: FeedKind::Ecf,
                keys: vec!["F9".to_string()],
                rows: 2,
            }]
        );
    }
}
