//! Daily Spine Builder
//!
//! One row per calendar day per well, from the well's first measurement in
//! any feed through the run cutoff. Wells with no measurement anywhere start
//! at the configured fallback date.

use crate::config::SpineConfig;
use crate::feeds::{FeedKind, FeedSet};
use crate::types::{DailyProductionRecord, WellIdentity};
use chrono::{Datelike, NaiveDate};
use tracing::{debug, warn};

/// A well's spine and where it was anchored.
#[derive(Debug, Clone, PartialEq)]
pub struct WellSpine {
    /// Earliest non-null measurement across all feeds, if any
    pub first_measurement: Option<NaiveDate>,
    /// First spine day: the first measurement or the fallback date
    pub start: NaiveDate,
    /// Ascending by date, no gaps or duplicates
    pub rows: Vec<DailyProductionRecord>,
}

/// Earliest measurement date per feed for `well`, in feed order.
pub fn first_measurements(well: &WellIdentity, feeds: &FeedSet) -> Vec<(FeedKind, NaiveDate)> {
    FeedKind::ALL
        .iter()
        .filter_map(|&kind| {
            let key = well.identity(kind.identity_kind());
            if key.is_empty() {
                return None;
            }
            feeds
                .table(kind)
                .and_then(|t| t.first_measurement(key))
                .map(|date| (kind, date))
        })
        .collect()
}

/// Build the daily spine for one well through `cutoff` inclusive.
pub fn build(
    well: &WellIdentity,
    feeds: &FeedSet,
    config: &SpineConfig,
    cutoff: NaiveDate,
) -> WellSpine {
    let sources = first_measurements(well, feeds);
    let first_measurement = sources.iter().map(|(_, date)| *date).min();

    let start = match first_measurement {
        Some(date) => {
            if date.year() > config.late_start_warning_year {
                let breakdown: Vec<String> = sources
                    .iter()
                    .map(|(kind, date)| format!("{kind}={date}"))
                    .collect();
                warn!(
                    well = %well.name,
                    first = %date,
                    sources = %breakdown.join(", "),
                    "First measurement after {}, check for missing history",
                    config.late_start_warning_year
                );
            }
            date
        }
        None => {
            debug!(well = %well.name, fallback = %config.default_start_date, "No measurements, using fallback start date");
            config.default_start_date
        }
    };

    let rows = start
        .iter_days()
        .take_while(|date| *date <= cutoff)
        .map(|date| DailyProductionRecord::spine(well, date))
        .collect();

    WellSpine {
        first_measurement,
        start,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feeds::FeedRow;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn well() -> WellIdentity {
        WellIdentity::new("A-1", "F1", "P1")
    }

    #[test]
    fn test_spine_starts_at_earliest_feed() {
        let feeds = FeedSet::new()
            .with_rows(
                FeedKind::GasWellhead,
                vec![FeedRow::on_day("F1", day(2024, 1, 5), vec![Some(10.0), None])],
            )
            .with_rows(
                FeedKind::Pressures,
                vec![FeedRow::on_day("P1", day(2024, 1, 3), vec![Some(800.0), None, None])],
            );

        let spine = build(&well(), &feeds, &SpineConfig::default(), day(2024, 1, 10));
        assert_eq!(spine.first_measurement, Some(day(2024, 1, 3)));
        assert_eq!(spine.rows.len(), 8);
        assert_eq!(spine.rows[0].date, day(2024, 1, 3));
        assert_eq!(spine.rows[7].date, day(2024, 1, 10));
    }

    #[test]
    fn test_spine_has_no_gaps_or_duplicates() {
        let feeds = FeedSet::new().with_rows(
            FeedKind::Ecf,
            vec![FeedRow::on_day("F1", day(2023, 12, 30), vec![Some(1.0)])],
        );
        let spine = build(&well(), &feeds, &SpineConfig::default(), day(2024, 3, 1));
        for pair in spine.rows.windows(2) {
            assert_eq!(pair[0].date.succ_opt(), Some(pair[1].date));
        }
        assert!(spine.rows.iter().all(|r| r.well == "A-1" && r.flow_id == "F1"));
    }

    #[test]
    fn test_spine_falls_back_without_data() {
        let config = SpineConfig {
            default_start_date: day(2024, 2, 27),
            ..SpineConfig::default()
        };
        let spine = build(&well(), &FeedSet::new(), &config, day(2024, 3, 1));
        assert_eq!(spine.first_measurement, None);
        assert_eq!(spine.start, day(2024, 2, 27));
        // 2024 is a leap year: 27, 28, 29 Feb and 1 Mar
        assert_eq!(spine.rows.len(), 4);
        assert!(spine.rows.iter().all(|r| r.gas_wh.is_none()));
    }

    #[test]
    fn test_all_null_rows_do_not_anchor_spine() {
        let feeds = FeedSet::new().with_rows(
            FeedKind::Wgr,
            vec![
                FeedRow::on_day("P1", day(2024, 1, 1), vec![None]),
                FeedRow::on_day("P1", day(2024, 1, 4), vec![Some(0.1)]),
            ],
        );
        let spine = build(&well(), &feeds, &SpineConfig::default(), day(2024, 1, 5));
        assert_eq!(spine.start, day(2024, 1, 4));
    }

    #[test]
    fn test_first_measurement_after_cutoff_gives_empty_spine() {
        let feeds = FeedSet::new().with_rows(
            FeedKind::Ecf,
            vec![FeedRow::on_day("F1", day(2024, 6, 1), vec![Some(1.0)])],
        );
        let spine = build(&well(), &feeds, &SpineConfig::default(), day(2024, 5, 31));
        assert!(spine.rows.is_empty());
    }

    #[test]
    fn test_other_wells_keys_ignored() {
        let feeds = FeedSet::new().with_rows(
            FeedKind::Ecf,
            vec![FeedRow::on_day("F2", day(2020, 1, 1), vec![Some(1.0)])],
        );
        assert!(first_measurements(&well(), &feeds).is_empty());
    }
}
