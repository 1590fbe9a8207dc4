//! Store integration: on-disk persistence, reopen, and the reports built
//! from stored rows.

use chrono::NaiveDate;
use prodalloc::allocation::ExternalVolumeTable;
use prodalloc::feeds::{FeedKind, FeedRow, FeedSet};
use prodalloc::registry::InMemoryRegistry;
use prodalloc::types::{ExternalVolumes, ProductionMonth, RatioKind, WellIdentity};
use prodalloc::{
    ratio_exceptions, EngineConfig, OutputWriter, ProductionStore, ReconciliationEngine, RunWindow,
};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
}

fn run(window: RunWindow) -> prodalloc::RunOutput {
    let registry = InMemoryRegistry::new(vec![
        WellIdentity::new("A-1", "F1", "P1"),
        WellIdentity::new("B-2", "F2", "P2"),
    ]);
    let gas = (1..=30)
        .flat_map(|d| {
            [
                FeedRow::on_day("F1", day(d), vec![Some(40.0), Some(24.0)]),
                FeedRow::on_day("F2", day(d), vec![Some(if d % 2 == 0 { 3.0 } else { 20.0 }), None]),
            ]
        })
        .collect();
    let feeds = FeedSet::new().with_rows(FeedKind::GasWellhead, gas);

    let april = ProductionMonth::of(day(1));
    let volumes = ExternalVolumeTable::new()
        // 1200 WH gas reported as 1800 S2: factor 1.5
        .with("A-1", april, ExternalVolumes { s2_gas: 1800.0, sales_gas: 1100.0, sales_condensate: 0.0 })
        .with("B-2", april, ExternalVolumes { s2_gas: 150.0, sales_gas: 300.0, sales_condensate: 0.0 });

    ReconciliationEngine::new(EngineConfig::default())
        .run(&registry, &feeds, &volumes, window)
        .unwrap()
}

#[test]
fn test_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prodalloc.db");
    let window = RunWindow::through(day(30));

    {
        let store = ProductionStore::open(&path).unwrap();
        let report = store.replace_window(&run(window).wells, window).unwrap();
        assert_eq!(report.skipped, 0);
    }

    let store = ProductionStore::open(&path).unwrap();
    let rows = store.production_rows().unwrap();
    assert_eq!(rows["A-1"].len(), 30);
    assert_eq!(rows["A-1"][29].cumulative.gas_wh, 1200.0);
    assert_eq!(rows["A-1"][29].cumulative.s2_gas, 1800.0);
    assert_eq!(store.daily_rows("B-2").unwrap().len(), 30);
}

#[test]
fn test_ratio_exceptions_from_stored_factors() {
    let dir = tempfile::tempdir().unwrap();
    let store = ProductionStore::open(dir.path().join("prodalloc.db")).unwrap();
    let window = RunWindow::through(day(30));
    store.replace_window(&run(window).wells, window).unwrap();

    let factors = store.factors().unwrap();
    assert_eq!(factors.len(), 2);

    let groups = ratio_exceptions(&factors, 1.0);
    let s2 = groups.iter().find(|g| g.kind == RatioKind::WhToS2).unwrap();
    assert_eq!(s2.exceptions.len(), 1);
    assert_eq!(s2.exceptions[0].well, "A-1");
    assert_eq!(s2.exceptions[0].value, 1.5);

    // B-2 wellhead total is 15 x 20 + 15 x 3 = 345, sales gas 300 stays below 1
    let sales = groups.iter().find(|g| g.kind == RatioKind::WhToSalesGas);
    assert!(sales.map_or(true, |g| g.exceptions.iter().all(|e| e.well != "B-2")));
}

#[test]
fn test_resequence_after_threshold_change() {
    let store = ProductionStore::open_temp().unwrap();
    let window = RunWindow::through(day(30));
    store.replace_window(&run(window).wells, window).unwrap();

    assert_eq!(store.resequence(1.0).unwrap().rows_changed, 0);

    // B-2 alternates 20 / 3, so a threshold of 5 freezes every even day
    let report = store.resequence(5.0).unwrap();
    assert_eq!(report.rows_changed, 29);
    let b2 = &store.production_rows().unwrap()["B-2"];
    let uprt: Vec<u32> = b2.iter().map(|r| r.sequence.day_seq_uprt).collect();
    let expected: Vec<u32> = (1..=30).map(|d| (d + 1) / 2).collect();
    assert_eq!(uprt, expected);
    assert_eq!(b2[29].sequence.days_seq, 30, "Days Seq untouched");
}
