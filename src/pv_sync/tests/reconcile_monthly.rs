mod common;

use common::{FakeLedger, MonthTables, day};
use pv_sync::{
    ledger::DailyLedgerRecord,
    reconcile::{ReconcileError, monthly::MonthlyEngine, reconcile},
    tariff::TariffSplit,
};

fn month(published: usize, value: u64) -> Vec<Option<u64>> {
    (0..31)
        .map(|i| (i < published).then_some(value))
        .collect()
}

fn missing(dates: &[chrono::NaiveDate]) -> Vec<DailyLedgerRecord> {
    dates
        .iter()
        .map(|&d| {
            let mut r = DailyLedgerRecord::new(d);
            r.generated = Some(4000);
            r
        })
        .collect()
}

#[test]
fn books_import_unsplit_and_fetches_each_month_once() {
    let mut tables = MonthTables::default();
    tables.import.insert((2021, 2), month(28, 9000));
    tables.export.insert((2021, 2), month(28, 1500));
    tables.import.insert((2021, 3), month(31, 8000));
    tables.export.insert((2021, 3), month(31, 500));

    let days = missing(&[day(2021, 2, 27), day(2021, 2, 28), day(2021, 3, 1)]);
    let ledger = FakeLedger::with_records(days.clone());

    let report = reconcile(&MonthlyEngine::new(&tables), &ledger, &days).unwrap();
    assert_eq!(report.updated.len(), 3);
    assert_eq!(*tables.calls.borrow(), vec![(2021, 2), (2021, 3)]);

    let feb = &ledger.writes.borrow()[0];
    assert_eq!(feb.import, TariffSplit::unsplit(9000));
    assert_eq!(feb.exported, 1500);
    assert_eq!(feb.consumption, Some(9000 + 4000 - 1500));

    let march = ledger.record(day(2021, 3, 1));
    assert_eq!(march.import_peak, Some(8000));
    assert_eq!(march.import_off_peak, Some(0));
    assert!(march.is_complete());
}

#[test]
fn unpublished_days_are_skipped() {
    let mut tables = MonthTables::default();
    tables.import.insert((2021, 3), month(14, 8000));
    tables.export.insert((2021, 3), month(15, 500));

    let days = missing(&[day(2021, 3, 14), day(2021, 3, 15)]);
    let ledger = FakeLedger::with_records(days.clone());

    let report = reconcile(&MonthlyEngine::new(&tables), &ledger, &days).unwrap();
    assert_eq!(report.updated, vec![day(2021, 3, 14)]);
    assert_eq!(report.skipped, vec![day(2021, 3, 15)]);
    assert_eq!(ledger.record(day(2021, 3, 15)), days[1]);
}

#[test]
fn portal_failure_in_a_later_month_writes_nothing() {
    let mut tables = MonthTables::default();
    tables.import.insert((2021, 2), month(28, 9000));
    tables.export.insert((2021, 2), month(28, 1500));

    let days = missing(&[day(2021, 2, 28), day(2021, 3, 1)]);
    let ledger = FakeLedger::with_records(days.clone());

    let err = reconcile(&MonthlyEngine::new(&tables), &ledger, &days).unwrap_err();
    assert!(matches!(err, ReconcileError::SourceUnavailable(_)));
    assert!(ledger.writes.borrow().is_empty());
}

#[test]
fn nothing_missing_means_no_portal_calls() {
    let tables = MonthTables::default();
    let ledger = FakeLedger::default();
    let report = reconcile(&MonthlyEngine::new(&tables), &ledger, &[]).unwrap();
    assert!(report.updated.is_empty());
    assert!(tables.calls.borrow().is_empty());
}
