//! Gap scanning: which recent ledger days still lack import/export figures.

use chrono::NaiveDate;
use tracing::debug;

use crate::ledger::{DailyLedgerRecord, Ledger, LedgerError};

/// How many recent days are inspected by default.
pub const DEFAULT_LOOKBACK_DAYS: usize = 35;

/// Records strictly before `today` that are incomplete, oldest first.
///
/// The records are returned whole; the engines need `generated` to derive
/// consumption.
pub fn incomplete_days(
    records: Vec<DailyLedgerRecord>,
    today: NaiveDate,
) -> Vec<DailyLedgerRecord> {
    let mut days: Vec<DailyLedgerRecord> = records
        .into_iter()
        .filter(|r| r.date < today && !r.is_complete())
        .collect();
    days.sort_by_key(|r| r.date);
    days.dedup_by_key(|r| r.date);
    days
}

/// Reads the last `lookback` ledger days and returns the incomplete ones, oldest first.
///
/// Today's record is still accumulating and is never reported. A ledger failure is
/// returned to the caller, which should skip the provider round-trip for this run.
pub fn find_missing_days(
    ledger: &dyn Ledger,
    lookback: usize,
    today: NaiveDate,
) -> Result<Vec<DailyLedgerRecord>, LedgerError> {
    let records = ledger.get_daily_records(lookback, None)?;
    let scanned = records.len();
    let missing = incomplete_days(records, today);
    debug!(
        scanned,
        missing = ?missing.iter().map(|r| r.date.to_string()).collect::<Vec<_>>(),
        "missing export/import"
    );
    Ok(missing)
}
