//! Reconciliation: turn provider readings into ledger updates for missing days.
//!
//! A pass has two phases. The engine first reads everything it needs from its
//! provider and produces a [`DayPlan`] per missing day; only then are updates
//! written. A provider failure therefore aborts the pass before any write, while
//! a failed write only costs that one day.
//!
//! Engines:
//! - [`hourly::HourlyEngine`]: hourly import plus daily export (Tibber); import
//!   is split into tariff windows.
//! - [`monthly::MonthlyEngine`]: month-by-day tables (Göteborg Energi); import is
//!   booked unsplit.

pub mod hourly;
pub mod monthly;

use chrono::NaiveDate;
use energy_ingestor::providers::ProviderError;
use tracing::{debug, info, warn};

use crate::{
    ledger::{DailyLedgerRecord, Ledger, LedgerUpdate},
    tariff::TariffSplit,
};

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// The provider could not deliver the data; nothing was written.
    #[error("energy source unavailable: {0}")]
    SourceUnavailable(#[from] ProviderError),
}

/// What a pass decided for one missing day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayPlan {
    /// Source data is complete; write this.
    Update(LedgerUpdate),
    /// Source data is incomplete; leave the record alone.
    Skip { date: NaiveDate, reason: &'static str },
}

/// Outcome of one pass, days listed in the order they were handled.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub updated: Vec<NaiveDate>,
    pub skipped: Vec<NaiveDate>,
    pub failed: Vec<NaiveDate>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A provider-specific way of filling missing days.
pub trait ReconcileEngine {
    /// Reads the provider and decides every day in `missing` (oldest first, never
    /// empty). Must not write anything.
    fn plan(&self, missing: &[DailyLedgerRecord]) -> Result<Vec<DayPlan>, ReconcileError>;
}

/// Total consumption for a day: everything imported plus whatever was generated
/// and not exported.
///
/// Unknown generation counts as zero; a result below zero (meter skew) is clamped.
pub fn derive_consumption(import_total: u64, generated: Option<u64>, exported: u64) -> u64 {
    import_total
        .saturating_add(generated.unwrap_or(0))
        .saturating_sub(exported)
}

/// The update for `record`'s day given the provider's figures.
///
/// `consumption` is always included, not only on zero-generation days: PVOutput
/// infers nothing useful from a zero `generated`, and an explicit value is the
/// same figure it would infer otherwise.
pub fn build_update(record: &DailyLedgerRecord, exported: u64, import: TariffSplit) -> LedgerUpdate {
    LedgerUpdate {
        date: record.date,
        exported,
        import,
        consumption: Some(derive_consumption(
            import.total(),
            record.generated,
            exported,
        )),
    }
}

/// Writes each planned update, isolating failures per day.
pub fn apply(ledger: &dyn Ledger, plan: Vec<DayPlan>) -> ReconcileReport {
    let mut report = ReconcileReport::default();
    for day in plan {
        match day {
            DayPlan::Skip { date, reason } => {
                debug!(%date, reason, "skipping day");
                report.skipped.push(date);
            }
            DayPlan::Update(update) => match ledger.update_daily_record(&update) {
                Ok(()) => {
                    debug!(date = %update.date, ?update, "updated day");
                    report.updated.push(update.date);
                }
                Err(e) => {
                    warn!(date = %update.date, error = %e, "failed to update day");
                    report.failed.push(update.date);
                }
            },
        }
    }
    report
}

/// Runs one reconciliation pass over `missing` (oldest first).
///
/// With nothing missing the engine is never consulted, so the provider sees no
/// traffic.
pub fn reconcile(
    engine: &dyn ReconcileEngine,
    ledger: &dyn Ledger,
    missing: &[DailyLedgerRecord],
) -> Result<ReconcileReport, ReconcileError> {
    if missing.is_empty() {
        debug!("nothing missing");
        return Ok(ReconcileReport::default());
    }

    let plan = engine.plan(missing)?;
    let report = apply(ledger, plan);
    info!(
        updated = report.updated.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        "reconcile pass finished"
    );
    Ok(report)
}
