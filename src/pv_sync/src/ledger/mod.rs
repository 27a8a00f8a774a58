//! The remote daily ledger (PVOutput) as seen by the reconciliation engine.
//!
//! The engine only needs two capabilities: read the most recent daily records
//! and overwrite selected fields of one day. [`Ledger`] is that surface; the HTTP
//! implementation lives in [`pvoutput`].

pub mod pvoutput;
pub mod wire;

use chrono::NaiveDate;

use crate::tariff::TariffSplit;

/// Errors talking to the ledger.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Transport failure (connect, timeout, body read).
    #[error("ledger request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The ledger answered with a non-success status.
    #[error("ledger rejected request ({status}): {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body, usually a one-line reason.
        body: String,
    },

    /// The response could not be parsed.
    #[error("malformed ledger response: {0}")]
    Malformed(String),

    /// Client construction failed (bad credentials format).
    #[error("ledger client setup failed: {0}")]
    Setup(String),
}

/// One day as stored by the ledger. Energy in Wh; `None` means not reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyLedgerRecord {
    pub date: NaiveDate,
    pub generated: Option<u64>,
    pub exported: Option<u64>,
    pub consumption: Option<u64>,
    pub import_peak: Option<u64>,
    pub import_off_peak: Option<u64>,
    pub import_shoulder: Option<u64>,
    pub import_high_shoulder: Option<u64>,
}

impl DailyLedgerRecord {
    /// An empty record for `date`.
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            generated: None,
            exported: None,
            consumption: None,
            import_peak: None,
            import_off_peak: None,
            import_shoulder: None,
            import_high_shoulder: None,
        }
    }

    /// Sum of the four import buckets, treating missing buckets as zero.
    pub fn import_total(&self) -> u64 {
        [
            self.import_peak,
            self.import_off_peak,
            self.import_shoulder,
            self.import_high_shoulder,
        ]
        .into_iter()
        .flatten()
        .sum()
    }

    /// Export reported and a non-zero import split.
    ///
    /// A day with genuinely zero import looks incomplete and will be refilled on
    /// every run; the overwrite is recomputed from the source, so it is harmless.
    pub fn is_complete(&self) -> bool {
        self.exported.is_some() && self.import_total() > 0
    }
}

/// Fields written back for one day. Built fresh per update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerUpdate {
    pub date: NaiveDate,
    pub exported: u64,
    pub import: TariffSplit,
    pub consumption: Option<u64>,
}

impl LedgerUpdate {
    /// The record the ledger holds after applying this update to `record`.
    ///
    /// Only supplied fields change; `generated` is never touched.
    pub fn applied_to(&self, record: &DailyLedgerRecord) -> DailyLedgerRecord {
        DailyLedgerRecord {
            date: self.date,
            generated: record.generated,
            exported: Some(self.exported),
            consumption: self.consumption.or(record.consumption),
            import_peak: Some(self.import.peak),
            import_off_peak: Some(self.import.off_peak),
            import_shoulder: Some(self.import.shoulder),
            import_high_shoulder: Some(self.import.high_shoulder),
        }
    }
}

/// Read/write access to the daily ledger.
pub trait Ledger {
    /// Up to `limit` daily records ending at `date_to` (or the latest day), most
    /// recent first.
    fn get_daily_records(
        &self,
        limit: usize,
        date_to: Option<NaiveDate>,
    ) -> Result<Vec<DailyLedgerRecord>, LedgerError>;

    /// Overwrite the fields carried by `update` for its day.
    fn update_daily_record(&self, update: &LedgerUpdate) -> Result<(), LedgerError>;
}
