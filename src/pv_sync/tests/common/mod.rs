#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
};

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Timelike};
use chrono_tz::Tz;
use energy_ingestor::{
    models::{
        energy::{ConsumptionEntry, ProductionEntry},
        resolution::EnergyResolution,
    },
    providers::{
        ApiSnafu, ConsumptionSource, MonthlyEnergySource, ProductionSource, ProviderError, Series,
    },
};
use pv_sync::ledger::{DailyLedgerRecord, Ledger, LedgerError, LedgerUpdate};

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn provider_down() -> ProviderError {
    ApiSnafu {
        message: "service unavailable",
    }
    .build()
}

/// In-memory ledger keyed by day.
#[derive(Default)]
pub struct FakeLedger {
    pub records: RefCell<BTreeMap<NaiveDate, DailyLedgerRecord>>,
    pub writes: RefCell<Vec<LedgerUpdate>>,
    pub reject: Option<NaiveDate>,
    pub reads: Cell<usize>,
}

impl FakeLedger {
    pub fn with_records(records: impl IntoIterator<Item = DailyLedgerRecord>) -> Self {
        let ledger = Self::default();
        ledger
            .records
            .borrow_mut()
            .extend(records.into_iter().map(|r| (r.date, r)));
        ledger
    }

    pub fn rejecting(mut self, date: NaiveDate) -> Self {
        self.reject = Some(date);
        self
    }

    pub fn record(&self, date: NaiveDate) -> DailyLedgerRecord {
        self.records.borrow()[&date].clone()
    }
}

impl Ledger for FakeLedger {
    fn get_daily_records(
        &self,
        limit: usize,
        date_to: Option<NaiveDate>,
    ) -> Result<Vec<DailyLedgerRecord>, LedgerError> {
        self.reads.set(self.reads.get() + 1);
        Ok(self
            .records
            .borrow()
            .values()
            .rev()
            .filter(|r| date_to.is_none_or(|to| r.date <= to))
            .take(limit)
            .cloned()
            .collect())
    }

    fn update_daily_record(&self, update: &LedgerUpdate) -> Result<(), LedgerError> {
        if self.reject == Some(update.date) {
            return Err(LedgerError::Rejected {
                status: 400,
                body: "Bad request 400: Date is too old".into(),
            });
        }
        self.writes.borrow_mut().push(update.clone());
        let mut records = self.records.borrow_mut();
        let before = records
            .get(&update.date)
            .cloned()
            .unwrap_or_else(|| DailyLedgerRecord::new(update.date));
        records.insert(update.date, update.applied_to(&before));
        Ok(())
    }
}

/// Provider backed by chronological vectors; counts the entries handed out.
#[derive(Default)]
pub struct VecSource {
    pub consumption: Vec<ConsumptionEntry>,
    pub production: Vec<ProductionEntry>,
    /// Yield an error after this many consumption entries.
    pub fail_after: Option<usize>,
    pub pulled: Cell<usize>,
    pub calls: Cell<usize>,
}

impl VecSource {
    fn ordered<T: Clone>(v: &[T], reverse: bool) -> Vec<T> {
        let mut v = v.to_vec();
        if reverse {
            v.reverse();
        }
        v
    }
}

impl ConsumptionSource for VecSource {
    fn consumption_series(
        &self,
        _resolution: EnergyResolution,
        reverse: bool,
    ) -> Series<'_, ConsumptionEntry> {
        self.calls.set(self.calls.get() + 1);
        let entries = Self::ordered(&self.consumption, reverse);
        let limit = self.fail_after.unwrap_or(entries.len());
        let fail = self.fail_after.map(|_| Err(provider_down()));
        Box::new(
            entries
                .into_iter()
                .take(limit)
                .map(Ok)
                .chain(fail)
                .inspect(|_| self.pulled.set(self.pulled.get() + 1)),
        )
    }
}

impl ProductionSource for VecSource {
    fn production_series(
        &self,
        _resolution: EnergyResolution,
        reverse: bool,
    ) -> Series<'_, ProductionEntry> {
        self.calls.set(self.calls.get() + 1);
        Box::new(Self::ordered(&self.production, reverse).into_iter().map(Ok))
    }
}

/// Month tables keyed by (year, month); missing months fail like a portal error.
#[derive(Default)]
pub struct MonthTables {
    pub import: BTreeMap<(i32, u32), Vec<Option<u64>>>,
    pub export: BTreeMap<(i32, u32), Vec<Option<u64>>>,
    pub calls: RefCell<Vec<(i32, u32)>>,
}

impl MonthlyEnergySource for MonthTables {
    fn month_import(&self, year: i32, month: u32) -> Result<Vec<Option<u64>>, ProviderError> {
        self.calls.borrow_mut().push((year, month));
        self.import.get(&(year, month)).cloned().ok_or_else(provider_down)
    }

    fn month_export(&self, year: i32, month: u32) -> Result<Vec<Option<u64>>, ProviderError> {
        self.export.get(&(year, month)).cloned().ok_or_else(provider_down)
    }
}

/// First instant of local `date` in `tz`; midnight itself may not exist.
pub fn local_start(tz: Tz, date: NaiveDate) -> DateTime<Tz> {
    (0..24)
        .find_map(|h| tz.from_local_datetime(&date.and_hms_opt(h, 0, 0)?).earliest())
        .unwrap()
}

/// Hourly readings covering every real hour of local `date` in `tz`, in
/// chronological order. `wh` gets the local hour-of-day.
pub fn hourly_readings(tz: Tz, date: NaiveDate, wh: impl Fn(u32) -> u64) -> Vec<ConsumptionEntry> {
    let end = local_start(tz, date.succ_opt().unwrap());

    let mut out = Vec::new();
    let mut t = local_start(tz, date);
    while t < end {
        out.push(ConsumptionEntry {
            from: t.fixed_offset(),
            energy_wh: wh(t.hour()),
            unit_price: None,
            cost: None,
        });
        t = t + Duration::hours(1);
    }
    out
}

/// One daily production entry at local midnight of `date`.
pub fn daily_export(tz: Tz, date: NaiveDate, wh: u64) -> ProductionEntry {
    ProductionEntry {
        from: local_start(tz, date).fixed_offset(),
        energy_wh: wh,
        unit_price: None,
        profit: None,
    }
}
