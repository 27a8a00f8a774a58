//! Engine for portals that publish month-by-day import and export tables.

use std::collections::BTreeMap;

use chrono::Datelike;
use energy_ingestor::providers::MonthlyEnergySource;
use tracing::debug;

use super::{DayPlan, ReconcileEngine, ReconcileError, build_update};
use crate::{ledger::DailyLedgerRecord, tariff::TariffSplit};

type MonthTables = (Vec<Option<u64>>, Vec<Option<u64>>);

/// Books each day's import unsplit; the source has no hourly detail.
pub struct MonthlyEngine<'a> {
    source: &'a dyn MonthlyEnergySource,
}

impl<'a> MonthlyEngine<'a> {
    pub fn new(source: &'a dyn MonthlyEnergySource) -> Self {
        Self { source }
    }

    /// One import and one export table per distinct month in `missing`.
    fn fetch_months(
        &self,
        missing: &[DailyLedgerRecord],
    ) -> Result<BTreeMap<(i32, u32), MonthTables>, ReconcileError> {
        let mut months = BTreeMap::new();
        for record in missing {
            let key = (record.date.year(), record.date.month());
            if months.contains_key(&key) {
                continue;
            }
            let (year, month) = key;
            let import = self.source.month_import(year, month)?;
            let export = self.source.month_export(year, month)?;
            debug!(year, month, "fetched month tables");
            months.insert(key, (import, export));
        }
        Ok(months)
    }
}

fn day_value(table: &[Option<u64>], day: u32) -> Option<u64> {
    table.get(day as usize - 1).copied().flatten()
}

impl ReconcileEngine for MonthlyEngine<'_> {
    fn plan(&self, missing: &[DailyLedgerRecord]) -> Result<Vec<DayPlan>, ReconcileError> {
        let months = self.fetch_months(missing)?;

        let plan = missing
            .iter()
            .map(|record| {
                let date = record.date;
                let figures = months
                    .get(&(date.year(), date.month()))
                    .and_then(|(import, export)| {
                        Some((day_value(import, date.day())?, day_value(export, date.day())?))
                    });
                match figures {
                    Some((import, exported)) => {
                        DayPlan::Update(build_update(record, exported, TariffSplit::unsplit(import)))
                    }
                    None => DayPlan::Skip {
                        date,
                        reason: "day not published yet",
                    },
                }
            })
            .collect();
        Ok(plan)
    }
}
