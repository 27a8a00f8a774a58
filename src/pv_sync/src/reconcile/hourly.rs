//! Engine for providers with hourly import and daily export series.

use energy_ingestor::{
    models::resolution::EnergyResolution,
    providers::{ConsumptionSource, ProductionSource},
};
use tracing::debug;

use super::{DayPlan, ReconcileEngine, ReconcileError, build_update};
use crate::{
    ledger::DailyLedgerRecord,
    normalize::{daily_totals, hourly_days},
    tariff::bucket,
};

/// Splits hourly import into tariff windows and pairs it with the day's export.
pub struct HourlyEngine<'a> {
    consumption: &'a dyn ConsumptionSource,
    production: &'a dyn ProductionSource,
}

impl<'a> HourlyEngine<'a> {
    pub fn new(consumption: &'a dyn ConsumptionSource, production: &'a dyn ProductionSource) -> Self {
        Self {
            consumption,
            production,
        }
    }
}

impl ReconcileEngine for HourlyEngine<'_> {
    fn plan(&self, missing: &[DailyLedgerRecord]) -> Result<Vec<DayPlan>, ReconcileError> {
        let Some(first_date) = missing.iter().map(|r| r.date).min() else {
            return Ok(Vec::new());
        };

        let hourly = hourly_days(
            self.consumption
                .consumption_series(EnergyResolution::Hourly, true),
            first_date,
        )?;
        let exported = daily_totals(
            self.production
                .production_series(EnergyResolution::Daily, true),
            first_date,
        )?;
        debug!(
            %first_date,
            consumption_days = hourly.days().count(),
            production_days = exported.len(),
            "fetched provider series"
        );

        let plan = missing
            .iter()
            .map(|record| {
                let Some(profile) = hourly.complete_day(record.date) else {
                    return DayPlan::Skip {
                        date: record.date,
                        reason: "hourly consumption incomplete",
                    };
                };
                let Some(&exported) = exported.get(&record.date) else {
                    return DayPlan::Skip {
                        date: record.date,
                        reason: "no production total",
                    };
                };
                DayPlan::Update(build_update(record, exported, bucket(&profile)))
            })
            .collect();
        Ok(plan)
    }
}
