//! Day-series normalisation.
//!
//! Providers hand out readings newest-first with a local UTC offset on every
//! timestamp. [`hourly_days`] folds that stream into one 24-slot profile per
//! local calendar day:
//! - sub-hourly readings are summed into their hour;
//! - a spring-forward gap (a local hour that never happened) is filled with zero
//!   so the day still has 24 slots;
//! - a fall-back repeat (a local hour that happened twice) is added into the one
//!   slot for that hour;
//! - any other hole stays empty and the day is reported incomplete.
//!
//! Consumption stops as soon as a reading older than the cutoff day shows up, so
//! the provider is never paged further back than needed.

use std::{cmp::Ordering, collections::BTreeMap, ops::Range};

use chrono::NaiveDate;
use energy_ingestor::{
    models::energy::{ConsumptionEntry, ProductionEntry},
    providers::ProviderError,
};
use tracing::debug;

use crate::{
    tariff::HOURS_PER_DAY,
    tz::{local_day_hour, offset_secs},
};

const SECS_PER_HOUR: i32 = 3600;

/// One local day, slot per hour-of-day; `None` means no reading yet.
pub type DayProfile = [Option<u64>; HOURS_PER_DAY];

/// Clock change between two consecutive readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Same UTC offset.
    Steady,
    /// Clocks moved forward between the readings; `skipped_hours` local hours
    /// do not exist.
    SpringForward { skipped_hours: u32 },
    /// Clocks moved back between the readings; a local hour repeats.
    FallBack,
}

/// Classify the clock change from the earlier reading's offset to the later one's.
pub fn classify_transition(earlier_offset_secs: i32, later_offset_secs: i32) -> Transition {
    match later_offset_secs.cmp(&earlier_offset_secs) {
        Ordering::Equal => Transition::Steady,
        Ordering::Greater => {
            let delta = later_offset_secs - earlier_offset_secs;
            // half-hour zones still skip the whole hour slot
            let skipped_hours = (delta + SECS_PER_HOUR - 1) / SECS_PER_HOUR;
            Transition::SpringForward {
                skipped_hours: skipped_hours as u32,
            }
        }
        Ordering::Less => Transition::FallBack,
    }
}

/// Hourly profiles keyed by local day.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct HourlyConsumptionSeries {
    days: BTreeMap<NaiveDate, DayProfile>,
}

impl HourlyConsumptionSeries {
    /// Raw profile for `day`, complete or not.
    pub fn profile(&self, day: NaiveDate) -> Option<&DayProfile> {
        self.days.get(&day)
    }

    /// The day's 24 readings, or `None` when the provider has not published
    /// every hour yet.
    pub fn complete_day(&self, day: NaiveDate) -> Option<[u64; HOURS_PER_DAY]> {
        let profile = self.days.get(&day)?;
        let mut out = [0; HOURS_PER_DAY];
        for (slot, v) in out.iter_mut().zip(profile) {
            *slot = (*v)?;
        }
        Some(out)
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.days.keys().copied()
    }

    fn profile_mut(&mut self, day: NaiveDate) -> &mut DayProfile {
        self.days.entry(day).or_insert([None; HOURS_PER_DAY])
    }

    /// Sets the still-empty slots in `hours` of `day` to zero.
    fn zero_fill(&mut self, day: NaiveDate, hours: Range<usize>) {
        if hours.is_empty() {
            return;
        }
        for slot in &mut self.profile_mut(day)[hours] {
            slot.get_or_insert(0);
        }
    }
}

/// Position of the previously folded (later in time) reading.
struct Previous {
    day: NaiveDate,
    hour: u32,
    offset: i32,
}

/// Fold a newest-first consumption stream into per-day hourly profiles.
///
/// Reads until the first entry whose local day is before `cutoff`. A stream error
/// aborts the fold.
pub fn hourly_days<I>(events: I, cutoff: NaiveDate) -> Result<HourlyConsumptionSeries, ProviderError>
where
    I: IntoIterator<Item = Result<ConsumptionEntry, ProviderError>>,
{
    let mut series = HourlyConsumptionSeries::default();
    let mut previous: Option<Previous> = None;

    for event in events {
        let event = event?;
        let (day, hour) = local_day_hour(&event.from);
        if day < cutoff {
            break;
        }
        let offset = offset_secs(&event.from);

        if let Some(prev) = &previous {
            match classify_transition(offset, prev.offset) {
                Transition::Steady => {}
                Transition::SpringForward { skipped_hours } => {
                    // Only the hours the clock actually jumped over, never past
                    // the later reading.
                    let skipped = skipped_hours as usize;
                    let start = hour as usize + 1;
                    if prev.day == day {
                        series.zero_fill(day, start..(start + skipped).min(prev.hour as usize));
                    } else {
                        // The jump crosses midnight: the tail of this day, then the
                        // head of the later one.
                        let tail = start.min(HOURS_PER_DAY)..(start + skipped).min(HOURS_PER_DAY);
                        let head = (skipped - tail.len()).min(prev.hour as usize);
                        series.zero_fill(day, tail);
                        series.zero_fill(prev.day, 0..head);
                    }
                    debug!(%day, hour, skipped_hours, "spring-forward, zero-filled skipped hours");
                }
                Transition::FallBack => {
                    debug!(%day, hour, "fall-back, merging repeated hour");
                }
            }
        }

        let slot = &mut series.profile_mut(day)[hour as usize];
        *slot = Some(slot.unwrap_or(0) + event.energy_wh);
        previous = Some(Previous { day, hour, offset });
    }

    Ok(series)
}

/// Fold a newest-first daily production stream into per-day totals.
///
/// Stops right after the first entry on or before `cutoff`.
pub fn daily_totals<I>(entries: I, cutoff: NaiveDate) -> Result<BTreeMap<NaiveDate, u64>, ProviderError>
where
    I: IntoIterator<Item = Result<ProductionEntry, ProviderError>>,
{
    let mut totals = BTreeMap::new();
    for entry in entries {
        let entry = entry?;
        let day = entry.day();
        *totals.entry(day).or_insert(0) += entry.energy_wh;
        if day <= cutoff {
            break;
        }
    }
    Ok(totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn reading(ts: &str, wh: u64) -> Result<ConsumptionEntry, ProviderError> {
        Ok(ConsumptionEntry {
            from: DateTime::parse_from_rfc3339(ts).unwrap(),
            energy_wh: wh,
            unit_price: None,
            cost: None,
        })
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn classify_offsets() {
        assert_eq!(classify_transition(3600, 3600), Transition::Steady);
        assert_eq!(
            classify_transition(3600, 7200),
            Transition::SpringForward { skipped_hours: 1 }
        );
        assert_eq!(
            classify_transition(37800, 39600),
            Transition::SpringForward { skipped_hours: 1 }
        );
        assert_eq!(classify_transition(7200, 3600), Transition::FallBack);
    }

    #[test]
    fn spring_forward_at_midnight_fills_head_of_later_day() {
        // Santiago skips 00:00 on 2022-09-11.
        let mut events = Vec::new();
        for h in (1..24).rev() {
            events.push(reading(&format!("2022-09-11T{h:02}:00:00-03:00"), 10));
        }
        events.push(reading("2022-09-10T23:00:00-04:00", 10));

        let series = hourly_days(events, d(2022, 9, 10)).unwrap();
        let profile = series.profile(d(2022, 9, 11)).unwrap();
        assert_eq!(profile[0], Some(0));
        assert_eq!(series.complete_day(d(2022, 9, 11)).unwrap().iter().sum::<u64>(), 230);
        assert_eq!(series.profile(d(2022, 9, 10)).unwrap()[23], Some(10));
    }

    #[test]
    fn quarter_hours_sum_into_their_hour() {
        let events = vec![
            reading("2021-03-15T10:45:00+01:00", 4),
            reading("2021-03-15T10:30:00+01:00", 3),
            reading("2021-03-15T10:15:00+01:00", 2),
            reading("2021-03-15T10:00:00+01:00", 1),
        ];
        let series = hourly_days(events, d(2021, 3, 15)).unwrap();
        let profile = series.profile(d(2021, 3, 15)).unwrap();
        assert_eq!(profile[10], Some(10));
        assert_eq!(profile[9], None);
        assert!(series.complete_day(d(2021, 3, 15)).is_none());
    }

    #[test]
    fn plain_gap_is_not_guessed() {
        let mut events = Vec::new();
        for h in (0..24).rev().filter(|h| *h != 13) {
            events.push(reading(&format!("2021-03-15T{h:02}:00:00+01:00"), 1));
        }
        let series = hourly_days(events, d(2021, 3, 15)).unwrap();
        assert!(series.complete_day(d(2021, 3, 15)).is_none());
        assert_eq!(series.profile(d(2021, 3, 15)).unwrap()[13], None);
    }

    #[test]
    fn stops_at_first_reading_before_cutoff() {
        let mut pulled = 0;
        let events = [
            reading("2021-03-15T00:00:00+01:00", 1),
            reading("2021-03-14T23:00:00+01:00", 1),
            reading("2021-03-14T22:00:00+01:00", 1),
        ]
        .into_iter()
        .inspect(|_| pulled += 1);

        let series = hourly_days(events, d(2021, 3, 15)).unwrap();
        assert_eq!(pulled, 2);
        assert_eq!(series.days().collect::<Vec<_>>(), vec![d(2021, 3, 15)]);
    }

    #[test]
    fn daily_totals_include_cutoff_day_then_stop() {
        let prod = |ts: &str, wh: u64| -> Result<ProductionEntry, ProviderError> {
            Ok(ProductionEntry {
                from: DateTime::parse_from_rfc3339(ts).unwrap(),
                energy_wh: wh,
                unit_price: None,
                profit: None,
            })
        };
        let mut pulled = 0;
        let entries = [
            prod("2021-03-16T00:00:00+01:00", 300),
            prod("2021-03-15T00:00:00+01:00", 200),
            prod("2021-03-14T00:00:00+01:00", 100),
        ]
        .into_iter()
        .inspect(|_| pulled += 1);

        let totals = daily_totals(entries, d(2021, 3, 15)).unwrap();
        assert_eq!(pulled, 2);
        assert_eq!(totals.get(&d(2021, 3, 15)), Some(&200));
        assert_eq!(totals.get(&d(2021, 3, 14)), None);
    }
}
