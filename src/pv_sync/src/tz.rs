//! Time zone helpers.
//!
//! What this module provides:
//! - [`parse_tz`]: Parse an IANA time zone name (e.g., "Europe/Stockholm").
//! - [`today_in`] / [`today_at`]: The local calendar day used to exclude the ledger's
//!   still-accumulating record.
//! - [`local_day_hour`]: Local calendar day and hour-of-day of a provider timestamp.
//! - [`offset_secs`]: UTC offset of a provider timestamp, used for DST detection.
//!
//! Notes:
//! - Provider timestamps carry their own UTC offset, so day/hour math never needs the
//!   configured zone; the zone only decides what "today" is.
//! - During "fall back" a local hour occurs twice (same day/hour, different offset).
//! - During "spring forward" a local hour is skipped; consecutive readings jump by
//!   two local hours while only one real hour passed.
//!
//! Examples
//! - "2021-03-28T03:00:00+02:00" (Stockholm, right after spring forward) -> day 2021-03-28, hour 3
//! - 2021-10-31 02:xx occurs twice in Stockholm: once at +02:00, once at +01:00.

use anyhow::Context;
use chrono::{DateTime, FixedOffset, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;

/// Zone used when the config does not name one.
pub const DEFAULT_TZ: Tz = chrono_tz::Europe::Stockholm;

/// Parse an IANA time zone name.
pub fn parse_tz(name: &str) -> anyhow::Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .with_context(|| format!("bad tz: {name}"))
}

/// The local calendar day in `tz` at instant `now`.
pub fn today_at(tz: Tz, now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// The current local calendar day in `tz`.
pub fn today_in(tz: Tz) -> NaiveDate {
    today_at(tz, Utc::now())
}

/// Local calendar day and hour-of-day (0..=23) of an offset-carrying timestamp.
pub fn local_day_hour(ts: &DateTime<FixedOffset>) -> (NaiveDate, u32) {
    (ts.date_naive(), ts.hour())
}

/// UTC offset of the timestamp in seconds east of UTC.
pub fn offset_secs(ts: &DateTime<FixedOffset>) -> i32 {
    ts.offset().local_minus_utc()
}
