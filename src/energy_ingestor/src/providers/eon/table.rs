//! The month report table served by E.ON's SAP backend.
//!
//! One `<tr>` per day: the first cell is the two-digit day number (sometimes
//! suffixed with `X`), followed by 24 hourly cells holding whole kWh or `-`
//! when the hour is not metered yet. Only the first table with day rows counts.

use std::sync::LazyLock;

use regex::Regex;
use snafu::ensure;

use crate::providers::{DecodeSnafu, ProviderError};

/// Hourly Wh for one day; `None` for hours not metered yet.
pub type HourlyDay = [Option<u64>; 24];

static ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<tr[^>]*>(.*?)</tr>").expect("valid row regex"));
static CELL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<td[^>]*>(.*?)</td>").expect("valid cell regex"));
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));
static DAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]{2})X?$").expect("valid day regex"));

fn cell_text(raw: &str) -> String {
    TAG.replace_all(raw, "").trim().to_string()
}

/// Hour cell: `-` is unmetered, digits are kWh. Anything else is not an hour cell.
fn hour_value(text: &str) -> Option<Option<u64>> {
    if text == "-" {
        return Some(None);
    }
    text.parse::<u64>().ok().map(|kwh| Some(kwh * 1000))
}

fn day_rows(table: &str) -> Result<Vec<HourlyDay>, ProviderError> {
    let mut days = Vec::new();
    for row in ROW.captures_iter(table) {
        let mut cells = CELL.captures_iter(&row[1]).map(|c| cell_text(&c[1]));
        let Some(first) = cells.next() else { continue };
        let Some(day) = DAY.captures(&first).and_then(|c| c[1].parse::<usize>().ok()) else {
            continue;
        };
        ensure!(
            day == days.len() + 1,
            DecodeSnafu {
                message: format!("day {day} out of sequence after {}", days.len()),
            }
        );

        let values: Vec<Option<u64>> = cells.filter_map(|t| hour_value(&t)).take(24).collect();
        let hours: HourlyDay = values.try_into().map_err(|v: Vec<_>| {
            DecodeSnafu {
                message: format!("day {day} has {} hourly values", v.len()),
            }
            .build()
        })?;
        days.push(hours);
    }
    Ok(days)
}

/// Parse a month report into per-day hourly values, index = day - 1.
pub fn parse_month(body: &str) -> Result<Vec<HourlyDay>, ProviderError> {
    for table in body.split_inclusive("</table>") {
        let days = day_rows(table)?;
        if days.is_empty() {
            continue;
        }
        ensure!(
            days.len() >= 28,
            DecodeSnafu {
                message: format!("month report has only {} days", days.len()),
            }
        );
        return Ok(days);
    }
    DecodeSnafu {
        message: "no month table in report",
    }
    .fail()
}

/// Day total, only when every hour is metered.
pub fn day_total(hours: &HourlyDay) -> Option<u64> {
    hours.iter().copied().sum()
}
