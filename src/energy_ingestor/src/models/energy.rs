//! Canonical in-memory representation of metered energy.
//!
//! These structs are the output of every provider implementation, regardless
//! of how the upstream API shapes its payload. Amounts are integer watt-hours.

use chrono::{DateTime, FixedOffset, NaiveDate};

/// Grid import metered over one interval starting at `from`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumptionEntry {
    /// Interval start, carrying the provider's local UTC offset.
    pub from: DateTime<FixedOffset>,

    /// Energy imported during the interval, in Wh.
    pub energy_wh: u64,

    /// Price per kWh for the interval. Not all providers supply this.
    pub unit_price: Option<f64>,

    /// Cost of the interval. Not all providers supply this.
    pub cost: Option<f64>,
}

/// Grid export metered over one interval starting at `from`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductionEntry {
    /// Interval start, carrying the provider's local UTC offset.
    pub from: DateTime<FixedOffset>,

    /// Energy exported during the interval, in Wh.
    pub energy_wh: u64,

    /// Price per kWh for the interval. Not all providers supply this.
    pub unit_price: Option<f64>,

    /// Revenue for the interval. Not all providers supply this.
    pub profit: Option<f64>,
}

impl ConsumptionEntry {
    /// Local calendar day of the interval start.
    pub fn day(&self) -> NaiveDate {
        self.from.date_naive()
    }
}

impl ProductionEntry {
    /// Local calendar day of the interval start.
    pub fn day(&self) -> NaiveDate {
        self.from.date_naive()
    }
}

/// Converts a provider kWh reading to whole Wh.
///
/// Negative readings (meter corrections) are clamped to zero.
pub fn kwh_to_wh(kwh: f64) -> u64 {
    if kwh.is_finite() && kwh > 0.0 {
        (kwh * 1000.0).round() as u64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kwh_conversion_rounds_float_noise() {
        assert_eq!(kwh_to_wh(1.234), 1234);
        assert_eq!(kwh_to_wh(0.1 + 0.2), 300);
        assert_eq!(kwh_to_wh(-0.5), 0);
        assert_eq!(kwh_to_wh(f64::NAN), 0);
    }

    #[test]
    fn day_uses_local_offset_not_utc() {
        let from = DateTime::parse_from_rfc3339("2021-03-15T00:00:00+01:00").unwrap();
        let e = ConsumptionEntry {
            from,
            energy_wh: 1,
            unit_price: None,
            cost: None,
        };
        assert_eq!(e.day(), NaiveDate::from_ymd_opt(2021, 3, 15).unwrap());
    }
}
