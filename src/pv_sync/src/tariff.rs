//! Time-of-use tariff split of one day's hourly grid import.
//!
//! Windows are half-open local hour ranges. Off-peak is never summed directly:
//! it is whatever the other three windows leave of the day total, so the split
//! always adds back up to the metered total.

use std::ops::Range;

/// Hours per canonical day profile.
pub const HOURS_PER_DAY: usize = 24;

/// Peak: 08:00–17:00.
pub const PEAK: &[Range<usize>] = &[8..17];
/// Shoulder: 06:00–08:00 and 20:00–23:00.
pub const SHOULDER: &[Range<usize>] = &[6..8, 20..23];
/// High shoulder: 17:00–20:00.
pub const HIGH_SHOULDER: &[Range<usize>] = &[17..20];

/// Import energy per tariff window, Wh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TariffSplit {
    pub peak: u64,
    pub off_peak: u64,
    pub shoulder: u64,
    pub high_shoulder: u64,
}

impl TariffSplit {
    /// Book a day total without hourly detail; everything lands in `peak`.
    pub const fn unsplit(total: u64) -> Self {
        Self {
            peak: total,
            off_peak: 0,
            shoulder: 0,
            high_shoulder: 0,
        }
    }

    pub const fn total(&self) -> u64 {
        self.peak + self.off_peak + self.shoulder + self.high_shoulder
    }
}

fn window_sum(hourly: &[u64; HOURS_PER_DAY], window: &[Range<usize>]) -> u64 {
    window
        .iter()
        .flat_map(|r| hourly[r.clone()].iter())
        .sum()
}

/// Split a complete 24-hour import profile into the four tariff windows.
pub fn bucket(hourly: &[u64; HOURS_PER_DAY]) -> TariffSplit {
    let total: u64 = hourly.iter().sum();
    let peak = window_sum(hourly, PEAK);
    let shoulder = window_sum(hourly, SHOULDER);
    let high_shoulder = window_sum(hourly, HIGH_SHOULDER);
    TariffSplit {
        peak,
        off_peak: total - (peak + shoulder + high_shoulder),
        shoulder,
        high_shoulder,
    }
}
