//! Provider abstraction for metering data sources.
//!
//! This module defines the traits the sync engine consumes:
//! - [`ConsumptionSource`]: lazy series of grid import per interval.
//! - [`ProductionSource`]: lazy series of grid export per interval.
//! - [`MonthlyEnergySource`]: per-day import/export arrays, one request per month,
//!   for portals that only publish monthly tables (Göteborg Energi, E.ON).
//!
//! Series are plain blocking iterators. Implementations fetch pages on demand, so
//! a consumer that stops iterating early never pays for older history.
//!
//! # Example
//!
//! ```rust
//! use energy_ingestor::models::{energy::ConsumptionEntry, resolution::EnergyResolution};
//! use energy_ingestor::providers::{ConsumptionSource, Series};
//!
//! struct NoData;
//!
//! impl ConsumptionSource for NoData {
//!     fn consumption_series(
//!         &self,
//!         _resolution: EnergyResolution,
//!         _reverse: bool,
//!     ) -> Series<'_, ConsumptionEntry> {
//!         Box::new(std::iter::empty())
//!     }
//! }
//! ```

pub mod eon;
pub mod goteborg_energi;
pub mod paging;
pub mod tibber;

use shared_utils::env::MissingEnvVarError;
use snafu::{Backtrace, Snafu};

use crate::models::{
    energy::{ConsumptionEntry, ProductionEntry},
    resolution::EnergyResolution,
};

/// A lazy, possibly unbounded series of provider readings.
///
/// An `Err` item means the provider could not deliver the next page; the
/// series ends after yielding it.
pub type Series<'a, T> = Box<dyn Iterator<Item = Result<T, ProviderError>> + 'a>;

/// Source of grid-import readings.
pub trait ConsumptionSource {
    /// Iterate consumption at `resolution`, most recent first when `reverse` is set.
    fn consumption_series(
        &self,
        resolution: EnergyResolution,
        reverse: bool,
    ) -> Series<'_, ConsumptionEntry>;
}

/// Source of grid-export readings.
pub trait ProductionSource {
    /// Iterate production at `resolution`, most recent first when `reverse` is set.
    fn production_series(
        &self,
        resolution: EnergyResolution,
        reverse: bool,
    ) -> Series<'_, ProductionEntry>;
}

/// Source that publishes whole months at daily resolution.
///
/// The returned vector is indexed by `day - 1`; `None` means the portal has not
/// published that day yet.
pub trait MonthlyEnergySource {
    fn month_import(&self, year: i32, month: u32) -> Result<Vec<Option<u64>>, ProviderError>;
    fn month_export(&self, year: i32, month: u32) -> Result<Vec<Option<u64>>, ProviderError>;
}

/// Errors that can occur during the creation of a provider instance
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderInitError {
    /// missed environment variable.
    #[snafu(display("Missing environment variable: {source}"))]
    MissingEnvVar {
        source: MissingEnvVarError,
        backtrace: Backtrace,
    },

    /// failed to init reqwest client
    #[snafu(display("Failed to build HTTP client: {source}"))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// Token contains characters that cannot go into a header.
    #[snafu(display("Invalid API token format: {source}"))]
    InvalidToken {
        source: reqwest::header::InvalidHeaderValue,
        backtrace: Backtrace,
    },
}

/// Errors that can occur within a provider implementation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderError {
    /// An error during an API request (e.g., network failure, timeout).
    #[snafu(display("API request failed: {source}"))]
    Reqwest {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The provider's API returned a specific error message (e.g., invalid token).
    #[snafu(display("API error: {message}"))]
    Api {
        message: String,
        backtrace: Backtrace,
    },

    /// The request parameters were invalid for this specific provider.
    #[snafu(display("Invalid parameters for provider: {message}"))]
    Validation {
        message: String,
        backtrace: Backtrace,
    },

    /// The provider answered, but not in a shape we understand.
    #[snafu(display("Unexpected provider response: {message}"))]
    Decode {
        message: String,
        backtrace: Backtrace,
    },

    /// An error during provider configuration or initialization.
    #[snafu(display("Provider initialization error: {source}"))]
    Init {
        #[snafu(backtrace)]
        source: ProviderInitError,
    },
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;

    struct FixedSource(Vec<ConsumptionEntry>);

    impl ConsumptionSource for FixedSource {
        fn consumption_series(
            &self,
            _resolution: EnergyResolution,
            reverse: bool,
        ) -> Series<'_, ConsumptionEntry> {
            let mut v = self.0.clone();
            if reverse {
                v.reverse();
            }
            Box::new(v.into_iter().map(Ok))
        }
    }

    fn source(name: &str) -> Box<dyn ConsumptionSource> {
        let from = DateTime::parse_from_rfc3339("2021-03-15T10:00:00+01:00").unwrap();
        let entry = |wh| ConsumptionEntry {
            from,
            energy_wh: wh,
            unit_price: None,
            cost: None,
        };
        if name == "two" {
            Box::new(FixedSource(vec![entry(1), entry(2)]))
        } else {
            Box::new(FixedSource(vec![]))
        }
    }

    #[test]
    fn dynamic_source_iterates_in_requested_order() {
        let src = source("two");
        let got: Vec<u64> = src
            .consumption_series(EnergyResolution::Hourly, true)
            .map(|e| e.unwrap().energy_wh)
            .collect();
        assert_eq!(got, vec![2, 1]);
    }
}
