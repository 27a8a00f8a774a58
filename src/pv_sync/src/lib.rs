//! Backfills grid import/export figures into a PVOutput daily ledger.
//!
//! A run scans the ledger for recent days missing export or import data
//! ([`gaps`]), reads the energy provider for those days, normalises its readings
//! into local-day hourly profiles ([`normalize`]), splits import over the tariff
//! windows ([`tariff`]) and writes one update per complete day ([`reconcile`]).

pub mod config;
pub mod gaps;
pub mod ledger;
pub mod logging;
pub mod normalize;
pub mod reconcile;
pub mod tariff;
pub mod tz;
