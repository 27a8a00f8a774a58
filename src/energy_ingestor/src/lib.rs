//! Metering-provider clients for the pvoutput sync jobs.
//!
//! Providers expose energy series behind the traits in [`providers`]; the
//! sync engine in `pv_sync` only ever talks to those traits.

pub mod models;
pub mod providers;
