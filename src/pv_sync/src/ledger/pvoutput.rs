//! PVOutput.org HTTP client implementing [`Ledger`].
//!
//! Requests are authenticated with the `X-Pvoutput-Apikey` and
//! `X-Pvoutput-SystemId` headers. PVOutput enforces an hourly request quota per
//! account; the client keeps a local token bucket and blocks until a request is
//! allowed instead of collecting 403s.

use std::{num::NonZeroU32, thread};

use chrono::NaiveDate;
use governor::{
    DefaultDirectRateLimiter, Quota, RateLimiter,
    clock::{Clock, DefaultClock},
};
use reqwest::{
    blocking::Client,
    header::{self, HeaderValue},
};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::ledger::{
    DailyLedgerRecord, Ledger, LedgerError, LedgerUpdate,
    wire::{format_date, output_form, parse_outputs},
};

const BASE_URL: &str = "https://pvoutput.org";
const GET_OUTPUT_PATH: &str = "/service/r2/getoutput.jsp";
const ADD_OUTPUT_PATH: &str = "/service/r2/addoutput.jsp";

/// Largest `limit` getoutput.jsp accepts.
pub const MAX_OUTPUTS: usize = 150;

pub struct PvOutput {
    client: Client,
    base_url: String,
    dry_run: bool,
    limiter: DefaultDirectRateLimiter,
}

fn header_value(v: &str, sensitive: bool) -> Result<HeaderValue, LedgerError> {
    let mut value =
        HeaderValue::from_str(v).map_err(|e| LedgerError::Setup(format!("bad header value: {e}")))?;
    value.set_sensitive(sensitive);
    Ok(value)
}

impl PvOutput {
    /// Creates a client for one PVOutput system.
    ///
    /// With `dry_run` set, writes are logged and reported as successful without
    /// being sent; reads still go to the service.
    pub fn new(
        api_key: &SecretString,
        system_id: &str,
        requests_per_hour: NonZeroU32,
        dry_run: bool,
    ) -> Result<Self, LedgerError> {
        let mut headers = header::HeaderMap::new();
        headers.insert("X-Pvoutput-Apikey", header_value(api_key.expose_secret(), true)?);
        headers.insert("X-Pvoutput-SystemId", header_value(system_id, false)?);
        headers.insert(header::ACCEPT, HeaderValue::from_static("text/plain"));

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
            dry_run,
            limiter: RateLimiter::direct(Quota::per_hour(requests_per_hour)),
        })
    }

    /// Points the client at another host (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Blocks the calling thread until the hourly quota allows one more request.
    fn throttle(&self) {
        let clock = DefaultClock::default();
        while let Err(not_until) = self.limiter.check() {
            let wait = not_until.wait_time_from(clock.now());
            debug!(?wait, "pvoutput quota exhausted, waiting");
            thread::sleep(wait);
        }
    }

    fn post(&self, path: &str, form: &[(&str, String)]) -> Result<String, LedgerError> {
        debug!(path, ?form, "POST to pvoutput");
        self.throttle();

        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .form(form)
            .send()?;
        let status = response.status();
        let body = response.text()?;
        debug!(%status, %body, "pvoutput response");

        if !status.is_success() {
            return Err(LedgerError::Rejected {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }
        Ok(body)
    }
}

impl Ledger for PvOutput {
    fn get_daily_records(
        &self,
        limit: usize,
        date_to: Option<NaiveDate>,
    ) -> Result<Vec<DailyLedgerRecord>, LedgerError> {
        let mut form = vec![("limit", limit.clamp(1, MAX_OUTPUTS).to_string())];
        if let Some(dt) = date_to {
            form.push(("dt", format_date(dt)));
        }
        let body = self.post(GET_OUTPUT_PATH, &form)?;
        parse_outputs(&body)
    }

    fn update_daily_record(&self, update: &LedgerUpdate) -> Result<(), LedgerError> {
        let form = output_form(update);
        if self.dry_run {
            debug!(?form, "dry run, not sending output");
            return Ok(());
        }
        self.post(ADD_OUTPUT_PATH, &form).map(|_| ())
    }
}
