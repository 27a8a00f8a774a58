//! Göteborg Energi customer portal.
//!
//! The portal has no API. A session is established by scraping the anti-forgery
//! token from the login page and posting the credentials; monthly per-day
//! figures come from the JSON endpoint that backs the consumption chart. Import
//! and export are separate metering points (pod ids).

pub mod response;

use std::sync::LazyLock;

use regex::Regex;
use reqwest::{
    StatusCode,
    blocking::{Client, Response},
    redirect,
};
use secrecy::{ExposeSecret, SecretString};
use snafu::{OptionExt, ResultExt};
use tracing::debug;

use crate::providers::{
    ApiSnafu, ClientBuildSnafu, DecodeSnafu, InitSnafu, MonthlyEnergySource, ProviderError,
    ReqwestSnafu, goteborg_energi::response::ConsumptionByHour,
};

const BASE_URL: &str = "https://elavtal.goteborgenergi.se";
const LOGIN_PATH: &str = "/din-sida-info/logga-in/";
const LOGOUT_PATH: &str = "/din-sida/elforbrukning-och-elavtal/Logout/";
const ENERGY_PATH: &str = "/din-sida/elforbrukning-och-elavtal/";
const BY_HOUR_PATH: &str = "/din-sida/elforbrukning-och-elavtal/GetConsumptionByHour/";

static LOGIN_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"name="__RequestVerificationToken" type="hidden" value="([^"]+)"#)
        .expect("valid login token regex")
});

static ENERGY_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)<form.*? id="get-consumption-form" .*?<input name="__RequestVerificationToken" .*? value="([^"]+)""#,
    )
    .expect("valid energy token regex")
});

/// Credentials and metering points for one portal account.
pub struct GoteborgEnergi {
    base_url: String,
    username: String,
    password: SecretString,
    import_pod: String,
    export_pod: String,
}

/// A logged-in portal session. Call [`log_out`](Self::log_out) when done.
pub struct GoteborgEnergiSession {
    client: Client,
    base_url: String,
    import_pod: String,
    export_pod: String,
}

fn expect_status(response: &Response, want: StatusCode, what: &str) -> Result<(), ProviderError> {
    debug!(url = %response.url(), status = %response.status(), "{what}");
    if response.status() != want {
        return ApiSnafu {
            message: format!("{what}: unexpected status {}", response.status()),
        }
        .fail();
    }
    Ok(())
}

fn scrape_token(re: &Regex, body: &str, what: &str) -> Result<String, ProviderError> {
    re.captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .context(DecodeSnafu {
            message: format!("failed to detect {what} token"),
        })
}

impl GoteborgEnergi {
    pub fn new(
        username: impl Into<String>,
        password: SecretString,
        import_pod: impl Into<String>,
        export_pod: impl Into<String>,
    ) -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            username: username.into(),
            password,
            import_pod: import_pod.into(),
            export_pod: export_pod.into(),
        }
    }

    /// Points the client at another host (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Logs in and returns a session holding the portal cookies.
    pub fn log_in(self) -> Result<GoteborgEnergiSession, ProviderError> {
        let client = Client::builder()
            .cookie_store(true)
            .redirect(redirect::Policy::none())
            .build()
            .context(ClientBuildSnafu)
            .context(InitSnafu)?;

        let url = format!("{}{LOGIN_PATH}", self.base_url);
        let page = client.get(&url).send().context(ReqwestSnafu)?;
        expect_status(&page, StatusCode::OK, "get login page")?;
        let body = page.text().context(ReqwestSnafu)?;
        let token = scrape_token(&LOGIN_TOKEN, &body, "login")?;

        let form = [
            ("ReturnUrl", ""),
            ("KeepMeLoggedIn", "false"),
            ("Username", self.username.as_str()),
            ("Password", self.password.expose_secret()),
            ("__RequestVerificationToken", token.as_str()),
        ];
        let login = client.post(&url).form(&form).send().context(ReqwestSnafu)?;
        expect_status(&login, StatusCode::FOUND, "post login")?;

        Ok(GoteborgEnergiSession {
            client,
            base_url: self.base_url,
            import_pod: self.import_pod,
            export_pod: self.export_pod,
        })
    }
}

impl GoteborgEnergiSession {
    /// Per-day energy for metering point `pod` in the given month, Wh.
    pub fn month_energy(
        &self,
        pod: &str,
        year: i32,
        month: u32,
    ) -> Result<Vec<Option<u64>>, ProviderError> {
        let page = self
            .client
            .get(format!("{}{ENERGY_PATH}", self.base_url))
            .query(&[("podid", pod)])
            .send()
            .context(ReqwestSnafu)?;
        expect_status(&page, StatusCode::OK, "get energy page")?;
        let body = page.text().context(ReqwestSnafu)?;
        let token = scrape_token(&ENERGY_TOKEN, &body, "energy")?;

        let year = year.to_string();
        let month = month.to_string();
        let form = [
            ("PodId", pod),
            ("year", year.as_str()),
            ("month", month.as_str()),
            ("__RequestVerificationToken", token.as_str()),
        ];
        let chart = self
            .client
            .post(format!("{}{BY_HOUR_PATH}", self.base_url))
            .form(&form)
            .send()
            .context(ReqwestSnafu)?;
        expect_status(&chart, StatusCode::OK, "post consumption by hour")?;
        let payload: ConsumptionByHour = chart.json().context(ReqwestSnafu)?;
        response::month_series(payload)
    }

    pub fn log_out(self) -> Result<(), ProviderError> {
        let response = self
            .client
            .get(format!("{}{LOGOUT_PATH}", self.base_url))
            .send()
            .context(ReqwestSnafu)?;
        expect_status(&response, StatusCode::FOUND, "log out")
    }
}

impl MonthlyEnergySource for GoteborgEnergiSession {
    fn month_import(&self, year: i32, month: u32) -> Result<Vec<Option<u64>>, ProviderError> {
        self.month_energy(&self.import_pod, year, month)
    }

    fn month_export(&self, year: i32, month: u32) -> Result<Vec<Option<u64>>, ProviderError> {
        self.month_energy(&self.export_pod, year, month)
    }
}
