//! E.ON "Mina sidor" customer portal.
//!
//! Login is an ASP.NET form post on the my-pages host; the `__VIEWSTATE` is
//! scraped from the login page once and reused for logout. Monthly reports live
//! on a separate SAP host that accepts the my-pages session cookies, so those
//! are carried over by hand rather than through a cookie store.
//!
//! Reports are hourly per day in whole kWh. Import and export are the same
//! installation with different role/type codes.

pub mod table;

use std::sync::LazyLock;

use regex::Regex;
use reqwest::{
    StatusCode,
    blocking::{Client, Response},
    header::{self, HeaderValue},
    redirect,
};
use secrecy::{ExposeSecret, SecretString};
use snafu::{OptionExt, ResultExt, ensure};
use tracing::debug;

use crate::providers::{
    ApiSnafu, ClientBuildSnafu, DecodeSnafu, InitSnafu, MonthlyEnergySource, ProviderError,
    ReqwestSnafu,
    eon::table::{HourlyDay, day_total, parse_month},
};

const MY_PAGES_URL: &str = "https://minasidor.eon.se";
const SAP_URL: &str = "https://sapuces.eon.se";
const LOGIN_PATH: &str = "/privatkund/Mina-sidor/Inloggning/";
const MONTH_ENERGY_PATH: &str = "/eon-online/eon.consumption.month.sap";

const LOGIN_FIELD_ID_TYPE: &str = "m$blocks1C2R1$Login$UserIdTypeField";
const LOGIN_FIELD_USER: &str = "m$blocks1C2R1$Login$UserIdField";
const LOGIN_FIELD_PASSWORD: &str = "m$blocks1C2R1$Login$PasswordField";
const LOGIN_FIELD_BUTTON: &str = "m$blocks1C2R1$Login$LoginButton";
const LOGOUT_TARGET: &str = "m$ctl01$logoutConfirmButton";

static VIEWSTATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"id="__VIEWSTATE" value="([^"]+)""#).expect("valid viewstate regex")
});

/// Which side of the meter a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Import,
    Export,
}

impl Direction {
    const fn role(self) -> &'static str {
        match self {
            Direction::Import => "01",
            Direction::Export => "03",
        }
    }

    const fn kind(self) -> &'static str {
        match self {
            Direction::Import => "P",
            Direction::Export => "G",
        }
    }
}

/// Credentials and installation for one portal account.
pub struct Eon {
    my_pages_url: String,
    sap_url: String,
    user_id: String,
    password: SecretString,
    installation: String,
}

/// A logged-in portal session. Call [`log_out`](Self::log_out) when done.
pub struct EonSession {
    client: Client,
    my_pages_url: String,
    sap_url: String,
    viewstate: String,
    cookie: HeaderValue,
    installation: String,
}

fn expect_status(response: &Response, want: StatusCode, what: &str) -> Result<(), ProviderError> {
    debug!(url = %response.url(), status = %response.status(), "{what}");
    ensure!(
        response.status() == want,
        ApiSnafu {
            message: format!("{what}: unexpected status {}", response.status()),
        }
    );
    Ok(())
}

/// `name=value` pairs of every `Set-Cookie`, joined for a `Cookie` header.
fn session_cookie(response: &Response) -> Result<HeaderValue, ProviderError> {
    let pairs: Vec<&str> = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    ensure!(
        !pairs.is_empty(),
        ApiSnafu {
            message: "log in: no session cookie",
        }
    );
    let mut value = HeaderValue::from_str(&pairs.join("; ")).map_err(|e| {
        DecodeSnafu {
            message: format!("unusable session cookie: {e}"),
        }
        .build()
    })?;
    value.set_sensitive(true);
    Ok(value)
}

impl Eon {
    pub fn new(
        user_id: impl Into<String>,
        password: SecretString,
        installation: impl Into<String>,
    ) -> Self {
        Self {
            my_pages_url: MY_PAGES_URL.to_string(),
            sap_url: SAP_URL.to_string(),
            user_id: user_id.into(),
            password,
            installation: installation.into(),
        }
    }

    /// Points both portal hosts at other locations (used by tests).
    pub fn with_base_urls(
        mut self,
        my_pages_url: impl Into<String>,
        sap_url: impl Into<String>,
    ) -> Self {
        self.my_pages_url = my_pages_url.into();
        self.sap_url = sap_url.into();
        self
    }

    /// Logs in and returns a session carrying the portal cookies.
    pub fn log_in(self) -> Result<EonSession, ProviderError> {
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .build()
            .context(ClientBuildSnafu)
            .context(InitSnafu)?;

        let url = format!("{}{LOGIN_PATH}", self.my_pages_url);
        let page = client.get(&url).send().context(ReqwestSnafu)?;
        expect_status(&page, StatusCode::OK, "get login page")?;
        let body = page.text().context(ReqwestSnafu)?;
        let viewstate = VIEWSTATE
            .captures(&body)
            .map(|c| c[1].to_string())
            .context(DecodeSnafu {
                message: "failed to detect viewstate",
            })?;

        let form = [
            ("__VIEWSTATE", viewstate.as_str()),
            (LOGIN_FIELD_ID_TYPE, "1"),
            (LOGIN_FIELD_USER, self.user_id.as_str()),
            (LOGIN_FIELD_PASSWORD, self.password.expose_secret()),
            (LOGIN_FIELD_BUTTON, "Logga in"),
        ];
        let login = client.post(&url).form(&form).send().context(ReqwestSnafu)?;
        expect_status(&login, StatusCode::FOUND, "log in")?;
        let cookie = session_cookie(&login)?;

        Ok(EonSession {
            client,
            my_pages_url: self.my_pages_url,
            sap_url: self.sap_url,
            viewstate,
            cookie,
            installation: self.installation,
        })
    }
}

impl EonSession {
    /// Hourly Wh per day of the month for the session's installation.
    pub fn month_hourly(
        &self,
        direction: Direction,
        year: i32,
        month: u32,
    ) -> Result<Vec<HourlyDay>, ProviderError> {
        let year = year.to_string();
        let month = format!("{month:02}");
        let form = [
            ("radioChosen", "KWH"),
            ("role", direction.role()),
            ("type", direction.kind()),
            ("installationSelector", self.installation.as_str()),
            ("year", year.as_str()),
            ("month", month.as_str()),
        ];
        let response = self
            .client
            .post(format!("{}{MONTH_ENERGY_PATH}", self.sap_url))
            .header(header::COOKIE, self.cookie.clone())
            .form(&form)
            .send()
            .context(ReqwestSnafu)?;
        expect_status(&response, StatusCode::OK, "get month energy")?;
        let body = response
            .text_with_charset("iso-8859-15")
            .context(ReqwestSnafu)?;
        parse_month(&body)
    }

    fn month_totals(&self, direction: Direction, year: i32, month: u32) -> Result<Vec<Option<u64>>, ProviderError> {
        Ok(self
            .month_hourly(direction, year, month)?
            .iter()
            .map(day_total)
            .collect())
    }

    pub fn log_out(self) -> Result<(), ProviderError> {
        let form = [
            ("__VIEWSTATE", self.viewstate.as_str()),
            ("__EVENTTARGET", LOGOUT_TARGET),
            ("__EVENTARGUMENT", ""),
        ];
        let response = self
            .client
            .post(format!("{}{LOGIN_PATH}", self.my_pages_url))
            .header(header::COOKIE, self.cookie)
            .form(&form)
            .send()
            .context(ReqwestSnafu)?;
        expect_status(&response, StatusCode::FOUND, "log out")
    }
}

impl MonthlyEnergySource for EonSession {
    fn month_import(&self, year: i32, month: u32) -> Result<Vec<Option<u64>>, ProviderError> {
        self.month_totals(Direction::Import, year, month)
    }

    fn month_export(&self, year: i32, month: u32) -> Result<Vec<Option<u64>>, ProviderError> {
        self.month_totals(Direction::Export, year, month)
    }
}
