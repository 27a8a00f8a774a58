//! Tibber GraphQL provider.
//!
//! Consumption and production are exposed as cursor-paged connections. Reverse
//! iteration asks for the `last` N nodes `before` the previous page's start
//! cursor and yields each page newest-first.
//!
//! Nodes whose amount is `null` (not yet metered) are dropped; nodes with a
//! zero amount are kept, which is why the query does not set
//! `filterEmptyNodes`.

pub mod response;

use reqwest::{
    blocking::Client,
    header::{self, HeaderValue},
};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use shared_utils::env::get_env_var;
use snafu::{OptionExt, ResultExt};
use tracing::debug;

use crate::{
    models::{
        energy::{ConsumptionEntry, ProductionEntry, kwh_to_wh},
        resolution::EnergyResolution,
    },
    providers::{
        ApiSnafu, ClientBuildSnafu, ConsumptionSource, DecodeSnafu, InitSnafu, InvalidTokenSnafu,
        MissingEnvVarSnafu, ProductionSource, ProviderError, ProviderInitError, ReqwestSnafu,
        Series,
        paging::{Page, PagedSeries},
        tibber::response::{
            GraphQlResponse, HomeViewer, HomesViewer, SeriesConnection, SeriesNode, ViewerData,
        },
    },
};

const ENDPOINT: &str = "https://api.tibber.com/v1-beta/gql";

/// Nodes requested per page, tuned per resolution like Tibber's own client.
pub const fn page_size(resolution: EnergyResolution) -> u32 {
    match resolution {
        EnergyResolution::Hourly => 48,
        EnergyResolution::Daily => 14,
        EnergyResolution::Weekly => 4,
        EnergyResolution::Monthly => 6,
        EnergyResolution::Annual => 5,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeriesKind {
    Consumption,
    Production,
}

impl SeriesKind {
    const fn field(self) -> &'static str {
        match self {
            SeriesKind::Consumption => "consumption",
            SeriesKind::Production => "production",
        }
    }

    const fn money(self) -> &'static str {
        match self {
            SeriesKind::Consumption => "cost",
            SeriesKind::Production => "profit",
        }
    }
}

/// Builds the inner `consumption(...)`/`production(...)` selection.
fn series_query(
    kind: SeriesKind,
    resolution: EnergyResolution,
    reverse: bool,
    cursor: Option<&str>,
) -> String {
    let mut params = vec![format!("resolution: {resolution}")];
    let size = page_size(resolution);
    if reverse {
        params.push(format!("last: {size}"));
        if let Some(c) = cursor {
            params.push(format!("before: \"{c}\""));
        }
    } else {
        params.push(format!("first: {size}"));
        if let Some(c) = cursor {
            params.push(format!("after: \"{c}\""));
        }
    }
    let name = kind.field();
    let money = kind.money();
    format!(
        "{name}({}) {{ pageInfo {{ startCursor endCursor hasPreviousPage hasNextPage }} \
         nodes {{ from {name} unitPrice {money} }} }}",
        params.join(", ")
    )
}

/// Tibber API client bound to one home.
pub struct TibberProvider {
    client: Client,
    endpoint: String,
    home_id: String,
}

impl TibberProvider {
    /// Connects to Tibber with `token`.
    ///
    /// When `home_id` is `None` the first home on the account is used.
    pub fn connect(token: &SecretString, home_id: Option<&str>) -> Result<Self, ProviderError> {
        Self::with_endpoint(ENDPOINT, token, home_id)
    }

    /// Connects using the `TIBBER_TOKEN` environment variable.
    pub fn from_env(home_id: Option<&str>) -> Result<Self, ProviderError> {
        let token = get_env_var("TIBBER_TOKEN")
            .context(MissingEnvVarSnafu)
            .context(InitSnafu)?;
        Self::connect(&SecretString::from(token), home_id)
    }

    /// Same as [`connect`](Self::connect) against a custom GraphQL endpoint.
    pub fn with_endpoint(
        endpoint: &str,
        token: &SecretString,
        home_id: Option<&str>,
    ) -> Result<Self, ProviderError> {
        let client = build_client(token).context(InitSnafu)?;
        let mut provider = Self {
            client,
            endpoint: endpoint.to_string(),
            home_id: String::new(),
        };
        provider.home_id = match home_id {
            Some(id) => id.to_string(),
            None => provider
                .homes()?
                .into_iter()
                .next()
                .context(ApiSnafu {
                    message: "account has no homes",
                })?,
        };
        Ok(provider)
    }

    pub fn home_id(&self) -> &str {
        &self.home_id
    }

    /// Lists the home ids visible to the token.
    pub fn homes(&self) -> Result<Vec<String>, ProviderError> {
        let viewer: HomesViewer = self.do_query("homes { id }")?;
        Ok(viewer.homes.into_iter().map(|h| h.id).collect())
    }

    fn do_query<T: DeserializeOwned>(&self, selection: &str) -> Result<T, ProviderError> {
        let query = format!("{{ viewer {{ {selection} }} }}");
        debug!(%query, "tibber query");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "query": query }))
            .send()
            .context(ReqwestSnafu)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .unwrap_or_else(|_| "Unknown API error".to_string());
            return ApiSnafu {
                message: format!("{status}: {body}"),
            }
            .fail();
        }

        let parsed: GraphQlResponse<ViewerData<T>> = response.json().context(ReqwestSnafu)?;
        if let Some(err) = parsed.errors.first() {
            return ApiSnafu {
                message: err.message.clone(),
            }
            .fail();
        }
        let data = parsed.data.context(DecodeSnafu {
            message: "response without data",
        })?;
        Ok(data.viewer)
    }

    fn fetch_page(
        &self,
        kind: SeriesKind,
        resolution: EnergyResolution,
        reverse: bool,
        cursor: Option<&str>,
    ) -> Result<Page<SeriesNode>, ProviderError> {
        let selection = format!(
            "home(id: \"{}\") {{ {} }}",
            self.home_id,
            series_query(kind, resolution, reverse, cursor)
        );
        let viewer: HomeViewer = self.do_query(&selection)?;
        let connection = match kind {
            SeriesKind::Consumption => viewer.home.consumption,
            SeriesKind::Production => viewer.home.production,
        }
        .context(DecodeSnafu {
            message: format!("missing {} connection", kind.field()),
        })?;
        Ok(into_page(connection, kind, reverse))
    }

    fn series(
        &self,
        kind: SeriesKind,
        resolution: EnergyResolution,
        reverse: bool,
    ) -> PagedSeries<SeriesNode, impl FnMut(Option<&str>) -> Result<Page<SeriesNode>, ProviderError> + '_>
    {
        PagedSeries::new(move |cursor| self.fetch_page(kind, resolution, reverse, cursor))
    }
}

fn build_client(token: &SecretString) -> Result<Client, ProviderInitError> {
    let mut auth = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
        .context(InvalidTokenSnafu)?;
    auth.set_sensitive(true);

    let mut headers = header::HeaderMap::new();
    headers.insert(header::AUTHORIZATION, auth);

    Client::builder()
        .default_headers(headers)
        .build()
        .context(ClientBuildSnafu)
}

/// Drops unmetered nodes and orders the page for the requested direction.
fn into_page(connection: SeriesConnection, kind: SeriesKind, reverse: bool) -> Page<SeriesNode> {
    let info = connection.page_info;
    let mut entries: Vec<SeriesNode> = connection
        .nodes
        .into_iter()
        .filter(|n| match kind {
            SeriesKind::Consumption => n.consumption.is_some(),
            SeriesKind::Production => n.production.is_some(),
        })
        .collect();

    if reverse {
        entries.reverse();
        Page {
            entries,
            cursor: info.start_cursor,
            has_more: info.has_previous_page,
        }
    } else {
        Page {
            entries,
            cursor: info.end_cursor,
            has_more: info.has_next_page,
        }
    }
}

impl ConsumptionSource for TibberProvider {
    fn consumption_series(
        &self,
        resolution: EnergyResolution,
        reverse: bool,
    ) -> Series<'_, ConsumptionEntry> {
        Box::new(
            self.series(SeriesKind::Consumption, resolution, reverse)
                .map(|node| {
                    node.map(|n| ConsumptionEntry {
                        from: n.from,
                        energy_wh: kwh_to_wh(n.consumption.unwrap_or_default()),
                        unit_price: n.unit_price,
                        cost: n.cost.map(|c| (c * 100.0).round() / 100.0),
                    })
                }),
        )
    }
}

impl ProductionSource for TibberProvider {
    fn production_series(
        &self,
        resolution: EnergyResolution,
        reverse: bool,
    ) -> Series<'_, ProductionEntry> {
        Box::new(
            self.series(SeriesKind::Production, resolution, reverse)
                .map(|node| {
                    node.map(|n| ProductionEntry {
                        from: n.from,
                        energy_wh: kwh_to_wh(n.production.unwrap_or_default()),
                        unit_price: n.unit_price,
                        profit: n.profit.map(|p| (p * 100.0).round() / 100.0),
                    })
                }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverse_query_uses_last_and_before() {
        let q = series_query(
            SeriesKind::Consumption,
            EnergyResolution::Hourly,
            true,
            Some("abc"),
        );
        assert!(q.starts_with("consumption(resolution: HOURLY, last: 48, before: \"abc\")"));
        assert!(q.contains("nodes { from consumption unitPrice cost }"));
    }

    #[test]
    fn forward_query_uses_first_and_after() {
        let q = series_query(SeriesKind::Production, EnergyResolution::Daily, false, None);
        assert!(q.starts_with("production(resolution: DAILY, first: 14)"));
        assert!(q.contains("nodes { from production unitPrice profit }"));
    }

    #[test]
    fn reverse_page_is_newest_first_and_drops_null_nodes() {
        let connection: SeriesConnection = serde_json::from_value(serde_json::json!({
            "pageInfo": {
                "startCursor": "s", "endCursor": "e",
                "hasPreviousPage": true, "hasNextPage": false
            },
            "nodes": [
                { "from": "2021-03-15T00:00:00.000+01:00", "consumption": 1.0, "unitPrice": 0.5, "cost": 0.5 },
                { "from": "2021-03-15T01:00:00.000+01:00", "consumption": null, "unitPrice": null, "cost": null },
                { "from": "2021-03-15T02:00:00.000+01:00", "consumption": 0.0, "unitPrice": 0.5, "cost": 0.0 }
            ]
        }))
        .unwrap();

        let page = into_page(connection, SeriesKind::Consumption, true);
        assert_eq!(page.cursor.as_deref(), Some("s"));
        assert!(page.has_more);
        let hours: Vec<u32> = page
            .entries
            .iter()
            .map(|n| chrono::Timelike::hour(&n.from))
            .collect();
        assert_eq!(hours, vec![2, 0]);
    }
}
