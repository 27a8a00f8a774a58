use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Deserialize, Debug)]
pub struct GraphQlError {
    pub message: String,
}

#[derive(Deserialize, Debug)]
pub struct ViewerData<T> {
    pub viewer: T,
}

#[derive(Deserialize, Debug)]
pub struct HomesViewer {
    pub homes: Vec<HomeRef>,
}

#[derive(Deserialize, Debug)]
pub struct HomeRef {
    pub id: String,
}

#[derive(Deserialize, Debug)]
pub struct HomeViewer {
    pub home: HomeSeries,
}

#[derive(Deserialize, Debug)]
pub struct HomeSeries {
    pub consumption: Option<SeriesConnection>,
    pub production: Option<SeriesConnection>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SeriesConnection {
    pub page_info: PageInfo,
    pub nodes: Vec<SeriesNode>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
    pub has_previous_page: bool,
    pub has_next_page: bool,
}

/// One node of either series; only the fields for its kind are present.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SeriesNode {
    pub from: DateTime<FixedOffset>,
    pub consumption: Option<f64>,
    pub production: Option<f64>,
    pub unit_price: Option<f64>,
    pub cost: Option<f64>,
    pub profit: Option<f64>,
}
