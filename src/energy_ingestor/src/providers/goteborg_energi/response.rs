use serde::Deserialize;
use snafu::OptionExt;

use crate::{
    models::energy::kwh_to_wh,
    providers::{DecodeSnafu, ProviderError, ValidationSnafu},
};

#[derive(Deserialize, Debug)]
pub struct ConsumptionByHour {
    pub series: Vec<ChartSeries>,
}

#[derive(Deserialize, Debug)]
pub struct ChartSeries {
    pub data: Vec<Option<ChartPoint>>,
}

/// One bar in the portal's month chart; `name` is the day of month.
#[derive(Deserialize, Debug)]
pub struct ChartPoint {
    pub name: String,
    pub y: Option<f64>,
}

/// Turns the month chart into per-day Wh, indexed by `day - 1`.
pub fn month_series(payload: ConsumptionByHour) -> Result<Vec<Option<u64>>, ProviderError> {
    let series = payload.series.into_iter().next().context(DecodeSnafu {
        message: "chart without series",
    })?;

    let mut energy = vec![None; series.data.len()];
    for point in series.data.into_iter().flatten() {
        let day: usize = point.name.trim().parse().map_err(|_| {
            ValidationSnafu {
                message: format!("bad day label {:?}", point.name),
            }
            .build()
        })?;
        if day == 0 || day > energy.len() {
            return ValidationSnafu {
                message: format!("day {day} outside a {}-day month", energy.len()),
            }
            .fail();
        }
        energy[day - 1] = point.y.map(kwh_to_wh);
    }
    Ok(energy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_days_and_keeps_gaps() {
        let payload: ConsumptionByHour = serde_json::from_str(
            r#"{"series":[{"data":[{"name":"1","y":12.5},null,{"name":"3","y":0.0}]}]}"#,
        )
        .unwrap();
        let got = month_series(payload).unwrap();
        assert_eq!(got, vec![Some(12_500), None, Some(0)]);
    }

    #[test]
    fn rejects_out_of_range_day() {
        let payload: ConsumptionByHour =
            serde_json::from_str(r#"{"series":[{"data":[{"name":"2","y":1.0}]}]}"#).unwrap();
        assert!(month_series(payload).is_err());
    }
}
