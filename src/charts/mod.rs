//! Charts module - map models, previews, PNG and figure export

pub mod colors;
pub mod figure;
mod hexbin;
mod plotter;
mod renderer;
mod scatter;

pub use hexbin::{HexFrame, HexbinMap};
pub use plotter::{ChartPlotter, DashboardCharts};
pub use renderer::StaticChartRenderer;
pub use scatter::ScatterMap;

use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("No transactions to plot")]
    EmptyTable,

    #[error("Hexagon count must be at least 1")]
    InvalidHexagonCount,

    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// WGS84 coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    /// South-west and north-east corners of a set of points.
    pub fn bounds(points: &[GeoPoint]) -> Option<(GeoPoint, GeoPoint)> {
        let first = *points.first()?;
        Some(points.iter().fold((first, first), |(sw, ne), p| {
            (
                GeoPoint {
                    lat: sw.lat.min(p.lat),
                    lon: sw.lon.min(p.lon),
                },
                GeoPoint {
                    lat: ne.lat.max(p.lat),
                    lon: ne.lon.max(p.lon),
                },
            )
        }))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::data::columns::{
        AREA_M2, AREA_NAME, LATITUDE, LONGITUDE, STATION_DISTANCE, TRANSACTION_PERIOD, UNIT_PRICE,
    };
    use polars::prelude::*;

    /// Plot-ready table from `(lat, lon, unit_price, period)` rows.
    pub fn points_frame(rows: &[(f64, f64, i64, &str)]) -> DataFrame {
        let n = rows.len();
        DataFrame::new(vec![
            Column::new(LATITUDE.into(), rows.iter().map(|r| r.0).collect::<Vec<_>>()),
            Column::new(LONGITUDE.into(), rows.iter().map(|r| r.1).collect::<Vec<_>>()),
            Column::new(UNIT_PRICE.into(), rows.iter().map(|r| r.2).collect::<Vec<_>>()),
            Column::new(TRANSACTION_PERIOD.into(), rows.iter().map(|r| r.3).collect::<Vec<_>>()),
            Column::new(AREA_NAME.into(), vec!["Marunouchi"; n]),
            Column::new(AREA_M2.into(), vec!["100"; n]),
            Column::new(STATION_DISTANCE.into(), vec!["5"; n]),
        ])
        .unwrap()
    }
}
