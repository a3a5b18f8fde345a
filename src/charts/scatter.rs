//! Point map of individual transactions, colored and sized by unit price.

use super::colors::{interpolate, normalize, Rgb, PRICE_SCALE};
use super::{ChartError, GeoPoint};
use crate::data::columns::{
    AREA_M2, AREA_NAME, LATITUDE, LONGITUDE, STATION_DISTANCE, TRANSACTION_PERIOD, UNIT_PRICE,
};
use crate::data::string_values;
use polars::prelude::*;

/// Marker sizes grow with `price^SIZE_EXPONENT` so outliers do not swamp the map.
pub const SIZE_EXPONENT: f64 = 0.9;

/// One transaction on the map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapPoint {
    pub position: GeoPoint,
    pub unit_price: i64,
    pub scaled_size: f64,
    pub area_name: String,
    pub area_m2: String,
    pub station_distance: String,
    pub period: String,
}

/// Extract map points from a cleaned (or filtered) table.
pub fn map_points(df: &DataFrame) -> Result<Vec<MapPoint>, ChartError> {
    let lats = df.column(LATITUDE)?.f64()?;
    let lons = df.column(LONGITUDE)?.f64()?;
    let prices = df.column(UNIT_PRICE)?.i64()?;
    let names = string_values(df, AREA_NAME)?;
    let areas = string_values(df, AREA_M2)?;
    let distances = string_values(df, STATION_DISTANCE)?;
    let periods = string_values(df, TRANSACTION_PERIOD)?;

    let mut points = Vec::with_capacity(df.height());
    for (idx, ((lat, lon), price)) in lats
        .into_iter()
        .zip(lons.into_iter())
        .zip(prices.into_iter())
        .enumerate()
    {
        let (Some(lat), Some(lon), Some(price)) = (lat, lon, price) else {
            continue;
        };
        let text = |values: &[Option<String>]| values[idx].clone().unwrap_or_default();
        points.push(MapPoint {
            position: GeoPoint { lat, lon },
            unit_price: price,
            scaled_size: (price as f64).powf(SIZE_EXPONENT),
            area_name: text(&names),
            area_m2: text(&areas),
            station_distance: text(&distances),
            period: text(&periods),
        });
    }
    Ok(points)
}

/// Mean position of a set of points.
pub fn mean_center(points: &[GeoPoint]) -> Option<GeoPoint> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let (lat, lon) = points
        .iter()
        .fold((0.0, 0.0), |(lat, lon), p| (lat + p.lat, lon + p.lon));
    Some(GeoPoint {
        lat: lat / n,
        lon: lon / n,
    })
}

/// Point map ready for preview, PNG or figure export.
#[derive(Debug, Clone)]
pub struct ScatterMap {
    pub points: Vec<MapPoint>,
    pub center: GeoPoint,
    pub zoom: u8,
    pub price_range: (i64, i64),
    pub size_range: (f64, f64),
}

impl ScatterMap {
    pub fn build(df: &DataFrame, zoom: u8) -> Result<Self, ChartError> {
        let points = map_points(df)?;
        let positions: Vec<GeoPoint> = points.iter().map(|p| p.position).collect();
        let center = mean_center(&positions).ok_or(ChartError::EmptyTable)?;

        let price_range = points.iter().fold((i64::MAX, i64::MIN), |(lo, hi), p| {
            (lo.min(p.unit_price), hi.max(p.unit_price))
        });
        let size_range = points
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p.scaled_size), hi.max(p.scaled_size))
            });

        Ok(Self {
            points,
            center,
            zoom,
            price_range,
            size_range,
        })
    }

    /// Position of a price on the color scale.
    pub fn price_position(&self, unit_price: i64) -> f64 {
        normalize(
            unit_price as f64,
            self.price_range.0 as f64,
            self.price_range.1 as f64,
        )
    }

    pub fn color_of(&self, point: &MapPoint) -> Rgb {
        interpolate(&PRICE_SCALE, self.price_position(point.unit_price))
    }

    /// Marker radius in pixels, `min_radius..=max_radius` by scaled size.
    pub fn radius_of(&self, point: &MapPoint, min_radius: f64, max_radius: f64) -> f64 {
        let t = normalize(point.scaled_size, self.size_range.0, self.size_range.1);
        min_radius + (max_radius - min_radius) * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> DataFrame {
        DataFrame::new(vec![
            Column::new(LATITUDE.into(), vec![35.0, 36.0, 37.0]),
            Column::new(LONGITUDE.into(), vec![139.0, 140.0, 141.0]),
            Column::new(UNIT_PRICE.into(), vec![100i64, 1000, 10000]),
            Column::new(AREA_NAME.into(), vec!["a", "b", "c"]),
            Column::new(AREA_M2.into(), vec!["150", "200", "2,000 m^2 or greater."]),
            Column::new(STATION_DISTANCE.into(), vec!["5", "Unknown", "30-60minutes"]),
            Column::new(TRANSACTION_PERIOD.into(), vec!["2021-1", "2021-1", "2021-2"]),
        ])
        .unwrap()
    }

    #[test]
    fn centers_on_mean_coordinates() {
        let map = ScatterMap::build(&frame(), 10).unwrap();
        assert_eq!(map.points.len(), 3);
        assert!((map.center.lat - 36.0).abs() < 1e-12);
        assert!((map.center.lon - 140.0).abs() < 1e-12);
        assert_eq!(map.zoom, 10);
    }

    #[test]
    fn sizes_scale_sub_linearly() {
        let map = ScatterMap::build(&frame(), 10).unwrap();
        let expected = 10000f64.powf(0.9);
        assert!((map.points[2].scaled_size - expected).abs() < 1e-9);
        assert!(map.points[2].scaled_size < 10000.0);
        assert_eq!(map.radius_of(&map.points[0], 2.0, 10.0), 2.0);
        assert_eq!(map.radius_of(&map.points[2], 2.0, 10.0), 10.0);
    }

    #[test]
    fn colors_follow_price_scale() {
        let map = ScatterMap::build(&frame(), 10).unwrap();
        assert_eq!(map.price_range, (100, 10000));
        assert_eq!(map.color_of(&map.points[0]), PRICE_SCALE[0]);
        assert_eq!(map.color_of(&map.points[2]), PRICE_SCALE[11]);
    }

    #[test]
    fn empty_table_is_rejected() {
        let empty = frame().head(Some(0));
        assert!(matches!(ScatterMap::build(&empty, 10), Err(ChartError::EmptyTable)));
    }
}
