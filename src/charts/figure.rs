//! Plotly figure JSON for the two maps.
//!
//! The output is a plain `{data, layout, frames}` document that plotly.js (or
//! `plotly.io.from_json`) renders as Mapbox maps with the configured token and style.

use super::colors::{plotly_scale, to_hex, ICEFIRE_SCALE, OVERLAY_POINT, PRICE_SCALE};
use super::{GeoPoint, HexbinMap, ScatterMap};
use crate::config::MapboxCredentials;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

const SCATTER_HOVER: &str = "%{customdata[2]} <br>Unit Price: %{customdata[0]}<br>Area: %{customdata[1]}<br>Nearest Station: %{customdata[3]} Minutes";
const HEXBIN_HOVER: &str = "Price per M^2=%{z}<extra></extra>";
const COLORBAR_TITLE: &str = "Price per M^2";
/// Largest marker diameter in pixels, as plotly express sizes `size=` columns.
const MAX_MARKER_SIZE: f64 = 20.0;
const HEXBIN_HEIGHT: u32 = 700;
const HEXBIN_OPACITY: f64 = 0.9;

#[derive(Debug, Clone, Serialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub frames: Vec<AnimationFrame>,
}

impl Figure {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnimationFrame {
    pub name: String,
    pub data: Vec<Trace>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trace {
    Scattermapbox(ScatterTrace),
    Choroplethmapbox(ChoroplethTrace),
}

#[derive(Debug, Clone, Serialize)]
pub struct ScatterTrace {
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
    pub mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hovertext: Vec<String>,
    /// `[unit price, area, area name, station distance]` per point.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub customdata: Vec<(i64, String, String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hovertemplate: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hoverinfo: Option<&'static str>,
    pub marker: Marker,
    pub showlegend: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Marker {
    pub color: Value,
    pub size: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coloraxis: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sizemode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sizeref: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChoroplethTrace {
    pub geojson: Value,
    pub locations: Vec<String>,
    pub z: Vec<f64>,
    pub coloraxis: &'static str,
    pub hovertemplate: &'static str,
    pub marker: Value,
    pub name: String,
}

/// Point map figure.
pub fn scatter_figure(map: &ScatterMap, mapbox: &MapboxCredentials) -> Figure {
    let max_size = map.size_range.1.max(f64::MIN_POSITIVE);
    let points = &map.points;

    let trace = ScatterTrace {
        lat: points.iter().map(|p| p.position.lat).collect(),
        lon: points.iter().map(|p| p.position.lon).collect(),
        mode: "markers",
        name: None,
        hovertext: points.iter().map(|p| p.area_name.clone()).collect(),
        customdata: points
            .iter()
            .map(|p| {
                (
                    p.unit_price,
                    p.area_m2.clone(),
                    p.area_name.clone(),
                    p.station_distance.clone(),
                )
            })
            .collect(),
        hovertemplate: Some(SCATTER_HOVER),
        hoverinfo: None,
        marker: Marker {
            color: json!(points.iter().map(|p| p.unit_price).collect::<Vec<_>>()),
            size: json!(points.iter().map(|p| p.scaled_size).collect::<Vec<_>>()),
            opacity: None,
            coloraxis: Some("coloraxis"),
            sizemode: Some("area"),
            sizeref: Some(2.0 * max_size / MAX_MARKER_SIZE.powi(2)),
        },
        showlegend: false,
    };

    Figure {
        data: vec![Trace::Scattermapbox(trace)],
        layout: json!({
            "margin": {"r": 0, "t": 0, "l": 0, "b": 0},
            "coloraxis": {
                "colorscale": plotly_scale(&PRICE_SCALE),
                "cmin": map.price_range.0,
                "cmax": map.price_range.1,
                "showscale": false,
            },
            "mapbox": mapbox_layout(mapbox, map.center, map.zoom),
        }),
        frames: Vec::new(),
    }
}

/// Animated hexbin figure: one choropleth plus point overlay per period.
pub fn hexbin_figure(map: &HexbinMap, mapbox: &MapboxCredentials) -> Figure {
    let geojson = hexagon_geojson(map);
    let frames: Vec<AnimationFrame> = map
        .frames
        .iter()
        .map(|frame| AnimationFrame {
            name: frame.period.clone(),
            data: vec![
                Trace::Choroplethmapbox(ChoroplethTrace {
                    geojson: geojson.clone(),
                    locations: frame.cells.iter().map(|c| c.id.to_string()).collect(),
                    z: frame.cells.iter().map(|c| c.mean_price).collect(),
                    coloraxis: "coloraxis",
                    hovertemplate: HEXBIN_HOVER,
                    marker: json!({"opacity": HEXBIN_OPACITY, "line": {"width": 1}}),
                    name: frame.period.clone(),
                }),
                Trace::Scattermapbox(overlay_trace(&frame.points)),
            ],
        })
        .collect();

    let periods = map.periods();
    Figure {
        data: frames.first().map(|f| f.data.clone()).unwrap_or_default(),
        layout: json!({
            "margin": {"r": 0, "t": 0, "l": 0, "b": 0},
            "height": HEXBIN_HEIGHT,
            "coloraxis": {
                "colorscale": plotly_scale(&ICEFIRE_SCALE),
                "cmin": map.value_range.0,
                "cmax": map.value_range.1,
                "showscale": true,
                "colorbar": {"title": {"text": COLORBAR_TITLE}},
            },
            "mapbox": mapbox_layout(mapbox, map.center, map.zoom),
            "sliders": [period_slider(&periods)],
            "updatemenus": [play_buttons()],
        }),
        frames,
    }
}

fn mapbox_layout(mapbox: &MapboxCredentials, center: GeoPoint, zoom: u8) -> Value {
    json!({
        "accesstoken": mapbox.access_token,
        "style": mapbox.style,
        "center": {"lat": center.lat, "lon": center.lon},
        "zoom": zoom,
    })
}

fn overlay_trace(points: &[GeoPoint]) -> ScatterTrace {
    ScatterTrace {
        lat: points.iter().map(|p| p.lat).collect(),
        lon: points.iter().map(|p| p.lon).collect(),
        mode: "markers",
        name: None,
        hovertext: Vec::new(),
        customdata: Vec::new(),
        hovertemplate: None,
        hoverinfo: Some("skip"),
        marker: Marker {
            color: json!(to_hex(OVERLAY_POINT)),
            size: json!(4),
            opacity: Some(0.5),
            coloraxis: None,
            sizemode: None,
            sizeref: None,
        },
        showlegend: false,
    }
}

/// Every hexagon used by any frame, as a GeoJSON feature collection keyed by cell id.
fn hexagon_geojson(map: &HexbinMap) -> Value {
    let mut cells: BTreeMap<usize, &[GeoPoint]> = BTreeMap::new();
    for cell in map.frames.iter().flat_map(|f| &f.cells) {
        cells.entry(cell.id).or_insert(cell.vertices.as_slice());
    }

    let features: Vec<Value> = cells
        .into_iter()
        .map(|(id, vertices)| {
            let mut ring: Vec<[f64; 2]> = vertices.iter().map(|v| [v.lon, v.lat]).collect();
            if let Some(first) = ring.first().copied() {
                ring.push(first);
            }
            json!({
                "type": "Feature",
                "id": id.to_string(),
                "geometry": {"type": "Polygon", "coordinates": [ring]},
            })
        })
        .collect();

    json!({"type": "FeatureCollection", "features": features})
}

fn animation_args(duration: u32) -> Value {
    json!({
        "frame": {"duration": duration, "redraw": true},
        "mode": "immediate",
        "fromcurrent": true,
        "transition": {"duration": duration, "easing": "linear"},
    })
}

fn period_slider(periods: &[&str]) -> Value {
    let steps: Vec<Value> = periods
        .iter()
        .map(|period| {
            json!({
                "args": [[period], animation_args(0)],
                "label": period,
                "method": "animate",
            })
        })
        .collect();

    json!({
        "active": 0,
        "currentvalue": {"prefix": "Period="},
        "len": 0.9,
        "x": 0.1,
        "xanchor": "left",
        "y": 0,
        "yanchor": "top",
        "pad": {"b": 10, "t": 20},
        "steps": steps,
    })
}

fn play_buttons() -> Value {
    json!({
        "type": "buttons",
        "direction": "left",
        "showactive": false,
        "x": 0.1,
        "xanchor": "right",
        "y": 0,
        "yanchor": "top",
        "pad": {"r": 10, "t": 40},
        "buttons": [
            {"args": [Value::Null, animation_args(500)], "label": "&#9654;", "method": "animate"},
            {"args": [[Value::Null], animation_args(0)], "label": "&#9724;", "method": "animate"},
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::fixtures::points_frame;

    fn credentials() -> MapboxCredentials {
        MapboxCredentials {
            access_token: "pk.test".into(),
            style: "mapbox://styles/me/abc".into(),
        }
    }

    fn to_value(figure: &Figure) -> Value {
        serde_json::from_str(&figure.to_json().unwrap()).unwrap()
    }

    #[test]
    fn scatter_figure_carries_points_and_mapbox() {
        let df = points_frame(&[(35.6, 139.7, 1000, "2021-1"), (35.8, 139.9, 3000, "2021-1")]);
        let map = ScatterMap::build(&df, 12).unwrap();
        let fig = to_value(&scatter_figure(&map, &credentials()));

        let trace = &fig["data"][0];
        assert_eq!(trace["type"], "scattermapbox");
        assert_eq!(trace["lat"].as_array().unwrap().len(), 2);
        assert_eq!(trace["customdata"][1], json!([3000, "100", "Marunouchi", "5"]));
        assert_eq!(trace["hovertemplate"], SCATTER_HOVER);
        assert_eq!(trace["marker"]["sizemode"], "area");

        let mapbox = &fig["layout"]["mapbox"];
        assert_eq!(mapbox["accesstoken"], "pk.test");
        assert_eq!(mapbox["style"], "mapbox://styles/me/abc");
        assert_eq!(mapbox["zoom"], 12);
        assert!((mapbox["center"]["lat"].as_f64().unwrap() - 35.7).abs() < 1e-9);
        assert_eq!(fig["layout"]["coloraxis"]["showscale"], false);
        assert!(fig.get("frames").is_none());
    }

    #[test]
    fn hexbin_figure_animates_periods() {
        let df = points_frame(&[
            (35.60, 139.60, 100, "2021-1"),
            (35.70, 139.80, 400, "2021-1"),
            (35.65, 139.70, 250, "2021-2"),
        ]);
        let map = HexbinMap::build(&df, 9, 20).unwrap();
        let fig = to_value(&hexbin_figure(&map, &credentials()));

        let frames = fig["frames"].as_array().unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0]["name"], "2021-1");
        assert_eq!(frames[1]["data"][0]["z"], json!([250.0]));

        assert_eq!(fig["data"][0]["type"], "choroplethmapbox");
        assert_eq!(fig["data"][0]["marker"]["opacity"], HEXBIN_OPACITY);
        let overlay = &fig["data"][1];
        assert_eq!(overlay["type"], "scattermapbox");
        assert_eq!(overlay["marker"]["color"], "#ff1493");
        assert_eq!(overlay["marker"]["size"], 4);

        let features = fig["data"][0]["geojson"]["features"].as_array().unwrap();
        let used: usize = map.frames.iter().map(|f| f.cells.len()).sum();
        assert!(!features.is_empty() && features.len() <= used);
        let ring = features[0]["geometry"]["coordinates"][0].as_array().unwrap();
        assert_eq!(ring.len(), 7);
        assert_eq!(ring.first(), ring.last());

        let layout = &fig["layout"];
        assert_eq!(layout["height"], 700);
        assert_eq!(layout["sliders"][0]["pad"]["t"], 20);
        assert_eq!(layout["sliders"][0]["steps"].as_array().unwrap().len(), 2);
        assert_eq!(layout["updatemenus"][0]["pad"]["t"], 40);
        assert_eq!(layout["coloraxis"]["cmin"], 100.0);
        assert_eq!(layout["coloraxis"]["cmax"], 400.0);
        assert_eq!(layout["coloraxis"]["colorbar"]["title"]["text"], COLORBAR_TITLE);
    }
}
