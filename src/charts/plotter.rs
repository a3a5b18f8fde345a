//! Chart Plotter Module
//! Interactive previews of the dashboard charts using egui_plot.

use super::colors::{Rgb, OVERLAY_POINT, PRICE_SCALE};
use super::{ChartError, GeoPoint, HexFrame, HexbinMap, ScatterMap};
use crate::data::{FilterSelection, FilteredView};
use crate::stats::{CategoryMean, PriceSummary, PurposeTrend, StatsCalculator};
use egui::{Color32, RichText, Stroke};
use egui_plot::{Bar, BarChart, Legend, Line, Plot, PlotPoints, Points, Polygon};

/// Line colors of the purpose trend chart.
pub const PALETTE: [Color32; 10] = [
    Color32::from_rgb(231, 76, 60),  // Red
    Color32::from_rgb(46, 204, 113), // Green
    Color32::from_rgb(155, 89, 182), // Purple
    Color32::from_rgb(243, 156, 18), // Orange
    Color32::from_rgb(26, 188, 156), // Teal
    Color32::from_rgb(233, 30, 99),  // Pink
    Color32::from_rgb(0, 188, 212),  // Cyan
    Color32::from_rgb(52, 152, 219), // Blue
    Color32::from_rgb(121, 85, 72),  // Brown
    Color32::from_rgb(96, 125, 139), // Blue Grey
];

const MAP_HEIGHT: f32 = 420.0;
const CHART_HEIGHT: f32 = 280.0;
/// Marker radii of the point map preview, smallest unit price first.
const SIZE_LEVELS: [f32; 4] = [2.5, 4.0, 6.0, 8.5];

/// Everything the central panel draws for one filter selection.
#[derive(Debug, Clone, Default)]
pub struct DashboardCharts {
    pub title: String,
    pub scatter: Option<ScatterMap>,
    pub hexbin: Option<HexbinMap>,
    pub layout_means: Vec<CategoryMean>,
    pub trends: Vec<PurposeTrend>,
    pub summary: PriceSummary,
}

impl DashboardCharts {
    /// Point map, layout means and summary come from the quarter rows; the hexbin
    /// animation and purpose trends span the whole region.
    pub fn from_view(
        view: &FilteredView,
        selection: &FilterSelection,
        hexbin_zoom: u8,
        hexagon_count: usize,
    ) -> Result<Self, ChartError> {
        Ok(Self {
            title: dashboard_title(selection, view),
            scatter: allow_empty(ScatterMap::build(&view.quarter, view.zoom))?,
            hexbin: allow_empty(HexbinMap::build(&view.region, hexbin_zoom, hexagon_count))?,
            layout_means: StatsCalculator::mean_unit_price_by_layout(&view.quarter)?,
            trends: StatsCalculator::unit_price_trend_by_purpose(&view.region)?,
            summary: PriceSummary::from_frame(&view.quarter)?,
        })
    }
}

/// An empty selection draws nothing instead of failing.
fn allow_empty<T>(result: Result<T, ChartError>) -> Result<Option<T>, ChartError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ChartError::EmptyTable) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Selection line above the charts. Filters absent from the quarter are marked as ignored.
pub fn dashboard_title(selection: &FilterSelection, view: &FilteredView) -> String {
    let or_all = |value: &Option<String>| value.clone().unwrap_or_else(|| "All".to_string());
    let ignored = |value: &Option<String>, applied: bool| {
        if value.is_some() && !applied {
            " (not in quarter)"
        } else {
            ""
        }
    };
    format!(
        "Prefecture: {}  Quarter: {}  Purpose of Use: {}{}  City: {}{}",
        or_all(&selection.prefecture),
        or_all(&selection.period),
        or_all(&selection.purpose_of_use),
        ignored(&selection.purpose_of_use, view.purpose_applied),
        or_all(&selection.city),
        ignored(&selection.city, view.city_applied),
    )
}

fn color32(rgb: Rgb) -> Color32 {
    Color32::from_rgb(rgb[0], rgb[1], rgb[2])
}

/// Longitude units per latitude unit that keep the map roughly conformal.
fn map_aspect(center: GeoPoint) -> f32 {
    let cos = center.lat.to_radians().cos().abs().max(0.1);
    (1.0 / cos) as f32
}

/// Creates the dashboard previews using egui_plot.
pub struct ChartPlotter;

impl ChartPlotter {
    /// Point map: one series per (color step, size level) bucket.
    pub fn draw_scatter_map(ui: &mut egui::Ui, map: &ScatterMap) {
        let levels = SIZE_LEVELS.len();
        let mut buckets: Vec<Vec<[f64; 2]>> = vec![Vec::new(); PRICE_SCALE.len() * levels];
        let steps = (PRICE_SCALE.len() - 1) as f64;
        for point in &map.points {
            let step = ((map.price_position(point.unit_price) * steps).round() as usize)
                .min(PRICE_SCALE.len() - 1);
            let level = (map.radius_of(point, 0.0, (levels - 1) as f64).round() as usize)
                .min(levels - 1);
            buckets[step * levels + level].push([point.position.lon, point.position.lat]);
        }

        Plot::new("scatter_map")
            .height(MAP_HEIGHT)
            .data_aspect(map_aspect(map.center))
            .x_axis_label("Longitude")
            .y_axis_label("Latitude")
            .allow_scroll(false)
            .show(ui, |plot_ui| {
                for (i, bucket) in buckets.into_iter().enumerate() {
                    if bucket.is_empty() {
                        continue;
                    }
                    plot_ui.points(
                        Points::new(PlotPoints::from(bucket))
                            .radius(SIZE_LEVELS[i % levels])
                            .color(color32(PRICE_SCALE[i / levels])),
                    );
                }
            });

        ui.label(
            RichText::new(format!(
                "{} transactions, unit price {} - {} per m²",
                map.points.len(),
                map.price_range.0,
                map.price_range.1
            ))
            .size(11.0)
            .weak(),
        );
    }

    /// One frame of the hexbin animation with its raw points on top.
    pub fn draw_hexbin_frame(ui: &mut egui::Ui, map: &HexbinMap, frame: &HexFrame) {
        Plot::new("hexbin_map")
            .height(MAP_HEIGHT)
            .data_aspect(map_aspect(map.center))
            .x_axis_label("Longitude")
            .y_axis_label("Latitude")
            .allow_scroll(false)
            .show(ui, |plot_ui| {
                for cell in &frame.cells {
                    let color = color32(map.color_of(cell));
                    let outline: PlotPoints =
                        cell.vertices.iter().map(|v| [v.lon, v.lat]).collect();
                    plot_ui.polygon(
                        Polygon::new(outline)
                            .fill_color(color.gamma_multiply(0.9))
                            .stroke(Stroke::new(1.0, Color32::WHITE)),
                    );
                }

                let points: PlotPoints = frame.points.iter().map(|p| [p.lon, p.lat]).collect();
                plot_ui.points(
                    Points::new(points)
                        .radius(2.0)
                        .color(color32(OVERLAY_POINT).gamma_multiply(0.5)),
                );
            });

        ui.label(
            RichText::new(format!(
                "Period {}: {} cells, mean price per m² {:.0} - {:.0}",
                frame.period,
                frame.cells.len(),
                map.value_range.0,
                map.value_range.1
            ))
            .size(11.0)
            .weak(),
        );
    }

    /// Mean unit price per layout, highest first.
    pub fn draw_layout_bars(ui: &mut egui::Ui, means: &[CategoryMean]) {
        let labels: Vec<String> = means.iter().map(|m| m.label.clone()).collect();
        let bars: Vec<Bar> = means
            .iter()
            .enumerate()
            .map(|(i, m)| {
                Bar::new(i as f64, m.mean)
                    .name(&m.label)
                    .width(0.7)
                    .fill(PALETTE[i % PALETTE.len()])
            })
            .collect();

        Plot::new("layout_bars")
            .height(CHART_HEIGHT)
            .x_axis_label("Layout")
            .y_axis_label("Unit price per m²")
            .allow_zoom(false)
            .allow_drag(false)
            .allow_scroll(false)
            .x_axis_formatter(move |mark, _range| category_label(&labels, mark.value))
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(BarChart::new(bars).name("Mean unit price"));
            });
    }

    /// Mean unit price per period, one line per purpose of use.
    pub fn draw_purpose_trends(ui: &mut egui::Ui, trends: &[PurposeTrend]) {
        let periods = StatsCalculator::trend_periods(trends);
        let index_of = |period: &str| periods.iter().position(|p| p == period);

        let lines: Vec<(String, Vec<[f64; 2]>)> = trends
            .iter()
            .map(|trend| {
                let points = trend
                    .points
                    .iter()
                    .filter_map(|(period, mean)| Some([index_of(period)? as f64, *mean]))
                    .collect();
                (trend.purpose.clone(), points)
            })
            .collect();

        Plot::new("purpose_trends")
            .height(CHART_HEIGHT)
            .legend(Legend::default())
            .x_axis_label("Transaction period")
            .y_axis_label("Unit price per m²")
            .allow_scroll(false)
            .x_axis_formatter(move |mark, _range| category_label(&periods, mark.value))
            .show(ui, |plot_ui| {
                for (i, (purpose, points)) in lines.into_iter().enumerate() {
                    plot_ui.line(
                        Line::new(PlotPoints::from(points))
                            .color(PALETTE[i % PALETTE.len()])
                            .width(1.5)
                            .name(purpose),
                    );
                }
            });
    }

    /// Draw statistics table
    pub fn draw_summary_table(ui: &mut egui::Ui, summary: &PriceSummary) {
        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                egui::Grid::new(ui.make_persistent_id("price_summary"))
                    .striped(true)
                    .min_col_width(55.0)
                    .spacing([8.0, 4.0])
                    .show(ui, |ui| {
                        for header in ["N", "Mean", "Median", "P05", "P95"] {
                            ui.label(RichText::new(header).strong().size(11.0));
                        }
                        ui.end_row();

                        ui.label(RichText::new(summary.count.to_string()).size(11.0));
                        for value in [summary.mean, summary.median, summary.p05, summary.p95] {
                            ui.label(RichText::new(format_price(value)).size(11.0));
                        }
                        ui.end_row();
                    });
            });
    }
}

/// Axis label of a categorical x position; blank between categories.
fn category_label(labels: &[String], value: f64) -> String {
    let idx = value.round();
    if (value - idx).abs() > 1e-6 || idx < 0.0 {
        return String::new();
    }
    labels.get(idx as usize).cloned().unwrap_or_default()
}

fn format_price(value: f64) -> String {
    if value.is_nan() {
        "-".to_string()
    } else {
        format!("{:.0}", value)
    }
}
