//! Static Chart Renderer
//! Draws the point map and single hexbin frames into PNG images with plotters.
//!
//! Charts are drawn into an in-memory RGB buffer first so callers can inspect or
//! save the result; only `save_png` touches the filesystem.

use super::colors::{Rgb, OVERLAY_POINT};
use super::{GeoPoint, HexbinMap, ScatterMap};
use image::{ImageFormat, RgbImage};
use plotters::prelude::*;
use std::fmt::Display;
use std::ops::Range;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Fraction of the data extent added around the map.
const EXTENT_PADDING: f64 = 0.05;
/// Smallest span in degrees, so single-location maps still get an extent.
const MIN_SPAN: f64 = 0.01;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Drawing failed: {0}")]
    Drawing(String),

    #[error("Hexbin map has no frame {0}")]
    NoSuchFrame(usize),

    #[error("Image buffer does not match {width}x{height}")]
    Buffer { width: u32, height: u32 },

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

fn drawing<E: Display>(e: E) -> RenderError {
    RenderError::Drawing(e.to_string())
}

fn rgb(color: Rgb) -> RGBColor {
    RGBColor(color[0], color[1], color[2])
}

/// Padded longitude and latitude ranges around `points`.
fn extent(points: &[GeoPoint], fallback: GeoPoint) -> (Range<f64>, Range<f64>) {
    let (sw, ne) = GeoPoint::bounds(points).unwrap_or((fallback, fallback));
    let pad = |lo: f64, hi: f64| {
        let span = (hi - lo).max(MIN_SPAN);
        let mid = (lo + hi) / 2.0;
        let half = span * (0.5 + EXTENT_PADDING);
        (mid - half)..(mid + half)
    };
    (pad(sw.lon, ne.lon), pad(sw.lat, ne.lat))
}

pub struct StaticChartRenderer;

impl StaticChartRenderer {
    /// Point map, colored and sized by unit price.
    pub fn render_scatter(
        map: &ScatterMap,
        width: u32,
        height: u32,
        title: Option<&str>,
    ) -> Result<RgbImage, RenderError> {
        let positions: Vec<GeoPoint> = map.points.iter().map(|p| p.position).collect();
        let (x_range, y_range) = extent(&positions, map.center);

        Self::render(width, height, |root| {
            let mut builder = ChartBuilder::on(root);
            builder.margin(10);
            if let Some(title) = title {
                builder.caption(title, ("sans-serif", 18));
            }
            let mut chart = builder
                .build_cartesian_2d(x_range, y_range)
                .map_err(drawing)?;

            chart
                .draw_series(map.points.iter().map(|p| {
                    let radius = map.radius_of(p, 2.0, 9.0).round() as i32;
                    Circle::new(
                        (p.position.lon, p.position.lat),
                        radius,
                        rgb(map.color_of(p)).filled(),
                    )
                }))
                .map_err(drawing)?;
            Ok(())
        })
    }

    /// One period of the hexbin map with its raw points on top.
    pub fn render_hexbin_frame(
        map: &HexbinMap,
        frame_index: usize,
        width: u32,
        height: u32,
        title: Option<&str>,
    ) -> Result<RgbImage, RenderError> {
        let frame = map
            .frames
            .get(frame_index)
            .ok_or(RenderError::NoSuchFrame(frame_index))?;
        // Extent over every frame so stepping through periods keeps the view fixed.
        let corners: Vec<GeoPoint> = map
            .frames
            .iter()
            .flat_map(|f| f.cells.iter().flat_map(|c| c.vertices.iter().copied()))
            .collect();
        let (x_range, y_range) = extent(&corners, map.center);

        Self::render(width, height, |root| {
            let mut builder = ChartBuilder::on(root);
            builder.margin(10);
            if let Some(title) = title {
                builder.caption(format!("{title} ({})", frame.period), ("sans-serif", 18));
            }
            let mut chart = builder
                .build_cartesian_2d(x_range, y_range)
                .map_err(drawing)?;

            chart
                .draw_series(frame.cells.iter().map(|cell| {
                    let outline: Vec<(f64, f64)> =
                        cell.vertices.iter().map(|v| (v.lon, v.lat)).collect();
                    Polygon::new(outline, rgb(map.color_of(cell)).filled())
                }))
                .map_err(drawing)?;

            let overlay = rgb(OVERLAY_POINT).mix(0.5).filled();
            chart
                .draw_series(
                    frame
                        .points
                        .iter()
                        .map(|p| Circle::new((p.lon, p.lat), 2, overlay)),
                )
                .map_err(drawing)?;
            Ok(())
        })
    }

    pub fn save_png(image: &RgbImage, path: &Path) -> Result<(), RenderError> {
        image.save_with_format(path, ImageFormat::Png)?;
        info!(path = %path.display(), width = image.width(), height = image.height(), "Saved PNG");
        Ok(())
    }

    fn render<F>(width: u32, height: u32, draw: F) -> Result<RgbImage, RenderError>
    where
        F: FnOnce(&DrawingArea<BitMapBackend<'_>, plotters::coord::Shift>) -> Result<(), RenderError>,
    {
        let mut buffer = vec![0u8; width as usize * height as usize * 3];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
            root.fill(&WHITE).map_err(drawing)?;
            draw(&root)?;
            root.present().map_err(drawing)?;
        }
        RgbImage::from_raw(width, height, buffer).ok_or(RenderError::Buffer { width, height })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::colors::{ICEFIRE_SCALE, PRICE_SCALE};
    use crate::charts::fixtures::points_frame;

    fn contains_color(image: &RgbImage, color: Rgb) -> bool {
        image.pixels().any(|p| p.0 == color)
    }

    #[test]
    fn scatter_png_draws_price_colors() {
        let df = points_frame(&[
            (35.60, 139.60, 100, "2021-1"),
            (35.70, 139.70, 1000, "2021-1"),
            (35.80, 139.80, 10000, "2021-1"),
        ]);
        let map = ScatterMap::build(&df, 10).unwrap();
        let image = StaticChartRenderer::render_scatter(&map, 320, 240, None).unwrap();
        assert_eq!(image.dimensions(), (320, 240));
        assert!(contains_color(&image, PRICE_SCALE[11]));
        assert!(contains_color(&image, PRICE_SCALE[0]));
    }

    #[test]
    fn hexbin_png_fills_cells() {
        let df = points_frame(&[
            (35.60, 139.50, 100, "2021-1"),
            (35.70, 139.70, 250, "2021-1"),
            (35.80, 139.90, 400, "2021-1"),
        ]);
        let map = HexbinMap::build(&df, 9, 20).unwrap();
        let image = StaticChartRenderer::render_hexbin_frame(&map, 0, 400, 400, None).unwrap();
        assert!(contains_color(&image, ICEFIRE_SCALE[8]));
    }

    #[test]
    fn missing_frame_is_an_error() {
        let df = points_frame(&[(35.6, 139.6, 100, "2021-1")]);
        let map = HexbinMap::build(&df, 9, 20).unwrap();
        assert!(matches!(
            StaticChartRenderer::render_hexbin_frame(&map, 3, 100, 100, None),
            Err(RenderError::NoSuchFrame(3))
        ));
    }

    #[test]
    fn saves_png_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.png");
        let df = points_frame(&[(35.6, 139.6, 100, "2021-1")]);
        let map = ScatterMap::build(&df, 10).unwrap();
        let image = StaticChartRenderer::render_scatter(&map, 64, 48, None).unwrap();
        StaticChartRenderer::save_png(&image, &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }
}
