//! Animated hexbin map: mean unit price per hexagonal cell, one frame per period.
//!
//! Points are projected to Web Mercator and binned on two interleaved rectangular
//! lattices, the classic hexbin construction. The grid is fitted once over every
//! point so all frames share the same cells.

use super::colors::{interpolate, normalize, Rgb, ICEFIRE_SCALE};
use super::scatter::{map_points, mean_center};
use super::{ChartError, GeoPoint};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};
use tracing::debug;

/// Hexagon corner offsets in units of `(dx, dy / 3)`.
const HEX_CORNERS: [(f64, f64); 6] = [
    (0.5, -0.5),
    (0.5, 0.5),
    (0.0, 1.0),
    (-0.5, 0.5),
    (-0.5, -0.5),
    (0.0, -1.0),
];

/// Project degrees to Web Mercator (radians).
pub fn project(point: GeoPoint) -> (f64, f64) {
    let x = point.lon.to_radians();
    let y = (FRAC_PI_4 + point.lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

pub fn unproject(x: f64, y: f64) -> GeoPoint {
    GeoPoint {
        lat: (2.0 * y.exp().atan() - FRAC_PI_2).to_degrees(),
        lon: x.to_degrees(),
    }
}

/// Hexagonal grid over a projected extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HexGrid {
    xmin: f64,
    ymin: f64,
    dx: f64,
    dy: f64,
    nx: usize,
    ny: usize,
}

impl HexGrid {
    /// Fit a grid with `nx` hexagons across the x extent of `points`.
    pub fn fit(points: &[GeoPoint], nx: usize) -> Result<Self, ChartError> {
        if nx == 0 {
            return Err(ChartError::InvalidHexagonCount);
        }
        if points.is_empty() {
            return Err(ChartError::EmptyTable);
        }
        let projected: Vec<(f64, f64)> = points.iter().map(|p| project(*p)).collect();
        let (mut xmin, mut xmax, ymin, ymax) = projected.iter().fold(
            (
                f64::INFINITY,
                f64::NEG_INFINITY,
                f64::INFINITY,
                f64::NEG_INFINITY,
            ),
            |(x0, x1, y0, y1), &(x, y)| (x0.min(x), x1.max(x), y0.min(y), y1.max(y)),
        );

        let padding = 1.0e-9 * (xmax - xmin);
        xmin -= padding;
        xmax += padding;
        let span_x = xmax - xmin;
        let span_y = ymax - ymin;

        let dx = if span_x > 0.0 {
            span_x / nx as f64
        } else if span_y > 0.0 {
            span_y / nx as f64
        } else {
            1.0_f64.to_radians()
        };
        let dy = dx * 3.0_f64.sqrt();
        let ny = ((span_y / dy).ceil() as usize).max(1);
        // Center the rows vertically over the extent.
        let ymin = ymin - (ymin + dy * ny as f64 - ymax) / 2.0;

        Ok(Self {
            xmin,
            ymin,
            dx,
            dy,
            nx,
            ny,
        })
    }

    pub fn columns(&self) -> usize {
        self.nx
    }

    pub fn rows(&self) -> usize {
        self.ny
    }

    /// Number of cells across both lattices.
    pub fn cell_count(&self) -> usize {
        self.first_lattice_len() + self.nx * self.ny
    }

    fn first_lattice_len(&self) -> usize {
        (self.nx + 1) * (self.ny + 1)
    }

    /// Id of the cell containing `point`.
    pub fn cell_of(&self, point: GeoPoint) -> usize {
        let (x, y) = project(point);
        let x = (x - self.xmin) / self.dx;
        let y = (y - self.ymin) / self.dy;

        let (ix1, iy1) = (x.round(), y.round());
        let (ix2, iy2) = (x.floor(), y.floor());
        let d1 = (x - ix1).powi(2) + 3.0 * (y - iy1).powi(2);
        let d2 = (x - ix2 - 0.5).powi(2) + 3.0 * (y - iy2 - 0.5).powi(2);

        if d1 < d2 {
            let ix = clamp_index(ix1, self.nx);
            let iy = clamp_index(iy1, self.ny);
            ix * (self.ny + 1) + iy
        } else {
            let ix = clamp_index(ix2, self.nx - 1);
            let iy = clamp_index(iy2, self.ny - 1);
            self.first_lattice_len() + ix * self.ny + iy
        }
    }

    /// Projected center of a cell.
    fn projected_center(&self, id: usize) -> (f64, f64) {
        let first = self.first_lattice_len();
        let (ix, iy) = if id < first {
            (
                (id / (self.ny + 1)) as f64,
                (id % (self.ny + 1)) as f64,
            )
        } else {
            let k = id - first;
            ((k / self.ny) as f64 + 0.5, (k % self.ny) as f64 + 0.5)
        };
        (self.xmin + ix * self.dx, self.ymin + iy * self.dy)
    }

    pub fn center(&self, id: usize) -> GeoPoint {
        let (x, y) = self.projected_center(id);
        unproject(x, y)
    }

    /// Corners of a cell, counter-clockwise from the lower right.
    pub fn vertices(&self, id: usize) -> Vec<GeoPoint> {
        let (cx, cy) = self.projected_center(id);
        HEX_CORNERS
            .iter()
            .map(|(ox, oy)| unproject(cx + ox * self.dx, cy + oy * self.dy / 3.0))
            .collect()
    }
}

fn clamp_index(value: f64, max: usize) -> usize {
    if value <= 0.0 {
        0
    } else {
        (value as usize).min(max)
    }
}

/// One non-empty hexagon of a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct HexCell {
    pub id: usize,
    pub center: GeoPoint,
    pub vertices: Vec<GeoPoint>,
    pub mean_price: f64,
    pub count: usize,
}

/// Cells and raw points of one transaction period.
#[derive(Debug, Clone, PartialEq)]
pub struct HexFrame {
    pub period: String,
    pub cells: Vec<HexCell>,
    pub points: Vec<GeoPoint>,
}

#[derive(Debug, Clone)]
pub struct HexbinMap {
    pub grid: HexGrid,
    pub frames: Vec<HexFrame>,
    pub center: GeoPoint,
    pub zoom: u8,
    pub hexagon_count: usize,
    /// Mean price range over every frame.
    pub value_range: (f64, f64),
}

impl HexbinMap {
    pub fn build(df: &DataFrame, zoom: u8, hexagon_count: usize) -> Result<Self, ChartError> {
        if hexagon_count == 0 {
            return Err(ChartError::InvalidHexagonCount);
        }
        let points = map_points(df)?;
        let positions: Vec<GeoPoint> = points.iter().map(|p| p.position).collect();
        let center = mean_center(&positions).ok_or(ChartError::EmptyTable)?;
        let grid = HexGrid::fit(&positions, hexagon_count)?;

        let mut by_period: BTreeMap<&str, Vec<(GeoPoint, f64)>> = BTreeMap::new();
        for point in &points {
            by_period
                .entry(point.period.as_str())
                .or_default()
                .push((point.position, point.unit_price as f64));
        }

        let mut value_range = (f64::INFINITY, f64::NEG_INFINITY);
        let mut frames = Vec::with_capacity(by_period.len());
        for (period, members) in by_period {
            let mut sums: BTreeMap<usize, (f64, usize)> = BTreeMap::new();
            for (position, price) in &members {
                let entry = sums.entry(grid.cell_of(*position)).or_insert((0.0, 0));
                entry.0 += price;
                entry.1 += 1;
            }

            let cells: Vec<HexCell> = sums
                .into_iter()
                .map(|(id, (sum, count))| HexCell {
                    id,
                    center: grid.center(id),
                    vertices: grid.vertices(id),
                    mean_price: sum / count as f64,
                    count,
                })
                .collect();
            for cell in &cells {
                value_range.0 = value_range.0.min(cell.mean_price);
                value_range.1 = value_range.1.max(cell.mean_price);
            }

            frames.push(HexFrame {
                period: period.to_string(),
                cells,
                points: members.into_iter().map(|(position, _)| position).collect(),
            });
        }

        debug!(
            frames = frames.len(),
            columns = grid.columns(),
            rows = grid.rows(),
            cells = grid.cell_count(),
            "Built hexbin map"
        );

        Ok(Self {
            grid,
            frames,
            center,
            zoom,
            hexagon_count,
            value_range,
        })
    }

    pub fn periods(&self) -> Vec<&str> {
        self.frames.iter().map(|f| f.period.as_str()).collect()
    }

    pub fn color_of(&self, cell: &HexCell) -> Rgb {
        interpolate(
            &ICEFIRE_SCALE,
            normalize(cell.mean_price, self.value_range.0, self.value_range.1),
        )
    }
}
