//! Gridded series types.
//!
//! Values are `f32` with two distinct sentinel encodings: NaN marks a
//! genuinely missing sample, while [`OUTSIDE_AREA`] marks a cell whose center
//! falls outside a requested polygon. Downstream consumers filter the two
//! independently; an outside-area cell must never be read as "no data".

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::dekad::Dekad;

/// Sentinel for grid cells outside the requested polygon.
pub const OUTSIDE_AREA: f32 = -9999.0;

/// True when a value is the outside-area sentinel.
pub fn is_outside(value: f32) -> bool {
    value == OUTSIDE_AREA
}

/// True when a value marks a missing sample.
pub fn is_missing(value: f32) -> bool {
    value.is_nan()
}

/// True when a value is an actual observation (neither sentinel).
pub fn is_observed(value: f32) -> bool {
    !is_missing(value) && !is_outside(value)
}

/// A regular latitude/longitude grid: bounds plus cell counts.
///
/// Cells are addressed row-major, top-to-bottom: row 0 is the northernmost
/// band. A point series is the degenerate 1x1 grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Geographic bounds of the grid.
    pub bbox: BoundingBox,
    /// Number of cells along the longitude axis.
    pub width: usize,
    /// Number of cells along the latitude axis.
    pub height: usize,
}

impl GridSpec {
    /// Create a new grid specification.
    pub fn new(bbox: BoundingBox, width: usize, height: usize) -> Self {
        Self {
            bbox,
            width,
            height,
        }
    }

    /// The degenerate single-cell grid at a point.
    pub fn point(lat: f64, lon: f64) -> Self {
        Self {
            bbox: BoundingBox::new(lon, lat, lon, lat),
            width: 1,
            height: 1,
        }
    }

    /// Total number of cells.
    pub fn num_cells(&self) -> usize {
        self.width * self.height
    }

    /// True for the degenerate single-cell grid.
    pub fn is_point(&self) -> bool {
        self.width == 1 && self.height == 1
    }

    /// Grid resolution in degrees per cell (lon, lat).
    pub fn resolution(&self) -> (f64, f64) {
        (
            self.bbox.width() / self.width as f64,
            self.bbox.height() / self.height as f64,
        )
    }

    /// Cell area in square degrees; the shared-grid policy picks the smallest.
    pub fn cell_area(&self) -> f64 {
        let (rx, ry) = self.resolution();
        rx * ry
    }

    /// Geographic coordinates of a cell center as (lon, lat).
    pub fn cell_to_coords(&self, col: usize, row: usize) -> (f64, f64) {
        let (res_x, res_y) = self.resolution();
        let lon = self.bbox.min_lon + (col as f64 + 0.5) * res_x;
        let lat = self.bbox.max_lat - (row as f64 + 0.5) * res_y;
        (lon, lat)
    }

    /// Coordinates of a cell center by flat index.
    pub fn index_to_coords(&self, index: usize) -> (f64, f64) {
        self.cell_to_coords(index % self.width, index / self.width)
    }

    /// The cell whose center is nearest to (lon, lat).
    ///
    /// There is no distance cutoff: coordinates outside the grid map to the
    /// nearest edge cell. Equidistant ties resolve to the lower cell index.
    pub fn nearest_cell(&self, lon: f64, lat: f64) -> (usize, usize) {
        let (res_x, res_y) = self.resolution();
        let col = nearest_axis_index(lon - self.bbox.min_lon, res_x, self.width);
        // rows count downward from the northern edge
        let row = nearest_axis_index(self.bbox.max_lat - lat, res_y, self.height);
        (col, row)
    }

    /// Flat index of the nearest cell.
    pub fn nearest_index(&self, lon: f64, lat: f64) -> usize {
        let (col, row) = self.nearest_cell(lon, lat);
        row * self.width + col
    }
}

/// Nearest cell index along one axis, measured from the axis origin.
///
/// `offset` is the distance from the origin edge, `res` the cell size. Ties
/// between two equidistant centers go to the lower index.
fn nearest_axis_index(offset: f64, res: f64, len: usize) -> usize {
    if len <= 1 || res <= 0.0 {
        return 0;
    }
    // fractional index of the offset relative to cell centers
    let frac = offset / res - 0.5;
    let lo = frac.floor().clamp(0.0, (len - 1) as f64) as usize;
    let hi = (lo + 1).min(len - 1);
    let d_lo = (frac - lo as f64).abs();
    let d_hi = (hi as f64 - frac).abs();
    if d_hi < d_lo {
        hi
    } else {
        lo
    }
}

/// A raw, pre-alignment frame: one timestamp and one value per grid cell.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    pub time: NaiveDateTime,
    pub values: Vec<f32>,
}

/// A raw acquired series with arbitrary, possibly irregular timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSeries {
    pub spec: GridSpec,
    pub samples: Vec<RawSample>,
}

impl RawSeries {
    /// Create a raw series, sorting samples by timestamp.
    pub fn new(spec: GridSpec, mut samples: Vec<RawSample>) -> Self {
        samples.sort_by_key(|s| s.time);
        Self { spec, samples }
    }

    /// A series with no samples.
    pub fn empty(spec: GridSpec) -> Self {
        Self {
            spec,
            samples: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// A dekad-aligned labelled array over (time, lat, lon).
///
/// The time axis is strictly increasing with no duplicates; values are stored
/// time-major, each time step holding `spec.num_cells()` values row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct GriddedSeries {
    pub spec: GridSpec,
    pub times: Vec<Dekad>,
    pub values: Vec<f32>,
}

impl GriddedSeries {
    /// Create a new series. The value buffer length must match the axes.
    pub fn new(spec: GridSpec, times: Vec<Dekad>, values: Vec<f32>) -> Self {
        debug_assert_eq!(values.len(), times.len() * spec.num_cells());
        Self {
            spec,
            times,
            values,
        }
    }

    /// A series with no time steps.
    pub fn empty(spec: GridSpec) -> Self {
        Self {
            spec,
            times: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Number of time steps.
    pub fn num_times(&self) -> usize {
        self.times.len()
    }

    /// True when the series holds no time steps at all.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// All cell values for one time step.
    pub fn time_slice(&self, t: usize) -> &[f32] {
        let n = self.spec.num_cells();
        &self.values[t * n..(t + 1) * n]
    }

    /// Value at (time index, flat cell index).
    pub fn value(&self, t: usize, cell: usize) -> f32 {
        self.values[t * self.spec.num_cells() + cell]
    }

    /// Values of one cell across all time steps.
    pub fn cell_series(&self, cell: usize) -> impl Iterator<Item = f32> + '_ {
        let n = self.spec.num_cells();
        self.times
            .iter()
            .enumerate()
            .map(move |(t, _)| self.values[t * n + cell])
    }

    /// The single-cell value series of a point grid.
    pub fn point_values(&self) -> impl Iterator<Item = f32> + '_ {
        self.cell_series(0)
    }
}
