//! Spatial resolution of a region against a gridded series.
//!
//! Point regions take the single nearest cell, boxes take an inclusive
//! subset, polygons take their envelope with outside cells marked by the
//! outside-area sentinel. Cross-grid regridding is nearest-neighbour only;
//! equidistant ties go to the lower cell index on both axes.

use drought_common::series::OUTSIDE_AREA;
use drought_common::{BoundingBox, GriddedSeries, GridSpec, Region};

/// Resolve a region against a source series.
pub fn resolve_region(series: &GriddedSeries, region: &Region) -> GriddedSeries {
    match region {
        Region::Point { lat, lon } => extract_point(series, *lat, *lon),
        Region::Box(bbox) => subset_bbox(series, bbox),
        Region::Polygon(_) => {
            let subset = subset_bbox(series, &region.envelope());
            mask_polygon(subset, region)
        }
    }
}

/// Nearest-cell extraction for a point, no distance cutoff.
fn extract_point(series: &GriddedSeries, lat: f64, lon: f64) -> GriddedSeries {
    let cell = series.spec.nearest_index(lon, lat);
    let (cell_lon, cell_lat) = series.spec.index_to_coords(cell);
    let spec = GridSpec::point(cell_lat, cell_lon);
    let values = series.cell_series(cell).collect();
    GriddedSeries::new(spec, series.times.clone(), values)
}

/// Inclusive subset of the cells whose centers fall inside the bbox.
///
/// A box too small to cover any cell center degenerates to the single cell
/// nearest its center.
fn subset_bbox(series: &GriddedSeries, bbox: &BoundingBox) -> GriddedSeries {
    let spec = &series.spec;
    let (res_x, res_y) = spec.resolution();

    let mut cols: Vec<usize> = Vec::new();
    for col in 0..spec.width {
        let (lon, _) = spec.cell_to_coords(col, 0);
        if lon >= bbox.min_lon && lon <= bbox.max_lon {
            cols.push(col);
        }
    }
    let mut rows: Vec<usize> = Vec::new();
    for row in 0..spec.height {
        let (_, lat) = spec.cell_to_coords(0, row);
        if lat >= bbox.min_lat && lat <= bbox.max_lat {
            rows.push(row);
        }
    }

    if cols.is_empty() || rows.is_empty() {
        let (lon, lat) = bbox.center();
        return extract_point(series, lat, lon);
    }

    let (col0, ncols) = (cols[0], cols.len());
    let (row0, nrows) = (rows[0], rows.len());
    let sub_bbox = BoundingBox::new(
        spec.bbox.min_lon + col0 as f64 * res_x,
        spec.bbox.max_lat - (row0 + nrows) as f64 * res_y,
        spec.bbox.min_lon + (col0 + ncols) as f64 * res_x,
        spec.bbox.max_lat - row0 as f64 * res_y,
    );
    let sub_spec = GridSpec::new(sub_bbox, ncols, nrows);

    let mut values = Vec::with_capacity(series.times.len() * sub_spec.num_cells());
    for t in 0..series.times.len() {
        let slice = series.time_slice(t);
        for row in row0..row0 + nrows {
            for col in col0..col0 + ncols {
                values.push(slice[row * spec.width + col]);
            }
        }
    }

    GriddedSeries::new(sub_spec, series.times.clone(), values)
}

/// Mark every cell whose center falls outside the polygon.
///
/// The sentinel is distinct from missing: a masked cell was deliberately
/// excluded, not unobserved.
fn mask_polygon(mut series: GriddedSeries, region: &Region) -> GriddedSeries {
    let cells = series.spec.num_cells();
    let outside: Vec<bool> = (0..cells)
        .map(|cell| {
            let (lon, lat) = series.spec.index_to_coords(cell);
            !region.contains(lon, lat)
        })
        .collect();

    for t in 0..series.times.len() {
        for (cell, is_out) in outside.iter().enumerate() {
            if *is_out {
                series.values[t * cells + cell] = OUTSIDE_AREA;
            }
        }
    }
    series
}

/// Resample a series onto a target grid by nearest-neighbour lookup.
///
/// A target matching the source grid is a no-op. Sentinel values transfer
/// unchanged, so outside-area cells stay distinguishable after regridding.
pub fn regrid_nearest(series: &GriddedSeries, target: &GridSpec) -> GriddedSeries {
    if *target == series.spec {
        return series.clone();
    }

    let src_cells = series.spec.num_cells();
    let dst_cells = target.num_cells();
    let lookup: Vec<usize> = (0..dst_cells)
        .map(|cell| {
            let (lon, lat) = target.index_to_coords(cell);
            series.spec.nearest_index(lon, lat)
        })
        .collect();

    let mut values = Vec::with_capacity(series.times.len() * dst_cells);
    for t in 0..series.times.len() {
        let src = &series.values[t * src_cells..(t + 1) * src_cells];
        values.extend(lookup.iter().map(|&i| src[i]));
    }

    GriddedSeries::new(*target, series.times.clone(), values)
}

/// The shared output grid for a combination run.
///
/// Fixed policy: the highest-resolution (smallest-cell) native grid among
/// the inputs; the first wins a tie.
pub fn shared_grid(specs: &[GridSpec]) -> Option<GridSpec> {
    let mut best: Option<GridSpec> = None;
    for spec in specs {
        match best {
            None => best = Some(*spec),
            Some(current) if spec.cell_area() < current.cell_area() => best = Some(*spec),
            Some(_) => {}
        }
    }
    best
}
