//! Deterministic synthetic series generators.

use chrono::NaiveDate;

use drought_common::{Dekad, GriddedSeries, GridSpec, RawSample, RawSeries};

/// Daily samples at a single point, one per day at noon.
///
/// The value of day `i` is `f(i)`; NaN values stand in for missing days.
pub fn daily_point_series(
    lat: f64,
    lon: f64,
    start: NaiveDate,
    days: usize,
    f: impl Fn(usize) -> f32,
) -> RawSeries {
    let spec = GridSpec::point(lat, lon);
    let samples = (0..days)
        .map(|i| RawSample {
            time: (start + chrono::Days::new(i as u64))
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            values: vec![f(i)],
        })
        .collect();
    RawSeries::new(spec, samples)
}

/// Hourly samples at a single point.
pub fn hourly_point_series(
    lat: f64,
    lon: f64,
    start: NaiveDate,
    hours: usize,
    f: impl Fn(usize) -> f32,
) -> RawSeries {
    let spec = GridSpec::point(lat, lon);
    let base = start.and_hms_opt(0, 0, 0).unwrap();
    let samples = (0..hours)
        .map(|i| RawSample {
            time: base + chrono::Duration::hours(i as i64),
            values: vec![f(i)],
        })
        .collect();
    RawSeries::new(spec, samples)
}

/// Gridded samples at exact dekad starts: one frame per dekad.
///
/// The value of cell `c` in frame `t` is `f(t, c)`. Feeding the result to
/// the aligner reproduces it unchanged.
pub fn dekad_grid_series(
    spec: GridSpec,
    start: NaiveDate,
    dekads: usize,
    f: impl Fn(usize, usize) -> f32,
) -> RawSeries {
    let mut samples = Vec::with_capacity(dekads);
    let mut dk = Dekad::containing(start);
    for t in 0..dekads {
        samples.push(RawSample {
            time: dk.start().and_hms_opt(0, 0, 0).unwrap(),
            values: (0..spec.num_cells()).map(|c| f(t, c)).collect(),
        });
        dk = dk.next();
    }
    RawSeries::new(spec, samples)
}

/// A dekad-aligned gridded series built directly, bypassing the aligner.
pub fn aligned_grid_series(
    spec: GridSpec,
    start: NaiveDate,
    dekads: usize,
    f: impl Fn(usize, usize) -> f32,
) -> GriddedSeries {
    let mut times = Vec::with_capacity(dekads);
    let mut dk = Dekad::containing(start);
    for _ in 0..dekads {
        times.push(dk);
        dk = dk.next();
    }
    let values = (0..dekads)
        .flat_map(|t| (0..spec.num_cells()).map(move |c| (t, c)))
        .map(|(t, c)| f(t, c))
        .collect();
    GriddedSeries::new(spec, times, values)
}
