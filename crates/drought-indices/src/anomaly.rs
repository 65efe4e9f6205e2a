//! Anomaly derivation against the baseline window.
//!
//! The built-in standardization is a per-cell z-score over the baseline
//! period. Fitted-distribution transforms (gamma-fit SPI) are external
//! collaborators plugged in through [`DistributionFit`].

use chrono::NaiveDate;

use drought_common::series::{is_observed, is_outside};
use drought_common::GriddedSeries;

/// Validity range of a fitted standardized index.
pub const FITTED_INDEX_VALID_MIN: f32 = -3.09;
pub const FITTED_INDEX_VALID_MAX: f32 = 3.09;

/// Per-cell baseline statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineStats {
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
}

/// Compute per-cell mean and population standard deviation over the
/// baseline window. Cells with no observations in the window get NaN stats.
pub fn baseline_stats(
    series: &GriddedSeries,
    baseline_start: NaiveDate,
    baseline_end: NaiveDate,
) -> BaselineStats {
    let cells = series.spec.num_cells();
    let mut mean = vec![f32::NAN; cells];
    let mut std = vec![f32::NAN; cells];

    for cell in 0..cells {
        let observed: Vec<f32> = series
            .times
            .iter()
            .enumerate()
            .filter(|(_, dk)| dk.start() >= baseline_start && dk.start() <= baseline_end)
            .map(|(t, _)| series.value(t, cell))
            .filter(|v| is_observed(*v))
            .collect();

        if observed.is_empty() {
            continue;
        }
        let m = observed.iter().sum::<f32>() / observed.len() as f32;
        let var = observed.iter().map(|v| (v - m) * (v - m)).sum::<f32>() / observed.len() as f32;
        mean[cell] = m;
        std[cell] = var.sqrt();
    }

    BaselineStats { mean, std }
}

/// Standardize a series against per-cell baseline statistics.
///
/// Missing values stay missing, outside-area sentinels pass through, and a
/// degenerate baseline (zero or unknown spread) yields missing output.
pub fn zscore(series: &GriddedSeries, stats: &BaselineStats) -> GriddedSeries {
    let cells = series.spec.num_cells();
    let values = series
        .values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let cell = i % cells;
            if is_outside(*v) {
                return *v;
            }
            if !is_observed(*v) {
                return f32::NAN;
            }
            let (m, s) = (stats.mean[cell], stats.std[cell]);
            if s.is_nan() || s == 0.0 {
                return f32::NAN;
            }
            (v - m) / s
        })
        .collect();

    GriddedSeries::new(series.spec, series.times.clone(), values)
}

/// Transform an accumulation series into a standardized index.
///
/// The production gamma-fit implementation lives outside this crate; the
/// pipeline only depends on this seam.
pub trait DistributionFit {
    fn fit_transform(
        &self,
        series: &GriddedSeries,
        baseline_start: NaiveDate,
        baseline_end: NaiveDate,
    ) -> GriddedSeries;
}

/// Plain standardization: z-score against the baseline window, clamped to
/// the fitted-index validity range.
#[derive(Debug, Default)]
pub struct StandardizedFit;

impl DistributionFit for StandardizedFit {
    fn fit_transform(
        &self,
        series: &GriddedSeries,
        baseline_start: NaiveDate,
        baseline_end: NaiveDate,
    ) -> GriddedSeries {
        let stats = baseline_stats(series, baseline_start, baseline_end);
        let mut scored = zscore(series, &stats);
        for v in &mut scored.values {
            if is_observed(*v) {
                *v = v.clamp(FITTED_INDEX_VALID_MIN, FITTED_INDEX_VALID_MAX);
            }
        }
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drought_common::series::OUTSIDE_AREA;
    use drought_common::{Dekad, GridSpec};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn point_series(start: NaiveDate, values: Vec<f32>) -> GriddedSeries {
        let mut times = Vec::new();
        let mut dk = Dekad::containing(start);
        for _ in 0..values.len() {
            times.push(dk);
            dk = dk.next();
        }
        GriddedSeries::new(GridSpec::point(52.5, 1.25), times, values)
    }

    #[test]
    fn test_baseline_stats() {
        let series = point_series(date(2020, 1, 1), vec![1.0, 2.0, 3.0, 100.0]);
        // the last value sits outside the baseline window
        let stats = baseline_stats(&series, date(2020, 1, 1), date(2020, 1, 31));
        assert_eq!(stats.mean[0], 2.0);
        let expected_std = (2.0f32 / 3.0).sqrt();
        assert!((stats.std[0] - expected_std).abs() < 1e-6);
    }

    #[test]
    fn test_zscore_marks_degenerate_baseline_missing() {
        let series = point_series(date(2020, 1, 1), vec![5.0, 5.0, 5.0]);
        let stats = baseline_stats(&series, date(2020, 1, 1), date(2020, 1, 31));
        let scored = zscore(&series, &stats);
        assert!(scored.values.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_zscore_passes_sentinels() {
        let series = point_series(date(2020, 1, 1), vec![1.0, f32::NAN, 3.0, OUTSIDE_AREA]);
        let stats = baseline_stats(&series, date(2020, 1, 1), date(2020, 1, 31));
        let scored = zscore(&series, &stats);
        assert!(scored.value(1, 0).is_nan());
        assert_eq!(scored.value(3, 0), OUTSIDE_AREA);
    }

    #[test]
    fn test_standardized_fit_clamps() {
        let mut values = vec![1.0; 30];
        values[29] = 1000.0;
        let series = point_series(date(2020, 1, 1), values);
        let fitted =
            StandardizedFit.fit_transform(&series, date(2020, 1, 1), date(2020, 10, 31));
        assert_eq!(fitted.value(29, 0), FITTED_INDEX_VALID_MAX);
    }
}
