//! Temporal alignment onto the dekad calendar.
//!
//! Any dated series, regular or not, re-bases onto the canonical
//! fixed-interval axis: one timestamp per dekad, gaps encoded as missing
//! values. Nothing here interpolates; the only fill operation is the
//! explicit, bounded [`forward_fill`].

use chrono::NaiveDate;
use tracing::debug;

use drought_common::series::{is_missing, is_observed, is_outside};
use drought_common::{Dekad, GriddedSeries, RawSeries};

/// How samples inside one dekad bucket combine.
///
/// Mean suits state quantities (soil moisture, anomalies); accumulation
/// quantities such as precipitation use Sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Aggregation {
    #[default]
    Mean,
    Sum,
    Max,
}

impl Aggregation {
    fn combine(&self, values: &[f32]) -> f32 {
        let observed: Vec<f32> = values.iter().copied().filter(|v| !is_missing(*v)).collect();
        if observed.is_empty() {
            return f32::NAN;
        }
        match self {
            Aggregation::Mean => observed.iter().sum::<f32>() / observed.len() as f32,
            Aggregation::Sum => observed.iter().sum(),
            Aggregation::Max => observed.iter().copied().fold(f32::MIN, f32::max),
        }
    }
}

/// Re-base a raw series onto the dekad calendar covering `[start, end]`.
///
/// Samples whose dekad falls outside the window are ignored. Dekads with no
/// sample come back as missing values. A window with no overlapping samples
/// at all yields an explicitly empty series, which is a valid result and not
/// an error. Aligning an already dekad-aligned series reproduces it.
pub fn align_to_dekads(
    raw: &RawSeries,
    start: NaiveDate,
    end: NaiveDate,
    agg: Aggregation,
) -> GriddedSeries {
    let dekads: Vec<Dekad> = Dekad::range(start, end).collect();
    if dekads.is_empty() {
        return GriddedSeries::empty(raw.spec);
    }
    let first = dekads[0];
    let last = dekads[dekads.len() - 1];
    let cells = raw.spec.num_cells();

    // bucket sample indices by dekad position
    let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); dekads.len()];
    let mut in_range = 0usize;
    for (i, sample) in raw.samples.iter().enumerate() {
        let dekad = Dekad::containing(sample.time.date());
        if dekad < first || dekad > last {
            continue;
        }
        // consecutive-dekad axis: position is the count of steps from `first`
        let position = dekads.partition_point(|dk| *dk < dekad);
        buckets[position].push(i);
        in_range += 1;
    }

    if in_range == 0 {
        debug!(start = %start, end = %end, "no source samples in window, returning empty series");
        return GriddedSeries::empty(raw.spec);
    }

    let mut values = vec![f32::NAN; dekads.len() * cells];
    let mut scratch = Vec::new();
    for (position, bucket) in buckets.iter().enumerate() {
        if bucket.is_empty() {
            continue;
        }
        for cell in 0..cells {
            scratch.clear();
            scratch.extend(bucket.iter().map(|&i| raw.samples[i].values[cell]));
            values[position * cells + cell] = agg.combine(&scratch);
        }
    }

    GriddedSeries::new(raw.spec, dekads, values)
}

/// Select the given dekads out of a series, missing where absent.
pub fn reindex(series: &GriddedSeries, times: &[Dekad]) -> GriddedSeries {
    let cells = series.spec.num_cells();
    let mut values = vec![f32::NAN; times.len() * cells];
    for (t_out, dekad) in times.iter().enumerate() {
        if let Some(t_in) = series.times.iter().position(|dk| dk == dekad) {
            values[t_out * cells..(t_out + 1) * cells].copy_from_slice(series.time_slice(t_in));
        }
    }
    GriddedSeries::new(series.spec, times.to_vec(), values)
}

/// Carry the last observation forward over gaps of at most `limit` steps.
///
/// The fill never reaches past a contiguous gap longer than the limit and
/// never invents data before a cell's first observation. Outside-area
/// sentinels are left untouched.
pub fn forward_fill(series: &GriddedSeries, limit: usize) -> GriddedSeries {
    let cells = series.spec.num_cells();
    let mut values = series.values.clone();
    for cell in 0..cells {
        let mut last: Option<f32> = None;
        let mut gap = 0usize;
        for t in 0..series.times.len() {
            let idx = t * cells + cell;
            let v = values[idx];
            if is_outside(v) {
                continue;
            }
            if is_observed(v) {
                last = Some(v);
                gap = 0;
            } else {
                gap += 1;
                if gap <= limit {
                    if let Some(fill) = last {
                        values[idx] = fill;
                    }
                }
            }
        }
    }
    GriddedSeries::new(series.spec, series.times.clone(), values)
}

/// Shift a series later in time by `steps` dekads.
///
/// The value at time `t` becomes the value observed at `t - steps`; the
/// first `steps` positions have no antecedent and are missing.
pub fn shift(series: &GriddedSeries, steps: usize) -> GriddedSeries {
    let cells = series.spec.num_cells();
    let mut values = vec![f32::NAN; series.values.len()];
    for t in steps..series.times.len() {
        let src = (t - steps) * cells;
        let dst = t * cells;
        values[dst..dst + cells].copy_from_slice(&series.values[src..src + cells]);
    }
    GriddedSeries::new(series.spec, series.times.clone(), values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use drought_common::series::OUTSIDE_AREA;
    use drought_common::{GridSpec, RawSample};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn point_sample(d: NaiveDate, hour: u32, v: f32) -> RawSample {
        RawSample {
            time: d.and_hms_opt(hour, 0, 0).unwrap(),
            values: vec![v],
        }
    }

    fn point_series(samples: Vec<RawSample>) -> RawSeries {
        RawSeries::new(GridSpec::point(52.5, 1.25), samples)
    }

    #[test]
    fn test_daily_samples_aggregate_mean() {
        let raw = point_series(vec![
            point_sample(date(2022, 1, 2), 0, 1.0),
            point_sample(date(2022, 1, 9), 0, 3.0),
            point_sample(date(2022, 1, 15), 0, 5.0),
        ]);
        let aligned = align_to_dekads(&raw, date(2022, 1, 1), date(2022, 1, 31), Aggregation::Mean);

        assert_eq!(aligned.times.len(), 3);
        assert_eq!(aligned.value(0, 0), 2.0);
        assert_eq!(aligned.value(1, 0), 5.0);
        assert!(aligned.value(2, 0).is_nan());
    }

    #[test]
    fn test_sum_aggregation() {
        let raw = point_series(vec![
            point_sample(date(2022, 1, 3), 0, 1.5),
            point_sample(date(2022, 1, 3), 12, 2.5),
        ]);
        let aligned = align_to_dekads(&raw, date(2022, 1, 1), date(2022, 1, 10), Aggregation::Sum);
        assert_eq!(aligned.times.len(), 1);
        assert_eq!(aligned.value(0, 0), 4.0);
    }

    #[test]
    fn test_aligned_input_is_noop() {
        let raw = point_series(vec![
            point_sample(date(2022, 1, 1), 0, 1.0),
            point_sample(date(2022, 1, 11), 0, 2.0),
            point_sample(date(2022, 1, 21), 0, 3.0),
        ]);
        let aligned = align_to_dekads(&raw, date(2022, 1, 1), date(2022, 1, 31), Aggregation::Mean);
        assert_eq!(aligned.values, vec![1.0, 2.0, 3.0]);

        // a second pass over the aligned output changes nothing
        let again = align_to_dekads(
            &RawSeries::new(
                aligned.spec,
                aligned
                    .times
                    .iter()
                    .zip(&aligned.values)
                    .map(|(dk, v)| point_sample(dk.start(), 0, *v))
                    .collect(),
            ),
            date(2022, 1, 1),
            date(2022, 1, 31),
            Aggregation::Mean,
        );
        assert_eq!(again.values, aligned.values);
        assert_eq!(again.times, aligned.times);
    }

    #[test]
    fn test_empty_window_is_empty_not_error() {
        let raw = point_series(vec![point_sample(date(2021, 6, 1), 0, 1.0)]);
        let aligned = align_to_dekads(&raw, date(2022, 1, 1), date(2022, 3, 31), Aggregation::Mean);
        assert!(aligned.is_empty());
        assert_eq!(aligned.spec, raw.spec);
    }

    #[test]
    fn test_alignment_deterministic() {
        let raw = point_series(vec![
            point_sample(date(2022, 2, 5), 7, 0.25),
            point_sample(date(2022, 2, 14), 3, -0.5),
            point_sample(date(2022, 2, 24), 19, 1.75),
        ]);
        let a = align_to_dekads(&raw, date(2022, 2, 1), date(2022, 2, 28), Aggregation::Mean);
        let b = align_to_dekads(&raw, date(2022, 2, 1), date(2022, 2, 28), Aggregation::Mean);
        assert_eq!(a, b);
    }

    #[test]
    fn test_reindex_fills_gaps_with_missing() {
        let raw = point_series(vec![point_sample(date(2022, 1, 1), 0, 1.0)]);
        let aligned = align_to_dekads(&raw, date(2022, 1, 1), date(2022, 1, 10), Aggregation::Mean);

        let target: Vec<Dekad> = Dekad::range(date(2022, 1, 1), date(2022, 1, 31)).collect();
        let reindexed = reindex(&aligned, &target);
        assert_eq!(reindexed.times.len(), 3);
        assert_eq!(reindexed.value(0, 0), 1.0);
        assert!(reindexed.value(1, 0).is_nan());
        assert!(reindexed.value(2, 0).is_nan());
    }

    #[test]
    fn test_forward_fill_bounded() {
        let spec = GridSpec::point(0.0, 0.0);
        let times: Vec<Dekad> = Dekad::range(date(2022, 1, 1), date(2022, 2, 28)).collect();
        let values = vec![1.0, f32::NAN, f32::NAN, f32::NAN, 2.0, f32::NAN];
        let series = GriddedSeries::new(spec, times, values);

        let filled = forward_fill(&series, 2);
        // fills two steps into the gap, not the third
        assert_eq!(filled.value(1, 0), 1.0);
        assert_eq!(filled.value(2, 0), 1.0);
        assert!(filled.value(3, 0).is_nan());
        assert_eq!(filled.value(5, 0), 2.0);
    }

    #[test]
    fn test_forward_fill_skips_outside() {
        let spec = GridSpec::point(0.0, 0.0);
        let times: Vec<Dekad> = Dekad::range(date(2022, 1, 1), date(2022, 1, 31)).collect();
        let series = GriddedSeries::new(spec, times, vec![OUTSIDE_AREA; 3]);
        let filled = forward_fill(&series, 5);
        assert!(filled.values.iter().all(|v| *v == OUTSIDE_AREA));
    }

    #[test]
    fn test_shift() {
        let spec = GridSpec::point(0.0, 0.0);
        let times: Vec<Dekad> = Dekad::range(date(2022, 1, 1), date(2022, 1, 31)).collect();
        let series = GriddedSeries::new(spec, times, vec![1.0, 2.0, 3.0]);

        let shifted = shift(&series, 2);
        assert!(shifted.value(0, 0).is_nan());
        assert!(shifted.value(1, 0).is_nan());
        assert_eq!(shifted.value(2, 0), 1.0);
    }
}
