//! Data source and decoder seams.

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;

use drought_common::{BoundingBox, GridSpec, RawSample, RawSeries, Region};

use crate::error::AcquisitionError;

/// A provider of raw series data for a region and date range.
///
/// Implementations either query a remote service or read pre-supplied files;
/// the pipeline treats both identically and never retries on its own.
pub trait DataSource {
    /// Yield the raw series overlapping the inclusive date range.
    ///
    /// A window with no data is an empty series, not an error.
    fn fetch(
        &self,
        region: &Region,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawSeries, AcquisitionError>;
}

/// Decodes one provider file into a raw series.
///
/// Provider formats (NetCDF in production) are pass-through concerns; the
/// pipeline only sees the decoded series.
pub trait SeriesDecoder {
    fn decode(&self, path: &Path) -> Result<RawSeries, AcquisitionError>;
}

#[derive(Debug, Deserialize)]
struct JsonSeriesFile {
    bbox: BoundingBox,
    width: usize,
    height: usize,
    samples: Vec<JsonSample>,
}

#[derive(Debug, Deserialize)]
struct JsonSample {
    time: NaiveDateTime,
    values: Vec<Option<f32>>,
}

/// Decoder for the workspace's JSON series interchange files.
///
/// `null` values decode to the missing marker.
#[derive(Debug, Default)]
pub struct JsonDecoder;

impl SeriesDecoder for JsonDecoder {
    fn decode(&self, path: &Path) -> Result<RawSeries, AcquisitionError> {
        let bytes = std::fs::read(path).map_err(|_| {
            AcquisitionError::MissingFile(path.to_path_buf())
        })?;
        let file: JsonSeriesFile = serde_json::from_slice(&bytes)
            .map_err(|e| AcquisitionError::Decode(format!("{}: {}", path.display(), e)))?;

        let spec = GridSpec::new(file.bbox, file.width, file.height);
        let samples = file
            .samples
            .into_iter()
            .map(|s| {
                if s.values.len() != spec.num_cells() {
                    return Err(AcquisitionError::Decode(format!(
                        "{}: sample at {} has {} values, grid holds {}",
                        path.display(),
                        s.time,
                        s.values.len(),
                        spec.num_cells()
                    )));
                }
                Ok(RawSample {
                    time: s.time,
                    values: s.values.into_iter().map(|v| v.unwrap_or(f32::NAN)).collect(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RawSeries::new(spec, samples))
    }
}

/// In-memory source used by tests and by callers with pre-fetched data.
///
/// Counts fetches so idempotence of the processing pipeline is observable.
#[derive(Debug, Clone)]
pub struct MemorySource {
    series: RawSeries,
    fetches: Arc<AtomicU32>,
}

impl MemorySource {
    pub fn new(series: RawSeries) -> Self {
        Self {
            series,
            fetches: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Number of fetches served so far.
    pub fn fetch_count(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl DataSource for MemorySource {
    fn fetch(
        &self,
        _region: &Region,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawSeries, AcquisitionError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let samples = self
            .series
            .samples
            .iter()
            .filter(|s| s.time.date() >= start && s.time.date() <= end)
            .cloned()
            .collect();
        Ok(RawSeries::new(self.series.spec, samples))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_json_decoder_roundtrip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "bbox": {{"min_lon": 0.0, "min_lat": 50.0, "max_lon": 2.0, "max_lat": 52.0}},
                "width": 2,
                "height": 2,
                "samples": [
                    {{"time": "2022-01-01T00:00:00", "values": [1.0, null, 3.0, 4.0]}}
                ]
            }}"#
        )
        .unwrap();

        let series = JsonDecoder.decode(file.path()).unwrap();
        assert_eq!(series.spec.num_cells(), 4);
        assert_eq!(series.samples.len(), 1);
        assert!(series.samples[0].values[1].is_nan());
        assert_eq!(series.samples[0].values[2], 3.0);
    }

    #[test]
    fn test_json_decoder_missing_file() {
        let err = JsonDecoder.decode(Path::new("/nonexistent/file.json")).unwrap_err();
        assert!(matches!(err, AcquisitionError::MissingFile(_)));
    }

    #[test]
    fn test_json_decoder_bad_cell_count() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "bbox": {{"min_lon": 0.0, "min_lat": 50.0, "max_lon": 2.0, "max_lat": 52.0}},
                "width": 2,
                "height": 2,
                "samples": [{{"time": "2022-01-01T00:00:00", "values": [1.0]}}]
            }}"#
        )
        .unwrap();

        let err = JsonDecoder.decode(file.path()).unwrap_err();
        assert!(matches!(err, AcquisitionError::Decode(_)));
    }

    #[test]
    fn test_memory_source_trims_and_counts() {
        let spec = GridSpec::point(52.5, 1.25);
        let sample = |d: NaiveDate, v: f32| RawSample {
            time: d.and_hms_opt(12, 0, 0).unwrap(),
            values: vec![v],
        };
        let source = MemorySource::new(RawSeries::new(
            spec,
            vec![
                sample(date(2022, 1, 1), 1.0),
                sample(date(2022, 2, 1), 2.0),
                sample(date(2022, 3, 1), 3.0),
            ],
        ));

        let region = Region::from_coords(&[(52.5, 1.25)]).unwrap();
        let fetched = source
            .fetch(&region, date(2022, 1, 15), date(2022, 2, 15))
            .unwrap();
        assert_eq!(fetched.samples.len(), 1);
        assert_eq!(fetched.samples[0].values, vec![2.0]);
        assert_eq!(source.fetch_count(), 1);
    }

    #[test]
    fn test_memory_source_empty_window() {
        let spec = GridSpec::point(0.0, 0.0);
        let source = MemorySource::new(RawSeries::empty(spec));
        let region = Region::from_coords(&[(0.0, 0.0)]).unwrap();
        let fetched = source
            .fetch(&region, date(2022, 1, 1), date(2022, 1, 31))
            .unwrap();
        assert!(fetched.is_empty());
    }
}
