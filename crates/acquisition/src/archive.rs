//! Local archive of pre-computed indicator products.
//!
//! Global Drought Observatory products arrive as per-year files named by
//! product code (e.g. `spg03_2022.json`, `smant_2021.json`). The archive
//! scans a configured input directory and merges every file matching a
//! product prefix into one raw series.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};
use walkdir::WalkDir;

use drought_common::{RawSeries, Region};

use crate::error::AcquisitionError;
use crate::source::{DataSource, SeriesDecoder};

/// A directory of pre-supplied product files.
pub struct LocalArchive {
    root: PathBuf,
    decoder: Arc<dyn SeriesDecoder + Send + Sync>,
}

impl LocalArchive {
    pub fn new(root: impl Into<PathBuf>, decoder: Arc<dyn SeriesDecoder + Send + Sync>) -> Self {
        Self {
            root: root.into(),
            decoder,
        }
    }

    /// All archive files whose name starts with `prefix`, sorted by path.
    pub fn scan(&self, prefix: &str) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .map_or(false, |name| name.starts_with(prefix))
            })
            .map(|entry| entry.into_path())
            .collect();
        files.sort();
        files
    }

    /// Decode and merge every file matching `prefix`.
    ///
    /// All files of one product must share a grid; a grid mismatch is a
    /// decode error. No matching file at all is a missing-file condition.
    pub fn load(&self, prefix: &str) -> Result<RawSeries, AcquisitionError> {
        let files = self.scan(prefix);
        if files.is_empty() {
            debug!(root = %self.root.display(), prefix = %prefix, "no archive files found");
            return Err(AcquisitionError::MissingFile(self.root.join(prefix)));
        }

        info!(prefix = %prefix, count = files.len(), "loading archive files");

        let mut merged = self.decoder.decode(&files[0])?;
        for path in &files[1..] {
            let series = self.decoder.decode(path)?;
            if series.spec != merged.spec {
                return Err(AcquisitionError::Decode(format!(
                    "{}: grid does not match other {} files",
                    path.display(),
                    prefix
                )));
            }
            merged.samples.extend(series.samples);
        }

        Ok(RawSeries::new(merged.spec, merged.samples))
    }
}

/// [`DataSource`] view of one product prefix within a [`LocalArchive`].
pub struct ArchiveSource {
    archive: LocalArchive,
    prefix: String,
}

impl ArchiveSource {
    pub fn new(archive: LocalArchive, prefix: impl Into<String>) -> Self {
        Self {
            archive,
            prefix: prefix.into(),
        }
    }
}

impl DataSource for ArchiveSource {
    fn fetch(
        &self,
        _region: &Region,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawSeries, AcquisitionError> {
        let full = self.archive.load(&self.prefix)?;
        let samples = full
            .samples
            .into_iter()
            .filter(|s| s.time.date() >= start && s.time.date() <= end)
            .collect();
        Ok(RawSeries::new(full.spec, samples))
    }
}

/// Convenience for archives of JSON interchange files rooted at `root`.
pub fn json_archive(root: impl Into<PathBuf>) -> LocalArchive {
    LocalArchive::new(root, Arc::new(crate::source::JsonDecoder))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::JsonDecoder;

    fn write_product(dir: &Path, name: &str, time: &str, values: &str) {
        std::fs::write(
            dir.join(name),
            format!(
                r#"{{
                    "bbox": {{"min_lon": 0.0, "min_lat": 50.0, "max_lon": 1.0, "max_lat": 51.0}},
                    "width": 1,
                    "height": 1,
                    "samples": [{{"time": "{}", "values": {}}}]
                }}"#,
                time, values
            ),
        )
        .unwrap();
    }

    #[test]
    fn test_scan_filters_by_prefix() {
        let dir = tempfile::tempdir().unwrap();
        write_product(dir.path(), "spg03_2021.json", "2021-06-01T00:00:00", "[0.5]");
        write_product(dir.path(), "spg03_2022.json", "2022-06-01T00:00:00", "[0.7]");
        write_product(dir.path(), "smant_2022.json", "2022-06-01T00:00:00", "[-1.0]");

        let archive = LocalArchive::new(dir.path(), Arc::new(JsonDecoder));
        let files = archive.scan("spg03");
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|p| p
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("spg03")));
    }

    #[test]
    fn test_load_merges_years_sorted() {
        let dir = tempfile::tempdir().unwrap();
        write_product(dir.path(), "fpanv_2022.json", "2022-01-01T00:00:00", "[1.5]");
        write_product(dir.path(), "fpanv_2021.json", "2021-12-21T00:00:00", "[0.5]");

        let archive = LocalArchive::new(dir.path(), Arc::new(JsonDecoder));
        let series = archive.load("fpanv").unwrap();
        assert_eq!(series.samples.len(), 2);
        // merged series is time-sorted regardless of file order
        assert_eq!(series.samples[0].values, vec![0.5]);
        assert_eq!(series.samples[1].values, vec![1.5]);
    }

    #[test]
    fn test_load_missing_product() {
        let dir = tempfile::tempdir().unwrap();
        let archive = LocalArchive::new(dir.path(), Arc::new(JsonDecoder));
        let err = archive.load("spg03").unwrap_err();
        assert!(matches!(err, AcquisitionError::MissingFile(_)));
    }

    #[test]
    fn test_archive_source_trims_range() {
        let dir = tempfile::tempdir().unwrap();
        write_product(dir.path(), "smant_2021.json", "2021-06-01T00:00:00", "[-0.5]");
        write_product(dir.path(), "smant_2022.json", "2022-06-01T00:00:00", "[-1.5]");

        let source = ArchiveSource::new(
            LocalArchive::new(dir.path(), Arc::new(JsonDecoder)),
            "smant",
        );
        let region = Region::from_coords(&[(50.5, 0.5)]).unwrap();
        let series = source
            .fetch(
                &region,
                NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2022, 12, 31).unwrap(),
            )
            .unwrap();
        assert_eq!(series.samples.len(), 1);
        assert_eq!(series.samples[0].values, vec![-1.5]);
    }
}
