//! Standardized precipitation index from remote reanalysis data.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use acquisition::DataSource;
use drought_common::{Dekad, DroughtError, DroughtResult, GriddedSeries, RawSeries};

use crate::align::{align_to_dekads, reindex, Aggregation};
use crate::anomaly::{DistributionFit, StandardizedFit};
use crate::config::{AnalysisArgs, Config};
use crate::indicator::{try_short_circuit, write_artifact, DroughtIndicator};
use crate::registry::Product;
use crate::resolve::resolve_region;
use crate::store::ArtifactStore;

const FIELD: &str = "spi";

/// SPI computed here from reanalysis precipitation.
///
/// Standardization needs the long reference series, so acquisition always
/// covers the whole baseline window regardless of the analysis dates; the
/// result is trimmed to the analysis window at the end.
pub struct SpiEcmwf {
    config: Config,
    args: AnalysisArgs,
    source: Box<dyn DataSource>,
    fit: Box<dyn DistributionFit>,
    store: Arc<dyn ArtifactStore>,
    raw: Option<RawSeries>,
    data: Option<GriddedSeries>,
}

impl SpiEcmwf {
    pub fn new(
        config: Config,
        args: AnalysisArgs,
        source: Box<dyn DataSource>,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            config,
            args,
            source,
            fit: Box::new(StandardizedFit),
            store,
            raw: None,
            data: None,
        }
    }

    /// Replace the built-in standardization with a fitted transform.
    pub fn with_fit(mut self, fit: Box<dyn DistributionFit>) -> Self {
        self.fit = fit;
        self
    }

    fn fetch_end(&self) -> chrono::NaiveDate {
        self.config.baseline_end.max(self.args.end)
    }
}

impl DroughtIndicator for SpiEcmwf {
    fn product(&self) -> Product {
        self.args.product
    }

    fn args(&self) -> &AnalysisArgs {
        &self.args
    }

    fn download(&mut self) -> DroughtResult<()> {
        if self.store.exists(&self.args.artifact_key()) {
            debug!(key = %self.args.artifact_key(), "output artifact exists, skipping acquisition");
            return Ok(());
        }

        info!(
            start = %self.config.baseline_start,
            end = %self.fetch_end(),
            "acquiring precipitation over the reference period"
        );
        let raw = self
            .source
            .fetch(&self.args.region, self.config.baseline_start, self.fetch_end())?;
        self.raw = Some(raw);
        Ok(())
    }

    fn process(&mut self) -> DroughtResult<PathBuf> {
        if let Some((series, path)) = try_short_circuit(&self.store, &self.args, FIELD)? {
            self.data = Some(series);
            return Ok(path);
        }

        let raw = self.raw.as_ref().ok_or_else(|| {
            DroughtError::precondition("process() called before download()")
        })?;

        // precipitation accumulates per dekad
        let aligned = align_to_dekads(
            raw,
            self.config.baseline_start,
            self.fetch_end(),
            Aggregation::Sum,
        );
        let resolved = resolve_region(&aligned, &self.args.region);

        let data = if resolved.is_empty() {
            resolved
        } else {
            let index = self.fit.fit_transform(
                &resolved,
                self.config.baseline_start,
                self.config.baseline_end,
            );
            let window: Vec<Dekad> = Dekad::range(self.args.start, self.args.end).collect();
            reindex(&index, &window)
        };

        let path = write_artifact(&self.store, &self.args, FIELD, &data)?;
        self.data = Some(data);
        Ok(path)
    }

    fn data(&self) -> Option<&GriddedSeries> {
        self.data.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acquisition::MemorySource;
    use chrono::NaiveDate;
    use drought_common::Region;
    use output_formats::ArtifactFormat;
    use test_utils::generators;

    use crate::store::FsArtifactStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn setup(dir: &std::path::Path) -> (Config, AnalysisArgs, MemorySource) {
        let config = Config {
            output_dir: dir.to_path_buf(),
            baseline_start: date(2020, 1, 1),
            baseline_end: date(2021, 12, 31),
            ..Default::default()
        };
        let args = AnalysisArgs::new(
            Region::from_coords(&[(52.5, 1.25)]).unwrap(),
            date(2021, 6, 1),
            date(2021, 8, 31),
            Product::Spi,
            ArtifactFormat::GeoJson,
        )
        .unwrap();
        // varying daily precipitation over the whole baseline
        let raw = generators::daily_point_series(52.5, 1.25, date(2020, 1, 1), 730, |day| {
            (day % 17) as f32 * 0.3
        });
        (config, args, MemorySource::new(raw))
    }

    #[test]
    fn test_process_before_download_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (config, args, source) = setup(dir.path());
        let store: Arc<dyn ArtifactStore> = Arc::new(FsArtifactStore::new(dir.path()));

        let mut spi = SpiEcmwf::new(config, args, Box::new(source), store);
        assert!(matches!(
            spi.process(),
            Err(DroughtError::Precondition(_))
        ));
    }

    #[test]
    fn test_process_produces_trimmed_index() {
        let dir = tempfile::tempdir().unwrap();
        let (config, args, source) = setup(dir.path());
        let store: Arc<dyn ArtifactStore> = Arc::new(FsArtifactStore::new(dir.path()));

        let mut spi = SpiEcmwf::new(config, args, Box::new(source), store);
        spi.download().unwrap();
        let path = spi.process().unwrap();
        assert!(path.is_file());

        let data = spi.data().unwrap();
        // June through August is nine dekads
        assert_eq!(data.num_times(), 9);
        assert_eq!(data.times[0].start(), date(2021, 6, 1));
        assert!(data.spec.is_point());
        // the index is standardized, so values sit in the fitted range
        assert!(data
            .point_values()
            .filter(|v| !v.is_nan())
            .all(|v| (-3.09..=3.09).contains(&v)));
    }

    #[test]
    fn test_second_run_skips_fetch_and_matches_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let (config, args, source) = setup(dir.path());
        let store: Arc<dyn ArtifactStore> = Arc::new(FsArtifactStore::new(dir.path()));

        let mut first = SpiEcmwf::new(
            config.clone(),
            args.clone(),
            Box::new(source.clone()),
            Arc::clone(&store),
        );
        first.download().unwrap();
        let path = first.process().unwrap();
        let bytes_first = std::fs::read(&path).unwrap();
        assert_eq!(source.fetch_count(), 1);

        let mut second = SpiEcmwf::new(config, args, Box::new(source.clone()), store);
        second.download().unwrap();
        let path_second = second.process().unwrap();

        // no new acquisition, no recomputation, identical bytes
        assert_eq!(source.fetch_count(), 1);
        assert_eq!(path_second, path);
        assert_eq!(std::fs::read(&path_second).unwrap(), bytes_first);
        // the short-circuit still repopulates the processed series
        assert_eq!(second.data().unwrap().num_times(), 9);
    }

    #[test]
    fn test_empty_window_yields_empty_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            output_dir: dir.path().to_path_buf(),
            baseline_start: date(2020, 1, 1),
            baseline_end: date(2020, 12, 31),
            ..Default::default()
        };
        let args = AnalysisArgs::new(
            Region::from_coords(&[(52.5, 1.25)]).unwrap(),
            date(2020, 6, 1),
            date(2020, 6, 30),
            Product::Spi,
            ArtifactFormat::GeoJson,
        )
        .unwrap();
        let source = MemorySource::new(generators::daily_point_series(
            52.5,
            1.25,
            date(2030, 1, 1),
            10,
            |_| 1.0,
        ));
        let store: Arc<dyn ArtifactStore> = Arc::new(FsArtifactStore::new(dir.path()));

        let mut spi = SpiEcmwf::new(config, args, Box::new(source), store);
        spi.download().unwrap();
        let path = spi.process().unwrap();

        // empty result is a success with an artifact holding no rows
        assert!(path.is_file());
        assert!(spi.data().unwrap().is_empty());
    }
}
