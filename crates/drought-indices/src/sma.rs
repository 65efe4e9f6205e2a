//! Soil-moisture anomaly from remote reanalysis data.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use acquisition::DataSource;
use drought_common::{DroughtError, DroughtResult, GriddedSeries, RawSeries};

use crate::align::{align_to_dekads, Aggregation};
use crate::anomaly::{baseline_stats, zscore};
use crate::config::{AnalysisArgs, Config};
use crate::indicator::{try_short_circuit, write_artifact, DroughtIndicator};
use crate::registry::Product;
use crate::resolve::{regrid_nearest, resolve_region};
use crate::store::ArtifactStore;

const FIELD: &str = "sma";

/// Soil-moisture anomaly computed as a z-score against the baseline.
///
/// Two acquisitions per run: a monthly series over the whole baseline
/// window to form the reference statistics, and an hourly series over the
/// analysis window that is re-based to dekads and standardized.
pub struct SmaEcmwf {
    config: Config,
    args: AnalysisArgs,
    baseline_source: Box<dyn DataSource>,
    hourly_source: Box<dyn DataSource>,
    store: Arc<dyn ArtifactStore>,
    raw_baseline: Option<RawSeries>,
    raw_hourly: Option<RawSeries>,
    data: Option<GriddedSeries>,
}

impl SmaEcmwf {
    pub fn new(
        config: Config,
        args: AnalysisArgs,
        baseline_source: Box<dyn DataSource>,
        hourly_source: Box<dyn DataSource>,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            config,
            args,
            baseline_source,
            hourly_source,
            store,
            raw_baseline: None,
            raw_hourly: None,
            data: None,
        }
    }
}

impl DroughtIndicator for SmaEcmwf {
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
            baseline_start = %self.config.baseline_start,
            baseline_end = %self.config.baseline_end,
            "acquiring soil water baseline and analysis series"
        );
        self.raw_baseline = Some(self.baseline_source.fetch(
            &self.args.region,
            self.config.baseline_start,
            self.config.baseline_end,
        )?);
        self.raw_hourly = Some(self.hourly_source.fetch(
            &self.args.region,
            self.args.start,
            self.args.end,
        )?);
        Ok(())
    }

    fn process(&mut self) -> DroughtResult<PathBuf> {
        if let Some((series, path)) = try_short_circuit(&self.store, &self.args, FIELD)? {
            self.data = Some(series);
            return Ok(path);
        }

        let (raw_baseline, raw_hourly) = match (&self.raw_baseline, &self.raw_hourly) {
            (Some(b), Some(h)) => (b, h),
            _ => {
                return Err(DroughtError::precondition(
                    "process() called before download()",
                ))
            }
        };

        let hourly = align_to_dekads(raw_hourly, self.args.start, self.args.end, Aggregation::Mean);
        let resolved_hourly = resolve_region(&hourly, &self.args.region);

        let data = if resolved_hourly.is_empty() {
            resolved_hourly
        } else {
            let baseline = align_to_dekads(
                raw_baseline,
                self.config.baseline_start,
                self.config.baseline_end,
                Aggregation::Mean,
            );
            let resolved_baseline = resolve_region(&baseline, &self.args.region);
            // reference statistics must live on the analysis cells
            let resolved_baseline = regrid_nearest(&resolved_baseline, &resolved_hourly.spec);
            let stats = baseline_stats(
                &resolved_baseline,
                self.config.baseline_start,
                self.config.baseline_end,
            );
            zscore(&resolved_hourly, &stats)
        };

        let path = write_artifact(&self.store, &self.args, FIELD, &data)?;
        self.data = Some(data);
        Ok(path)
    }

    fn data(&self) -> Option<&GriddedSeries> {
        self.data.as_ref()
    }
}
