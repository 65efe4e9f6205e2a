//! Run configuration and analysis arguments.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use drought_common::{DroughtError, DroughtResult, Region};
use output_formats::ArtifactFormat;

use crate::registry::Product;

/// Which acquisition backend supplies the CDI constituents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Anomalies computed here from remote reanalysis data.
    #[default]
    Ecmwf,
    /// Pre-computed anomalies read from the local archive.
    Gdo,
}

/// Static run configuration, read-only to the core.
///
/// Loaded from a YAML file; every field has a default so a missing file is
/// still a runnable configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Root of pre-supplied input files and the download cache.
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,
    /// Root of the output artifact store.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// First day of the long-term reference period.
    #[serde(default = "default_baseline_start")]
    pub baseline_start: NaiveDate,
    /// Last day of the long-term reference period, inclusive.
    #[serde(default = "default_baseline_end")]
    pub baseline_end: NaiveDate,
    /// Backend used for CDI constituents.
    #[serde(default)]
    pub backend: Backend,
    /// Base URL of the reanalysis file endpoint.
    #[serde(default = "default_reanalysis_url")]
    pub reanalysis_url: String,
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("input")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_baseline_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(1985, 1, 1).unwrap()
}

fn default_baseline_end() -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 12, 31).unwrap()
}

fn default_reanalysis_url() -> String {
    "https://cds.climate.copernicus.eu/api/v2/resources".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            output_dir: default_output_dir(),
            baseline_start: default_baseline_start(),
            baseline_end: default_baseline_end(),
            backend: Backend::default(),
            reanalysis_url: default_reanalysis_url(),
        }
    }
}

impl Config {
    /// Load a configuration from a YAML file.
    pub fn load(path: &Path) -> DroughtResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DroughtError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: Config = serde_yaml::from_str(&content).map_err(|e| {
            DroughtError::config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    fn validate(&self) -> DroughtResult<()> {
        if self.baseline_start > self.baseline_end {
            return Err(DroughtError::config(format!(
                "baseline window starts {} after it ends {}",
                self.baseline_start, self.baseline_end
            )));
        }
        Ok(())
    }
}

/// Immutable arguments of one analysis request.
#[derive(Debug, Clone)]
pub struct AnalysisArgs {
    pub region: Region,
    /// First analysis day.
    pub start: NaiveDate,
    /// Last analysis day, inclusive.
    pub end: NaiveDate,
    pub product: Product,
    pub format: ArtifactFormat,
}

impl AnalysisArgs {
    /// Build analysis arguments, rejecting an inverted date range.
    pub fn new(
        region: Region,
        start: NaiveDate,
        end: NaiveDate,
        product: Product,
        format: ArtifactFormat,
    ) -> DroughtResult<Self> {
        if start > end {
            return Err(DroughtError::precondition(format!(
                "analysis start {} is after end {}",
                start, end
            )));
        }
        Ok(Self {
            region,
            start,
            end,
            product,
            format,
        })
    }

    /// The same request for a different product and start date.
    ///
    /// Used by the combiner to build its lagged constituents; the region,
    /// end date and format are shared.
    pub fn constituent(&self, product: Product, start: NaiveDate) -> Self {
        Self {
            region: self.region.clone(),
            start,
            end: self.end,
            product,
            format: self.format,
        }
    }

    /// Deterministic artifact key for this request.
    ///
    /// The key is the whole caching contract: identical (product, region,
    /// date-range) requests share one artifact.
    pub fn artifact_key(&self) -> String {
        format!(
            "{}_{}-{}_{}.{}",
            self.product.key_name(),
            self.start.format("%Y%m%d"),
            self.end.format("%Y%m%d"),
            self.region.cache_key(),
            self.format.extension()
        )
    }
}
