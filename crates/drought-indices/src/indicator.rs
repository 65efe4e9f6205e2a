//! The indicator lifecycle contract and shared processing helpers.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use drought_common::{DroughtResult, GriddedSeries};
use output_formats::SeriesTable;

use crate::config::AnalysisArgs;
use crate::registry::Product;
use crate::store::ArtifactStore;

/// One unit of drought-index work over a single physical quantity.
///
/// Lifecycle: construct, `download()`, `process()`, read `data()`. Processing
/// before downloading is a precondition error; processed output exists in
/// full or not at all.
pub trait DroughtIndicator {
    /// The product this indicator computes.
    fn product(&self) -> Product;

    /// The analysis request driving this instance.
    fn args(&self) -> &AnalysisArgs;

    /// Acquire raw source data.
    ///
    /// Idempotent: when a persisted artifact (or cached download) already
    /// exists for this key, acquisition is skipped entirely.
    fn download(&mut self) -> DroughtResult<()>;

    /// Align, resolve and derive the indicator, then persist its artifact.
    ///
    /// Returns the artifact path. Re-invocation with an existing artifact
    /// short-circuits byte-identically without recomputation.
    fn process(&mut self) -> DroughtResult<PathBuf>;

    /// The processed series, once `process()` has run.
    fn data(&self) -> Option<&GriddedSeries>;
}

/// Try to satisfy a processing request from the artifact store.
///
/// Returns the stored series and artifact path on a hit. This is the
/// at-most-once computation guarantee: a key that was ever processed is
/// never derived again.
pub(crate) fn try_short_circuit(
    store: &Arc<dyn ArtifactStore>,
    args: &AnalysisArgs,
    field: &str,
) -> DroughtResult<Option<(GriddedSeries, PathBuf)>> {
    let key = args.artifact_key();
    if !store.exists(&key) {
        return Ok(None);
    }

    info!(key = %key, "artifact already exists, skipping recomputation");
    let bytes = store.read(&key)?;
    let table = SeriesTable::from_bytes(args.format, &bytes)?;
    let series = table
        .to_gridded(field)
        .unwrap_or_else(|| GriddedSeries::empty(table.grid));
    Ok(Some((series, store.path(&key))))
}

/// Persist a processed series as this request's artifact.
pub(crate) fn write_artifact(
    store: &Arc<dyn ArtifactStore>,
    args: &AnalysisArgs,
    field: &str,
    series: &GriddedSeries,
) -> DroughtResult<PathBuf> {
    let table = SeriesTable::from_series(field, series);
    let bytes = table.to_bytes(args.format)?;
    let path = store.write(&args.artifact_key(), &bytes)?;
    info!(
        product = %args.product.key_name(),
        path = %path.display(),
        times = series.num_times(),
        "wrote indicator artifact"
    );
    Ok(path)
}
