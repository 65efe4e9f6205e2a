//! Indicators served from pre-computed archive products.
//!
//! Global Drought Observatory products arrive already expressed as
//! anomalies, so processing is alignment and spatial resolution only. The
//! soil-moisture product has a modelled companion (`smand`) covering recent
//! dates the long series (`smant`) lacks; gaps in the primary fill from it.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use acquisition::{AcquisitionError, DataSource};
use drought_common::series::{is_missing, is_observed};
use drought_common::{DroughtError, DroughtResult, GriddedSeries, RawSeries};

use crate::align::{align_to_dekads, Aggregation};
use crate::config::{AnalysisArgs, Config};
use crate::indicator::{try_short_circuit, write_artifact, DroughtIndicator};
use crate::registry::Product;
use crate::resolve::{regrid_nearest, resolve_region};
use crate::store::ArtifactStore;

/// A pass-through indicator over one archive product.
pub struct GdoIndicator {
    config: Config,
    args: AnalysisArgs,
    source: Box<dyn DataSource>,
    /// Modelled companion product used to fill recent gaps, if any.
    fallback: Option<Box<dyn DataSource>>,
    store: Arc<dyn ArtifactStore>,
    raw: Option<RawSeries>,
    raw_fallback: Option<RawSeries>,
    data: Option<GriddedSeries>,
}

impl GdoIndicator {
    pub fn new(
        config: Config,
        args: AnalysisArgs,
        source: Box<dyn DataSource>,
        fallback: Option<Box<dyn DataSource>>,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            config,
            args,
            source,
            fallback,
            store,
            raw: None,
            raw_fallback: None,
            data: None,
        }
    }

    fn field(&self) -> &'static str {
        self.args.product.field()
    }
}

impl DroughtIndicator for GdoIndicator {
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
            product = %self.args.product.key_name(),
            input_dir = %self.config.input_dir.display(),
            "loading pre-computed archive product"
        );
        self.raw = Some(
            self.source
                .fetch(&self.args.region, self.args.start, self.args.end)?,
        );

        if let Some(fallback) = &self.fallback {
            match fallback.fetch(&self.args.region, self.args.start, self.args.end) {
                Ok(series) => self.raw_fallback = Some(series),
                // the companion product is an optional gap filler
                Err(AcquisitionError::MissingFile(path)) => {
                    warn!(path = %path.display(), "companion product unavailable, gaps stay unfilled");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn process(&mut self) -> DroughtResult<PathBuf> {
        if let Some((series, path)) = try_short_circuit(&self.store, &self.args, self.field())? {
            self.data = Some(series);
            return Ok(path);
        }

        let raw = self.raw.as_ref().ok_or_else(|| {
            DroughtError::precondition("process() called before download()")
        })?;

        let aligned = align_to_dekads(raw, self.args.start, self.args.end, Aggregation::Mean);
        let mut data = resolve_region(&aligned, &self.args.region);

        if let Some(raw_fallback) = &self.raw_fallback {
            let fallback_aligned =
                align_to_dekads(raw_fallback, self.args.start, self.args.end, Aggregation::Mean);
            let fallback = resolve_region(&fallback_aligned, &self.args.region);
            data = merge_missing(data, fallback);
        }

        let path = write_artifact(&self.store, &self.args, self.field(), &data)?;
        self.data = Some(data);
        Ok(path)
    }

    fn data(&self) -> Option<&GriddedSeries> {
        self.data.as_ref()
    }
}

/// Fill missing primary values from a companion series.
///
/// An empty primary defers to the companion entirely; otherwise the
/// companion is regridded onto the primary's cells and consulted per value.
fn merge_missing(primary: GriddedSeries, fallback: GriddedSeries) -> GriddedSeries {
    if fallback.is_empty() {
        return primary;
    }
    if primary.is_empty() {
        return fallback;
    }

    let fallback = regrid_nearest(&fallback, &primary.spec);
    let cells = primary.spec.num_cells();
    let mut merged = primary;
    for (t_out, dekad) in merged.times.iter().enumerate() {
        let Some(t_fb) = fallback.times.iter().position(|dk| dk == dekad) else {
            continue;
        };
        for cell in 0..cells {
            let idx = t_out * cells + cell;
            let candidate = fallback.value(t_fb, cell);
            if is_missing(merged.values[idx]) && is_observed(candidate) {
                merged.values[idx] = candidate;
            }
        }
    }
    merged
}
