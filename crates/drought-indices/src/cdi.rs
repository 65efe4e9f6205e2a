//! Combined drought indicator.
//!
//! Three constituent indicators merge into one categorical severity signal
//! on a shared grid and calendar. A CDI value at time x looks backwards:
//! precipitation reacts first, soil moisture later, vegetation last, so the
//! inputs enter with lags of three, two and one dekad respectively and the
//! combined calendar starts early enough to keep every constituent sample.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Datelike, Months, NaiveDate};
use tracing::{debug, info};

use drought_common::series::{is_observed, is_outside, OUTSIDE_AREA};
use drought_common::{Dekad, DroughtError, DroughtResult, GriddedSeries, GridSpec};
use output_formats::{Column, LabelColumn, SeriesTable};

use crate::align::{forward_fill, reindex, shift};
use crate::config::AnalysisArgs;
use crate::indicator::DroughtIndicator;
use crate::registry::Product;
use crate::resolve::{regrid_nearest, shared_grid};
use crate::store::ArtifactStore;

/// Categorical drought severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DroughtStatus {
    Normal,
    Watch,
    Warning,
    Alert1,
    Alert2,
}

impl DroughtStatus {
    /// Numeric severity level carried in tabular output.
    pub fn level(&self) -> u8 {
        match self {
            DroughtStatus::Normal => 0,
            DroughtStatus::Watch => 1,
            DroughtStatus::Warning => 2,
            DroughtStatus::Alert1 => 3,
            DroughtStatus::Alert2 => 4,
        }
    }

    /// Human-readable status name.
    pub fn name(&self) -> &'static str {
        match self {
            DroughtStatus::Normal => "Normal",
            DroughtStatus::Watch => "Watch",
            DroughtStatus::Warning => "Warning",
            DroughtStatus::Alert1 => "Alert 1",
            DroughtStatus::Alert2 => "Alert 2",
        }
    }
}

/// Classify one (time, cell) from its three anomaly inputs.
///
/// Checked most specific first: Alert 1, Alert 2, Warning, Watch, Normal.
/// Missing soil-moisture or vegetation inputs count as "not low"; a cell
/// with no precipitation signal cannot be classified beyond Normal. A cell
/// with all three inputs missing carries no record at all.
pub fn classify(spi: f32, sma: f32, fapar: f32) -> Option<DroughtStatus> {
    if !is_observed(spi) && !is_observed(sma) && !is_observed(fapar) {
        return None;
    }

    let spi_low = is_observed(spi) && spi < -1.0;
    if !spi_low {
        return Some(DroughtStatus::Normal);
    }

    let sma_low = is_observed(sma) && sma < -1.0;
    let fapar_low = is_observed(fapar) && fapar < -1.0;
    Some(if sma_low && fapar_low {
        DroughtStatus::Alert1
    } else if fapar_low {
        DroughtStatus::Alert2
    } else if sma_low {
        DroughtStatus::Warning
    } else {
        DroughtStatus::Watch
    })
}

/// Dekad lags applied to the constituents when combining.
const SPI_LAG: usize = 3;
const SMA_LAG: usize = 2;
const FAPAR_LAG: usize = 1;

/// A monthly precipitation value spans the month's remaining two dekads.
const SPI_FILL_LIMIT: usize = 2;

/// The combined drought indicator.
pub struct CdiIndicator {
    args: AnalysisArgs,
    spi: Box<dyn DroughtIndicator>,
    sma: Box<dyn DroughtIndicator>,
    fapar: Box<dyn DroughtIndicator>,
    /// Combined calendar, from the SPI start through the analysis end.
    dekads: Vec<Dekad>,
    store: Arc<dyn ArtifactStore>,
    downloaded: bool,
    table: Option<SeriesTable>,
    data: Option<GriddedSeries>,
}

impl CdiIndicator {
    /// Start dates of the (SPI, SMA, fAPAR) constituents for an analysis
    /// starting at `start`.
    ///
    /// SPI series are monthly, so it backs up to the first of the previous
    /// month; the others back up by their lag in dekads.
    pub fn constituent_starts(start: NaiveDate) -> (NaiveDate, NaiveDate, NaiveDate) {
        let dekad = Dekad::containing(start);
        let spi = (start - Months::new(1)).with_day(1).unwrap();
        let sma = dekad.minus(SMA_LAG as u32).start();
        let fapar = dekad.minus(FAPAR_LAG as u32).start();
        (spi, sma, fapar)
    }

    /// Build a combiner over three already-constructed constituents.
    ///
    /// The constituents are expected to carry the lagged start dates from
    /// [`Self::constituent_starts`]; the registry wires this up.
    pub fn new(
        args: AnalysisArgs,
        spi: Box<dyn DroughtIndicator>,
        sma: Box<dyn DroughtIndicator>,
        fapar: Box<dyn DroughtIndicator>,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        let (spi_start, _, _) = Self::constituent_starts(args.start);
        let dekads = Dekad::range(spi_start, args.end).collect();
        Self {
            args,
            spi,
            sma,
            fapar,
            dekads,
            store,
            downloaded: false,
            table: None,
            data: None,
        }
    }

    /// The full combined table (anomalies, level and status), once processed.
    pub fn combined(&self) -> Option<&SeriesTable> {
        self.table.as_ref()
    }

    /// Regrid, reindex and lag one constituent onto the combined axes.
    fn prepare(
        &self,
        series: &GriddedSeries,
        target: &GridSpec,
        fill_limit: usize,
        lag: usize,
    ) -> GriddedSeries {
        let on_grid = regrid_nearest(series, target);
        let on_calendar = reindex(&on_grid, &self.dekads);
        let filled = if fill_limit > 0 {
            forward_fill(&on_calendar, fill_limit)
        } else {
            on_calendar
        };
        shift(&filled, lag)
    }
}

impl DroughtIndicator for CdiIndicator {
    fn product(&self) -> Product {
        self.args.product
    }

    fn args(&self) -> &AnalysisArgs {
        &self.args
    }

    fn download(&mut self) -> DroughtResult<()> {
        self.downloaded = true;
        if self.store.exists(&self.args.artifact_key()) {
            debug!(key = %self.args.artifact_key(), "output artifact exists, skipping acquisition");
            return Ok(());
        }

        self.spi.download()?;
        self.sma.download()?;
        self.fapar.download()?;
        Ok(())
    }

    fn process(&mut self) -> DroughtResult<PathBuf> {
        let key = self.args.artifact_key();
        if self.store.exists(&key) {
            info!(key = %key, "artifact already exists, skipping recomputation");
            let table = SeriesTable::from_bytes(self.args.format, &self.store.read(&key)?)?;
            self.data = table.to_gridded("cdi");
            self.table = Some(table);
            return Ok(self.store.path(&key));
        }

        if !self.downloaded {
            return Err(DroughtError::precondition(
                "process() called before download()",
            ));
        }

        info!("computing combined drought indicator");

        // constituents complete fully before any combination
        if self.spi.data().is_none() {
            self.spi.process()?;
        }
        if self.sma.data().is_none() {
            self.sma.process()?;
        }
        if self.fapar.data().is_none() {
            self.fapar.process()?;
        }

        let (spi, sma, fapar) = match (self.spi.data(), self.sma.data(), self.fapar.data()) {
            (Some(s), Some(m), Some(f)) => (s, m, f),
            _ => {
                return Err(DroughtError::precondition(
                    "constituent indicator produced no data",
                ))
            }
        };

        // shared output grid: the finest native grid of the three
        let target = shared_grid(&[spi.spec, sma.spec, fapar.spec])
            .ok_or_else(|| DroughtError::precondition("no constituent grids available"))?;

        let spi_lagged = self.prepare(spi, &target, SPI_FILL_LIMIT, SPI_LAG);
        let sma_lagged = self.prepare(sma, &target, 0, SMA_LAG);
        let fapar_lagged = self.prepare(fapar, &target, 0, FAPAR_LAG);

        // a cell is outside the area when any resolved constituent masked it
        let cells = target.num_cells();
        let outside: Vec<bool> = (0..cells)
            .map(|cell| {
                [&spi_lagged, &sma_lagged, &fapar_lagged].iter().any(|s| {
                    s.cell_series(cell).any(is_outside)
                })
            })
            .collect();

        let rows = self.dekads.len() * cells;
        let mut spi_col = vec![f32::NAN; rows];
        let mut sma_col = vec![f32::NAN; rows];
        let mut fapar_col = vec![f32::NAN; rows];
        let mut cdi_col = vec![f32::NAN; rows];
        let mut status_col: Vec<Option<String>> = vec![None; rows];
        let mut mask = vec![false; rows];

        for t in 0..self.dekads.len() {
            for cell in 0..cells {
                let row = t * cells + cell;
                if outside[cell] {
                    spi_col[row] = OUTSIDE_AREA;
                    sma_col[row] = OUTSIDE_AREA;
                    fapar_col[row] = OUTSIDE_AREA;
                    cdi_col[row] = OUTSIDE_AREA;
                    continue;
                }

                let s = spi_lagged.value(t, cell);
                let m = sma_lagged.value(t, cell);
                let f = fapar_lagged.value(t, cell);
                spi_col[row] = s;
                sma_col[row] = m;
                fapar_col[row] = f;

                // a record with no acknowledged input is dropped, not Normal
                if let Some(status) = classify(s, m, f) {
                    cdi_col[row] = status.level() as f32;
                    status_col[row] = Some(status.name().to_string());
                    mask[row] = true;
                }
            }
        }

        let table = SeriesTable {
            grid: target,
            times: self.dekads.clone(),
            columns: vec![
                Column {
                    name: "spi".to_string(),
                    values: spi_col,
                },
                Column {
                    name: "sma".to_string(),
                    values: sma_col,
                },
                Column {
                    name: "fapar".to_string(),
                    values: fapar_col,
                },
                Column {
                    name: "cdi".to_string(),
                    values: cdi_col,
                },
            ],
            labels: Some(LabelColumn {
                name: "status".to_string(),
                values: status_col,
            }),
            mask,
        };

        let bytes = table.to_bytes(self.args.format)?;
        let path = self.store.write(&key, &bytes)?;
        info!(path = %path.display(), times = self.dekads.len(), "wrote combined artifact");

        self.data = table.to_gridded("cdi");
        self.table = Some(table);
        Ok(path)
    }

    fn data(&self) -> Option<&GriddedSeries> {
        self.data.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_table() {
        // all three low: the most severe alert
        assert_eq!(classify(-1.2, -1.5, -1.1), Some(DroughtStatus::Alert1));
        // low precipitation and vegetation, sound soil moisture
        assert_eq!(classify(-1.2, 0.7, -1.5), Some(DroughtStatus::Alert2));
        // low precipitation and soil moisture, sound vegetation
        assert_eq!(classify(-1.2, -1.5, -0.9), Some(DroughtStatus::Warning));
        // low precipitation only
        assert_eq!(classify(-1.2, 0.7, -0.9), Some(DroughtStatus::Watch));
        // precipitation at or above the threshold gates everything
        assert_eq!(classify(-0.5, -2.0, -2.0), Some(DroughtStatus::Normal));
        assert_eq!(classify(-1.0, -2.0, -2.0), Some(DroughtStatus::Normal));
    }

    #[test]
    fn test_missing_inputs() {
        // missing precipitation cannot escalate past Normal
        assert_eq!(
            classify(f32::NAN, -1.5, -1.5),
            Some(DroughtStatus::Normal)
        );
        // missing soil moisture counts as not-low
        assert_eq!(classify(-1.2, f32::NAN, -1.5), Some(DroughtStatus::Alert2));
        assert_eq!(classify(-1.2, f32::NAN, f32::NAN), Some(DroughtStatus::Watch));
        // all three missing: no record at all
        assert_eq!(classify(f32::NAN, f32::NAN, f32::NAN), None);
    }

    #[test]
    fn test_status_levels() {
        assert_eq!(DroughtStatus::Normal.level(), 0);
        assert_eq!(DroughtStatus::Alert2.level(), 4);
        assert_eq!(DroughtStatus::Alert1.name(), "Alert 1");
    }

    #[test]
    fn test_constituent_starts() {
        fn date(y: i32, m: u32, d: u32) -> NaiveDate {
            NaiveDate::from_ymd_opt(y, m, d).unwrap()
        }

        let (spi, sma, fapar) = CdiIndicator::constituent_starts(date(2022, 3, 15));
        // one month back, at the first of the month
        assert_eq!(spi, date(2022, 2, 1));
        // two dekads back from the dekad containing the start
        assert_eq!(sma, date(2022, 2, 21));
        // one dekad back
        assert_eq!(fapar, date(2022, 3, 1));
    }
}
