//! The artifact data model shared by all output formats.

use drought_common::series::{is_outside, OUTSIDE_AREA};
use drought_common::{Dekad, DroughtError, DroughtResult, GridSpec, GriddedSeries};

/// Serialization format of an output artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    /// Geometry-annotated feature collection, one feature per (time, cell).
    GeoJson,
    /// Tabular layout, one row per (time, cell).
    Csv,
}

impl ArtifactFormat {
    /// Parse a format tag (case-insensitive).
    pub fn parse(s: &str) -> DroughtResult<Self> {
        match s.to_lowercase().as_str() {
            "geojson" | "json" => Ok(Self::GeoJson),
            "csv" => Ok(Self::Csv),
            other => Err(DroughtError::config(format!(
                "unknown output format '{}', expected geojson or csv",
                other
            ))),
        }
    }

    /// File extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::GeoJson => "json",
            Self::Csv => "csv",
        }
    }
}

/// A named value column, time-major over (time, cell).
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<f32>,
}

/// An optional string column, e.g. the CDI status names.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelColumn {
    pub name: String,
    pub values: Vec<Option<String>>,
}

/// The content of one output artifact.
///
/// Rows are addressed `t * num_cells + cell`. A row is emitted when its mask
/// bit is set and no column carries the outside-area sentinel; everything
/// else is omitted from the serialized artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesTable {
    pub grid: GridSpec,
    pub times: Vec<Dekad>,
    pub columns: Vec<Column>,
    pub labels: Option<LabelColumn>,
    pub mask: Vec<bool>,
}

impl SeriesTable {
    /// Build a single-column table from a processed series.
    ///
    /// Outside-area cells are masked out; missing values stay in as gaps.
    pub fn from_series(name: impl Into<String>, series: &GriddedSeries) -> Self {
        let mask = series.values.iter().map(|v| !is_outside(*v)).collect();
        Self {
            grid: series.spec,
            times: series.times.clone(),
            columns: vec![Column {
                name: name.into(),
                values: series.values.clone(),
            }],
            labels: None,
            mask,
        }
    }

    /// Number of rows (visible or not).
    pub fn num_rows(&self) -> usize {
        self.times.len() * self.grid.num_cells()
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Reconstruct a gridded series from one column.
    pub fn to_gridded(&self, name: &str) -> Option<GriddedSeries> {
        self.column(name).map(|c| {
            GriddedSeries::new(self.grid, self.times.clone(), c.values.clone())
        })
    }

    /// Whether a row appears in serialized output.
    pub fn row_visible(&self, row: usize) -> bool {
        self.mask[row] && !self.columns.iter().any(|c| is_outside(c.values[row]))
    }

    /// Serialize to the requested format.
    pub fn to_bytes(&self, format: ArtifactFormat) -> DroughtResult<Vec<u8>> {
        match format {
            ArtifactFormat::GeoJson => crate::geojson::write(self),
            ArtifactFormat::Csv => Ok(crate::table::write(self)),
        }
    }

    /// Deserialize from the requested format.
    pub fn from_bytes(format: ArtifactFormat, bytes: &[u8]) -> DroughtResult<Self> {
        match format {
            ArtifactFormat::GeoJson => crate::geojson::read(bytes),
            ArtifactFormat::Csv => crate::table::read(bytes),
        }
    }

    /// Rebuild the hidden-row structure after parsing visible rows.
    ///
    /// `seen` flags rows present in the serialized artifact. Cells with no
    /// visible row at all were outside the requested area; rows absent from
    /// a cell that does have data were dropped and come back as masked gaps.
    pub(crate) fn restore_hidden_rows(&mut self, seen: &[bool]) {
        let cells = self.grid.num_cells();
        for cell in 0..cells {
            let any_seen = (0..self.times.len()).any(|t| seen[t * cells + cell]);
            for t in 0..self.times.len() {
                let row = t * cells + cell;
                if seen[row] {
                    continue;
                }
                self.mask[row] = false;
                let fill = if any_seen { f32::NAN } else { OUTSIDE_AREA };
                for col in &mut self.columns {
                    col.values[row] = fill;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use drought_common::BoundingBox;

    #[test]
    fn test_format_parse() {
        assert_eq!(ArtifactFormat::parse("GeoJSON").unwrap(), ArtifactFormat::GeoJson);
        assert_eq!(ArtifactFormat::parse("csv").unwrap(), ArtifactFormat::Csv);
        assert!(ArtifactFormat::parse("netcdf").is_err());
    }

    #[test]
    fn test_from_series_masks_outside() {
        let spec = GridSpec::new(BoundingBox::new(0.0, 0.0, 2.0, 1.0), 2, 1);
        let d0 = Dekad::containing(NaiveDate::from_ymd_opt(2022, 1, 1).unwrap());
        let series = GriddedSeries::new(spec, vec![d0], vec![1.0, OUTSIDE_AREA]);

        let table = SeriesTable::from_series("spi", &series);
        assert!(table.row_visible(0));
        assert!(!table.row_visible(1));
    }
}
