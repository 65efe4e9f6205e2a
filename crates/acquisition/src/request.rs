//! Reanalysis download request descriptors.

use chrono::NaiveDate;
use drought_common::{BoundingBox, Region};

/// Variables requested for precipitation downloads.
pub const PRECIP_VARIABLES: &[&str] = &["total_precipitation"];

/// Variables requested for soil-water downloads, one per soil layer.
pub const SOILWATER_VARIABLES: &[&str] = &[
    "volumetric_soil_water_layer_1",
    "volumetric_soil_water_layer_2",
    "volumetric_soil_water_layer_3",
    "volumetric_soil_water_layer_4",
];

/// Buffer applied around a point region so the provider returns a small
/// extraction box rather than a single cell.
const POINT_BOX_SIZE: f64 = 0.1;

/// A constrained reanalysis download: which variables, where, and when.
///
/// The request is a pure value; the [`crate::DownloadClient`] turns it into a
/// cached file. Two frequencies exist: monthly series for long baselines and
/// hourly series for short analysis windows.
#[derive(Debug, Clone, PartialEq)]
pub struct ReanalysisRequest {
    /// Dataset short name used in the cache filename (e.g. "precip").
    pub dataset: String,
    /// Provider variable names.
    pub variables: Vec<String>,
    /// Area of interest, already expanded for point regions.
    pub area: BoundingBox,
    /// First requested day.
    pub start: NaiveDate,
    /// Last requested day, inclusive.
    pub end: NaiveDate,
    /// Monthly means when true, hourly samples otherwise.
    pub monthly: bool,
}

impl ReanalysisRequest {
    /// Build a request for a region and date range.
    pub fn new(
        dataset: impl Into<String>,
        variables: &[&str],
        region: &Region,
        start: NaiveDate,
        end: NaiveDate,
        monthly: bool,
    ) -> Self {
        let area = match region {
            Region::Point { .. } => region.envelope().expand(POINT_BOX_SIZE).clamp_to_valid(),
            _ => region.envelope(),
        };
        Self {
            dataset: dataset.into(),
            variables: variables.iter().map(|v| v.to_string()).collect(),
            area,
            start,
            end,
            monthly,
        }
    }

    /// Deterministic cache filename for this request.
    ///
    /// Identical requests resolve to the same file, which is what makes the
    /// download step idempotent.
    pub fn cache_filename(&self) -> String {
        let freq = if self.monthly { "monthly" } else { "hourly" };
        format!(
            "{}_{}-{}_{}_{}.nc",
            self.dataset,
            self.start.format("%Y%m%d"),
            self.end.format("%Y%m%d"),
            self.area.cache_key(),
            freq
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_point_region_expands_area() {
        let region = Region::from_coords(&[(52.5, 1.25)]).unwrap();
        let req = ReanalysisRequest::new(
            "precip",
            PRECIP_VARIABLES,
            &region,
            date(2020, 1, 1),
            date(2020, 12, 31),
            true,
        );
        assert!((req.area.min_lon - 1.15).abs() < 1e-9);
        assert!((req.area.max_lon - 1.35).abs() < 1e-9);
        assert!((req.area.min_lat - 52.4).abs() < 1e-9);
        assert!((req.area.max_lat - 52.6).abs() < 1e-9);
    }

    #[test]
    fn test_cache_filename_deterministic() {
        let region = Region::from_coords(&[(52.5, 1.25)]).unwrap();
        let make = || {
            ReanalysisRequest::new(
                "soilwater",
                SOILWATER_VARIABLES,
                &region,
                date(2020, 1, 1),
                date(2020, 3, 31),
                false,
            )
        };
        assert_eq!(make().cache_filename(), make().cache_filename());
        assert!(make().cache_filename().starts_with("soilwater_20200101-20200331_"));
        assert!(make().cache_filename().ends_with("_hourly.nc"));
    }

    #[test]
    fn test_monthly_and_hourly_names_differ() {
        let region = Region::from_coords(&[(52.5, 1.25)]).unwrap();
        let monthly = ReanalysisRequest::new(
            "precip",
            PRECIP_VARIABLES,
            &region,
            date(2020, 1, 1),
            date(2020, 12, 31),
            true,
        );
        let hourly = ReanalysisRequest::new(
            "precip",
            PRECIP_VARIABLES,
            &region,
            date(2020, 1, 1),
            date(2020, 12, 31),
            false,
        );
        assert_ne!(monthly.cache_filename(), hourly.cache_filename());
    }
}
