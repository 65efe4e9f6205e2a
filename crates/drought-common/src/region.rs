//! Analysis region: point, bounding box or polygon.

use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::error::{DroughtError, DroughtResult};

/// The geographic extent of an analysis request.
///
/// The variant is derived from the number of coordinate pairs supplied by the
/// caller: one pair is a point, two pairs a bounding box, three or more a
/// polygon ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Region {
    /// A single location.
    Point { lat: f64, lon: f64 },
    /// A rectangular area.
    Box(BoundingBox),
    /// A polygon ring of (lat, lon) vertices. The ring is implicitly closed.
    Polygon(Vec<(f64, f64)>),
}

impl Region {
    /// Build a region from (lat, lon) coordinate pairs.
    pub fn from_coords(pairs: &[(f64, f64)]) -> DroughtResult<Self> {
        for &(lat, lon) in pairs {
            validate_coordinate(lat, lon)?;
        }

        match pairs {
            [] => Err(DroughtError::region("no coordinates supplied")),
            [(lat, lon)] => Ok(Region::Point {
                lat: *lat,
                lon: *lon,
            }),
            [(lat_a, lon_a), (lat_b, lon_b)] => {
                if lat_a >= lat_b || lon_a >= lon_b {
                    return Err(DroughtError::region(format!(
                        "bounding box must have min < max on both axes, got lat {}..{} lon {}..{}",
                        lat_a, lat_b, lon_a, lon_b
                    )));
                }
                Ok(Region::Box(BoundingBox::new(*lon_a, *lat_a, *lon_b, *lat_b)))
            }
            ring => {
                let mut distinct: Vec<(f64, f64)> = Vec::new();
                for &v in ring {
                    if !distinct.contains(&v) {
                        distinct.push(v);
                    }
                }
                if distinct.len() < 3 {
                    return Err(DroughtError::region(format!(
                        "polygon needs at least 3 distinct vertices, got {}",
                        distinct.len()
                    )));
                }
                Ok(Region::Polygon(ring.to_vec()))
            }
        }
    }

    /// The bounding envelope of the region.
    ///
    /// For a point this is the degenerate zero-area box at the point itself.
    pub fn envelope(&self) -> BoundingBox {
        match self {
            Region::Point { lat, lon } => BoundingBox::new(*lon, *lat, *lon, *lat),
            Region::Box(bbox) => *bbox,
            Region::Polygon(ring) => {
                let mut env = BoundingBox::new(f64::MAX, f64::MAX, f64::MIN, f64::MIN);
                for (lat, lon) in ring {
                    env.min_lon = env.min_lon.min(*lon);
                    env.max_lon = env.max_lon.max(*lon);
                    env.min_lat = env.min_lat.min(*lat);
                    env.max_lat = env.max_lat.max(*lat);
                }
                env
            }
        }
    }

    /// Check whether a (lon, lat) location falls inside the region.
    ///
    /// Polygons use ray casting against the implicitly closed ring.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        match self {
            Region::Point {
                lat: plat,
                lon: plon,
            } => (lon - plon).abs() < f64::EPSILON && (lat - plat).abs() < f64::EPSILON,
            Region::Box(bbox) => bbox.contains(lon, lat),
            Region::Polygon(ring) => {
                let n = ring.len();
                let mut inside = false;
                let mut j = n - 1;
                for i in 0..n {
                    let (yi, xi) = ring[i];
                    let (yj, xj) = ring[j];
                    if ((yi > lat) != (yj > lat))
                        && (lon < (xj - xi) * (lat - yi) / (yj - yi) + xi)
                    {
                        inside = !inside;
                    }
                    j = i;
                }
                inside
            }
        }
    }

    /// Generate a cache key fragment identifying this region.
    pub fn cache_key(&self) -> String {
        match self {
            Region::Point { lat, lon } => format!("pt_{:.4}_{:.4}", lat, lon),
            Region::Box(bbox) => format!("box_{}", bbox.cache_key()),
            Region::Polygon(ring) => {
                // envelope plus vertex count keeps the key short but distinct
                format!("poly{}_{}", ring.len(), self.envelope().cache_key())
            }
        }
    }
}

fn validate_coordinate(lat: f64, lon: f64) -> DroughtResult<()> {
    if !(-90.0..=90.0).contains(&lat) {
        return Err(DroughtError::region(format!(
            "latitude {} is out of range [-90, 90]",
            lat
        )));
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(DroughtError::region(format!(
            "longitude {} is out of range [-180, 180]",
            lon
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_pair_is_point() {
        let region = Region::from_coords(&[(52.5, 1.25)]).unwrap();
        assert_eq!(
            region,
            Region::Point {
                lat: 52.5,
                lon: 1.25
            }
        );
    }

    #[test]
    fn test_two_pairs_are_bbox() {
        let region = Region::from_coords(&[(50.0, -1.0), (53.0, 2.0)]).unwrap();
        assert_eq!(region, Region::Box(BoundingBox::new(-1.0, 50.0, 2.0, 53.0)));
    }

    #[test]
    fn test_inverted_bbox_rejected() {
        let result = Region::from_coords(&[(53.0, -1.0), (50.0, 2.0)]);
        assert!(matches!(result, Err(DroughtError::Region(_))));

        let result = Region::from_coords(&[(50.0, 2.0), (53.0, -1.0)]);
        assert!(matches!(result, Err(DroughtError::Region(_))));
    }

    #[test]
    fn test_three_pairs_are_polygon() {
        let region = Region::from_coords(&[(50.0, 0.0), (52.0, 1.0), (50.0, 2.0)]).unwrap();
        assert!(matches!(region, Region::Polygon(_)));
    }

    #[test]
    fn test_degenerate_polygon_rejected() {
        let result = Region::from_coords(&[(50.0, 0.0), (50.0, 0.0), (50.0, 0.0)]);
        assert!(matches!(result, Err(DroughtError::Region(_))));
    }

    #[test]
    fn test_out_of_range_coordinate_rejected() {
        assert!(Region::from_coords(&[(95.0, 0.0)]).is_err());
        assert!(Region::from_coords(&[(0.0, 181.0)]).is_err());
    }

    #[test]
    fn test_polygon_contains() {
        // triangle over (50,0) (54,2) (50,4)
        let region =
            Region::from_coords(&[(50.0, 0.0), (54.0, 2.0), (50.0, 4.0)]).unwrap();
        assert!(region.contains(2.0, 51.0));
        assert!(!region.contains(0.1, 53.9));
        assert!(!region.contains(5.0, 51.0));
    }

    #[test]
    fn test_polygon_envelope() {
        let region =
            Region::from_coords(&[(50.0, 0.0), (54.0, 2.0), (50.0, 4.0)]).unwrap();
        assert_eq!(region.envelope(), BoundingBox::new(0.0, 50.0, 4.0, 54.0));
    }
}
