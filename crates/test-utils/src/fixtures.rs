//! Common fixtures for drought pipeline tests.

/// Common grid definitions for testing.
pub mod grid {
    use drought_common::{BoundingBox, GridSpec};

    /// 3x3 one-degree grid over East Anglia.
    pub const ANGLIA_3X3: GridSpec = GridSpec {
        bbox: BoundingBox {
            min_lon: 0.0,
            min_lat: 51.0,
            max_lon: 3.0,
            max_lat: 54.0,
        },
        width: 3,
        height: 3,
    };

    /// The same extent at quarter-degree resolution.
    pub const ANGLIA_12X12: GridSpec = GridSpec {
        bbox: BoundingBox {
            min_lon: 0.0,
            min_lat: 51.0,
            max_lon: 3.0,
            max_lat: 54.0,
        },
        width: 12,
        height: 12,
    };

    /// Small 2x2 grid for hand-checked expectations.
    pub const SIMPLE_2X2: GridSpec = GridSpec {
        bbox: BoundingBox {
            min_lon: 0.0,
            min_lat: 0.0,
            max_lon: 2.0,
            max_lat: 2.0,
        },
        width: 2,
        height: 2,
    };
}

/// Common region coordinates for testing, as (lat, lon) pairs.
pub mod region {
    /// A point inside the Anglia grids.
    pub const POINT: [(f64, f64); 1] = [(52.5, 1.25)];

    /// A box covering the south-west 2x2 cells of the one-degree Anglia grid.
    pub const BOX: [(f64, f64); 2] = [(51.5, 0.5), (53.0, 2.0)];

    /// A triangle over the south-west corner of the Anglia grids, shaped so
    /// no one-degree cell center lands exactly on an edge.
    pub const TRIANGLE: [(f64, f64); 3] = [(51.0, 0.0), (54.0, 0.0), (51.0, 2.6)];
}
