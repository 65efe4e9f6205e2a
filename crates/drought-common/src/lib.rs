//! Common types shared across all climate-drought crates.

pub mod bbox;
pub mod dekad;
pub mod error;
pub mod region;
pub mod series;

pub use bbox::BoundingBox;
pub use dekad::{Dekad, DekadRange};
pub use error::{DroughtError, DroughtResult};
pub use region::Region;
pub use series::{GridSpec, GriddedSeries, RawSample, RawSeries, OUTSIDE_AREA};
