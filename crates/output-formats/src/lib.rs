//! Output artifact formats for drought indicator products.
//!
//! Every artifact serializes a [`SeriesTable`]: a dekad time axis, a grid,
//! and one or more named value columns. Both formats round-trip, which is
//! what lets a processing run short-circuit off an existing artifact without
//! recomputing anything.

pub mod geojson;
pub mod table;

mod artifact;

pub use artifact::{ArtifactFormat, Column, LabelColumn, SeriesTable};
